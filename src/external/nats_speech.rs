use async_trait::async_trait;
use base64::Engine;
use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::speech::{AudioSink, SegmentEvent, SpeechEngine, SpeechEvent, WordInfo};
use crate::error::{Result, ServiceError};

/// Audio chunk published to the speech service
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioChunkMessage {
    pub session: String,
    pub sequence: u32,
    /// Base64-encoded 16kHz mono 16-bit PCM
    pub pcm: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub timestamp: String, // RFC3339
    #[serde(rename = "final")]
    pub final_chunk: bool,
}

/// Transcript segment received from the speech service
#[derive(Debug, Serialize, Deserialize)]
pub struct SegmentMessage {
    pub session: String,
    pub text: String,
    #[serde(rename = "final")]
    pub is_final: bool,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub words: Vec<WordInfo>,
    pub timestamp: String,
}

/// Speech engine speaking NATS: audio chunks go out on
/// `stt.audio.<session>`, segments come back on `stt.segment.<session>`.
pub struct NatsSpeechEngine {
    client: async_nats::Client,
}

impl NatsSpeechEngine {
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .map_err(|e| ServiceError::upstream(format!("NATS connect failed: {}", e)))?;

        info!("Connected to NATS");
        Ok(Self { client })
    }
}

#[async_trait]
impl SpeechEngine for NatsSpeechEngine {
    async fn open(
        &self,
        key: &str,
    ) -> Result<(Box<dyn AudioSink>, mpsc::Receiver<SpeechEvent>)> {
        let subject = format!("stt.segment.{}", key);
        let mut subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .map_err(|e| ServiceError::upstream(format!("NATS subscribe failed: {}", e)))?;

        info!("Subscribed to {}", subject);

        let (event_tx, event_rx) = mpsc::channel(64);
        let session = key.to_string();

        // Decode NATS messages into typed events until the subscription or
        // the consuming session goes away.
        tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                let event = match serde_json::from_slice::<SegmentMessage>(&msg.payload) {
                    Ok(seg) if seg.session == session => SpeechEvent::Segment(SegmentEvent {
                        text: seg.text,
                        is_final: seg.is_final,
                        confidence: seg.confidence,
                        words: seg.words,
                    }),
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Failed to parse segment message: {}", e);
                        continue;
                    }
                };

                if event_tx.send(event).await.is_err() {
                    break;
                }
            }
            let _ = event_tx.send(SpeechEvent::Closed).await;
        });

        let sink = NatsAudioSink {
            client: self.client.clone(),
            session: key.to_string(),
            sequence: 0,
        };

        Ok((Box::new(sink), event_rx))
    }
}

struct NatsAudioSink {
    client: async_nats::Client,
    session: String,
    sequence: u32,
}

impl NatsAudioSink {
    async fn publish(&mut self, pcm: &[u8], final_chunk: bool) -> Result<()> {
        let subject = format!("stt.audio.{}", self.session);

        let message = AudioChunkMessage {
            session: self.session.clone(),
            sequence: self.sequence,
            pcm: base64::engine::general_purpose::STANDARD.encode(pcm),
            sample_rate: 16000,
            channels: 1,
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_chunk,
        };
        self.sequence += 1;

        let payload = serde_json::to_vec(&message)
            .map_err(|e| ServiceError::upstream(format!("encode audio chunk: {}", e)))?;

        self.client
            .publish(subject, payload.into())
            .await
            .map_err(|e| ServiceError::upstream(format!("publish audio chunk: {}", e)))
    }
}

#[async_trait]
impl AudioSink for NatsAudioSink {
    async fn send(&mut self, chunk: Vec<u8>) -> Result<()> {
        self.publish(&chunk, false).await
    }

    async fn close(&mut self) -> Result<()> {
        // Empty final marker tells the service to flush this session
        self.publish(&[], true).await
    }
}
