use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};

use crate::error::{Result, ServiceError};

/// One speech-to-text result, interim or final
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentEvent {
    pub text: String,
    pub is_final: bool,
    #[serde(default)]
    pub confidence: Option<f32>,
    /// Word-level timing and speaker tags, when the engine provides them
    #[serde(default)]
    pub words: Vec<WordInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordInfo {
    pub word: String,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub speaker: Option<u32>,
}

/// Typed events flowing back from an upstream speech stream
///
/// Each transcription session consumes these from a dedicated channel, which
/// keeps per-session ordering without callback registration semantics.
#[derive(Debug, Clone)]
pub enum SpeechEvent {
    Segment(SegmentEvent),
    Error(String),
    Closed,
}

/// Upstream half of a speech stream: raw audio chunks go in
#[async_trait]
pub trait AudioSink: Send {
    async fn send(&mut self, chunk: Vec<u8>) -> Result<()>;
    async fn close(&mut self) -> Result<()>;
}

/// Streaming speech-to-text engine
///
/// `open` establishes one bidirectional stream per conversation key: an
/// audio sink owned exclusively by the session, and the receiving end of
/// that stream's event channel.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn open(&self, key: &str)
        -> Result<(Box<dyn AudioSink>, mpsc::Receiver<SpeechEvent>)>;
}

/// In-process loopback engine
///
/// Audio chunks land on a per-key channel and events are injected through a
/// [`SpeechStreamHandle`]. Backs the test suite and local development runs
/// with no speech service attached.
pub struct ChannelSpeechEngine {
    handles: Mutex<HashMap<String, SpeechStreamHandle>>,
}

/// Far end of a loopback stream
pub struct SpeechStreamHandle {
    /// Chunks the session dispatched upstream, in order
    pub audio_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    /// Inject transcript/error/close events into the session
    pub event_tx: mpsc::Sender<SpeechEvent>,
}

impl ChannelSpeechEngine {
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Take the far end of the stream opened for `key`
    pub async fn take_handle(&self, key: &str) -> Option<SpeechStreamHandle> {
        self.handles.lock().await.remove(key)
    }
}

impl Default for ChannelSpeechEngine {
    fn default() -> Self {
        Self::new()
    }
}

struct ChannelSink {
    audio_tx: mpsc::UnboundedSender<Vec<u8>>,
}

#[async_trait]
impl AudioSink for ChannelSink {
    async fn send(&mut self, chunk: Vec<u8>) -> Result<()> {
        self.audio_tx
            .send(chunk)
            .map_err(|_| ServiceError::upstream("speech stream closed"))
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl SpeechEngine for ChannelSpeechEngine {
    async fn open(
        &self,
        key: &str,
    ) -> Result<(Box<dyn AudioSink>, mpsc::Receiver<SpeechEvent>)> {
        let (audio_tx, audio_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(64);

        self.handles
            .lock()
            .await
            .insert(key.to_string(), SpeechStreamHandle { audio_rx, event_tx });

        Ok((Box::new(ChannelSink { audio_tx }), event_rx))
    }
}
