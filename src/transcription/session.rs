use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::segment::TranscriptSegment;
use super::AUDIO_CHUNK_BYTES;
use crate::error::Result;
use crate::external::speech::{AudioSink, SegmentEvent, SpeechEvent};
use crate::external::EXTERNAL_CALL_TIMEOUT;

/// Upstream half of a session: byte accumulator plus the exclusively-owned
/// sink. Serialized under one lock so frames for a session are never
/// reordered; different sessions dispatch fully in parallel.
struct SessionIo {
    buffer: Vec<u8>,
    sink: Box<dyn AudioSink>,
}

/// Shared state of one transcription session
pub(crate) struct SessionState {
    key: String,
    active: AtomicBool,
    io: Mutex<Option<SessionIo>>,
    segments: Mutex<Vec<TranscriptSegment>>,
    event_task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionState {
    pub(crate) fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            active: AtomicBool::new(false),
            io: Mutex::new(None),
            segments: Mutex::new(Vec::new()),
            event_task: Mutex::new(None),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Attach a fresh upstream stream and start the event loop. Also used
    /// to bring a stopped session back without losing its segments.
    pub(crate) async fn attach(
        self: Arc<Self>,
        sink: Box<dyn AudioSink>,
        events: mpsc::Receiver<SpeechEvent>,
    ) {
        {
            let mut io = self.io.lock().await;
            *io = Some(SessionIo {
                buffer: Vec::new(),
                sink,
            });
        }
        self.active.store(true, Ordering::SeqCst);

        let task = tokio::spawn(Self::event_loop(Arc::clone(&self), events));
        let mut handle = self.event_task.lock().await;
        if let Some(old) = handle.replace(task) {
            old.abort();
        }
    }

    /// Consume typed events from the engine until the stream errors,
    /// closes, or the session stops
    async fn event_loop(state: Arc<SessionState>, mut events: mpsc::Receiver<SpeechEvent>) {
        info!("Transcript event loop started for {}", state.key);

        while let Some(event) = events.recv().await {
            if !state.is_active() {
                break;
            }

            match event {
                SpeechEvent::Segment(seg) => state.append_segment(seg).await,
                SpeechEvent::Error(e) => {
                    warn!("Speech stream error for {}: {}", state.key, e);
                    state.active.store(false, Ordering::SeqCst);
                    break;
                }
                SpeechEvent::Closed => {
                    info!("Speech stream closed for {}", state.key);
                    state.active.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }

        state.active.store(false, Ordering::SeqCst);
        info!("Transcript event loop stopped for {}", state.key);
    }

    async fn append_segment(&self, event: SegmentEvent) {
        if event.text.trim().is_empty() {
            warn!("Dropping empty transcript segment for {}", self.key);
            return;
        }

        let speaker = event
            .words
            .first()
            .and_then(|w| w.speaker)
            .map(|s| format!("speaker_{}", s))
            .unwrap_or_else(|| "unknown".to_string());

        let segment = TranscriptSegment {
            speaker,
            text: event.text,
            timestamp: Utc::now(),
            is_final: event.is_final,
            confidence: event.confidence,
            words: event.words,
        };

        let mut segments = self.segments.lock().await;
        segments.push(segment);
    }

    /// Accumulate raw audio; dispatch full chunks upstream. Returns whether
    /// the frame was accepted. Upstream failure or timeout marks the
    /// session inactive but keeps captured segments retrievable.
    pub(crate) async fn feed(&self, bytes: &[u8]) -> Result<bool> {
        if !self.is_active() {
            warn!("Dropping audio for inactive session {}", self.key);
            return Ok(false);
        }

        let mut io_guard = self.io.lock().await;
        let Some(io) = io_guard.as_mut() else {
            return Ok(false);
        };

        io.buffer.extend_from_slice(bytes);

        while io.buffer.len() >= AUDIO_CHUNK_BYTES {
            let chunk: Vec<u8> = io.buffer.drain(..AUDIO_CHUNK_BYTES).collect();

            match tokio::time::timeout(EXTERNAL_CALL_TIMEOUT, io.sink.send(chunk)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Audio dispatch failed for {}: {}", self.key, e);
                    self.active.store(false, Ordering::SeqCst);
                    return Ok(false);
                }
                Err(_) => {
                    warn!("Audio dispatch timed out for {}", self.key);
                    self.active.store(false, Ordering::SeqCst);
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }

    /// Tear down the upstream connection. Segments stay retrievable until
    /// the session is cleared.
    pub(crate) async fn shutdown(&self) {
        self.active.store(false, Ordering::SeqCst);

        let io = { self.io.lock().await.take() };
        if let Some(mut io) = io {
            if let Err(e) = io.sink.close().await {
                warn!("Failed to close speech sink for {}: {}", self.key, e);
            }
        }

        let task = { self.event_task.lock().await.take() };
        if let Some(task) = task {
            task.abort();
        }
    }

    pub(crate) async fn snapshot(&self) -> Vec<TranscriptSegment> {
        self.segments.lock().await.clone()
    }
}
