use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use super::segment::TranscriptSegment;
use super::session::SessionState;
use crate::error::Result;
use crate::external::speech::SpeechEngine;

/// What the transcription manager can say about a conversation's context
/// when a consumer (the transfer orchestrator) asks for it
#[derive(Debug, Clone)]
pub enum SessionContext {
    /// No session was ever started for this key
    Absent,
    /// A session ran but produced no final text — degraded context
    Empty,
    /// Final segments are available
    Segments(Vec<TranscriptSegment>),
}

/// Owns every transcription session, keyed by conversation
///
/// At most one session exists per key; starting an already-active key is a
/// success no-op, stopping an absent key is a success no-op. A stopped
/// session keeps its segments until explicitly cleared.
pub struct TranscriptionManager {
    engine: Arc<dyn SpeechEngine>,
    sessions: Mutex<HashMap<String, Arc<SessionState>>>,
}

impl TranscriptionManager {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            engine,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Open an upstream stream for `key` and begin accumulating segments.
    /// Restarting a stopped key re-opens upstream and keeps appending to
    /// the same segment list.
    pub async fn start(&self, key: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().await;

        if let Some(existing) = sessions.get(key) {
            if existing.is_active() {
                info!("Transcription already active for {}", key);
                return Ok(());
            }
        }

        let (sink, events) = self.engine.open(key).await?;

        let state = sessions
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(SessionState::new(key)))
            .clone();
        state.attach(sink, events).await;

        info!("Transcription started for {}", key);
        Ok(())
    }

    /// Tear down the upstream stream for `key`. Success even when no
    /// session exists; captured segments remain retrievable.
    pub async fn stop(&self, key: &str) -> Result<()> {
        let state = { self.sessions.lock().await.get(key).cloned() };

        match state {
            Some(state) => {
                state.shutdown().await;
                info!("Transcription stopped for {}", key);
            }
            None => {
                info!("Transcription stop for {}: no session", key);
            }
        }

        Ok(())
    }

    /// Drop the session and destroy its segment list
    pub async fn clear(&self, key: &str) {
        let state = { self.sessions.lock().await.remove(key) };
        if let Some(state) = state {
            state.shutdown().await;
            info!("Transcription session cleared for {}", key);
        }
    }

    pub async fn is_active(&self, key: &str) -> bool {
        let sessions = self.sessions.lock().await;
        sessions.get(key).map(|s| s.is_active()).unwrap_or(false)
    }

    /// Feed raw audio from the media platform into the session's byte
    /// buffer. Frames for an absent or inactive session are dropped.
    pub async fn feed_audio(&self, key: &str, bytes: &[u8]) -> Result<bool> {
        let state = { self.sessions.lock().await.get(key).cloned() };

        match state {
            Some(state) => state.feed(bytes).await,
            None => Ok(false),
        }
    }

    /// All segments for a key in arrival order, or None if no session ever
    /// existed
    pub async fn get_segments(&self, key: &str) -> Option<Vec<TranscriptSegment>> {
        let state = { self.sessions.lock().await.get(key).cloned() };
        match state {
            Some(state) => Some(state.snapshot().await),
            None => None,
        }
    }

    /// Final-only segment text, space-joined in arrival order
    pub async fn get_summary_text(&self, key: &str) -> Option<String> {
        let segments = self.get_segments(key).await?;
        let text: Vec<&str> = segments
            .iter()
            .filter(|s| s.is_final)
            .map(|s| s.text.as_str())
            .collect();
        Some(text.join(" "))
    }

    /// Classify the conversation context for summarization
    pub async fn context(&self, key: &str) -> SessionContext {
        match self.get_segments(key).await {
            None => SessionContext::Absent,
            Some(segments) => {
                let finals: Vec<TranscriptSegment> =
                    segments.into_iter().filter(|s| s.is_final).collect();
                if finals.is_empty() {
                    SessionContext::Empty
                } else {
                    SessionContext::Segments(finals)
                }
            }
        }
    }
}
