//! Transcription session management
//!
//! One buffering session per live conversation: raw audio frames accumulate
//! in a byte buffer and are dispatched upstream in fixed-size chunks, while
//! a dedicated per-session task consumes the engine's typed events and
//! appends validated transcript segments. Segments survive upstream
//! failures and session stop; only an explicit clear destroys them.

mod manager;
mod segment;
mod session;

pub use manager::{SessionContext, TranscriptionManager};
pub use segment::TranscriptSegment;

/// Bytes dispatched upstream per chunk — roughly 100ms of 16kHz mono
/// 16-bit PCM
pub const AUDIO_CHUNK_BYTES: usize = 3200;
