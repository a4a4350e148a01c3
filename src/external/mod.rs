//! External collaborator boundary
//!
//! The core talks to the media/room platform, telephony gateway, speech
//! engine, and summarization service only through the traits defined here.
//! Every call that leaves the process is bounded by `EXTERNAL_CALL_TIMEOUT`
//! and a timeout is a normal failure mode with a fallback, not a crash.

pub mod media;
pub mod nats_speech;
pub mod speech;
pub mod summarizer;
pub mod telephony;

use std::time::Duration;

/// Budget for any single blocking call to an external service
pub const EXTERNAL_CALL_TIMEOUT: Duration = Duration::from_secs(30);

pub use media::{LocalMediaPlatform, MediaPlatform, Permissions};
pub use nats_speech::NatsSpeechEngine;
pub use speech::{
    AudioSink, ChannelSpeechEngine, SegmentEvent, SpeechEngine, SpeechEvent, SpeechStreamHandle,
    WordInfo,
};
pub use summarizer::{HttpSummarizer, Summarizer};
pub use telephony::{render_voice_markup, HttpTelephonyGateway, TelephonyGateway};
