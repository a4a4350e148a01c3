//! Warm-transfer orchestration
//!
//! Drives a conversation from "single agent" through "second agent ready to
//! join": resolves the target, produces a summary (caller-supplied,
//! LLM-generated from transcription context, or a deterministic fallback),
//! sets up room credentials, optionally places the phone leg, and gates the
//! handoff behind an explicit mark-ready step.

mod orchestrator;
mod record;

pub use orchestrator::{TransferOrchestrator, NO_TRANSCRIPTION_PLACEHOLDER, TRANSCRIPTION_FAILED_PLACEHOLDER};
pub use record::{
    PartyCredential, RoomStrategy, TransferRecord, TransferRequest, TransferStage,
    TranscriptSnapshot,
};
