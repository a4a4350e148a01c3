//! Customer admission and agent matching
//!
//! This module owns the three routing pieces:
//! - `CustomerQueue`: waiting customers in strict arrival order
//! - `AgentRegistry`: per-agent availability state machine
//! - `try_match`: the pairing algorithm fired on every state change

mod matcher;
mod queue;
mod registry;

pub use matcher::{try_match, Assignment};
pub use queue::{CustomerQueue, QueueEntry, QueueEntryStatus};
pub use registry::{AgentRecord, AgentRegistry, AgentStats, AgentStatus};
