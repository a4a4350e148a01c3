use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transcription::TranscriptSegment;

/// Stages a transfer passes through, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStage {
    Requested,
    Summarized,
    RoomReady,
    AwaitingSecondAgent,
    ReadyToJoin,
    Completed,
}

/// Whether the second agent joins the existing room or everyone moves to a
/// fresh transfer room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStrategy {
    /// Issue a credential for the incoming agent only; nobody moves
    #[default]
    ReuseOriginalRoom,
    /// Create `transfer_<room>_<agent>` and credential every party into it
    CreateTransferRoom,
}

/// One opaque join token per party that must join the transfer room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartyCredential {
    pub identity: String,
    pub token: String,
}

/// The transcription context that produced the summary, embedded in the
/// record for later inspection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSnapshot {
    /// "caller_supplied", "live", "never_started", or "empty"
    pub source: String,
    /// The context string handed to the summarizer (or the placeholder)
    pub text: String,
    /// The final segments inside the summarization window
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

/// Inputs to transfer initiation
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    pub from_agent_id: String,
    /// Originating conversation key
    pub room: String,
    pub customer_identity: String,
    /// Role key resolved through the agent directory
    pub target_role: String,
    /// Caller-supplied summary; when present and non-empty it is used
    /// verbatim and the summarization service is never called
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub strategy: RoomStrategy,
}

/// An outstanding warm transfer, keyed by target-agent slot
#[derive(Debug, Clone, Serialize)]
pub struct TransferRecord {
    pub target_agent_id: String,
    /// Room the second agent joins
    pub room: String,
    pub summary: String,
    pub credentials: Vec<PartyCredential>,
    pub from_agent_id: String,
    pub created_at: DateTime<Utc>,
    /// Flips false → true exactly once, never back
    pub ready_to_join: bool,
    pub stage: TransferStage,
    /// Telephony leg call id, when the target takes transfers by phone
    pub call_id: Option<String>,
    pub context: TranscriptSnapshot,
}

impl TransferRecord {
    /// Token issued for the target agent, if credential issuance succeeded
    pub fn target_token(&self) -> Option<&str> {
        let identity = format!("agent_{}", self.target_agent_id);
        self.credentials
            .iter()
            .find(|c| c.identity == identity)
            .map(|c| c.token.as_str())
    }
}
