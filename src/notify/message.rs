use chrono::{DateTime, Utc};
use serde::Serialize;

/// Events pushed to customers and agents over their persistent connections
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifyEvent {
    /// To an agent: a customer has been assigned to you
    CustomerAssigned {
        customer: String,
        category: String,
        room: String,
        /// Credential the agent presents to join the room
        token: String,
    },

    /// To a customer: an agent picked you up
    AgentAssigned {
        agent_id: String,
        room: String,
        /// Credential the customer presents to join the room
        token: String,
    },

    /// To a waiting customer: your place in line moved
    QueuePosition { position: usize },

    /// To the target agent: a transfer is being prepared, not yet joinable
    TransferPending {
        from_agent: String,
        room: String,
        summary: String,
        created_at: DateTime<Utc>,
    },

    /// To the target agent: the transfer is ready to join
    TransferReady {
        room: String,
        summary: String,
        token: Option<String>,
    },
}
