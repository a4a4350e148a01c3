use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ServiceError};

/// Agent availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Offline,
    Available,
    Busy,
}

impl FromStr for AgentStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "offline" => Ok(AgentStatus::Offline),
            "available" => Ok(AgentStatus::Available),
            "busy" => Ok(AgentStatus::Busy),
            other => Err(ServiceError::input(format!(
                "unknown agent status: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentStatus::Offline => "offline",
            AgentStatus::Available => "available",
            AgentStatus::Busy => "busy",
        };
        f.write_str(s)
    }
}

/// One agent's current state
///
/// `current_customer` is non-empty exactly when the agent is busy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_id: String,
    pub status: AgentStatus,
    pub current_customer: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl AgentRecord {
    fn offline(agent_id: &str) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            status: AgentStatus::Offline,
            current_customer: None,
            updated_at: Utc::now(),
        }
    }
}

/// Registry of every agent seen so far
///
/// Records are created lazily on first reference (defaulting to offline) and
/// never deleted, only transitioned.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: HashMap<String, AgentRecord>,
}

/// Registry-wide counts
#[derive(Debug, Clone, Serialize)]
pub struct AgentStats {
    pub total: usize,
    pub available: usize,
    pub busy: usize,
    pub offline: usize,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
        }
    }

    /// Current record for an agent, creating an offline record on first
    /// reference
    pub fn get(&mut self, agent_id: &str) -> &AgentRecord {
        self.agents
            .entry(agent_id.to_string())
            .or_insert_with(|| AgentRecord::offline(agent_id))
    }

    pub fn status_of(&mut self, agent_id: &str) -> AgentStatus {
        self.get(agent_id).status
    }

    /// Transition an agent's status. Going busy requires the customer being
    /// served; any other status clears it.
    pub fn set_status(
        &mut self,
        agent_id: &str,
        status: AgentStatus,
        current_customer: Option<String>,
    ) -> Result<AgentRecord> {
        if status == AgentStatus::Busy && current_customer.is_none() {
            return Err(ServiceError::agent(format!(
                "agent {} cannot be busy without a customer",
                agent_id
            )));
        }

        let record = self
            .agents
            .entry(agent_id.to_string())
            .or_insert_with(|| AgentRecord::offline(agent_id));

        record.status = status;
        record.current_customer = if status == AgentStatus::Busy {
            current_customer
        } else {
            None
        };
        record.updated_at = Utc::now();

        info!("Agent {} status: {}", agent_id, status);
        Ok(record.clone())
    }

    /// First available agent found; agents are not prioritized among
    /// themselves
    pub fn first_available(&self) -> Option<String> {
        self.agents
            .values()
            .find(|r| r.status == AgentStatus::Available)
            .map(|r| r.agent_id.clone())
    }

    pub fn available_count(&self) -> usize {
        self.agents
            .values()
            .filter(|r| r.status == AgentStatus::Available)
            .count()
    }

    pub fn stats(&self) -> AgentStats {
        let total = self.agents.len();
        let available = self.available_count();
        let busy = self
            .agents
            .values()
            .filter(|r| r.status == AgentStatus::Busy)
            .count();

        AgentStats {
            total,
            available,
            busy,
            offline: total - available - busy,
        }
    }
}
