//! Agent directory and customer profiles
//!
//! The transfer orchestrator resolves transfer targets by role here, and the
//! summarizer receives the matching customer profile as structured context.
//! Entries are seeded from configuration and read-only at runtime.

use serde::{Deserialize, Serialize};

/// A human agent known to the support center
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryAgent {
    pub id: String,
    pub name: String,
    /// Role key used as the transfer target category (e.g. "compliance")
    pub role: String,
    /// Phone number for the outbound telephony leg, if the agent takes
    /// transfers on the phone
    #[serde(default)]
    pub phone: Option<String>,
}

/// A known customer, used as structured summarization context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerProfile {
    /// Customer handle (email)
    pub identity: String,
    pub name: String,
    #[serde(default)]
    pub notes: String,
}

pub struct AgentDirectory {
    agents: Vec<DirectoryAgent>,
    customers: Vec<CustomerProfile>,
}

impl AgentDirectory {
    pub fn new(agents: Vec<DirectoryAgent>, customers: Vec<CustomerProfile>) -> Self {
        Self { agents, customers }
    }

    /// Find the first agent registered under the given role key
    pub fn agent_for_role(&self, role: &str) -> Option<&DirectoryAgent> {
        self.agents
            .iter()
            .find(|a| a.role.eq_ignore_ascii_case(role))
    }

    pub fn agent_by_id(&self, id: &str) -> Option<&DirectoryAgent> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// Look up a customer profile by identity (case-insensitive, matching
    /// how email handles are compared)
    pub fn customer(&self, identity: &str) -> Option<&CustomerProfile> {
        self.customers
            .iter()
            .find(|c| c.identity.eq_ignore_ascii_case(identity))
    }

    pub fn agents(&self) -> &[DirectoryAgent] {
        &self.agents
    }
}
