use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::queue::CustomerQueue;
use super::registry::{AgentRegistry, AgentStatus};

/// A (customer, agent) pairing produced by the matcher
#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    pub customer: String,
    pub category: String,
    pub agent_id: String,
    pub enqueued_at: DateTime<Utc>,
}

/// Bind the oldest waiting customer to an agent.
///
/// With a target agent, the bind happens only if that agent is available;
/// without one, the first available agent found gets the customer. Customers
/// are always served strictly oldest-first. The caller must hold the locks
/// on both structures for the whole call, which makes check-and-assign a
/// single critical section — an agent can never be handed two customers.
///
/// No available agent or an empty queue is a normal outcome, not an error.
pub fn try_match(
    queue: &mut CustomerQueue,
    agents: &mut AgentRegistry,
    target: Option<&str>,
) -> Option<Assignment> {
    let agent_id = match target {
        Some(id) => {
            if agents.status_of(id) != AgentStatus::Available {
                return None;
            }
            id.to_string()
        }
        None => agents.first_available()?,
    };

    let entry = queue.pop_front()?;

    // Infallible: the agent was just observed available, and busy is set
    // together with the customer.
    agents
        .set_status(&agent_id, AgentStatus::Busy, Some(entry.identity.clone()))
        .expect("agent observed available under lock");

    info!(
        "Matched customer {} (category {}) to agent {}",
        entry.identity, entry.category, agent_id
    );

    Some(Assignment {
        customer: entry.identity,
        category: entry.category,
        agent_id,
        enqueued_at: entry.enqueued_at,
    })
}
