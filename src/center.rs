//! The support-center service container
//!
//! All mutable orchestration state lives here, constructed once in `main`
//! and injected into every handler. Swapping the in-memory stores for a
//! durable backend means replacing this container's internals; the matcher
//! and orchestrator contracts stay put.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::directory::AgentDirectory;
use crate::error::{Result, ServiceError};
use crate::external::media::{MediaPlatform, Permissions};
use crate::external::speech::SpeechEngine;
use crate::external::summarizer::Summarizer;
use crate::external::telephony::TelephonyGateway;
use crate::notify::{NotificationHub, NotifyEvent, TargetKind};
use crate::routing::{
    try_match, AgentRecord, AgentRegistry, AgentStats, AgentStatus, Assignment, CustomerQueue,
};
use crate::transcription::TranscriptionManager;
use crate::transfer::TransferOrchestrator;

/// Everything both parties need to know about a fresh assignment
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentNotice {
    pub customer: String,
    pub category: String,
    pub agent_id: String,
    pub room: String,
    pub agent_token: String,
    pub customer_token: String,
}

/// Result of putting a customer in the queue: either they wait at
/// `position` or the matcher bound them immediately
#[derive(Debug, Clone, Serialize)]
pub struct EnqueueOutcome {
    pub position: usize,
    pub assignment: Option<AssignmentNotice>,
}

pub struct Center {
    queue: Mutex<CustomerQueue>,
    agents: Mutex<AgentRegistry>,
    pub transcription: Arc<TranscriptionManager>,
    pub transfers: Arc<TransferOrchestrator>,
    pub hub: Arc<NotificationHub>,
    pub directory: Arc<AgentDirectory>,
    media: Arc<dyn MediaPlatform>,
    /// Rooms this service created or credentialed, inspected by the reaper
    tracked_rooms: Mutex<HashSet<String>>,
}

impl Center {
    pub fn new(
        media: Arc<dyn MediaPlatform>,
        telephony: Arc<dyn TelephonyGateway>,
        summarizer: Arc<dyn Summarizer>,
        speech: Arc<dyn SpeechEngine>,
        directory: Arc<AgentDirectory>,
        webhook_base_url: &str,
    ) -> Self {
        let hub = Arc::new(NotificationHub::new());
        let transcription = Arc::new(TranscriptionManager::new(speech));
        let transfers = Arc::new(TransferOrchestrator::new(
            Arc::clone(&media),
            telephony,
            summarizer,
            Arc::clone(&transcription),
            Arc::clone(&directory),
            Arc::clone(&hub),
            webhook_base_url,
        ));

        Self {
            queue: Mutex::new(CustomerQueue::new()),
            agents: Mutex::new(AgentRegistry::new()),
            transcription,
            transfers,
            hub,
            directory,
            media,
            tracked_rooms: Mutex::new(HashSet::new()),
        }
    }

    /// Put a customer in line and immediately run the matcher
    pub async fn enqueue_customer(&self, identity: &str, category: &str) -> Result<EnqueueOutcome> {
        if identity.trim().is_empty() {
            return Err(ServiceError::input("identity must not be empty"));
        }
        if category.trim().is_empty() {
            return Err(ServiceError::input("category must not be empty"));
        }

        let (position, matched) = {
            let mut queue = self.queue.lock().await;
            let mut agents = self.agents.lock().await;
            let position = queue.enqueue(identity, category)?;
            let matched = try_match(&mut queue, &mut agents, None);
            (position, matched)
        };

        let assignment = match matched {
            Some(m) => Some(self.finish_assignment(m).await),
            None => None,
        };

        Ok(EnqueueOutcome {
            position,
            assignment,
        })
    }

    /// 1-based queue position, or None once assigned/absent
    pub async fn queue_position(&self, identity: &str) -> Option<usize> {
        self.queue.lock().await.position_of(identity)
    }

    /// Customer gave up waiting; idempotent
    pub async fn abandon(&self, identity: &str) -> bool {
        let removed = self.queue.lock().await.remove(identity);
        if removed {
            self.push_queue_positions().await;
        }
        removed
    }

    pub async fn queue_length(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Transition an agent's status. A transition to available triggers the
    /// matcher before this returns, so the caller sees any assignment the
    /// transition produced.
    pub async fn set_agent_status(
        &self,
        agent_id: &str,
        status: AgentStatus,
        current_customer: Option<String>,
    ) -> Result<(AgentRecord, Option<AssignmentNotice>)> {
        let record = {
            let mut agents = self.agents.lock().await;
            agents.set_status(agent_id, status, current_customer)?
        };

        let assignment = if status == AgentStatus::Available {
            self.match_for(Some(agent_id)).await
        } else {
            None
        };

        Ok((record, assignment))
    }

    /// Agent-initiated "pick next customer"
    pub async fn pick_next(&self, agent_id: &str) -> Result<Option<AssignmentNotice>> {
        {
            let mut agents = self.agents.lock().await;
            if agents.status_of(agent_id) != AgentStatus::Available {
                return Err(ServiceError::agent(format!(
                    "agent {} is not available; set status to available and retry",
                    agent_id
                )));
            }
        }

        Ok(self.match_for(Some(agent_id)).await)
    }

    pub async fn agent_record(&self, agent_id: &str) -> AgentRecord {
        self.agents.lock().await.get(agent_id).clone()
    }

    pub async fn agent_stats(&self) -> AgentStats {
        self.agents.lock().await.stats()
    }

    pub async fn available_count(&self) -> usize {
        self.agents.lock().await.available_count()
    }

    /// Delete tracked rooms that no longer have participants. Returns how
    /// many were reclaimed.
    pub async fn reap_idle_rooms(&self) -> usize {
        let rooms: Vec<String> = {
            let tracked = self.tracked_rooms.lock().await;
            tracked.iter().cloned().collect()
        };

        let mut reaped = 0;
        for room in rooms {
            let empty = match self.media.list_participants(&room).await {
                Ok(participants) => participants.is_empty(),
                // Already gone upstream; just stop tracking it.
                Err(_) => true,
            };

            if empty {
                if let Err(e) = self.media.delete_room(&room).await {
                    warn!("Failed to delete idle room {}: {}", room, e);
                    continue;
                }
                self.tracked_rooms.lock().await.remove(&room);
                info!("Reaped idle room {}", room);
                reaped += 1;
            }
        }
        reaped
    }

    pub async fn track_room(&self, room: &str) {
        self.tracked_rooms.lock().await.insert(room.to_string());
    }

    async fn match_for(&self, target: Option<&str>) -> Option<AssignmentNotice> {
        let matched = {
            let mut queue = self.queue.lock().await;
            let mut agents = self.agents.lock().await;
            try_match(&mut queue, &mut agents, target)
        };

        match matched {
            Some(m) => Some(self.finish_assignment(m).await),
            None => None,
        }
    }

    /// Room setup, credential issuance, and the two targeted notifications
    /// that follow every successful bind
    async fn finish_assignment(&self, assignment: Assignment) -> AssignmentNotice {
        let room = format!("support-{}", uuid::Uuid::new_v4());

        if let Err(e) = self.media.create_room(&room).await {
            warn!("Failed to create room {}: {}", room, e);
        }
        self.track_room(&room).await;

        let agent_identity = format!("agent_{}", assignment.agent_id);
        let agent_token = self.issue_token(&room, &agent_identity).await;
        let customer_token = self.issue_token(&room, &assignment.customer).await;

        self.hub
            .send_to(
                TargetKind::Agent,
                &assignment.agent_id,
                &NotifyEvent::CustomerAssigned {
                    customer: assignment.customer.clone(),
                    category: assignment.category.clone(),
                    room: room.clone(),
                    token: agent_token.clone(),
                },
            )
            .await;

        self.hub
            .send_to(
                TargetKind::Customer,
                &assignment.customer,
                &NotifyEvent::AgentAssigned {
                    agent_id: assignment.agent_id.clone(),
                    room: room.clone(),
                    token: customer_token.clone(),
                },
            )
            .await;

        self.push_queue_positions().await;

        AssignmentNotice {
            customer: assignment.customer,
            category: assignment.category,
            agent_id: assignment.agent_id,
            room,
            agent_token,
            customer_token,
        }
    }

    async fn issue_token(&self, room: &str, identity: &str) -> String {
        match self
            .media
            .issue_credential(room, identity, Permissions::default())
            .await
        {
            Ok(token) => token,
            Err(e) => {
                warn!("Failed to issue credential for {} in {}: {}", identity, room, e);
                String::new()
            }
        }
    }

    /// Tell everyone still waiting where they now stand
    async fn push_queue_positions(&self) {
        let waiting: Vec<(String, usize)> = {
            let queue = self.queue.lock().await;
            queue
                .waiting()
                .enumerate()
                .map(|(i, e)| (e.identity.clone(), i + 1))
                .collect()
        };

        for (identity, position) in waiting {
            self.hub
                .send_to(
                    TargetKind::Customer,
                    &identity,
                    &NotifyEvent::QueuePosition { position },
                )
                .await;
        }
    }
}
