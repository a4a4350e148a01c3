use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::record::{
    PartyCredential, RoomStrategy, TransferRecord, TransferRequest, TransferStage,
    TranscriptSnapshot,
};
use crate::directory::AgentDirectory;
use crate::error::{Result, ServiceError};
use crate::external::media::{MediaPlatform, Permissions};
use crate::external::summarizer::Summarizer;
use crate::external::telephony::TelephonyGateway;
use crate::external::EXTERNAL_CALL_TIMEOUT;
use crate::notify::{NotificationHub, NotifyEvent, TargetKind};
use crate::transcription::{SessionContext, TranscriptSegment, TranscriptionManager};

/// Context substituted when transcription was never started
pub const NO_TRANSCRIPTION_PLACEHOLDER: &str = "No transcription available for this conversation.";

/// Context substituted when a session ran but captured nothing
pub const TRANSCRIPTION_FAILED_PLACEHOLDER: &str =
    "Transcription failed; ask the customer to repeat their issue.";

/// Most recent final segments fed into the summarizer
const SUMMARY_WINDOW: usize = 10;

/// Deterministic summary used when the summarization service is
/// unreachable, times out, or returns nothing
fn fallback_summary(category: &str) -> String {
    match category {
        "compliance" => "Customer has a compliance question about their account; \
                         verification is done and they need a specialist review."
            .to_string(),
        "partner" => "Customer wants to discuss their investment with a partner; \
                      their account context has been confirmed."
            .to_string(),
        other => format!(
            "Customer needs assistance from the {} team; initial troubleshooting \
             is complete and the conversation context was captured.",
            other
        ),
    }
}

/// The warm-transfer state machine
///
/// Exactly one outstanding record may exist per target-agent slot; a new
/// initiation for the same slot overwrites the prior one (last-writer-wins,
/// with a logged warning).
pub struct TransferOrchestrator {
    pending: Mutex<HashMap<String, TransferRecord>>,
    media: Arc<dyn MediaPlatform>,
    telephony: Arc<dyn TelephonyGateway>,
    summarizer: Arc<dyn Summarizer>,
    transcription: Arc<TranscriptionManager>,
    directory: Arc<AgentDirectory>,
    hub: Arc<NotificationHub>,
    webhook_base_url: String,
}

impl TransferOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        media: Arc<dyn MediaPlatform>,
        telephony: Arc<dyn TelephonyGateway>,
        summarizer: Arc<dyn Summarizer>,
        transcription: Arc<TranscriptionManager>,
        directory: Arc<AgentDirectory>,
        hub: Arc<NotificationHub>,
        webhook_base_url: &str,
    ) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            media,
            telephony,
            summarizer,
            transcription,
            directory,
            hub,
            webhook_base_url: webhook_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Start a warm transfer. Never fails on an external-service error; the
    /// only errors surfaced to the caller are input errors (unknown target
    /// role).
    pub async fn initiate(&self, req: TransferRequest) -> Result<TransferRecord> {
        let target = self
            .directory
            .agent_for_role(&req.target_role)
            .cloned()
            .ok_or_else(|| {
                ServiceError::input(format!("no agent registered for role {}", req.target_role))
            })?;

        info!(
            "Transfer requested: {} -> {} ({}) for room {}",
            req.from_agent_id, target.id, req.target_role, req.room
        );

        let (summary, context) = self.determine_summary(&req).await;
        info!("Transfer summarized for room {}", req.room);

        let (transfer_room, created_new) = self.prepare_room(&req).await;
        let credentials = self
            .issue_credentials(&req, &target.id, &transfer_room, created_new)
            .await;
        info!("Transfer room ready: {}", transfer_room);

        // Phone leg, when the target takes transfers on the phone. A
        // telephony failure never aborts the in-room handoff.
        let call_id = match &target.phone {
            Some(phone) => self.place_phone_leg(phone, &transfer_room).await,
            None => None,
        };

        let record = TransferRecord {
            target_agent_id: target.id.clone(),
            room: transfer_room,
            summary,
            credentials,
            from_agent_id: req.from_agent_id.clone(),
            created_at: Utc::now(),
            ready_to_join: false,
            stage: TransferStage::AwaitingSecondAgent,
            call_id,
            context,
        };

        {
            let mut pending = self.pending.lock().await;
            if pending.contains_key(&target.id) {
                warn!(
                    "Overwriting pending transfer for agent slot {} (last writer wins)",
                    target.id
                );
            }
            pending.insert(target.id.clone(), record.clone());
        }

        self.hub
            .send_to(
                TargetKind::Agent,
                &target.id,
                &NotifyEvent::TransferPending {
                    from_agent: record.from_agent_id.clone(),
                    room: record.room.clone(),
                    summary: record.summary.clone(),
                    created_at: record.created_at,
                },
            )
            .await;

        Ok(record)
    }

    /// Flip `ready_to_join` for the target agent's pending transfer. The
    /// flag only ever goes false → true; marking twice is a no-op.
    pub async fn mark_ready(&self, target_agent_id: &str) -> Result<TransferRecord> {
        let record = {
            let mut pending = self.pending.lock().await;
            let record = pending.get_mut(target_agent_id).ok_or_else(|| {
                ServiceError::not_found(format!(
                    "no pending transfer for agent {}",
                    target_agent_id
                ))
            })?;

            if !record.ready_to_join {
                record.ready_to_join = true;
                record.stage = TransferStage::ReadyToJoin;
                info!("Transfer for agent {} marked ready to join", target_agent_id);
            }
            record.clone()
        };

        self.hub
            .send_to(
                TargetKind::Agent,
                target_agent_id,
                &NotifyEvent::TransferReady {
                    room: record.room.clone(),
                    summary: record.summary.clone(),
                    token: record.target_token().map(str::to_string),
                },
            )
            .await;

        Ok(record)
    }

    /// The target agent's view: only transfers already marked ready
    pub async fn pending_for(&self, agent_id: &str) -> Option<TransferRecord> {
        let pending = self.pending.lock().await;
        pending.get(agent_id).filter(|r| r.ready_to_join).cloned()
    }

    /// Pending record for a room regardless of readiness; the telephony
    /// webhook uses this to speak the summary
    pub async fn record_for_room(&self, room: &str) -> Option<TransferRecord> {
        let pending = self.pending.lock().await;
        pending.values().find(|r| r.room == room).cloned()
    }

    /// The originating agent leaves the conversation. The room is not torn
    /// down here; the idle-room reaper reclaims it once empty.
    pub async fn complete(&self, from_agent_id: &str, room: &str) -> Result<()> {
        let identity = format!("agent_{}", from_agent_id);
        if let Err(e) = self.media.disconnect(room, &identity).await {
            warn!("Failed to disconnect {} from {}: {}", identity, room, e);
        }

        let mut pending = self.pending.lock().await;
        let slots: Vec<String> = pending
            .iter()
            .filter(|(_, r)| r.room == room && r.from_agent_id == from_agent_id)
            .map(|(slot, _)| slot.clone())
            .collect();

        for slot in slots {
            if let Some(record) = pending.remove(&slot) {
                info!(
                    "Transfer completed: {} handed {} to {}",
                    from_agent_id, room, record.target_agent_id
                );
            }
        }

        Ok(())
    }

    async fn determine_summary(&self, req: &TransferRequest) -> (String, TranscriptSnapshot) {
        if let Some(supplied) = req.summary.as_deref() {
            if !supplied.trim().is_empty() {
                // Verbatim; the summarization service is not consulted.
                return (
                    supplied.to_string(),
                    TranscriptSnapshot {
                        source: "caller_supplied".to_string(),
                        text: supplied.to_string(),
                        segments: Vec::new(),
                    },
                );
            }
        }

        let (context_text, source, segments) = match self.transcription.context(&req.room).await {
            SessionContext::Absent => (
                NO_TRANSCRIPTION_PLACEHOLDER.to_string(),
                "never_started",
                Vec::new(),
            ),
            SessionContext::Empty => (
                TRANSCRIPTION_FAILED_PLACEHOLDER.to_string(),
                "empty",
                Vec::new(),
            ),
            SessionContext::Segments(finals) => {
                let window_start = finals.len().saturating_sub(SUMMARY_WINDOW);
                let window = &finals[window_start..];
                (
                    Self::build_context_text(&finals, window),
                    "live",
                    window.to_vec(),
                )
            }
        };

        let snapshot = TranscriptSnapshot {
            source: source.to_string(),
            text: context_text.clone(),
            segments,
        };

        let profile = self.directory.customer(&req.customer_identity).cloned();
        let summary = match tokio::time::timeout(
            EXTERNAL_CALL_TIMEOUT,
            self.summarizer
                .summarize(&context_text, &req.target_role, profile.as_ref()),
        )
        .await
        {
            Ok(Ok(text)) if !text.trim().is_empty() => text,
            Ok(Ok(_)) => {
                warn!("Summarizer returned empty text; using fallback");
                fallback_summary(&req.target_role)
            }
            Ok(Err(e)) => {
                warn!("Summarization failed: {}; using fallback", e);
                fallback_summary(&req.target_role)
            }
            Err(_) => {
                warn!("Summarization timed out; using fallback");
                fallback_summary(&req.target_role)
            }
        };

        (summary, snapshot)
    }

    /// Recent final segments annotated with speaker and timestamp, prefixed
    /// with the running summary of anything older than the window
    fn build_context_text(finals: &[TranscriptSegment], window: &[TranscriptSegment]) -> String {
        let mut context = String::new();

        let earlier = finals.len() - window.len();
        if earlier > 0 {
            let running: Vec<&str> = finals[..earlier].iter().map(|s| s.text.as_str()).collect();
            context.push_str(&format!("Earlier in the conversation: {}\n\n", running.join(" ")));
        }

        let lines: Vec<String> = window
            .iter()
            .map(|s| {
                format!(
                    "[{}] {}: {}",
                    s.timestamp.format("%H:%M:%S"),
                    s.speaker,
                    s.text
                )
            })
            .collect();
        context.push_str(&lines.join("\n"));

        context
    }

    async fn prepare_room(&self, req: &TransferRequest) -> (String, bool) {
        match req.strategy {
            RoomStrategy::ReuseOriginalRoom => (req.room.clone(), false),
            RoomStrategy::CreateTransferRoom => {
                let name = format!("transfer_{}_{}", req.room, req.from_agent_id);
                match self.media.create_room(&name).await {
                    Ok(()) => (name, true),
                    Err(e) => {
                        warn!(
                            "Failed to create transfer room {}: {}; reusing original room",
                            name, e
                        );
                        (req.room.clone(), false)
                    }
                }
            }
        }
    }

    async fn issue_credentials(
        &self,
        req: &TransferRequest,
        target_agent_id: &str,
        room: &str,
        include_existing_parties: bool,
    ) -> Vec<PartyCredential> {
        let mut identities = vec![format!("agent_{}", target_agent_id)];
        if include_existing_parties {
            identities.push(req.customer_identity.clone());
            identities.push(format!("agent_{}", req.from_agent_id));
        }

        let mut credentials = Vec::new();
        for identity in identities {
            match self
                .media
                .issue_credential(room, &identity, Permissions::default())
                .await
            {
                Ok(token) => credentials.push(PartyCredential { identity, token }),
                Err(e) => warn!("Failed to issue credential for {}: {}", identity, e),
            }
        }
        credentials
    }

    async fn place_phone_leg(&self, phone: &str, room: &str) -> Option<String> {
        let callback_url = format!(
            "{}/api/telephony/voice?room={}",
            self.webhook_base_url, room
        );
        let status_callback_url = format!("{}/api/telephony/status", self.webhook_base_url);

        match self
            .telephony
            .place_call(phone, &callback_url, &status_callback_url)
            .await
        {
            Ok(call_id) => {
                info!("Phone leg {} placed for room {}", call_id, room);
                Some(call_id)
            }
            Err(e) => {
                warn!("Phone leg to {} failed: {}; transfer proceeds in-room", phone, e);
                None
            }
        }
    }
}
