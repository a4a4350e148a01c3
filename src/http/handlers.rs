use super::state::AppState;
use crate::center::{AssignmentNotice, EnqueueOutcome};
use crate::error::ServiceError;
use crate::external::telephony::render_voice_markup;
use crate::routing::{AgentRecord, AgentStatus};
use crate::transfer::TransferRequest;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    /// Customer handle (email)
    pub identity: String,
    /// Conversation category
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub status: String,
    pub position: usize,
    pub assignment: Option<AssignmentNotice>,
}

#[derive(Debug, Serialize)]
pub struct PositionResponse {
    pub identity: String,
    pub position: usize,
}

#[derive(Debug, Deserialize)]
pub struct LeaveQueueRequest {
    pub identity: String,
}

#[derive(Debug, Deserialize)]
pub struct AgentStatusRequest {
    pub agent_id: String,
    /// "offline" | "available" | "busy"
    pub status: String,
    pub current_customer: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AgentStatusResponse {
    pub record: AgentRecord,
    pub assignment: Option<AssignmentNotice>,
}

#[derive(Debug, Deserialize)]
pub struct PickNextRequest {
    pub agent_id: String,
}

#[derive(Debug, Serialize)]
pub struct PickNextResponse {
    pub status: String,
    pub assignment: Option<AssignmentNotice>,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadyRequest {
    pub target_agent_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteTransferRequest {
    pub agent_id: String,
    pub room: String,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionControlRequest {
    pub room: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioFrameRequest {
    pub room: String,
    /// Base64-encoded 16kHz mono 16-bit PCM
    pub pcm: String,
}

#[derive(Debug, Serialize)]
pub struct AudioFrameResponse {
    pub accepted: bool,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub room: String,
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct VoiceWebhookQuery {
    pub room: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(err: ServiceError) -> Response {
    let status = match &err {
        ServiceError::Input(_) => StatusCode::BAD_REQUEST,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Queue(_) | ServiceError::Agent(_) | ServiceError::Transfer(_) => {
            StatusCode::CONFLICT
        }
        ServiceError::Upstream(_) | ServiceError::Timeout(_) => StatusCode::BAD_GATEWAY,
        ServiceError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Queue / matching
// ============================================================================

/// POST /api/queue/enqueue
/// Put a customer in the queue; the matcher runs before this returns
pub async fn enqueue(
    State(state): State<AppState>,
    Json(req): Json<EnqueueRequest>,
) -> impl IntoResponse {
    match state.center.enqueue_customer(&req.identity, &req.category).await {
        Ok(EnqueueOutcome {
            position,
            assignment,
        }) => {
            let status = if assignment.is_some() {
                "assigned"
            } else {
                "waiting"
            };
            (
                StatusCode::OK,
                Json(EnqueueResponse {
                    status: status.to_string(),
                    position,
                    assignment,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Enqueue failed for {}: {}", req.identity, e);
            error_response(e)
        }
    }
}

/// GET /api/queue/position/:identity
pub async fn queue_position(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> impl IntoResponse {
    match state.center.queue_position(&identity).await {
        Some(position) => (StatusCode::OK, Json(PositionResponse { identity, position }))
            .into_response(),
        None => error_response(ServiceError::not_found(format!(
            "queue position unavailable for {}",
            identity
        ))),
    }
}

/// POST /api/queue/leave
/// Customer abandons the queue; idempotent
pub async fn leave_queue(
    State(state): State<AppState>,
    Json(req): Json<LeaveQueueRequest>,
) -> impl IntoResponse {
    let removed = state.center.abandon(&req.identity).await;
    let status = if removed { "removed" } else { "not_queued" };
    (
        StatusCode::OK,
        Json(StatusResponse {
            status: status.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Agents
// ============================================================================

/// POST /api/agents/status
/// Transition an agent's availability; reports any assignment the
/// transition produced
pub async fn update_agent_status(
    State(state): State<AppState>,
    Json(req): Json<AgentStatusRequest>,
) -> impl IntoResponse {
    let status: AgentStatus = match req.status.parse() {
        Ok(s) => s,
        Err(e) => return error_response(e),
    };

    match state
        .center
        .set_agent_status(&req.agent_id, status, req.current_customer)
        .await
    {
        Ok((record, assignment)) => {
            if let Some(a) = &assignment {
                info!("Agent {} picked up {} on status change", a.agent_id, a.customer);
            }
            (
                StatusCode::OK,
                Json(AgentStatusResponse { record, assignment }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Status update failed for {}: {}", req.agent_id, e);
            error_response(e)
        }
    }
}

/// GET /api/agents/stats
pub async fn agent_stats(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.center.agent_stats().await)).into_response()
}

/// GET /api/agents/:agent_id
pub async fn get_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> impl IntoResponse {
    (StatusCode::OK, Json(state.center.agent_record(&agent_id).await)).into_response()
}

/// POST /api/agents/next
/// Agent-initiated pull of the oldest waiting customer
pub async fn pick_next(
    State(state): State<AppState>,
    Json(req): Json<PickNextRequest>,
) -> impl IntoResponse {
    match state.center.pick_next(&req.agent_id).await {
        Ok(assignment) => {
            let status = if assignment.is_some() {
                "assigned"
            } else {
                "queue_empty"
            };
            (
                StatusCode::OK,
                Json(PickNextResponse {
                    status: status.to_string(),
                    assignment,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

// ============================================================================
// Transfers
// ============================================================================

/// POST /api/transfer/initiate
pub async fn initiate_transfer(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> impl IntoResponse {
    match state.center.transfers.initiate(req).await {
        Ok(record) => {
            state.center.track_room(&record.room).await;
            (StatusCode::OK, Json(record)).into_response()
        }
        Err(e) => {
            error!("Transfer initiation failed: {}", e);
            error_response(e)
        }
    }
}

/// POST /api/transfer/ready
/// Expose a prepared transfer to its target agent
pub async fn mark_transfer_ready(
    State(state): State<AppState>,
    Json(req): Json<MarkReadyRequest>,
) -> impl IntoResponse {
    match state.center.transfers.mark_ready(&req.target_agent_id).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/transfer/pending/:agent_id
/// Transfers already marked ready for this agent
pub async fn pending_transfer(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> impl IntoResponse {
    match state.center.transfers.pending_for(&agent_id).await {
        Some(record) => (StatusCode::OK, Json(record)).into_response(),
        None => error_response(ServiceError::not_found(format!(
            "no transfer ready for agent {}",
            agent_id
        ))),
    }
}

/// POST /api/transfer/complete
/// The originating agent leaves the conversation
pub async fn complete_transfer(
    State(state): State<AppState>,
    Json(req): Json<CompleteTransferRequest>,
) -> impl IntoResponse {
    match state.center.transfers.complete(&req.agent_id, &req.room).await {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusResponse {
                status: "success".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

// ============================================================================
// Transcription
// ============================================================================

/// POST /api/transcription/start
pub async fn start_transcription(
    State(state): State<AppState>,
    Json(req): Json<TranscriptionControlRequest>,
) -> impl IntoResponse {
    match state.center.transcription.start(&req.room).await {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusResponse {
                status: "active".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to start transcription for {}: {}", req.room, e);
            error_response(e)
        }
    }
}

/// POST /api/transcription/stop
/// Success even when no session exists
pub async fn stop_transcription(
    State(state): State<AppState>,
    Json(req): Json<TranscriptionControlRequest>,
) -> impl IntoResponse {
    match state.center.transcription.stop(&req.room).await {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusResponse {
                status: "stopped".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/transcription/audio
/// Raw audio frames from the media platform, base64 PCM
pub async fn feed_audio(
    State(state): State<AppState>,
    Json(req): Json<AudioFrameRequest>,
) -> impl IntoResponse {
    let bytes = match base64::engine::general_purpose::STANDARD.decode(&req.pcm) {
        Ok(b) => b,
        Err(e) => {
            return error_response(ServiceError::input(format!("invalid base64 audio: {}", e)))
        }
    };

    match state.center.transcription.feed_audio(&req.room, &bytes).await {
        Ok(accepted) => (StatusCode::OK, Json(AudioFrameResponse { accepted })).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/transcription/:room/segments
pub async fn get_segments(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> impl IntoResponse {
    match state.center.transcription.get_segments(&room).await {
        Some(segments) => (StatusCode::OK, Json(segments)).into_response(),
        None => error_response(ServiceError::not_found(format!(
            "no transcription session for {}",
            room
        ))),
    }
}

/// GET /api/transcription/:room/summary
/// Final-only transcript text, space-joined
pub async fn get_summary(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> impl IntoResponse {
    match state.center.transcription.get_summary_text(&room).await {
        Some(summary) => (StatusCode::OK, Json(SummaryResponse { room, summary })).into_response(),
        None => error_response(ServiceError::not_found(format!(
            "no transcription session for {}",
            room
        ))),
    }
}

// ============================================================================
// Telephony webhooks
// ============================================================================

/// POST /api/telephony/voice?room=...
/// Call-control markup for an answered phone leg: speak the transfer
/// summary, then connect the call to the room
pub async fn voice_webhook(
    State(state): State<AppState>,
    Query(query): Query<VoiceWebhookQuery>,
) -> impl IntoResponse {
    let summary = state
        .center
        .transfers
        .record_for_room(&query.room)
        .await
        .map(|r| r.summary);

    let markup = render_voice_markup(&query.room, summary.as_deref());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        markup,
    )
        .into_response()
}

/// POST /api/telephony/status
/// Call-progress callback; acknowledged and logged
pub async fn telephony_status() -> impl IntoResponse {
    info!("Telephony status callback received");
    StatusCode::OK
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
