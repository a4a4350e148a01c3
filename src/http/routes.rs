use super::handlers;
use super::state::AppState;
use super::ws;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Queue and matching
        .route("/api/queue/enqueue", post(handlers::enqueue))
        .route("/api/queue/position/:identity", get(handlers::queue_position))
        .route("/api/queue/leave", post(handlers::leave_queue))
        // Agents
        .route("/api/agents/status", post(handlers::update_agent_status))
        .route("/api/agents/next", post(handlers::pick_next))
        .route("/api/agents/stats", get(handlers::agent_stats))
        .route("/api/agents/:agent_id", get(handlers::get_agent))
        // Warm transfers
        .route("/api/transfer/initiate", post(handlers::initiate_transfer))
        .route("/api/transfer/ready", post(handlers::mark_transfer_ready))
        .route(
            "/api/transfer/pending/:agent_id",
            get(handlers::pending_transfer),
        )
        .route("/api/transfer/complete", post(handlers::complete_transfer))
        // Transcription sessions
        .route(
            "/api/transcription/start",
            post(handlers::start_transcription),
        )
        .route("/api/transcription/stop", post(handlers::stop_transcription))
        .route("/api/transcription/audio", post(handlers::feed_audio))
        .route(
            "/api/transcription/:room/segments",
            get(handlers::get_segments),
        )
        .route(
            "/api/transcription/:room/summary",
            get(handlers::get_summary),
        )
        // Telephony webhooks
        .route("/api/telephony/voice", post(handlers::voice_webhook))
        .route("/api/telephony/status", post(handlers::telephony_status))
        // Persistent notification connections
        .route("/ws/notifications", get(ws::ws_handler))
        // Request logging + permissive CORS for browser clients
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
