//! HTTP and WebSocket API
//!
//! The synchronous request surface:
//! - POST /api/queue/enqueue, GET /api/queue/position/:identity,
//!   POST /api/queue/leave
//! - POST /api/agents/status, POST /api/agents/next,
//!   GET /api/agents/stats, GET /api/agents/:agent_id
//! - POST /api/transfer/{initiate,ready,complete},
//!   GET /api/transfer/pending/:agent_id
//! - POST /api/transcription/{start,stop,audio},
//!   GET /api/transcription/:room/{segments,summary}
//! - POST /api/telephony/{voice,status} (gateway webhooks)
//! - GET /health
//!
//! Plus the persistent connection surface at GET /ws/notifications.

mod handlers;
mod routes;
mod state;
mod ws;

pub use routes::create_router;
pub use state::AppState;
