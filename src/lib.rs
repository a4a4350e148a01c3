pub mod center;
pub mod config;
pub mod directory;
pub mod error;
pub mod external;
pub mod http;
pub mod notify;
pub mod routing;
pub mod transcription;
pub mod transfer;

pub use center::{AssignmentNotice, Center, EnqueueOutcome};
pub use config::Config;
pub use directory::{AgentDirectory, CustomerProfile, DirectoryAgent};
pub use error::{Result, ServiceError};
pub use http::{create_router, AppState};
pub use notify::{NotificationHub, NotifyEvent, TargetKind};
pub use routing::{AgentRecord, AgentRegistry, AgentStatus, Assignment, CustomerQueue};
pub use transcription::{TranscriptSegment, TranscriptionManager, AUDIO_CHUNK_BYTES};
pub use transfer::{RoomStrategy, TransferRecord, TransferRequest, TransferStage};
