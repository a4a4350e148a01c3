use thiserror::Error;

/// Support-center service errors
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Malformed or unacceptable caller input
    #[error("Invalid input: {0}")]
    Input(String),

    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Queue-related errors
    #[error("Queue error: {0}")]
    Queue(String),

    /// Agent-related errors
    #[error("Agent error: {0}")]
    Agent(String),

    /// Transfer orchestration errors
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// An external collaborator (media, telephony, speech, summarizer) failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A blocking external call exceeded its timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServiceError {
    /// Create a new Input error
    pub fn input<S: Into<String>>(msg: S) -> Self {
        Self::Input(msg.into())
    }

    /// Create a new NotFound error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Queue error
    pub fn queue<S: Into<String>>(msg: S) -> Self {
        Self::Queue(msg.into())
    }

    /// Create a new Agent error
    pub fn agent<S: Into<String>>(msg: S) -> Self {
        Self::Agent(msg.into())
    }

    /// Create a new Transfer error
    pub fn transfer<S: Into<String>>(msg: S) -> Self {
        Self::Transfer(msg.into())
    }

    /// Create a new Upstream error
    pub fn upstream<S: Into<String>>(msg: S) -> Self {
        Self::Upstream(msg.into())
    }

    /// Create a new Timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }
}

/// Result type for support-center operations
pub type Result<T> = std::result::Result<T, ServiceError>;
