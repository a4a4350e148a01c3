use std::sync::Arc;

use crate::center::Center;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The one service container every handler operates on
    pub center: Arc<Center>,
}

impl AppState {
    pub fn new(center: Arc<Center>) -> Self {
        Self { center }
    }
}
