use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ServiceError};

/// A waiting customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Customer handle (email)
    pub identity: String,
    /// Conversation category (e.g. "support", "compliance")
    pub category: String,
    pub enqueued_at: DateTime<Utc>,
    pub status: QueueEntryStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueEntryStatus {
    Waiting,
    Assigned,
}

/// FIFO queue of waiting customers
///
/// Ordering is insertion order; identity is unique among waiting entries.
/// Queue sizes are expected to be tens, not millions, so linear scans are
/// fine.
#[derive(Debug, Default)]
pub struct CustomerQueue {
    entries: VecDeque<QueueEntry>,
}

impl CustomerQueue {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Add a customer to the back of the queue, returning their 1-based
    /// position. Re-enqueuing an identity that is already waiting is a
    /// caller error.
    pub fn enqueue(&mut self, identity: &str, category: &str) -> Result<usize> {
        if self.entries.iter().any(|e| e.identity == identity) {
            return Err(ServiceError::input(format!(
                "customer {} is already queued",
                identity
            )));
        }

        self.entries.push_back(QueueEntry {
            identity: identity.to_string(),
            category: category.to_string(),
            enqueued_at: Utc::now(),
            status: QueueEntryStatus::Waiting,
        });

        let position = self.entries.len();
        info!("Enqueued customer {} at position {}", identity, position);
        Ok(position)
    }

    /// 1-based rank of a waiting customer, or None if not queued
    pub fn position_of(&self, identity: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.identity == identity)
            .map(|i| i + 1)
    }

    /// Pop the oldest waiting entry
    pub fn pop_front(&mut self) -> Option<QueueEntry> {
        let mut entry = self.entries.pop_front()?;
        entry.status = QueueEntryStatus::Assigned;
        Some(entry)
    }

    /// Remove a customer wherever they are in the queue, preserving the
    /// relative order of everyone else. Used on match and on abandonment;
    /// idempotent.
    pub fn remove(&mut self, identity: &str) -> bool {
        if let Some(index) = self.entries.iter().position(|e| e.identity == identity) {
            let _ = self.entries.remove(index);
            info!("Removed customer {} from queue", identity);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of waiting entries in queue order
    pub fn waiting(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }
}
