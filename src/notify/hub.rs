use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use super::message::NotifyEvent;

/// Which kind of party a connection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Customer,
    Agent,
}

type ConnectionKey = (TargetKind, String);
type Sender = mpsc::UnboundedSender<String>;

struct Registered {
    sender: Sender,
    /// Distinguishes this registration from an earlier one under the same
    /// key, so a stale guard cannot evict a replacement connection
    generation: u64,
}

/// Identity-addressed delivery over persistent connections
///
/// One sender per (kind, id); a send to a party with no registered channel,
/// or whose channel has gone away, degrades to a broadcast over every open
/// connection. Broadcast failures prune the dead connection and keep going.
pub struct NotificationHub {
    connections: Mutex<HashMap<ConnectionKey, Registered>>,
    next_generation: AtomicU64,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Register a connection for a party, returning a guard that
    /// unregisters it on drop (so a cancelled connection task still
    /// releases its slot)
    pub async fn register(
        hub: &Arc<Self>,
        kind: TargetKind,
        id: &str,
        sender: Sender,
    ) -> RegistrationGuard {
        let key = (kind, id.to_string());
        let generation = hub.next_generation.fetch_add(1, Ordering::SeqCst);

        let mut connections = hub.connections.lock().await;
        if connections
            .insert(key.clone(), Registered { sender, generation })
            .is_some()
        {
            info!("Replaced existing connection for {:?} {}", kind, id);
        } else {
            info!("Registered connection for {:?} {}", kind, id);
        }

        RegistrationGuard {
            hub: Arc::clone(hub),
            key,
            generation,
        }
    }

    pub async fn unregister(&self, kind: TargetKind, id: &str) {
        let mut connections = self.connections.lock().await;
        if connections.remove(&(kind, id.to_string())).is_some() {
            info!("Unregistered connection for {:?} {}", kind, id);
        }
    }

    async fn unregister_generation(&self, key: &ConnectionKey, generation: u64) {
        let mut connections = self.connections.lock().await;
        if connections
            .get(key)
            .map(|r| r.generation == generation)
            .unwrap_or(false)
        {
            connections.remove(key);
            info!("Unregistered connection for {:?} {}", key.0, key.1);
        }
    }

    /// Deliver to one party, falling back to broadcast when no targeted
    /// channel is usable
    pub async fn send_to(&self, kind: TargetKind, id: &str, event: &NotifyEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to serialize notification: {}", e);
                return;
            }
        };

        let mut connections = self.connections.lock().await;
        let key = (kind, id.to_string());

        if let Some(registered) = connections.get(&key) {
            if registered.sender.send(payload.clone()).is_ok() {
                debug!("Delivered targeted notification to {:?} {}", kind, id);
                return;
            }
            // Receiver is gone; drop the stale registration before the
            // broadcast so it does not fail a second time.
            connections.remove(&key);
            warn!("Targeted channel for {:?} {} is dead, broadcasting", kind, id);
        } else {
            debug!("No channel for {:?} {}, broadcasting", kind, id);
        }

        Self::broadcast_locked(&mut connections, &payload);
    }

    /// Best-effort delivery to every open connection
    pub async fn broadcast(&self, event: &NotifyEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to serialize notification: {}", e);
                return;
            }
        };

        let mut connections = self.connections.lock().await;
        Self::broadcast_locked(&mut connections, &payload);
    }

    fn broadcast_locked(connections: &mut HashMap<ConnectionKey, Registered>, payload: &str) {
        let mut dead = Vec::new();
        for (key, registered) in connections.iter() {
            if registered.sender.send(payload.to_string()).is_err() {
                dead.push(key.clone());
            }
        }
        for key in dead {
            warn!("Pruning dead connection for {:?} {}", key.0, key.1);
            connections.remove(&key);
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes its own registration when the owning connection task ends,
/// whether it returned or was cancelled. A registration that was already
/// replaced is left alone.
pub struct RegistrationGuard {
    hub: Arc<NotificationHub>,
    key: ConnectionKey,
    generation: u64,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        let hub = Arc::clone(&self.hub);
        let key = self.key.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            hub.unregister_generation(&key, generation).await;
        });
    }
}
