use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{Result, ServiceError};

/// What a credential lets its holder do in a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub publish: bool,
    pub subscribe: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            publish: true,
            subscribe: true,
        }
    }
}

/// Real-time media/room platform
///
/// The core assumes nothing about room creation beyond "subsequent
/// credential issuance for that room name succeeds."
#[async_trait]
pub trait MediaPlatform: Send + Sync {
    async fn create_room(&self, name: &str) -> Result<()>;

    /// Mint an opaque, time-bounded token the party presents to join
    async fn issue_credential(
        &self,
        room: &str,
        identity: &str,
        permissions: Permissions,
    ) -> Result<String>;

    async fn disconnect(&self, room: &str, identity: &str) -> Result<()>;

    async fn list_participants(&self, room: &str) -> Result<Vec<String>>;

    async fn delete_room(&self, name: &str) -> Result<()>;
}

/// In-process room platform
///
/// Rooms are plain participant sets and credentials are opaque UUID tokens.
/// Like the hosted platforms this stands in for, a room also comes into
/// existence the first time a credential is issued against its name.
pub struct LocalMediaPlatform {
    rooms: Mutex<HashMap<String, HashSet<String>>>,
}

impl LocalMediaPlatform {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for LocalMediaPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaPlatform for LocalMediaPlatform {
    async fn create_room(&self, name: &str) -> Result<()> {
        let mut rooms = self.rooms.lock().await;
        rooms.entry(name.to_string()).or_default();
        info!("Created room {}", name);
        Ok(())
    }

    async fn issue_credential(
        &self,
        room: &str,
        identity: &str,
        _permissions: Permissions,
    ) -> Result<String> {
        let mut rooms = self.rooms.lock().await;
        rooms
            .entry(room.to_string())
            .or_default()
            .insert(identity.to_string());

        let token = format!("tok_{}", uuid::Uuid::new_v4());
        info!("Issued credential for {} in room {}", identity, room);
        Ok(token)
    }

    async fn disconnect(&self, room: &str, identity: &str) -> Result<()> {
        let mut rooms = self.rooms.lock().await;
        match rooms.get_mut(room) {
            Some(participants) => {
                participants.remove(identity);
                info!("Disconnected {} from room {}", identity, room);
                Ok(())
            }
            None => Err(ServiceError::not_found(format!("room {}", room))),
        }
    }

    async fn list_participants(&self, room: &str) -> Result<Vec<String>> {
        let rooms = self.rooms.lock().await;
        match rooms.get(room) {
            Some(participants) => {
                let mut list: Vec<String> = participants.iter().cloned().collect();
                list.sort();
                Ok(list)
            }
            None => Err(ServiceError::not_found(format!("room {}", room))),
        }
    }

    async fn delete_room(&self, name: &str) -> Result<()> {
        let mut rooms = self.rooms.lock().await;
        rooms.remove(name);
        info!("Deleted room {}", name);
        Ok(())
    }
}
