use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{InviteError, InviteStore, PendingInvite};

/// Process-local invitation store
///
/// Expired entries are hidden on read and swept on every write.
#[derive(Debug, Default)]
pub struct MemoryInviteStore {
    entries: Mutex<HashMap<Uuid, PendingInvite>>,
}

impl MemoryInviteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl InviteStore for MemoryInviteStore {
    async fn put(&self, id: Uuid, invite: &PendingInvite) -> Result<(), InviteError> {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;

        entries.retain(|_, pending| !pending.is_expired(now));
        entries.insert(id, invite.clone());

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<PendingInvite>, InviteError> {
        let now = Utc::now();
        let entries = self.entries.lock().await;

        Ok(entries
            .get(&id)
            .filter(|pending| !pending.is_expired(now))
            .cloned())
    }

    async fn remove(&self, id: Uuid) -> Result<bool, InviteError> {
        Ok(self.entries.lock().await.remove(&id).is_some())
    }
}
