//! In-memory store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use pathcoach_core::error::StoreError;
use pathcoach_core::progress::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// The records held by a store. Shared with the file backend, which
/// snapshots it to disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct StoreState {
    #[serde(default)]
    pub progresses: Vec<Progress>,
    #[serde(default)]
    pub chats: Vec<ChatEntry>,
}

fn new_id() -> RecordId {
    RecordId(Uuid::new_v4().to_string())
}

impl StoreState {
    pub fn find(&self, user_id: &str, pathway_id: &str) -> Option<&Progress> {
        self.progresses
            .iter()
            .find(|p| p.user_id == user_id && p.pathway_id == pathway_id)
    }

    pub fn by_user(&self, user_id: &str) -> Vec<Progress> {
        self.progresses
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Returns the record id and whether a record was created.
    pub fn start(&mut self, user_id: &str, pathway_id: &str) -> (RecordId, bool) {
        if let Some(existing) = self.find(user_id, pathway_id) {
            return (existing.id.clone(), false);
        }
        let id = new_id();
        self.progresses
            .push(Progress::fresh(id.clone(), user_id, pathway_id));
        (id, true)
    }

    pub fn upsert(&mut self, upsert: &UpsertProgress) -> RecordId {
        let existing = self
            .progresses
            .iter_mut()
            .find(|p| p.user_id == upsert.user_id && p.pathway_id == upsert.pathway_id);
        match existing {
            Some(progress) => {
                progress.apply(upsert);
                progress.id.clone()
            }
            None => {
                let id = new_id();
                self.progresses.push(Progress::seeded(id.clone(), upsert));
                id
            }
        }
    }

    pub fn append_chat(&mut self, entry: NewChatEntry) -> RecordId {
        let id = new_id();
        self.chats.push(ChatEntry {
            id: id.clone(),
            user_id: entry.user_id,
            role: entry.role,
            text: entry.text,
            pathway_id: entry.pathway_id,
            created_at: Utc::now(),
        });
        id
    }

    /// Chats are kept in insertion order, which is creation order. A limit
    /// of zero means no limit.
    pub fn chats_by_user(&self, user_id: &str, limit: Option<usize>) -> Vec<ChatEntry> {
        let items: Vec<ChatEntry> = self
            .chats
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        match limit {
            Some(limit) if limit > 0 && limit < items.len() => items[items.len() - limit..].to_vec(),
            _ => items,
        }
    }
}

/// A store that keeps progress and chat history in process memory.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for InMemoryStore {
    async fn get(&self, user_id: &str, pathway_id: &str) -> Result<Option<Progress>, StoreError> {
        Ok(self.state.read().await.find(user_id, pathway_id).cloned())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Progress>, StoreError> {
        Ok(self.state.read().await.by_user(user_id))
    }

    async fn start(&self, user_id: &str, pathway_id: &str) -> Result<RecordId, StoreError> {
        Ok(self.state.write().await.start(user_id, pathway_id).0)
    }

    async fn upsert_response(&self, upsert: UpsertProgress) -> Result<RecordId, StoreError> {
        Ok(self.state.write().await.upsert(&upsert))
    }
}

#[async_trait]
impl ChatLog for InMemoryStore {
    async fn append(&self, entry: NewChatEntry) -> Result<RecordId, StoreError> {
        Ok(self.state.write().await.append_chat(entry))
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ChatEntry>, StoreError> {
        Ok(self.state.read().await.chats_by_user(user_id, limit))
    }
}
