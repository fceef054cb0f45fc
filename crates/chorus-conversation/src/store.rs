//! Persistence interface for conversation records.
//!
//! Records are loaded and saved whole, keyed by conversation id. No
//! concurrent-writer guarantees are assumed: the last `save` wins.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chorus_common::ConversationId;
use tokio::sync::RwLock;

use crate::data::ConversationData;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("conversation not found: {0}")]
    NotFound(ConversationId),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn load(&self, id: &ConversationId) -> Result<ConversationData, StoreError>;

    async fn save(&self, data: &ConversationData) -> Result<(), StoreError>;

    /// Ids of every stored conversation, most recently updated first.
    async fn list(&self) -> Result<Vec<ConversationId>, StoreError>;
}

/// Thread-safe in-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    conversations: Arc<RwLock<HashMap<ConversationId, ConversationData>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.conversations.read().await.len()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn load(&self, id: &ConversationId) -> Result<ConversationData, StoreError> {
        self.conversations
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn save(&self, data: &ConversationData) -> Result<(), StoreError> {
        self.conversations
            .write()
            .await
            .insert(data.id.clone(), data.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ConversationId>, StoreError> {
        let map = self.conversations.read().await;
        let mut records: Vec<&ConversationData> = map.values().collect();
        records.sort_by(|a, b| b.update_time.cmp(&a.update_time));
        Ok(records.into_iter().map(|d| d.id.clone()).collect())
    }
}
