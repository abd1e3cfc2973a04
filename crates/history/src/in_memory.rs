//! In-memory history store: the default, process-lifetime backend.

use async_trait::async_trait;
use dashmap::DashMap;
use ragbridge_core::error::HistoryError;
use ragbridge_core::history::HistoryStore;
use ragbridge_core::message::{ChatMessage, ConversationId};

/// Stores each conversation's messages in a concurrent map.
///
/// Individual `append` calls are atomic per key; whole-turn serialization is
/// left to the pipeline. Nothing is evicted and nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    conversations: DashMap<ConversationId, Vec<ChatMessage>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, id: &ConversationId) -> Result<Vec<ChatMessage>, HistoryError> {
        Ok(self
            .conversations
            .get(id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn append(&self, id: &ConversationId, message: ChatMessage) -> Result<(), HistoryError> {
        self.conversations
            .entry(id.clone())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn conversation_count(&self) -> Result<usize, HistoryError> {
        Ok(self.conversations.len())
    }
}
