//! HistoryStore trait: per-conversation ordered message storage.
//!
//! The store only appends in call order; it never enforces user→assistant
//! alternation and never prunes. Serializing whole turns for one conversation
//! is the pipeline's job, not the store's.

use async_trait::async_trait;

use crate::error::HistoryError;
use crate::message::{ChatMessage, ConversationId};

/// The core HistoryStore trait.
///
/// Implementations: in-memory (default), JSONL files (persistent).
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// The backend name (e.g., "memory", "file").
    fn name(&self) -> &str;

    /// The ordered history for `id`; empty if the id is unknown.
    async fn get(&self, id: &ConversationId) -> Result<Vec<ChatMessage>, HistoryError>;

    /// Append one message to the end of `id`'s history, creating it if absent.
    async fn append(&self, id: &ConversationId, message: ChatMessage) -> Result<(), HistoryError>;

    /// Number of known conversations.
    async fn conversation_count(&self) -> Result<usize, HistoryError>;
}
