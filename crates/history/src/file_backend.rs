//! File-based history store: persistent JSON-lines storage.
//!
//! One file per conversation, one JSON-encoded `ChatMessage` per line.
//! Appends are a single line write, so a crash mid-turn can at most leave a
//! user message without its reply.
//!
//! Storage location: `~/.ragbridge/history/<encoded id>.jsonl` by default.

use async_trait::async_trait;
use dashmap::DashMap;
use ragbridge_core::error::HistoryError;
use ragbridge_core::history::HistoryStore;
use ragbridge_core::message::{ChatMessage, ConversationId};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const EXTENSION: &str = "jsonl";

/// Longest escaped stem stored verbatim.
const MAX_STEM_LEN: usize = 200;

/// Escaped prefix kept in front of the digest for over-long ids.
const HASHED_PREFIX_LEN: usize = 120;

/// A directory of JSONL files, one per conversation.
pub struct FileHistoryStore {
    dir: PathBuf,
    write_locks: DashMap<ConversationId, Arc<Mutex<()>>>,
}

impl FileHistoryStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: PathBuf) -> Self {
        debug!(dir = %dir.display(), "File history store configured");
        Self {
            dir,
            write_locks: DashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a conversation. Ids are opaque (Teams ids contain `:`),
    /// so every byte outside `[A-Za-z0-9-]` is escaped as `_XX`. Stems longer
    /// than [`MAX_STEM_LEN`] keep a readable prefix plus a SHA-256 of the id,
    /// which keeps file names under common filesystem limits.
    fn path_for(&self, id: &ConversationId) -> PathBuf {
        let mut name = String::with_capacity(id.as_str().len());
        for b in id.as_str().bytes() {
            if b.is_ascii_alphanumeric() || b == b'-' {
                name.push(b as char);
            } else {
                name.push_str(&format!("_{b:02x}"));
            }
        }
        if name.len() > MAX_STEM_LEN {
            let digest = Sha256::digest(id.as_str().as_bytes());
            name.truncate(HASHED_PREFIX_LEN);
            name = format!("{name}~{digest:x}");
        }
        self.dir.join(format!("{name}.{EXTENSION}"))
    }

    fn lock_for(&self, id: &ConversationId) -> Arc<Mutex<()>> {
        self.write_locks.entry(id.clone()).or_default().clone()
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, id: &ConversationId) -> Result<Vec<ChatMessage>, HistoryError> {
        let content = match tokio::fs::read_to_string(self.path_for(id)).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(HistoryError::Storage(format!(
                    "Failed to read history for {id}: {e}"
                )));
            }
        };

        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<ChatMessage>(line) {
                Ok(msg) => Some(msg),
                Err(e) => {
                    warn!(conversation_id = %id, error = %e, "Skipping corrupted history line");
                    None
                }
            })
            .collect())
    }

    async fn append(&self, id: &ConversationId, message: ChatMessage) -> Result<(), HistoryError> {
        let mut line = serde_json::to_string(&message)
            .map_err(|e| HistoryError::Storage(format!("Failed to serialize message: {e}")))?;
        line.push('\n');

        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            HistoryError::Storage(format!("Failed to create history directory: {e}"))
        })?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(id))
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to open history file: {e}")))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to write history file: {e}")))?;
        file.flush()
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to flush history file: {e}")))?;

        Ok(())
    }

    async fn conversation_count(&self) -> Result<usize, HistoryError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(HistoryError::Storage(e.to_string())),
        };

        let mut count = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| HistoryError::Storage(e.to_string()))?
        {
            if entry.path().extension().is_some_and(|ext| ext == EXTENSION) {
                count += 1;
            }
        }
        Ok(count)
    }
}
