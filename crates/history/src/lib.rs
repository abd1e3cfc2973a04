//! Conversation history stores for RagBridge.
//!
//! All stores implement `ragbridge_core::HistoryStore`. The backend is chosen
//! from `[history] backend` in the config.

pub mod file_backend;
pub mod in_memory;

use std::sync::Arc;

use ragbridge_config::AppConfig;
use ragbridge_core::HistoryStore;

pub use file_backend::FileHistoryStore;
pub use in_memory::InMemoryHistoryStore;

/// Build the configured history store.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn HistoryStore> {
    match config.history.backend.as_str() {
        "file" => Arc::new(FileHistoryStore::new(config.history_dir())),
        _ => Arc::new(InMemoryHistoryStore::new()),
    }
}
