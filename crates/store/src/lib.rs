//! Persistence backends for Doppel.
//!
//! Every backend implements [`EventSink`] (the write side the pipeline and
//! gateway use) and [`Store`] (the read side used for history replay and
//! exports).

pub mod in_memory;
pub mod noop;
pub mod tracing_sink;

#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use doppel_config::StoreConfig;
use doppel_core::{EventSink, FeedbackRecord, PersistenceError, TranscriptRecord, Turn};
use serde::{Deserialize, Serialize};

pub use in_memory::InMemoryStore;
pub use noop::NoopStore;
pub use tracing_sink::TracingSink;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// A stored feedback entry with its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFeedback {
    pub id: i64,
    #[serde(flatten)]
    pub record: FeedbackRecord,
}

/// One row of the conversation listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

/// Read access to what an [`EventSink`] has written.
#[async_trait]
pub trait Store: EventSink {
    /// The last `limit` turns of a conversation, oldest first.
    async fn recent_turns(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<Turn>, PersistenceError>;

    /// Full transcript of one conversation, oldest first.
    async fn transcript(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<TranscriptRecord>, PersistenceError>;

    /// All conversations, most recently active first.
    async fn conversations(&self) -> Result<Vec<ConversationSummary>, PersistenceError>;

    /// All feedback, newest first.
    async fn list_feedback(&self) -> Result<Vec<StoredFeedback>, PersistenceError>;
}

/// Open the backend named in the config.
pub async fn open(config: &StoreConfig) -> Result<Arc<dyn Store>, PersistenceError> {
    match config.backend.as_str() {
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            if let Some(parent) = config.path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PersistenceError::Storage(format!(
                        "Failed to create {}: {e}",
                        parent.display()
                    ))
                })?;
            }
            let store = SqliteStore::open(&config.path.to_string_lossy()).await?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        "none" => Ok(Arc::new(NoopStore)),
        other => Err(PersistenceError::Storage(format!(
            "Unknown store backend '{other}'"
        ))),
    }
}
