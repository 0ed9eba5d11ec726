//! No-op store. Disables persistence entirely.

use async_trait::async_trait;
use doppel_core::{
    AnalyticsEvent, EventSink, FeedbackRecord, PersistenceError, TranscriptRecord, Turn,
};

use crate::{ConversationSummary, Store, StoredFeedback};

pub struct NoopStore;

#[async_trait]
impl EventSink for NoopStore {
    fn name(&self) -> &str { "none" }

    async fn record_turn(&self, _record: TranscriptRecord) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn record_feedback(&self, _record: FeedbackRecord) -> Result<i64, PersistenceError> {
        Ok(0)
    }

    async fn record_event(&self, _event: AnalyticsEvent) -> Result<(), PersistenceError> {
        Ok(())
    }
}

#[async_trait]
impl Store for NoopStore {
    async fn recent_turns(&self, _id: &str, _limit: usize) -> Result<Vec<Turn>, PersistenceError> {
        Ok(Vec::new())
    }

    async fn transcript(&self, _id: &str) -> Result<Vec<TranscriptRecord>, PersistenceError> {
        Ok(Vec::new())
    }

    async fn conversations(&self) -> Result<Vec<ConversationSummary>, PersistenceError> {
        Ok(Vec::new())
    }

    async fn list_feedback(&self) -> Result<Vec<StoredFeedback>, PersistenceError> {
        Ok(Vec::new())
    }
}
