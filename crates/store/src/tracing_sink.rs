//! A sink that writes records to the log instead of storing them.
//!
//! Transcript text is never logged, only its length, so log files do not
//! become a second copy of visitor conversations.

use async_trait::async_trait;
use doppel_core::{
    AnalyticsEvent, EventSink, FeedbackRecord, PersistenceError, TranscriptRecord, Turn,
};
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::info;

use crate::{ConversationSummary, Store, StoredFeedback};

#[derive(Default)]
pub struct TracingSink {
    next_feedback_id: AtomicI64,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn record_turn(&self, record: TranscriptRecord) -> Result<(), PersistenceError> {
        info!(
            target: "doppel::transcript",
            conversation_id = %record.conversation_id,
            role = %record.role,
            chars = record.text.chars().count(),
            "turn"
        );
        Ok(())
    }

    async fn record_feedback(&self, record: FeedbackRecord) -> Result<i64, PersistenceError> {
        let id = self.next_feedback_id.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            target: "doppel::feedback",
            id,
            kind = record.kind.as_str(),
            rating = record.rating.map(|r| r.as_str()),
            conversation_id = record.conversation_id.as_deref(),
            question = %record.user_message,
            "feedback"
        );
        Ok(id)
    }

    async fn record_event(&self, event: AnalyticsEvent) -> Result<(), PersistenceError> {
        info!(
            target: "doppel::analytics",
            kind = event.kind.as_str(),
            session_id = event.session_id.as_deref(),
            data = event.data.as_ref().map(|d| d.to_string()),
            "event"
        );
        Ok(())
    }
}

#[async_trait]
impl Store for TracingSink {
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
