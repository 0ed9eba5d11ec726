//! In-memory store. Useful for tests and throwaway sessions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use doppel_core::{
    AnalyticsEvent, EventSink, FeedbackRecord, PersistenceError, TranscriptRecord, Turn,
};
use tokio::sync::RwLock;

use crate::{ConversationSummary, Store, StoredFeedback};

#[derive(Default)]
struct Inner {
    turns: Vec<TranscriptRecord>,
    feedback: Vec<StoredFeedback>,
    events: Vec<AnalyticsEvent>,
}

/// Keeps every record in vectors behind a `tokio` lock.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<AnalyticsEvent> {
        self.inner.read().await.events.clone()
    }

    pub async fn turn_count(&self) -> usize {
        self.inner.read().await.turns.len()
    }
}

#[async_trait]
impl EventSink for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn record_turn(&self, record: TranscriptRecord) -> Result<(), PersistenceError> {
        self.inner.write().await.turns.push(record);
        Ok(())
    }

    async fn record_feedback(&self, record: FeedbackRecord) -> Result<i64, PersistenceError> {
        let mut inner = self.inner.write().await;
        let id = inner.feedback.len() as i64 + 1;
        inner.feedback.push(StoredFeedback { id, record });
        Ok(id)
    }

    async fn record_event(&self, event: AnalyticsEvent) -> Result<(), PersistenceError> {
        self.inner.write().await.events.push(event);
        Ok(())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn recent_turns(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<Turn>, PersistenceError> {
        let inner = self.inner.read().await;
        let mut turns: Vec<Turn> = inner
            .turns
            .iter()
            .rev()
            .filter(|r| r.conversation_id == conversation_id)
            .take(limit)
            .map(|r| Turn {
                role: r.role,
                text: r.text.clone(),
            })
            .collect();
        turns.reverse();
        Ok(turns)
    }

    async fn transcript(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<TranscriptRecord>, PersistenceError> {
        let inner = self.inner.read().await;
        Ok(inner
            .turns
            .iter()
            .filter(|r| r.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn conversations(&self) -> Result<Vec<ConversationSummary>, PersistenceError> {
        let inner = self.inner.read().await;
        let mut by_id: HashMap<&str, ConversationSummary> = HashMap::new();
        for record in &inner.turns {
            by_id
                .entry(record.conversation_id.as_str())
                .and_modify(|s| {
                    s.updated_at = s.updated_at.max(record.at);
                    s.message_count += 1;
                })
                .or_insert_with(|| ConversationSummary {
                    id: record.conversation_id.clone(),
                    started_at: record.at,
                    updated_at: record.at,
                    message_count: 1,
                });
        }
        let mut summaries: Vec<ConversationSummary> = by_id.into_values().collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }

    async fn list_feedback(&self) -> Result<Vec<StoredFeedback>, PersistenceError> {
        let inner = self.inner.read().await;
        Ok(inner.feedback.iter().rev().cloned().collect())
    }
}
