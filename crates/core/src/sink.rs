//! EventSink trait: append-only persistence of pipeline side effects.
//!
//! Three record kinds flow out of a conversation:
//! - transcript turns (what was said)
//! - feedback entries (automatic on uncertainty, or submitted by the user)
//! - anonymous analytics events (no personal content)
//!
//! Callers treat every write as fire-and-forget: a failed write is logged and
//! never changes the response the user sees.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::message::Role;

/// One persisted conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub conversation_id: String,
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl TranscriptRecord {
    pub fn now(conversation_id: impl Into<String>, role: Role, text: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            role,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Why a feedback entry was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Unanswered,
    Inappropriate,
    Inaccurate,
    Helpful,
    Unhelpful,
    Other,
}

impl FeedbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Unanswered => "unanswered",
            FeedbackKind::Inappropriate => "inappropriate",
            FeedbackKind::Inaccurate => "inaccurate",
            FeedbackKind::Helpful => "helpful",
            FeedbackKind::Unhelpful => "unhelpful",
            FeedbackKind::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unanswered" => Some(FeedbackKind::Unanswered),
            "inappropriate" => Some(FeedbackKind::Inappropriate),
            "inaccurate" => Some(FeedbackKind::Inaccurate),
            "helpful" => Some(FeedbackKind::Helpful),
            "unhelpful" => Some(FeedbackKind::Unhelpful),
            "other" => Some(FeedbackKind::Other),
            _ => None,
        }
    }
}

/// Thumbs up or down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Positive,
    Negative,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Positive => "positive",
            Rating::Negative => "negative",
        }
    }
}

/// A feedback entry used to find gaps in the training corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub user_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_response: Option<String>,
    pub kind: FeedbackKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub at: DateTime<Utc>,
}

/// Analytics event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsKind {
    Visit,
    Message,
    Feedback,
}

impl AnalyticsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsKind::Visit => "visit",
            AnalyticsKind::Message => "message",
            AnalyticsKind::Feedback => "feedback",
        }
    }
}

/// An anonymous analytics event: type, opaque session token, optional data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub kind: AnalyticsKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub at: DateTime<Utc>,
}

impl AnalyticsEvent {
    pub fn now(kind: AnalyticsKind, session_id: Option<String>) -> Self {
        Self {
            kind,
            session_id,
            data: None,
            at: Utc::now(),
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// The persistence collaborator.
///
/// Implementations: SQLite, in-memory (for testing), tracing-only, none.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// The sink name (e.g., "sqlite", "memory", "none").
    fn name(&self) -> &str;

    /// Append a transcript turn.
    async fn record_turn(&self, record: TranscriptRecord) -> Result<(), PersistenceError>;

    /// Append a feedback entry, returning its id.
    async fn record_feedback(&self, record: FeedbackRecord) -> Result<i64, PersistenceError>;

    /// Append an analytics event.
    async fn record_event(&self, event: AnalyticsEvent) -> Result<(), PersistenceError>;
}
