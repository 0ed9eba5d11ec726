//! `/api` routes: chat, feedback, analytics, health.

use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use chrono::{DateTime, Utc};
use doppel_core::{
    AnalyticsEvent, AnalyticsKind, FeedbackKind, FeedbackRecord, PipelineResult, Rating, Role,
    TranscriptRecord, Turn,
};
use doppel_guard::MAINTENANCE_MESSAGE;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::SharedState;

pub const MAX_MESSAGE_CHARS: usize = 2000;
pub const MAX_CONVERSATION_ID_CHARS: usize = 36;
pub const MAX_HISTORY_ITEMS: usize = 50;
pub const MAX_HISTORY_ITEM_CHARS: usize = 5000;
pub const MAX_NOTES_CHARS: usize = 1000;

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryItem {
    pub role: HistoryRole,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: String,
    #[serde(default)]
    pub history: Option<Vec<HistoryItem>>,
}

impl ChatRequest {
    fn validate(&self) -> Result<(), String> {
        check_len("message", &self.message, 1, MAX_MESSAGE_CHARS)?;
        check_len(
            "conversation_id",
            &self.conversation_id,
            1,
            MAX_CONVERSATION_ID_CHARS,
        )?;
        if let Some(history) = &self.history {
            if history.len() > MAX_HISTORY_ITEMS {
                return Err(format!("history: at most {MAX_HISTORY_ITEMS} items"));
            }
            for item in history {
                check_len("history.content", &item.content, 1, MAX_HISTORY_ITEM_CHARS)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub conversation_id: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub user_message: String,
    #[serde(default)]
    pub assistant_response: Option<String>,
    pub feedback_type: FeedbackKind,
    #[serde(default)]
    pub rating: Option<Rating>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl FeedbackRequest {
    fn validate(&self) -> Result<(), String> {
        check_len("user_message", &self.user_message, 1, MAX_MESSAGE_CHARS)?;
        if let Some(response) = &self.assistant_response {
            check_len("assistant_response", response, 0, MAX_HISTORY_ITEM_CHARS)?;
        }
        if let Some(notes) = &self.notes {
            check_len("notes", notes, 0, MAX_NOTES_CHARS)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub success: bool,
    pub feedback_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyticsRequest {
    pub event_type: AnalyticsKind,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyticsResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub chat_enabled: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn unprocessable(message: String) -> ApiError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse { error: message }),
    )
}

fn internal(message: impl Into<String>) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), String> {
    let n = value.chars().count();
    if n < min || n > max {
        return Err(format!("{field}: length must be between {min} and {max}"));
    }
    Ok(())
}

// ── Handlers ──────────────────────────────────────────────────────────────

pub async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    payload.validate().map_err(unprocessable)?;

    if !state.chat_enabled.load(Ordering::Relaxed) {
        info!("Chat disabled, returning maintenance message");
        return Ok(Json(ChatResponse {
            response: MAINTENANCE_MESSAGE.to_string(),
            conversation_id: payload.conversation_id,
            metadata: serde_json::json!({ "maintenance": true }),
        }));
    }

    let conversation_id = payload.conversation_id;
    let history = match payload.history {
        Some(items) => items
            .into_iter()
            .map(|item| match item.role {
                HistoryRole::User => Turn::user(item.content),
                HistoryRole::Assistant => Turn::assistant(item.content),
            })
            .collect(),
        None => match state
            .store
            .recent_turns(&conversation_id, state.pipeline.settings().history_limit)
            .await
        {
            Ok(turns) => turns,
            Err(e) => {
                warn!(error = %e, "History replay failed, continuing without history");
                Vec::new()
            }
        },
    };

    let result = state
        .pipeline
        .respond_in(Some(&conversation_id), &payload.message, &history)
        .await;

    info!(
        outcome = ?result.outcome,
        history = history.len(),
        context_used = result.context_used,
        "Chat handled"
    );

    persist_exchange(&state, &conversation_id, &payload.message, &result).await;

    Ok(Json(ChatResponse {
        metadata: metadata(&result),
        response: result.text,
        conversation_id,
    }))
}

/// Everything in the result except the text itself.
fn metadata(result: &PipelineResult) -> serde_json::Value {
    let mut value = serde_json::to_value(result).unwrap_or_default();
    if let Some(map) = value.as_object_mut() {
        map.remove("text");
    }
    value
}

async fn persist_exchange(
    state: &SharedState,
    conversation_id: &str,
    message: &str,
    result: &PipelineResult,
) {
    let store = &state.store;
    for (role, text) in [(Role::User, message), (Role::Assistant, result.text.as_str())] {
        if let Err(e) = store
            .record_turn(TranscriptRecord::now(conversation_id, role, text))
            .await
        {
            warn!(error = %e, role = %role, "Failed to store turn");
        }
    }

    let event = AnalyticsEvent::now(AnalyticsKind::Message, Some(conversation_id.to_string()))
        .with_data(serde_json::json!({
            "outcome": result.outcome,
            "blocked": result.blocked,
            "uncertain": result.uncertain,
        }));
    if let Err(e) = store.record_event(event).await {
        warn!(error = %e, "Failed to store message event");
    }
}

pub async fn feedback_handler(
    State(state): State<SharedState>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    payload.validate().map_err(unprocessable)?;

    let event = AnalyticsEvent::now(AnalyticsKind::Feedback, payload.conversation_id.clone())
        .with_data(serde_json::json!({
            "type": payload.feedback_type.as_str(),
            "rating": payload.rating.map(|r| r.as_str()).unwrap_or("none"),
        }));

    let record = FeedbackRecord {
        conversation_id: payload.conversation_id,
        user_message: payload.user_message,
        assistant_response: payload.assistant_response,
        kind: payload.feedback_type,
        rating: payload.rating,
        notes: payload.notes,
        at: Utc::now(),
    };

    let feedback_id = state.store.record_feedback(record).await.map_err(|e| {
        warn!(error = %e, "Failed to store feedback");
        internal("Failed to store feedback")
    })?;

    if let Err(e) = state.store.record_event(event).await {
        warn!(error = %e, "Failed to store feedback event");
    }

    info!(feedback_id, "Feedback received");
    Ok(Json(FeedbackResponse {
        success: true,
        feedback_id,
    }))
}

pub async fn analytics_handler(
    State(state): State<SharedState>,
    Json(payload): Json<AnalyticsRequest>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    if let Some(session_id) = &payload.session_id {
        check_len("session_id", session_id, 0, MAX_CONVERSATION_ID_CHARS).map_err(unprocessable)?;
    }

    let mut event = AnalyticsEvent::now(payload.event_type, payload.session_id);
    if let Some(data) = payload.metadata {
        event = event.with_data(data);
    }

    state.store.record_event(event).await.map_err(|e| {
        warn!(error = %e, "Failed to store analytics event");
        internal("Failed to store event")
    })?;

    Ok(Json(AnalyticsResponse { success: true }))
}

pub async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        chat_enabled: state.chat_enabled.load(Ordering::Relaxed),
        timestamp: Utc::now(),
    })
}

#[derive(Serialize)]
pub struct RootResponse {
    name: &'static str,
    version: &'static str,
}

pub async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        name: "Doppel",
        version: env!("CARGO_PKG_VERSION"),
    })
}
