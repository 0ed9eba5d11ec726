//! SQLite store.
//!
//! One database file, four tables:
//! - `conversations`: one row per conversation id, touched on every turn
//! - `messages`: transcript turns
//! - `feedback`: automatic and user-submitted feedback
//! - `analytics`: anonymous events
//!
//! Timestamps are stored as RFC 3339 text.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use doppel_core::{
    AnalyticsEvent, EventSink, FeedbackKind, FeedbackRecord, PersistenceError, Rating, Role,
    TranscriptRecord, Turn,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

use crate::{ConversationSummary, Store, StoredFeedback};

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "conversations table",
        r#"
        CREATE TABLE IF NOT EXISTS conversations (
            id          TEXT PRIMARY KEY,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        )
        "#,
    ),
    (
        "messages table",
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id  TEXT NOT NULL REFERENCES conversations(id),
            role             TEXT NOT NULL,
            content          TEXT NOT NULL,
            created_at       TEXT NOT NULL
        )
        "#,
    ),
    (
        "messages index",
        "CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, id)",
    ),
    (
        "feedback table",
        r#"
        CREATE TABLE IF NOT EXISTS feedback (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id     TEXT,
            user_message        TEXT NOT NULL,
            assistant_response  TEXT,
            feedback_type       TEXT NOT NULL,
            rating              TEXT,
            notes               TEXT,
            created_at          TEXT NOT NULL
        )
        "#,
    ),
    (
        "analytics table",
        r#"
        CREATE TABLE IF NOT EXISTS analytics (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            event_type  TEXT NOT NULL,
            session_id  TEXT,
            event_data  TEXT,
            created_at  TEXT NOT NULL
        )
        "#,
    ),
];

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (and create if missing) the database at `path` and run
    /// migrations. `"sqlite::memory:"` gives an ephemeral database.
    pub async fn open(path: &str) -> Result<Self, PersistenceError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| PersistenceError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| PersistenceError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {path}");
        Ok(store)
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, PersistenceError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), PersistenceError> {
        for (name, sql) in MIGRATIONS {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| PersistenceError::MigrationFailed(format!("{name}: {e}")))?;
        }
        debug!(steps = MIGRATIONS.len(), "SQLite migrations complete");
        Ok(())
    }

    fn row_to_feedback(row: &sqlx::sqlite::SqliteRow) -> Result<StoredFeedback, PersistenceError> {
        let id: i64 = column(row, "id")?;
        let kind: String = column(row, "feedback_type")?;
        let rating: Option<String> = column(row, "rating")?;
        let created_at: String = column(row, "created_at")?;

        Ok(StoredFeedback {
            id,
            record: FeedbackRecord {
                conversation_id: column(row, "conversation_id")?,
                user_message: column(row, "user_message")?,
                assistant_response: column(row, "assistant_response")?,
                kind: FeedbackKind::parse(&kind).unwrap_or(FeedbackKind::Other),
                rating: rating.as_deref().and_then(parse_rating),
                notes: column(row, "notes")?,
                at: parse_time(&created_at),
            },
        })
    }
}

fn column<'r, T>(row: &'r sqlx::sqlite::SqliteRow, name: &str) -> Result<T, PersistenceError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| PersistenceError::QueryFailed(format!("{name} column: {e}")))
}

fn parse_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_role(s: &str) -> Option<Role> {
    match s {
        "user" => Some(Role::User),
        "assistant" => Some(Role::Assistant),
        _ => None,
    }
}

fn parse_rating(s: &str) -> Option<Rating> {
    match s {
        "positive" => Some(Rating::Positive),
        "negative" => Some(Rating::Negative),
        _ => None,
    }
}

#[async_trait]
impl EventSink for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn record_turn(&self, record: TranscriptRecord) -> Result<(), PersistenceError> {
        let at = record.at.to_rfc3339();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PersistenceError::Storage(format!("BEGIN failed: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO conversations (id, created_at, updated_at)
            VALUES (?1, ?2, ?2)
            ON CONFLICT(id) DO UPDATE SET updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.conversation_id)
        .bind(&at)
        .execute(&mut *tx)
        .await
        .map_err(|e| PersistenceError::Storage(format!("Conversation upsert failed: {e}")))?;

        sqlx::query(
            "INSERT INTO messages (conversation_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&record.conversation_id)
        .bind(record.role.as_str())
        .bind(&record.text)
        .bind(&at)
        .execute(&mut *tx)
        .await
        .map_err(|e| PersistenceError::Storage(format!("Message insert failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| PersistenceError::Storage(format!("COMMIT failed: {e}")))?;

        debug!(conversation_id = %record.conversation_id, role = %record.role, "Stored turn");
        Ok(())
    }

    async fn record_feedback(&self, record: FeedbackRecord) -> Result<i64, PersistenceError> {
        let result = sqlx::query(
            r#"
            INSERT INTO feedback
                (conversation_id, user_message, assistant_response, feedback_type, rating, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&record.conversation_id)
        .bind(&record.user_message)
        .bind(&record.assistant_response)
        .bind(record.kind.as_str())
        .bind(record.rating.map(|r| r.as_str()))
        .bind(&record.notes)
        .bind(record.at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| PersistenceError::Storage(format!("Feedback insert failed: {e}")))?;

        let id = result.last_insert_rowid();
        debug!(feedback_id = id, kind = record.kind.as_str(), "Stored feedback");
        Ok(id)
    }

    async fn record_event(&self, event: AnalyticsEvent) -> Result<(), PersistenceError> {
        let data = event.data.as_ref().map(|d| d.to_string());
        sqlx::query(
            "INSERT INTO analytics (event_type, session_id, event_data, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(event.kind.as_str())
        .bind(&event.session_id)
        .bind(data)
        .bind(event.at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| PersistenceError::Storage(format!("Analytics insert failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn recent_turns(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<Turn>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT role, content FROM messages WHERE conversation_id = ?1 ORDER BY id DESC LIMIT ?2",
        )
        .bind(conversation_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PersistenceError::QueryFailed(format!("Recent turns: {e}")))?;

        let mut turns = Vec::with_capacity(rows.len());
        for row in rows.iter().rev() {
            let role: String = column(row, "role")?;
            let Some(role) = parse_role(&role) else {
                warn!(role = %role, "Skipping stored message with unknown role");
                continue;
            };
            turns.push(Turn {
                role,
                text: column(row, "content")?,
            });
        }
        Ok(turns)
    }

    async fn transcript(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<TranscriptRecord>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT role, content, created_at FROM messages WHERE conversation_id = ?1 ORDER BY id",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PersistenceError::QueryFailed(format!("Transcript: {e}")))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let role: String = column(row, "role")?;
            let Some(role) = parse_role(&role) else {
                continue;
            };
            let at: String = column(row, "created_at")?;
            records.push(TranscriptRecord {
                conversation_id: conversation_id.to_string(),
                role,
                text: column(row, "content")?,
                at: parse_time(&at),
            });
        }
        Ok(records)
    }

    async fn conversations(&self) -> Result<Vec<ConversationSummary>, PersistenceError> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.created_at, c.updated_at, COUNT(m.id) AS message_count
            FROM conversations c
            LEFT JOIN messages m ON m.conversation_id = c.id
            GROUP BY c.id
            ORDER BY c.updated_at DESC, c.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PersistenceError::QueryFailed(format!("Conversations: {e}")))?;

        rows.iter()
            .map(|row| {
                let created_at: String = column(row, "created_at")?;
                let updated_at: String = column(row, "updated_at")?;
                let count: i64 = column(row, "message_count")?;
                Ok(ConversationSummary {
                    id: column(row, "id")?,
                    started_at: parse_time(&created_at),
                    updated_at: parse_time(&updated_at),
                    message_count: count.max(0) as usize,
                })
            })
            .collect()
    }

    async fn list_feedback(&self) -> Result<Vec<StoredFeedback>, PersistenceError> {
        let rows = sqlx::query("SELECT * FROM feedback ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PersistenceError::QueryFailed(format!("Feedback list: {e}")))?;

        rows.iter().map(Self::row_to_feedback).collect()
    }
}
