//! Error types for the Doppel domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; `Error` wraps them all.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all Doppel operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// The persona corpus could not be read. Fatal at startup.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Corpus unavailable at {path}: {reason}")]
    Unavailable { path: PathBuf, reason: String },

    #[error("Failed to read corpus document {path}: {reason}")]
    Read { path: PathBuf, reason: String },
}

/// The completion service failed or timed out. Recoverable per call.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("Generation unavailable: {0}")]
    Unavailable(String),
}

impl From<ProviderError> for GenerationError {
    fn from(err: ProviderError) -> Self {
        GenerationError::Unavailable(err.to_string())
    }
}

/// A persistence side effect failed. Logged and swallowed by callers.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}
