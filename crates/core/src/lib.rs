//! # Doppel Core
//!
//! Domain types, capability traits, and error definitions for the Doppel
//! persona pipeline. This crate has **no framework dependencies**: it defines
//! the vocabulary every other crate speaks.
//!
//! ## Design Philosophy
//!
//! The pipeline consumes two external capabilities, both expressed as traits
//! here and injected at construction time:
//! - [`Provider`]: the opaque text-completion service
//! - [`EventSink`]: append-only persistence of transcripts, feedback, and analytics
//!
//! Everything else in this crate is plain immutable data that is shared
//! read-only across concurrent calls.

pub mod corpus;
pub mod error;
pub mod guard;
pub mod message;
pub mod provider;
pub mod response;
pub mod sink;

// Re-export key types at crate root for ergonomics
pub use corpus::{Chunk, Document, RelationshipEntry, RelationshipKind, RelationshipMatch};
pub use error::{
    CorpusError, Error, GenerationError, PersistenceError, ProviderError, Result,
};
pub use guard::{Category, InputVerdict, OutputVerdict};
pub use message::{Message, Role, Turn};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use response::{Outcome, PipelineResult};
pub use sink::{
    AnalyticsEvent, AnalyticsKind, EventSink, FeedbackKind, FeedbackRecord, Rating,
    TranscriptRecord,
};
