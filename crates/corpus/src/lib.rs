//! The persona corpus: owner-authored documents, the chunks cut from them,
//! the relationship roster, and the lexical retrieval index over the chunks.
//!
//! Everything here is built once at startup and read concurrently afterwards.
//! [`CorpusHandle`] is the only piece that can change at runtime, and it does
//! so by swapping in a fully built index and roster together.

pub mod chunking;
pub mod expansion;
pub mod loader;
pub mod retriever;
pub mod roster;
pub mod tfidf;

pub use chunking::{MAX_CHUNK_CHARS, MIN_CHUNK_CHARS, chunk_corpus, split_document};
pub use loader::load;
pub use retriever::{Corpus, CorpusHandle, Snapshot};
pub use roster::{ROSTER_LABEL, Roster};
pub use tfidf::{ScoredChunk, TfidfIndex};
