//! The loaded corpus and the swappable handle the pipeline queries through.

use std::path::Path;
use std::sync::{Arc, RwLock};

use doppel_core::{Chunk, CorpusError, Document};
use tracing::info;

use crate::chunking::chunk_corpus;
use crate::roster::Roster;
use crate::tfidf::{ScoredChunk, TfidfIndex};

/// Everything derived from the data directory at startup.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub documents: Vec<Document>,
    pub roster: Roster,
    pub index: TfidfIndex,
}

impl Corpus {
    /// Load, chunk, parse the roster, and build the index.
    pub fn load(dir: &Path, min_similarity: f32) -> Result<Self, CorpusError> {
        let documents = crate::loader::load(dir)?;
        Ok(Self::from_documents(documents, min_similarity))
    }

    pub fn from_documents(documents: Vec<Document>, min_similarity: f32) -> Self {
        let chunks: Vec<Chunk> = chunk_corpus(&documents);
        let roster = Roster::from_documents(&documents);
        let index = TfidfIndex::build(chunks).with_min_similarity(min_similarity);
        info!(
            documents = documents.len(),
            chunks = index.len(),
            vocabulary = index.vocabulary_size(),
            "Index built"
        );
        Self {
            documents,
            roster,
            index,
        }
    }
}

/// The index and roster that answer one call.
#[derive(Debug)]
pub struct Snapshot {
    pub index: TfidfIndex,
    pub roster: Roster,
}

/// Shared reference to the current [`Snapshot`].
///
/// Readers clone the inner `Arc` and drop the lock before scoring. A reload
/// builds the replacement completely and then swaps index and roster in with
/// one write, so a call sees either the old pair or the new one, never a mix.
#[derive(Debug)]
pub struct CorpusHandle {
    current: RwLock<Arc<Snapshot>>,
}

impl CorpusHandle {
    pub fn new(index: TfidfIndex, roster: Roster) -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot { index, roster })),
        }
    }

    pub fn from_corpus(corpus: Corpus) -> Self {
        Self::new(corpus.index, corpus.roster)
    }

    /// The snapshot as of now. Holding the returned `Arc` keeps it alive
    /// across a concurrent swap.
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn query(&self, text: &str, k: usize) -> Vec<ScoredChunk> {
        self.current().index.query(text, k)
    }

    /// Swap in an already built index and roster.
    pub fn replace(&self, index: TfidfIndex, roster: Roster) {
        let next = Arc::new(Snapshot { index, roster });
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = next;
    }

    /// Rebuild from `dir` and swap. On error the current snapshot stays.
    pub fn reload(&self, dir: &Path) -> Result<(), CorpusError> {
        let min_similarity = self.current().index.min_similarity();
        let corpus = Corpus::load(dir, min_similarity)?;
        let chunks = corpus.index.len();
        let roster = corpus.roster.len();
        self.replace(corpus.index, corpus.roster);
        info!(chunks, roster, "Corpus swapped");
        Ok(())
    }
}
