//! Corpus value types: documents, chunks, and the relationship roster.
//!
//! All of these are created once at load time and never mutated.

use serde::{Deserialize, Serialize};

/// An owner-authored source text identified by a topical label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// File stem, e.g. "hobbies" or "family_and_friends"
    pub label: String,
    pub text: String,
}

/// The atomic retrieval unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Label of the document this chunk came from
    pub source: String,
    /// Position across the whole corpus; used as the ranking tie-breaker
    pub ordinal: usize,
    pub text: String,
}

/// How a known person relates to the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    Family,
    Partner,
    Friend,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::Family => "family",
            RelationshipKind::Partner => "partner",
            RelationshipKind::Friend => "friend",
        }
    }
}

impl std::fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (name, relationship) pair parsed from the roster document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEntry {
    pub name: String,
    pub kind: RelationshipKind,
    /// Finer label such as "sister" or "Colorado friend"
    pub detail: String,
}

impl RelationshipEntry {
    pub fn new(name: impl Into<String>, kind: RelationshipKind, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            detail: detail.into(),
        }
    }
}

/// A recognized self-identification in the current conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipMatch {
    /// Roster spelling of the name, capitalized
    pub name: String,
    pub kind: RelationshipKind,
    pub detail: String,
}

impl From<&RelationshipEntry> for RelationshipMatch {
    fn from(entry: &RelationshipEntry) -> Self {
        let mut chars = entry.name.chars();
        let name = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        Self {
            name,
            kind: entry.kind,
            detail: entry.detail.clone(),
        }
    }
}
