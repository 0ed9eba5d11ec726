//! The per-call output bundle returned by the pipeline.

use serde::{Deserialize, Serialize};

use crate::corpus::RelationshipMatch;
use crate::guard::Category;

/// Terminal state a call ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Generated text passed the output guard
    Done,
    /// The input guard refused the utterance
    BlockedInput,
    /// The output guard discarded the generated text
    BlockedOutput,
    /// Retrieval or generation failed; a retry message was returned
    Failed,
}

/// Everything the caller learns from one call. There is no other state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub text: String,
    pub outcome: Outcome,
    pub blocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<RelationshipMatch>,
    pub uncertain: bool,
    pub failed: bool,
    /// Whether any corpus chunk was placed in the prompt
    pub context_used: bool,
}

impl PipelineResult {
    pub fn done(
        text: impl Into<String>,
        identity: Option<RelationshipMatch>,
        uncertain: bool,
        context_used: bool,
    ) -> Self {
        Self {
            text: text.into(),
            outcome: Outcome::Done,
            blocked: false,
            reason: None,
            identity,
            uncertain,
            failed: false,
            context_used,
        }
    }

    pub fn blocked(
        text: impl Into<String>,
        outcome: Outcome,
        reason: Category,
        identity: Option<RelationshipMatch>,
    ) -> Self {
        Self {
            text: text.into(),
            outcome,
            blocked: true,
            reason: Some(reason),
            identity,
            uncertain: false,
            failed: false,
            context_used: false,
        }
    }

    pub fn failed(text: impl Into<String>, identity: Option<RelationshipMatch>) -> Self {
        Self {
            text: text.into(),
            outcome: Outcome::Failed,
            blocked: false,
            reason: None,
            identity,
            uncertain: false,
            failed: true,
            context_used: false,
        }
    }
}
