//! Lexical guardrails.
//!
//! Rules are data: an ordered table of `(Category, patterns)` built once into
//! a [`RuleSet`] and shared behind `Arc`. [`Guard`] applies it to user
//! utterances before generation and to generated text after.

pub mod deflection;
pub mod input;
pub mod normalize;
pub mod output;
pub mod rules;

use std::sync::Arc;

use doppel_core::{InputVerdict, OutputVerdict};

pub use deflection::{MAINTENANCE_MESSAGE, RETRY_MESSAGE, deflection};
pub use normalize::normalize;
pub use rules::RuleSet;

/// Both guard stages over one shared rule set.
#[derive(Debug, Clone)]
pub struct Guard {
    rules: Arc<RuleSet>,
}

impl Guard {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    /// Screen a user utterance. First matching category wins.
    pub fn screen_input(&self, utterance: &str) -> InputVerdict {
        input::screen_input(&self.rules, utterance)
    }

    /// Screen generated text. `grounding` is the text the reply may quote
    /// specifics from (the retrieved chunks and the utterance).
    pub fn screen_output(&self, text: &str, grounding: &[&str]) -> OutputVerdict {
        output::screen_output(&self.rules, text, grounding)
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }
}
