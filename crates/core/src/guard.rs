//! Guardrail verdict types shared by the input and output guards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A guardrail category.
///
/// Declaration order is priority order: when several categories fire, the
/// smallest one is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Prompt-override attempts ("ignore previous instructions")
    Jailbreak,
    /// False authority or social-engineering phrasing
    Manipulation,
    /// Politics, religion, sensitive personal data
    BlockedTopic,
    /// Profanity and harassment
    Inappropriate,
    /// Generated text criticizing the owner
    NegativeOwner,
    /// Generated specifics with no grounding, stock AI disclaimers
    Fabrication,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Jailbreak => "jailbreak",
            Category::Manipulation => "manipulation",
            Category::BlockedTopic => "blocked_topic",
            Category::Inappropriate => "inappropriate",
            Category::NegativeOwner => "negative_owner",
            Category::Fabrication => "fabrication",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of screening a user utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputVerdict {
    pub allowed: bool,
    pub reason: Option<Category>,
}

impl InputVerdict {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: Category) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Result of screening generated text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputVerdict {
    /// `false` when any flag fired; the text must then never reach the user
    pub clean: bool,
    pub flags: BTreeSet<Category>,
    /// Hedging detected; the text is still shown but logged for review
    pub uncertain: bool,
}

impl OutputVerdict {
    /// The highest-priority flag, if any.
    pub fn primary_flag(&self) -> Option<Category> {
        self.flags.iter().next().copied()
    }
}
