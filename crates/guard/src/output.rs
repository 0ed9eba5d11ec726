//! Output-side screening.
//!
//! Unlike the input side this collects every flag instead of stopping at the
//! first, so the caller can log the full picture. Any flag makes the text
//! unclean. Hedging only marks it uncertain.

use std::collections::BTreeSet;

use doppel_core::{Category, OutputVerdict};
use tracing::debug;

use crate::normalize::normalize;
use crate::rules::{AI_DISCLAIMERS, HEDGES, RuleSet};

/// Digit runs at least this long must appear in the grounding text.
pub const MIN_CHECKED_DIGITS: usize = 3;

pub fn screen_output(rules: &RuleSet, text: &str, grounding: &[&str]) -> OutputVerdict {
    let normalized = normalize(text);
    let mut flags = BTreeSet::new();

    for category in [
        Category::BlockedTopic,
        Category::Inappropriate,
        Category::NegativeOwner,
    ] {
        if rules.rule(category).is_some_and(|r| r.matches(&normalized)) {
            flags.insert(category);
        }
    }

    if has_disclaimer(&normalized) || has_ungrounded_number(text, grounding) {
        flags.insert(Category::Fabrication);
    }

    let uncertain = HEDGES.iter().any(|h| normalized.contains(h));

    if !flags.is_empty() {
        debug!(?flags, "Output flagged");
    }

    OutputVerdict {
        clean: flags.is_empty(),
        flags,
        uncertain,
    }
}

fn has_disclaimer(normalized: &str) -> bool {
    AI_DISCLAIMERS.iter().any(|d| normalized.contains(d))
}

/// True when the text cites a multi-digit number (a year, a count, a sum)
/// that none of the grounding texts contain.
fn has_ungrounded_number(text: &str, grounding: &[&str]) -> bool {
    digit_runs(text)
        .into_iter()
        .filter(|run| run.len() >= MIN_CHECKED_DIGITS)
        .any(|run| !grounding.iter().any(|g| g.contains(run)))
}

fn digit_runs(text: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        match (c.is_ascii_digit(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push(&text[s..i]);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(&text[s..]);
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> RuleSet {
        RuleSet::new("Cameron", &[])
    }

    #[test]
    fn plain_answer_is_clean() {
        let v = screen_output(&rules(), "Cameron loves rock climbing and chess!", &[]);
        assert!(v.clean);
        assert!(v.flags.is_empty());
        assert!(!v.uncertain);
    }

    #[test]
    fn blocked_topic_in_output_is_flagged() {
        let v = screen_output(&rules(), "Honestly he's pretty conservative on most things.", &[]);
        assert!(!v.clean);
        assert_eq!(v.primary_flag(), Some(Category::BlockedTopic));
    }

    #[test]
    fn ai_disclaimer_is_fabrication() {
        let v = screen_output(&rules(), "As an AI language model, I can't have hobbies.", &[]);
        assert!(v.flags.contains(&Category::Fabrication));
    }

    #[test]
    fn ungrounded_year_is_fabrication() {
        let grounding = ["He started climbing in 2019 with friends."];
        let grounded = screen_output(&rules(), "He started climbing back in 2019.", &grounding);
        assert!(grounded.clean);

        let invented = screen_output(&rules(), "He won a chess title in 2021.", &grounding);
        assert_eq!(invented.primary_flag(), Some(Category::Fabrication));
    }

    #[test]
    fn short_numbers_are_not_checked() {
        let v = screen_output(&rules(), "He has 2 dogs and climbs 5 days a week.", &[]);
        assert!(v.clean);
    }

    #[test]
    fn negative_owner_is_flagged() {
        let v = screen_output(&rules(), "Cameron is so lazy, he never finishes anything.", &[]);
        assert!(v.flags.contains(&Category::NegativeOwner));
    }

    #[test]
    fn hedging_is_uncertain_but_clean() {
        let v = screen_output(&rules(), "I’m not sure what his favorite movie is.", &[]);
        assert!(v.clean);
        assert!(v.uncertain);
    }

    #[test]
    fn multiple_flags_are_collected() {
        let v = screen_output(
            &rules(),
            "As an AI I think Cameron is lazy and votes liberal.",
            &[],
        );
        assert!(v.flags.contains(&Category::BlockedTopic));
        assert!(v.flags.contains(&Category::NegativeOwner));
        assert!(v.flags.contains(&Category::Fabrication));
        assert_eq!(v.primary_flag(), Some(Category::BlockedTopic));
    }

    #[test]
    fn digit_runs_split_on_separators() {
        assert_eq!(digit_runs("1,250 in 2020!"), vec!["1", "250", "2020"]);
    }
}
