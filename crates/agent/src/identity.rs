//! Recognizes when the visitor says who they are.
//!
//! Only the visitor's own recent turns are scanned, newest first, so a name
//! given two messages ago still counts but one from the start of a long chat
//! does not. Nothing is remembered between calls; the caller resupplies
//! history every time.

use doppel_core::{RelationshipMatch, Role, Turn};
use doppel_corpus::Roster;
use doppel_guard::normalize;

/// User turns of history considered, besides the current utterance.
pub const IDENTITY_SCAN_TURNS: usize = 6;

/// Roster names shorter than this only match exactly. Three-letter names sit
/// one edit away from too many ordinary words ("Sam" and "sad").
pub const FUZZY_MIN_CHARS: usize = 4;

pub const MAX_EDIT_DISTANCE: usize = 1;

/// Words that follow a cue without being a name ("i'm good", "it's fine").
const NOT_NAMES: &[&str] = &[
    "a", "actually", "all", "alone", "alright", "also", "an", "asking", "back", "bad", "been",
    "bored", "busy", "calm", "cold", "confused", "cool", "curious", "doing", "done", "excited",
    "fine", "free", "from", "glad", "going", "good", "great", "happy", "hard", "her", "here",
    "his", "home", "hot", "hungry", "interested", "just", "kinda", "late", "like", "looking",
    "lost", "mad", "my", "nervous", "new", "nice", "not", "ok", "okay", "over", "pretty",
    "ready", "really", "sad", "sick", "so", "sorry", "still", "stuck", "super", "sure", "the",
    "thinking", "tired", "trying", "very", "weird", "well", "with", "wondering", "your",
];

const GREETINGS: &[&str] = &["hey", "hi", "hello", "yo", "sup", "hiya", "howdy"];

/// Token sequences that introduce a name.
const CUES: &[&[&str]] = &[
    &["my", "name", "is"],
    &["my", "name's"],
    &["call", "me"],
    &["this", "is"],
    &["i", "am"],
    &["it", "is"],
    &["i'm"],
    &["im"],
    &["it's"],
    &["its"],
];

/// Find the most recent self-identification that names someone on the
/// roster. No match is the common case and not an error.
pub fn identify(roster: &Roster, history: &[Turn], utterance: &str) -> Option<RelationshipMatch> {
    if roster.is_empty() {
        return None;
    }

    let recent_user_turns = history
        .iter()
        .rev()
        .filter(|t| t.role == Role::User)
        .take(IDENTITY_SCAN_TURNS)
        .map(|t| t.text.as_str());

    std::iter::once(utterance)
        .chain(recent_user_turns)
        .find_map(|text| {
            candidate_names(text)
                .iter()
                .find_map(|name| match_name(roster, name))
        })
}

/// Names offered in one turn, in the order they appear.
pub fn candidate_names(text: &str) -> Vec<String> {
    let normalized = normalize(text);
    let tokens: Vec<&str> = normalized.split(' ').filter(|t| !t.is_empty()).collect();
    let mut names = Vec::new();

    // "<name> here" opening a turn, optionally after a greeting
    let lead = usize::from(tokens.first().is_some_and(|t| GREETINGS.contains(t)));
    if tokens.get(lead + 1) == Some(&"here") {
        if let Some(name) = tokens.get(lead).filter(|t| is_name_like(t)) {
            names.push((*name).to_string());
        }
    }

    let mut i = 0;
    while i < tokens.len() {
        let cue_len = CUES
            .iter()
            .find(|cue| tokens[i..].starts_with(cue))
            .map(|cue| cue.len());
        match cue_len {
            Some(len) => {
                let mut j = i + len;
                // "it's just Bri", "this is actually Kyle"
                while tokens.get(j).is_some_and(|t| *t == "just" || *t == "actually") {
                    j += 1;
                }
                if let Some(name) = tokens.get(j).filter(|t| is_name_like(t)) {
                    names.push((*name).to_string());
                }
                i = j.max(i + 1);
            }
            None => i += 1,
        }
    }

    names
}

fn is_name_like(token: &str) -> bool {
    !NOT_NAMES.contains(&token) && token.chars().all(|c| c.is_alphabetic())
}

/// Exact (case-insensitive) first, then a single-edit fuzzy match against
/// roster names of at least [`FUZZY_MIN_CHARS`].
fn match_name(roster: &Roster, name: &str) -> Option<RelationshipMatch> {
    if let Some(entry) = roster.find_exact(name) {
        return Some(RelationshipMatch::from(entry));
    }

    let needle: Vec<char> = name.chars().collect();
    if needle.len() + MAX_EDIT_DISTANCE < FUZZY_MIN_CHARS {
        return None;
    }

    roster
        .entries()
        .iter()
        .filter(|e| e.name.chars().count() >= FUZZY_MIN_CHARS)
        .find(|e| {
            levenshtein_with_max(&e.name.to_lowercase(), &needle, MAX_EDIT_DISTANCE)
                <= MAX_EDIT_DISTANCE
        })
        .map(RelationshipMatch::from)
}

/// Edit distance between `value` and `needle`, giving up early once it is
/// certain to exceed `max_dist` (the return is then `max_dist + 1`).
fn levenshtein_with_max(value: &str, needle: &[char], max_dist: usize) -> usize {
    let n = needle.len();
    if n == 0 {
        return value.chars().count().min(max_dist + 1);
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr: Vec<usize> = vec![0; n + 1];

    for (i, c) in value.chars().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];

        for j in 1..=n {
            let cost = usize::from(c != needle[j - 1]);
            let d = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            curr[j] = d;
            row_min = row_min.min(d);
        }

        if row_min > max_dist {
            return max_dist + 1;
        }

        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}
