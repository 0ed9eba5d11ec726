//! The relationship roster: people the owner knows, parsed from the
//! `family_and_friends` document.
//!
//! The document is free prose, so the parser only picks up a handful of
//! phrasings ("my sister ... her name is Maya", "Colorado Friends: Kyle,
//! Parisa"). Anything it does not recognize is ignored.

use doppel_core::{Document, RelationshipEntry, RelationshipKind};
use regex_lite::Regex;
use tracing::{debug, info, warn};

/// Label of the document the roster is parsed from.
pub const ROSTER_LABEL: &str = "family_and_friends";

/// (pattern, kind, detail). Group 1 is the name, group 2 an optional nickname.
const NAMED_PATTERNS: &[(&str, RelationshipKind, &str)] = &[
    (r"(?i)sister.*?name is (\w+)", RelationshipKind::Family, "sister"),
    (r"(?i)brother.*?name is (\w+)", RelationshipKind::Family, "brother"),
    (r"(?i)\bdad'?s? name is (\w+)", RelationshipKind::Family, "dad"),
    (r"(?i)\bmom'?s? name is (\w+)", RelationshipKind::Family, "mom"),
    (
        r"(?i)girlfriend'?s? name is (\w+)(?: or (\w+))?",
        RelationshipKind::Partner,
        "girlfriend",
    ),
    (
        r"(?i)boyfriend'?s? name is (\w+)(?: or (\w+))?",
        RelationshipKind::Partner,
        "boyfriend",
    ),
    (
        r"(?i)partner'?s? name is (\w+)(?: or (\w+))?",
        RelationshipKind::Partner,
        "partner",
    ),
];

const FRIENDS_PATTERN: &str = r"(?im)^\s*([A-Za-z][\w ]*?) friends?:\s*(.+)$";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    entries: Vec<RelationshipEntry>,
}

impl Roster {
    pub fn from_entries(entries: Vec<RelationshipEntry>) -> Self {
        let mut roster = Self::default();
        for entry in entries {
            roster.insert(entry);
        }
        roster
    }

    /// Parse the roster document out of a loaded corpus. A corpus without
    /// one yields an empty roster.
    pub fn from_documents(documents: &[Document]) -> Self {
        match documents.iter().find(|d| d.label == ROSTER_LABEL) {
            Some(doc) => {
                let roster = Self::parse(&doc.text);
                info!(people = roster.len(), "Roster parsed");
                roster
            }
            None => {
                warn!("No {ROSTER_LABEL} document; identity recognition is disabled");
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Self {
        let mut roster = Self::default();

        for (pattern, kind, detail) in NAMED_PATTERNS {
            let Some(re) = compile(pattern) else { continue };
            if let Some(caps) = re.captures(text) {
                for group in [1, 2] {
                    if let Some(name) = caps.get(group) {
                        roster.insert(RelationshipEntry::new(name.as_str(), *kind, *detail));
                    }
                }
            }
        }

        if let Some(re) = compile(FRIENDS_PATTERN) {
            for caps in re.captures_iter(text) {
                let (Some(region), Some(names)) = (caps.get(1), caps.get(2)) else {
                    continue;
                };
                let detail = format!("{} friend", region.as_str().trim());
                for name in split_names(names.as_str()) {
                    roster.insert(RelationshipEntry::new(name, RelationshipKind::Friend, &detail));
                }
            }
        }

        roster
    }

    fn insert(&mut self, entry: RelationshipEntry) {
        if self.find_exact(&entry.name).is_some() {
            debug!(name = %entry.name, "Duplicate roster name ignored");
            return;
        }
        self.entries.push(entry);
    }

    /// Case-insensitive exact lookup.
    pub fn find_exact(&self, name: &str) -> Option<&RelationshipEntry> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub fn entries(&self) -> &[RelationshipEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// "Kyle, Cam (call him cami jon), Mary Ann" -> ["Kyle", "Cam", "Mary"]
fn split_names(list: &str) -> Vec<String> {
    strip_parentheticals(list)
        .split(',')
        .filter_map(|n| n.split_whitespace().next())
        .map(|n| n.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

fn strip_parentheticals(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern, error = %e, "Invalid roster pattern");
            None
        }
    }
}
