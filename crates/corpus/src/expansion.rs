//! Query expansion for conversational phrasings.
//!
//! Visitors ask "what's your biggest weakness?" while the corpus says "one
//! thing I struggle with". Each key found as a substring of the lower-cased
//! query appends its related terms before scoring.

const EXPANSIONS: &[(&str, &[&str])] = &[
    ("weakness", &["weaknesses", "flaw", "flaws", "struggle", "challenge"]),
    ("strength", &["strengths", "strong", "excel", "best"]),
    ("hire", &["why hire", "should hire", "hiring"]),
    ("goal", &["goals", "five year", "career", "future"]),
    ("left", &["leaving", "quit", "resigned", "departure", "last position"]),
    ("last job", &["left", "last position", "why left", "departure", "previous role"]),
    ("leave", &["left", "leaving", "quit", "resigned", "departure", "last position"]),
    ("failure", &["failed", "mistake", "learning", "lesson"]),
    ("conflict", &["disagreement", "difficult", "coworker", "handling"]),
    ("stress", &["pressure", "deadline", "deadlines", "handle stress"]),
    ("motivat", &["motivate", "motivation", "motivates", "driven", "drive"]),
    ("environment", &["work environment", "ideal", "culture"]),
    ("project", &["favorite project", "proud", "accomplishment"]),
    ("technical", &["problem", "challenge", "engineering"]),
    ("hobby", &["hobbies", "enjoys", "interests", "free time", "fun"]),
    ("hobbies", &["hobby", "enjoys", "interests", "free time", "fun"]),
    ("free time", &["hobbies", "enjoys", "weekend", "fun"]),
    (
        "personality",
        &["communication style", "humor", "mannerisms", "phrases", "values"],
    ),
    ("opinion", &["opinions", "hot takes", "pet peeves", "views", "beliefs"]),
    ("talk", &["communication style", "phrases", "mannerisms", "slang"]),
    ("communicat", &["communication style", "phrases", "mannerisms", "humor"]),
    ("experience", &["work", "job", "role", "position", "employment"]),
    ("skill", &["skills", "languages", "technologies", "proficient", "expertise"]),
    ("family", &["sister", "brother", "mom", "dad", "parents"]),
    ("friend", &["friends", "buddies", "crew"]),
];

/// Append related terms for every expansion key found in `query`.
///
/// Returns the query unchanged when no key matches.
pub fn expand(query: &str) -> String {
    let lowered = query.to_lowercase();
    let mut expanded = query.to_string();
    for (key, terms) in EXPANSIONS {
        if lowered.contains(key) {
            for term in *terms {
                expanded.push(' ');
                expanded.push_str(term);
            }
        }
    }
    expanded
}
