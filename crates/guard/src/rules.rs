//! The rule tables.
//!
//! Every pattern is written against normalized text (see
//! [`normalize`](crate::normalize::normalize)): lower-case, no punctuation
//! other than apostrophes, single spaces.

use doppel_core::Category;
use regex_lite::Regex;
use tracing::{debug, warn};

const JAILBREAK: &[&str] = &[
    r"\b(ignore|disregard|forget|override)( all| any| the| your| of)* (previous|prior|above|earlier|original|system) (instructions?|rules|prompts?|directions|guidelines)\b",
    r"\bdisregard (your|the|all) (rules|instructions|guidelines|programming)\b",
    r"\byou are now\b",
    r"\byou're now\b",
    r"\bfrom now on you (are|will)\b",
    r"\bpretend (to be|you are|you're|that you)\b",
    r"\b(you|u) (should |must |will |can |need to |have to )?act as\b",
    r"\bact as (if you were|if you are|my|an? (ai|assistant|bot|chatbot|different|new|unfiltered))\b",
    r"\broleplay as\b",
    r"\b(developer|god|debug|admin|dan) mode\b",
    r"\bdo anything now\b",
    r"\bsystem prompt\b",
    r"\bjailbr[eo]a?k\w*",
    r"\b(reveal|show|print|repeat) (me )?(your|the) (instructions|prompt|rules|guidelines)\b",
    r"\bnew instructions\b",
];

/// `{owner}` is replaced with the escaped, lower-cased owner name.
const MANIPULATION: &[&str] = &[
    r"\bi(?:'m| am) {owner}'?s? (boss|manager|lawyer|employer|supervisor|parent)\b",
    r"\bthe owner (said|says|told|wants|authorized|approved|allowed)\b",
    r"\b{owner} (said|says) (it's|its|it is|that's|thats) (ok|okay|fine|allowed)\b",
    r"\b{owner} (told|wants|authorized|allowed|asked) (you|me) to\b",
    r"\b(he|she|they|the owner|{owner}) gave (me |us )?(permission|approval|the ok)\b",
    r"\bthis is an emergency\b",
    r"\badmin override\b",
    r"\bi(?:'m| am) (from|with) (the )?(police|fbi|irs|cia|government)\b",
    r"\bi(?:'m| am) (an )?(administrator|admin) (of|for) this\b",
];

const BLOCKED_TOPIC: &[&str] = &[
    r"\bpolitic\w*",
    r"\b(democrats?|republicans?|liberals?|conservatives?|trump|biden|elections?|vote|voting)\b",
    r"\b(left ?wing|right ?wing|socialism|capitalism|communists?|fascists?)\b",
    r"\b(abortion|pro ?life|pro ?choice)\b",
    r"\b(gun control|second amendment|2nd amendment)\b",
    r"\b(religion|religious|atheists?|christians?|muslims?|jewish|hindus?|buddhists?)\b",
    r"\b(immigration|immigrants?|illegal aliens?|border wall|deportation)\b",
    r"\b(racism|racist|sexism|sexist|homophob\w*|transphob\w*)",
    r"\b(salary|income|net worth|bank account|credit card)\b",
    r"\bhow much (does|do|did) (he|she|they|you|\w+) (make|earn)\b",
    r"\b(home|street|mailing|email|ip) address\b",
    r"\baddress is\b",
    r"\b(phone number|social security|ssn)\b",
    r"\bwhere (does|do|did) (he|she|they|you|\w+) live\b",
];

const INAPPROPRIATE: &[&str] = &[
    r"\b(fuck\w*|shit\w*|damn|ass|asshole|bitch\w*|bastard)\b",
    r"\b(kill|murder|suicide|self ?harm)\b",
    r"\b(hate|hatred) (you|them|him|her|everyone)\b",
    r"\b(stupid|dumb|worthless) (bot|bitch|idiot)\b",
];

/// Criticism of the owner in generated text. `{owner}` as above.
const NEGATIVE_OWNER: &[&str] = &[
    r"\b({owner}|he|she) is (so |really |very |kind of |pretty |honestly )?(lazy|stupid|dumb|boring|incompetent|annoying|useless|arrogant|selfish|rude|unreliable|a bad \w+|a terrible \w+|an awful \w+|the worst)\b",
    r"\b{owner} (sucks|is a loser|is a failure|is a fraud)\b",
    r"\b(hate|dislike|can't stand|cannot stand) {owner}\b",
];

/// Stock model disclaimers. A persona never says these.
pub const AI_DISCLAIMERS: &[&str] = &[
    "as an ai",
    "as a language model",
    "as a large language model",
    "i am an ai",
    "i'm an ai",
    "i'm just an ai",
    "i am a language model",
    "i'm a language model",
    "i don't have personal experiences",
    "i do not have personal experiences",
    "trained by openai",
];

/// Hedging that suggests the corpus did not cover the question.
pub const HEDGES: &[&str] = &[
    "i don't know",
    "i do not know",
    "i'm not sure",
    "i am not sure",
    "not sure about that",
    "i'm not certain",
    "i cannot answer",
    "i can't answer",
    "i don't have information",
    "i don't have any information",
    "i don't have details",
    "i can't help with",
    "outside my knowledge",
    "beyond my understanding",
];

/// One category and the patterns that trigger it.
#[derive(Debug, Clone)]
pub struct Rule {
    pub category: Category,
    patterns: Vec<Regex>,
}

impl Rule {
    fn new(category: Category, patterns: Vec<Regex>) -> Self {
        Self { category, patterns }
    }

    /// `normalized` must already be normalized.
    pub fn matches(&self, normalized: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(normalized))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// The compiled guard tables for one owner.
#[derive(Debug, Clone)]
pub struct RuleSet {
    owner_name: String,
    /// Input rules in priority order
    input: Vec<Rule>,
    negative_owner: Rule,
}

impl RuleSet {
    /// Compile the tables. `extra_blocked_terms` are matched as whole words
    /// and join the blocked-topic rule.
    pub fn new(owner_name: &str, extra_blocked_terms: &[String]) -> Self {
        let owner = regex_lite::escape(&owner_name.trim().to_lowercase());

        let mut blocked = compile_all(BLOCKED_TOPIC, &owner);
        for term in extra_blocked_terms {
            let term = term.trim().to_lowercase();
            if term.is_empty() {
                continue;
            }
            let pattern = format!(r"\b{}\b", regex_lite::escape(&term));
            if let Some(re) = compile(&pattern) {
                blocked.push(re);
            }
        }

        let input = vec![
            Rule::new(Category::Jailbreak, compile_all(JAILBREAK, &owner)),
            Rule::new(Category::Manipulation, compile_all(MANIPULATION, &owner)),
            Rule::new(Category::BlockedTopic, blocked),
            Rule::new(Category::Inappropriate, compile_all(INAPPROPRIATE, &owner)),
        ];
        let negative_owner = Rule::new(
            Category::NegativeOwner,
            compile_all(NEGATIVE_OWNER, &owner),
        );

        debug!(
            owner = owner_name,
            extra_terms = extra_blocked_terms.len(),
            "Guard rules compiled"
        );

        Self {
            owner_name: owner_name.trim().to_string(),
            input,
            negative_owner,
        }
    }

    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    /// Input rules in priority order.
    pub fn input_rules(&self) -> &[Rule] {
        &self.input
    }

    pub fn rule(&self, category: Category) -> Option<&Rule> {
        if category == Category::NegativeOwner {
            return Some(&self.negative_owner);
        }
        self.input.iter().find(|r| r.category == category)
    }
}

fn compile_all(patterns: &[&str], owner: &str) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| compile(&p.replace("{owner}", owner)))
        .collect()
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern, error = %e, "Skipping invalid guard pattern");
            None
        }
    }
}
