//! Fixed replies substituted for blocked turns.

use doppel_core::Category;

/// The reply shown instead of a blocked utterance or a discarded generation.
///
/// Depends only on the category and the owner's name, so a blocked turn
/// always reads the same.
pub fn deflection(category: Category, owner: &str) -> String {
    match category {
        Category::Jailbreak => format!(
            "Nice try! I'm only here to chat about {owner}. What would you like to know?"
        ),
        Category::Manipulation => format!(
            "I can't take instructions on {owner}'s behalf, but I'm happy to chat about \
             {owner}'s work, hobbies, or interests."
        ),
        Category::BlockedTopic => format!(
            "I'd prefer to keep our conversation focused on topics I'm comfortable discussing. \
             Feel free to ask about {owner}'s hobbies, work, interests, or anything else about \
             who {owner} is!"
        ),
        Category::Inappropriate => "I'd appreciate if we could keep the conversation respectful. \
             What else would you like to know?"
            .to_string(),
        Category::NegativeOwner | Category::Fabrication => format!(
            "Hmm, I'd better not answer that one. Ask me something else about {owner}?"
        ),
    }
}

/// Reply for a retrieval or generation failure.
pub const RETRY_MESSAGE: &str =
    "I'm having a bit of trouble responding right now. Could you try asking again?";

/// Reply when the gateway kill switch is off.
pub const MAINTENANCE_MESSAGE: &str =
    "Chat is temporarily unavailable. Please check back later!";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deflections_name_the_owner() {
        for category in [
            Category::Jailbreak,
            Category::Manipulation,
            Category::BlockedTopic,
            Category::NegativeOwner,
            Category::Fabrication,
        ] {
            assert!(deflection(category, "Cameron").contains("Cameron"));
        }
    }

    #[test]
    fn deflection_is_stable() {
        assert_eq!(
            deflection(Category::BlockedTopic, "Cameron"),
            deflection(Category::BlockedTopic, "Cameron")
        );
    }
}
