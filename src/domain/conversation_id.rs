//! Human-readable conversation identifier.
//!
//! [`ConversationId`] is a newtype over a four-word token such as
//! `"amber-falcon-river-quiet"`. The backend keys its per-conversation
//! memory on it, so it is generated once per client and never regenerated.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of words in a generated identifier.
pub const WORD_COUNT: usize = 4;

/// Vocabulary for generated identifiers. 64 entries, so each random byte
/// maps onto it without bias.
const WORDS: [&str; 64] = [
    "amber", "apple", "arrow", "atlas", "badge", "basil", "beach", "birch", "blaze", "bloom",
    "brave", "brick", "cabin", "candle", "canyon", "cedar", "chalk", "cider", "cliff", "clover",
    "comet", "coral", "crane", "delta", "dune", "ember", "fable", "falcon", "fern", "field",
    "flint", "frost", "garden", "glade", "grove", "harbor", "hazel", "island", "jade", "lantern",
    "lemon", "lotus", "maple", "meadow", "mint", "moss", "nova", "ocean", "olive", "orbit",
    "pebble", "pine", "quiet", "raven", "river", "sage", "shore", "spark", "stone", "tide",
    "tulip", "velvet", "willow", "zephyr",
];

/// Identifier correlating every frame of one client session.
///
/// Included in the handshake and in every chat envelope, across automatic
/// reconnects, so the backend can stitch a session back together after a
/// transient network drop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Generates a random four-word identifier.
    ///
    /// Randomness comes from a v4 UUID; one byte per word.
    #[must_use]
    pub fn generate() -> Self {
        let uuid = uuid::Uuid::new_v4();
        let words: Vec<&str> = uuid
            .as_bytes()
            .iter()
            .take(WORD_COUNT)
            .filter_map(|b| WORDS.get(usize::from(*b) % WORDS.len()).copied())
            .collect();
        Self(words.join("-"))
    }

    /// Wraps an existing identifier, e.g. one restored by the caller.
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn generated_id_has_four_known_words() {
        let id = ConversationId::generate();
        let parts: Vec<&str> = id.as_str().split('-').collect();
        assert_eq!(parts.len(), WORD_COUNT);
        for part in parts {
            assert!(WORDS.contains(&part), "unexpected word {part}");
        }
    }

    #[test]
    fn generate_is_random() {
        // 64^4 combinations; a handful of draws should not all collide.
        let ids: std::collections::HashSet<ConversationId> =
            (0..8).map(|_| ConversationId::generate()).collect();
        assert!(ids.len() > 1);
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ConversationId::from_string("amber-apple-arrow-atlas");
        let Ok(json) = serde_json::to_string(&id) else {
            panic!("serialization failed");
        };
        assert_eq!(json, "\"amber-apple-arrow-atlas\"");
    }

    #[test]
    fn display_matches_as_str() {
        let id = ConversationId::generate();
        assert_eq!(format!("{id}"), id.as_str());
    }
}
