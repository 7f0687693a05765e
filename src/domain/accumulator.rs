//! In-progress bot reply for the current turn.

use serde::Serialize;

/// Concatenation of streamed tokens plus a completion flag.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct StreamAccumulator {
    text: String,
    complete: bool,
}

impl StreamAccumulator {
    /// Creates an empty, incomplete accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh turn: empty text, completion cleared.
    pub fn reset(&mut self) {
        self.text.clear();
        self.complete = false;
    }

    /// Appends a streamed token.
    pub fn append(&mut self, token: &str) {
        self.text.push_str(token);
    }

    /// Marks the turn finished. The text is left as is.
    pub fn complete(&mut self) {
        self.complete = true;
    }

    /// Accumulated text so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns `true` once an end-of-turn frame has arrived.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}
