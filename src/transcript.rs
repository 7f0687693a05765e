//! Chat transcript rendered by the UI.
//!
//! The transcript is the render-side collaborator of the realtime client:
//! it receives the accumulated reply and completion flag for each turn and
//! keeps exactly one bot entry per turn, replacing its text as tokens
//! stream in.

use serde::Serialize;

/// Greeting shown before the first turn.
pub const WELCOME_MESSAGE: &str = "Welcome! How can I help you today?";

/// Who said it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The person typing.
    User,
    /// The tutor backend.
    Bot,
}

/// One rendered chat bubble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Author of the entry.
    pub speaker: Speaker,
    /// Entry text.
    pub text: String,
}

/// Ordered list of chat entries.
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    entries: Vec<Entry>,
    /// Whether the last entry is the bot reply of the current turn.
    bot_turn_open: bool,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    /// Creates a transcript holding the welcome greeting.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: vec![Entry {
                speaker: Speaker::Bot,
                text: WELCOME_MESSAGE.to_string(),
            }],
            bot_turn_open: false,
        }
    }

    /// Records a user message, starting a new turn.
    ///
    /// Blank input is ignored and returns `false`.
    pub fn push_user(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        self.entries.push(Entry {
            speaker: Speaker::User,
            text: text.to_string(),
        });
        self.bot_turn_open = false;
        true
    }

    /// Folds the client's accumulated reply into the transcript.
    ///
    /// The first non-empty reply of a turn opens a bot entry; later calls
    /// replace its text. Once `complete` is seen the entry is sealed until
    /// the next user message.
    pub fn apply_reply(&mut self, accumulated: &str, complete: bool) {
        if accumulated.is_empty() {
            return;
        }
        let extend = self.bot_turn_open
            && self
                .entries
                .last()
                .is_some_and(|e| e.speaker == Speaker::Bot);
        if extend && let Some(last) = self.entries.last_mut() {
            accumulated.clone_into(&mut last.text);
        } else {
            self.entries.push(Entry {
                speaker: Speaker::Bot,
                text: accumulated.to_string(),
            });
            self.bot_turn_open = true;
        }
        if complete {
            self.bot_turn_open = false;
        }
    }

    /// Adds a system-authored bot note, e.g. an upload confirmation.
    pub fn push_bot_note(&mut self, text: impl Into<String>) {
        self.entries.push(Entry {
            speaker: Speaker::Bot,
            text: text.into(),
        });
        self.bot_turn_open = false;
    }

    /// Entries in display order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

/// Splits a bot reply into bullet items when it reads as a list.
///
/// A reply is a list when at least `max(2, lines - 1)` of its non-empty
/// lines start with `*`, `•` or `-` followed by whitespace. List items come
/// back without their markers (non-bullet lines are dropped); anything else
/// comes back as one element holding the original text.
#[must_use]
pub fn format_bot_message(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let bullets: Vec<&str> = lines.iter().filter_map(|l| strip_bullet(l)).collect();

    if !bullets.is_empty() && bullets.len() >= 2usize.max(lines.len().saturating_sub(1)) {
        bullets.into_iter().map(str::to_string).collect()
    } else {
        vec![text.to_string()]
    }
}

fn strip_bullet(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let rest = trimmed
        .strip_prefix('*')
        .or_else(|| trimmed.strip_prefix('•'))
        .or_else(|| trimmed.strip_prefix('-'))?;
    rest.starts_with(char::is_whitespace).then(|| rest.trim_start())
}
