//! Notifications published by the realtime client.
//!
//! Every state change the UI cares about emits a [`ClientEvent`] through
//! the [`super::EventBus`]. The same information is also available
//! synchronously from the client's snapshot getters.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ConnectionState;

/// Event emitted by the realtime client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// The connection lifecycle moved.
    StateChanged {
        /// New state.
        state: ConnectionState,
        /// Transition timestamp.
        timestamp: DateTime<Utc>,
    },

    /// `send` was called while not open; the payload waits in the queue.
    MessageQueued {
        /// Queue length after the push.
        queued: usize,
        /// Enqueue timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A user message was handed to the transport.
    MessageSent {
        /// The user text.
        message: String,
        /// `true` if it had been waiting in the queue.
        from_queue: bool,
        /// Send timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A partial bot token arrived.
    ///
    /// Carries only the new piece; the accumulated reply is
    /// `RealtimeClient::response`.
    Token {
        /// The token just received.
        delta: String,
        /// Receive timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The bot finished its turn.
    TurnCompleted {
        /// Full reply text.
        text: String,
        /// Receive timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The side-channel trigger fired.
    EasterEgg {
        /// Receive timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An inbound frame could not be decoded and was dropped.
    FrameDropped {
        /// Decoder error text.
        reason: String,
        /// Total frames dropped by this client so far.
        total: u64,
        /// Receive timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl ClientEvent {
    /// Returns the event timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> &DateTime<Utc> {
        match self {
            Self::StateChanged { timestamp, .. }
            | Self::MessageQueued { timestamp, .. }
            | Self::MessageSent { timestamp, .. }
            | Self::Token { timestamp, .. }
            | Self::TurnCompleted { timestamp, .. }
            | Self::EasterEgg { timestamp }
            | Self::FrameDropped { timestamp, .. } => timestamp,
        }
    }

    /// Returns the snake_case event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StateChanged { .. } => "state_changed",
            Self::MessageQueued { .. } => "message_queued",
            Self::MessageSent { .. } => "message_sent",
            Self::Token { .. } => "token",
            Self::TurnCompleted { .. } => "turn_completed",
            Self::EasterEgg { .. } => "easter_egg",
            Self::FrameDropped { .. } => "frame_dropped",
        }
    }
}
