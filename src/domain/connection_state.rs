//! Lifecycle states of the realtime connection.

use std::fmt;

use serde::Serialize;

/// Why the client stopped reconnecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// The caller invoked `close()`.
    ClosedByCaller,
    /// Every reconnect attempt allowed by the retry cap failed.
    RetriesExhausted,
}

/// Connection lifecycle.
///
/// ```text
/// Idle ─connect─▶ Connecting ─open─▶ Open
///                    ▲  │              │ transport closed
///                    │  └──failed──┐   ▼
///                    └─delay─── Retrying ─cap reached─▶ Terminal
/// ```
///
/// `close()` moves any non-terminal state straight to `Terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    /// Constructed, `connect` not yet called.
    Idle,
    /// A transport handshake is in flight.
    Connecting,
    /// The transport is open; sends go straight out.
    Open,
    /// Closed by the remote side or the network; waiting out the retry delay.
    Retrying {
        /// 1-based reconnect attempt that will run when the delay elapses.
        attempt: u32,
    },
    /// No further automatic reconnection.
    Terminal {
        /// What ended the connection.
        reason: TerminalReason,
    },
}

impl ConnectionState {
    /// Returns `true` while the transport is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` once reconnection has stopped for good.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal { .. })
    }

    /// Returns `true` while a connection attempt is in flight or scheduled.
    #[must_use]
    pub const fn is_reconnecting(&self) -> bool {
        matches!(self, Self::Connecting | Self::Retrying { .. })
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Connecting => f.write_str("connecting"),
            Self::Open => f.write_str("open"),
            Self::Retrying { attempt } => write!(f, "retrying (attempt {attempt})"),
            Self::Terminal {
                reason: TerminalReason::ClosedByCaller,
            } => f.write_str("closed"),
            Self::Terminal {
                reason: TerminalReason::RetriesExhausted,
            } => f.write_str("connection lost"),
        }
    }
}
