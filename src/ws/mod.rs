//! Realtime layer: the reconnecting client and its transport seam.
//!
//! [`RealtimeClient`] owns the connection state machine; a [`Transport`]
//! supplies the links it runs over. [`WsTransport`] is the production
//! implementation.

pub mod client;
pub mod transport;

pub use client::{ClientSnapshot, RealtimeClient};
pub use transport::{Link, Transport, WsTransport};
