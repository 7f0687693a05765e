//! # tutor-link
//!
//! Reconnecting WebSocket chat client for the AI tutor backend.
//!
//! The crate keeps one resilient, ordered, streaming channel open to the
//! chat endpoint on behalf of a UI: messages sent while offline are queued
//! and flushed in order on reconnect, streamed reply tokens are accumulated
//! per turn, and connection churn surfaces only as state.
//!
//! ## Architecture
//!
//! ```text
//! UI (terminal binary, Transcript)
//!     │
//!     ├── RealtimeClient (ws/)      connect / send / close, retry policy
//!     │       │
//!     │       ├── ClientState       queue, accumulator, lifecycle (domain/)
//!     │       ├── EventBus          ClientEvent broadcast (domain/)
//!     │       └── Transport         WsTransport over tokio-tungstenite
//!     │
//!     └── Uploader (service/)       multipart PDF upload
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod transcript;
pub mod ws;
