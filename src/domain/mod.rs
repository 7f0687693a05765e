//! Domain layer: identifiers, wire envelopes, and client-side state.
//!
//! These types carry no I/O. The realtime client in [`crate::ws`] owns one
//! of each and mutates them behind a single lock.

pub mod accumulator;
pub mod client_event;
pub mod connection_state;
pub mod conversation_id;
pub mod envelope;
pub mod event_bus;
pub mod outbound_queue;

pub use accumulator::StreamAccumulator;
pub use client_event::ClientEvent;
pub use connection_state::{ConnectionState, TerminalReason};
pub use conversation_id::ConversationId;
pub use envelope::{InboundFrame, OutboundEnvelope};
pub use event_bus::EventBus;
pub use outbound_queue::OutboundQueue;
