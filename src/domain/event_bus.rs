//! Fan-out of client events to UI observers.
//!
//! The realtime client reports every observable change through
//! [`EventBus::emit`]. Events are built lazily: a client nobody watches
//! (tests, headless use) never allocates payloads.

use tokio::sync::broadcast;

use super::ClientEvent;

/// Broadcast bus for [`ClientEvent`]s.
///
/// Observers that fall more than `capacity` events behind get
/// [`broadcast::error::RecvError::Lagged`] and skip ahead; the client's
/// snapshot getters stay authoritative, so a lagging UI re-reads state
/// instead of replaying.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per observer.
    ///
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Builds and broadcasts an event if anyone is subscribed.
    ///
    /// `build` is not called when there are no observers.
    pub fn emit(&self, build: impl FnOnce() -> ClientEvent) {
        if self.sender.receiver_count() == 0 {
            return;
        }
        // An observer may unsubscribe between the check and the send.
        let _ = self.sender.send(build());
    }

    /// Registers a new observer. It sees events emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.sender.subscribe()
    }
}
