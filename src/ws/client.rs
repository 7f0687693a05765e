//! Reconnecting realtime chat client.
//!
//! [`RealtimeClient`] keeps one WebSocket link to the chat backend alive on
//! behalf of a UI. Callers see three synchronous operations (`connect`,
//! `send`, `close`) plus observers; connection churn is absorbed here.
//!
//! ## Model
//!
//! All mutable state sits in one [`ClientState`] behind a single
//! `parking_lot::Mutex` that is never held across an `.await`. Work that has
//! to wait (a connection attempt, the retry delay, reading a link) runs in
//! spawned tasks that re-enter through the lock:
//!
//! - the latest attempt task's abort handle is kept so `close()` cancels a
//!   pending retry deterministically;
//! - each attempt and its link carry the `generation` they were started
//!   under; callbacks from an older generation are ignored;
//! - `attempts_in_flight` and `open_links` count transports that may still
//!   be alive, including ones from cancelled attempts. A `connect()` after
//!   `close()` waits until both are zero.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::task::AbortHandle;

use super::transport::{Link, Transport, WsTransport};
use crate::config::ClientConfig;
use crate::domain::{
    ClientEvent, ConnectionState, ConversationId, EventBus, InboundFrame, OutboundEnvelope,
    OutboundQueue, StreamAccumulator, TerminalReason,
};

/// Point-in-time view of the client, for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSnapshot {
    /// Session identifier.
    pub conversation_id: ConversationId,
    /// Lifecycle state.
    pub state: ConnectionState,
    /// Accumulated bot reply for the current turn.
    pub response: String,
    /// Whether the current turn has ended.
    pub response_complete: bool,
    /// Whether the side-channel trigger has fired.
    pub easter_egg: bool,
    /// Messages waiting for the link to open, in delivery order.
    pub queued: Vec<String>,
    /// Consecutive reconnect attempts since the link was last open.
    pub retry_count: u32,
    /// Inbound frames dropped as undecodable.
    pub dropped_frames: u64,
}

/// Handle to one realtime connection.
///
/// Dropping the handle closes the connection.
#[derive(Debug)]
pub struct RealtimeClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    conversation_id: ConversationId,
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    events: EventBus,
    state: Mutex<ClientState>,
}

#[derive(Debug)]
struct ClientState {
    lifecycle: ConnectionState,
    url: Option<String>,
    retries: u32,
    queue: OutboundQueue,
    accumulator: StreamAccumulator,
    easter_egg: bool,
    dropped_frames: u64,
    attempts: u64,
    /// Write side of the open link.
    sink: Option<mpsc::UnboundedSender<String>>,
    generation: u64,
    /// Attempt tasks not yet dropped, aborted ones included.
    attempts_in_flight: u32,
    /// Links handed out by the transport whose read side has not ended.
    open_links: u32,
    restart_pending: bool,
    /// Latest attempt task: retry delay, then handshake.
    pending: Option<AbortHandle>,
}

impl ClientState {
    fn new() -> Self {
        Self {
            lifecycle: ConnectionState::Idle,
            url: None,
            retries: 0,
            queue: OutboundQueue::new(),
            accumulator: StreamAccumulator::new(),
            easter_egg: false,
            dropped_frames: 0,
            attempts: 0,
            sink: None,
            generation: 0,
            attempts_in_flight: 0,
            open_links: 0,
            restart_pending: false,
            pending: None,
        }
    }

    /// No transport from any generation can still be alive.
    const fn transport_released(&self) -> bool {
        self.attempts_in_flight == 0 && self.open_links == 0
    }
}

/// Lives inside an attempt task and reports its end, including abort.
struct AttemptGuard {
    inner: Arc<Inner>,
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        // May run while the state lock is held; re-enter through a task.
        let inner = Arc::clone(&self.inner);
        if let Ok(runtime) = Handle::try_current() {
            runtime.spawn(async move { inner.attempt_finished() });
        }
    }
}

impl RealtimeClient {
    /// Creates a client that talks WebSocket via `tokio-tungstenite`.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(WsTransport::new()))
    }

    /// Creates a client over a custom transport.
    ///
    /// The conversation identifier is generated here, once.
    #[must_use]
    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let conversation_id = ConversationId::generate();
        tracing::debug!(%conversation_id, "realtime client created");
        Self {
            inner: Arc::new(Inner {
                conversation_id,
                config: config.clone(),
                transport,
                events: EventBus::new(config.event_capacity),
                state: Mutex::new(ClientState::new()),
            }),
        }
    }

    /// Starts connecting to `url`.
    ///
    /// A no-op while connecting, open, or retrying. From `Idle` or
    /// `Terminal` it starts over with a fresh retry budget. Failures never
    /// surface here; they drive the retry policy.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self, url: impl Into<String>) {
        self.inner.connect(url.into());
    }

    /// Sends one user message.
    ///
    /// Transmitted immediately when open, otherwise queued and flushed in
    /// order after the next handshake. Either way the accumulator is reset
    /// for the new turn. Never blocks.
    pub fn send(&self, payload: impl Into<String>) {
        self.inner.send(payload.into());
    }

    /// Closes the connection and stops reconnecting.
    ///
    /// Cancels a pending retry. Queued messages are kept and go out if
    /// `connect` is called again.
    pub fn close(&self) {
        self.inner.close();
    }

    /// Subscribes to client events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    /// Session identifier sent on every frame.
    #[must_use]
    pub fn conversation_id(&self) -> &ConversationId {
        &self.inner.conversation_id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.state.lock().lifecycle
    }

    /// Returns `true` while the link is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    /// Accumulated bot reply for the current turn.
    #[must_use]
    pub fn response(&self) -> String {
        self.inner.state.lock().accumulator.text().to_owned()
    }

    /// Whether the bot has finished the current turn.
    #[must_use]
    pub fn is_response_complete(&self) -> bool {
        self.inner.state.lock().accumulator.is_complete()
    }

    /// Whether the side-channel trigger has fired.
    #[must_use]
    pub fn easter_egg(&self) -> bool {
        self.inner.state.lock().easter_egg
    }

    /// Returns the trigger flag and clears it.
    pub fn take_easter_egg(&self) -> bool {
        std::mem::take(&mut self.inner.state.lock().easter_egg)
    }

    /// Messages waiting for the link, in delivery order.
    #[must_use]
    pub fn queued(&self) -> Vec<String> {
        self.inner.state.lock().queue.snapshot()
    }

    /// Consecutive reconnect attempts since the link was last open.
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.inner.state.lock().retries
    }

    /// Inbound frames dropped as undecodable.
    #[must_use]
    pub fn dropped_frames(&self) -> u64 {
        self.inner.state.lock().dropped_frames
    }

    /// Transport handshakes started over the client's lifetime.
    #[must_use]
    pub fn connection_attempts(&self) -> u64 {
        self.inner.state.lock().attempts
    }

    /// Everything above in one consistent read.
    #[must_use]
    pub fn snapshot(&self) -> ClientSnapshot {
        let st = self.inner.state.lock();
        ClientSnapshot {
            conversation_id: self.inner.conversation_id.clone(),
            state: st.lifecycle,
            response: st.accumulator.text().to_owned(),
            response_complete: st.accumulator.is_complete(),
            easter_egg: st.easter_egg,
            queued: st.queue.snapshot(),
            retry_count: st.retries,
            dropped_frames: st.dropped_frames,
        }
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        self.inner.close();
    }
}

impl Inner {
    fn set_state(&self, st: &mut ClientState, state: ConnectionState) {
        if st.lifecycle == state {
            return;
        }
        tracing::debug!(
            conversation_id = %self.conversation_id,
            from = %st.lifecycle,
            to = %state,
            "connection state changed"
        );
        st.lifecycle = state;
        self.events.emit(|| ClientEvent::StateChanged {
            state,
            timestamp: Utc::now(),
        });
    }

    /// Hands one chat envelope to the link. Returns `false` if the link is
    /// gone.
    fn transmit(&self, sink: &mpsc::UnboundedSender<String>, payload: &str) -> bool {
        match OutboundEnvelope::chat(&self.conversation_id, payload).to_json() {
            Ok(json) => sink.send(json).is_ok(),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode chat envelope");
                false
            }
        }
    }

    fn connect(self: &Arc<Self>, url: String) {
        let mut guard = self.state.lock();
        let st = &mut *guard;

        if !matches!(
            st.lifecycle,
            ConnectionState::Idle | ConnectionState::Terminal { .. }
        ) {
            tracing::debug!(state = %st.lifecycle, "connect ignored; connection already active");
            return;
        }

        tracing::info!(conversation_id = %self.conversation_id, %url, "connecting");
        st.url = Some(url);
        st.retries = 0;
        st.generation += 1;
        self.set_state(st, ConnectionState::Connecting);

        if st.transport_released() {
            self.spawn_attempt(st, None);
        } else {
            tracing::debug!(
                attempts_in_flight = st.attempts_in_flight,
                open_links = st.open_links,
                "previous transport still closing; connect deferred"
            );
            st.restart_pending = true;
        }
    }

    fn send(&self, payload: String) {
        let mut guard = self.state.lock();
        let st = &mut *guard;

        if st.lifecycle.is_open()
            && let Some(sink) = st.sink.as_ref()
            && self.transmit(sink, &payload)
        {
            st.accumulator.reset();
            self.events.emit(|| ClientEvent::MessageSent {
                message: payload,
                from_queue: false,
                timestamp: Utc::now(),
            });
            return;
        }

        tracing::debug!(state = %st.lifecycle, "link not open; queueing message");
        st.accumulator.reset();
        st.queue.push(payload);
        let queued = st.queue.len();
        self.events.emit(|| ClientEvent::MessageQueued {
            queued,
            timestamp: Utc::now(),
        });
    }

    fn close(&self) {
        let mut guard = self.state.lock();
        let st = &mut *guard;

        if st.lifecycle.is_terminal() {
            return;
        }

        st.generation += 1;
        st.restart_pending = false;
        if let Some(task) = st.pending.take() {
            task.abort();
        }
        if st.sink.take().is_some() {
            tracing::info!(conversation_id = %self.conversation_id, "closing connection");
        }
        self.set_state(
            st,
            ConnectionState::Terminal {
                reason: TerminalReason::ClosedByCaller,
            },
        );
    }

    /// Spawns the attempt task for the current generation, optionally after
    /// the retry delay.
    fn spawn_attempt(self: &Arc<Self>, st: &mut ClientState, delay: Option<Duration>) {
        let Some(url) = st.url.clone() else {
            return;
        };
        let Ok(runtime) = Handle::try_current() else {
            tracing::error!(%url, "no Tokio runtime; connection attempt not started");
            return;
        };
        let generation = st.generation;
        let inner = Arc::clone(self);
        let attempt = AttemptGuard {
            inner: Arc::clone(self),
        };
        st.attempts_in_flight += 1;

        let task = runtime.spawn(async move {
            let _attempt = attempt;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if !inner.begin_attempt(generation) {
                return;
            }
            match inner.transport.connect(&url).await {
                Ok(link) => inner.on_open(generation, link),
                Err(e) => {
                    tracing::warn!(error = %e, %url, "connection attempt failed");
                    inner.on_attempt_failed(generation);
                }
            }
        });
        st.pending = Some(task.abort_handle());
    }

    fn begin_attempt(&self, generation: u64) -> bool {
        let mut guard = self.state.lock();
        let st = &mut *guard;
        if st.generation != generation {
            return false;
        }
        st.attempts += 1;
        if matches!(st.lifecycle, ConnectionState::Retrying { .. }) {
            self.set_state(st, ConnectionState::Connecting);
        }
        true
    }

    fn on_open(self: &Arc<Self>, generation: u64, link: Link) {
        let Link { outgoing, incoming } = link;
        {
            let mut guard = self.state.lock();
            let st = &mut *guard;
            st.open_links += 1;

            if st.generation != generation || st.lifecycle != ConnectionState::Connecting {
                // The reader below still runs so the link is counted until
                // its transport finishes closing.
                tracing::debug!(generation, "discarding link from superseded attempt");
                drop(outgoing);
            } else {
                self.start_session(st, generation, outgoing);
            }
        }

        let inner = Arc::clone(self);
        tokio::spawn(inner.read_link(generation, incoming));
    }

    /// Handshake, queue flush, and the move to `Open`.
    fn start_session(
        &self,
        st: &mut ClientState,
        generation: u64,
        outgoing: mpsc::UnboundedSender<String>,
    ) {
        match OutboundEnvelope::handshake(&self.conversation_id).to_json() {
            Ok(json) => {
                if outgoing.send(json).is_err() {
                    tracing::warn!("link closed before handshake could be sent");
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to encode handshake"),
        }

        let mut flushed = Vec::new();
        st.queue.drain_into(|payload| {
            if self.transmit(&outgoing, payload) {
                flushed.push(payload.to_owned());
                true
            } else {
                false
            }
        });

        st.sink = Some(outgoing);
        st.retries = 0;
        st.pending = None;
        self.set_state(st, ConnectionState::Open);
        tracing::info!(
            conversation_id = %self.conversation_id,
            generation,
            flushed = flushed.len(),
            "connection open"
        );

        for message in flushed {
            self.events.emit(|| ClientEvent::MessageSent {
                message,
                from_queue: true,
                timestamp: Utc::now(),
            });
        }
    }

    async fn read_link(self: Arc<Self>, generation: u64, mut incoming: mpsc::UnboundedReceiver<String>) {
        while let Some(text) = incoming.recv().await {
            self.on_frame(generation, &text);
        }
        self.on_link_closed(generation);
    }

    fn on_frame(&self, generation: u64, text: &str) {
        let mut guard = self.state.lock();
        let st = &mut *guard;

        if st.generation != generation {
            return;
        }

        let frame = match InboundFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                st.dropped_frames += 1;
                let total = st.dropped_frames;
                tracing::warn!(error = %e, total, "dropping malformed frame");
                self.events.emit(|| ClientEvent::FrameDropped {
                    reason: e.to_string(),
                    total,
                    timestamp: Utc::now(),
                });
                return;
            }
        };

        if let Some(token) = frame.token() {
            st.accumulator.append(token);
            self.events.emit(|| ClientEvent::Token {
                delta: token.to_owned(),
                timestamp: Utc::now(),
            });
        }
        if frame.ends_turn() {
            st.accumulator.complete();
            let accumulator = &st.accumulator;
            self.events.emit(|| ClientEvent::TurnCompleted {
                text: accumulator.text().to_owned(),
                timestamp: Utc::now(),
            });
        }
        if frame.triggers_easter_egg() {
            st.easter_egg = true;
            self.events.emit(|| ClientEvent::EasterEgg {
                timestamp: Utc::now(),
            });
        }
    }

    fn on_attempt_failed(self: &Arc<Self>, generation: u64) {
        let mut guard = self.state.lock();
        let st = &mut *guard;
        if st.generation == generation && st.lifecycle == ConnectionState::Connecting {
            self.schedule_retry(st);
        }
    }

    /// The transport behind a link has fully closed.
    fn on_link_closed(self: &Arc<Self>, generation: u64) {
        let mut guard = self.state.lock();
        let st = &mut *guard;
        st.open_links = st.open_links.saturating_sub(1);

        if st.generation == generation && st.lifecycle.is_open() {
            st.sink = None;
            tracing::info!(conversation_id = %self.conversation_id, "connection closed");
            self.schedule_retry(st);
        }
        self.resume_deferred(st);
    }

    fn attempt_finished(self: &Arc<Self>) {
        let mut guard = self.state.lock();
        let st = &mut *guard;
        st.attempts_in_flight = st.attempts_in_flight.saturating_sub(1);
        self.resume_deferred(st);
    }

    /// Starts a connect that was waiting for the previous transport.
    fn resume_deferred(self: &Arc<Self>, st: &mut ClientState) {
        if st.restart_pending && st.transport_released() {
            st.restart_pending = false;
            tracing::debug!("previous transport released; starting deferred connect");
            self.spawn_attempt(st, None);
        }
    }

    fn schedule_retry(self: &Arc<Self>, st: &mut ClientState) {
        let max_retries = self.config.max_retries;
        if st.retries >= max_retries {
            tracing::warn!(max_retries, "max reconnection attempts reached; stopping");
            st.pending = None;
            self.set_state(
                st,
                ConnectionState::Terminal {
                    reason: TerminalReason::RetriesExhausted,
                },
            );
            return;
        }

        st.retries += 1;
        let attempt = st.retries;
        tracing::info!(
            attempt,
            max_retries,
            delay = ?self.config.retry_delay,
            "reconnecting"
        );
        self.set_state(st, ConnectionState::Retrying { attempt });
        self.spawn_attempt(st, Some(self.config.retry_delay));
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use futures_util::future::BoxFuture;

    #[derive(Debug)]
    struct Unreachable;

    /// Dials forever.
    #[derive(Debug)]
    struct Hanging;

    impl Transport for Hanging {
        fn connect(&self, _url: &str) -> BoxFuture<'static, Result<Link, TransportError>> {
            Box::pin(futures_util::future::pending())
        }
    }

    impl Transport for Unreachable {
        fn connect(&self, _url: &str) -> BoxFuture<'static, Result<Link, TransportError>> {
            Box::pin(async { Err(TransportError::Connect("refused".to_string())) })
        }
    }

    fn client() -> RealtimeClient {
        RealtimeClient::with_transport(&ClientConfig::default(), Arc::new(Unreachable))
    }

    #[test]
    fn starts_idle_with_fixed_conversation_id() {
        let client = client();
        assert_eq!(client.state(), ConnectionState::Idle);
        let id = client.conversation_id().clone();
        assert_eq!(client.snapshot().conversation_id, id);
    }

    #[test]
    fn send_before_connect_queues_in_order() {
        let client = client();
        client.send("one");
        client.send("two");
        assert_eq!(client.queued(), ["one", "two"]);
        assert!(!client.is_open());
    }

    #[test]
    fn close_from_idle_is_terminal_and_idempotent() {
        let client = client();
        let mut rx = client.subscribe();

        client.close();
        client.close();

        assert_eq!(
            client.state(),
            ConnectionState::Terminal {
                reason: TerminalReason::ClosedByCaller
            }
        );
        let Ok(ClientEvent::StateChanged { .. }) = rx.try_recv() else {
            panic!("expected one state change");
        };
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn easter_egg_flag_can_be_taken() {
        let client = client();
        client.inner.state.lock().easter_egg = true;
        assert!(client.take_easter_egg());
        assert!(!client.easter_egg());
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_server_exhausts_retries() {
        let config = ClientConfig {
            max_retries: 2,
            ..ClientConfig::default()
        };
        let client = RealtimeClient::with_transport(&config, Arc::new(Unreachable));
        let mut rx = client.subscribe();
        client.connect("ws://nowhere/ws");

        loop {
            let Ok(event) = rx.recv().await else {
                panic!("event bus closed");
            };
            if let ClientEvent::StateChanged {
                state: ConnectionState::Terminal { reason },
                ..
            } = event
            {
                assert_eq!(reason, TerminalReason::RetriesExhausted);
                break;
            }
        }
        assert_eq!(client.connection_attempts(), 3);
        assert_eq!(client.retry_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn link_from_cancelled_attempt_delays_restart_until_closed() {
        let client = RealtimeClient::with_transport(&ClientConfig::default(), Arc::new(Hanging));
        client.connect("ws://slow/ws");
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(client.connection_attempts(), 1);

        client.close();
        client.connect("ws://slow/ws");

        // The first attempt's dial completed just as it was cancelled.
        let (outgoing, mut server_rx) = mpsc::unbounded_channel();
        let (server_tx, incoming) = mpsc::unbounded_channel();
        client.inner.on_open(1, Link { outgoing, incoming });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(client.connection_attempts(), 1);
        assert!(server_rx.recv().await.is_none(), "late link gets no handshake");
        assert_eq!(client.state(), ConnectionState::Connecting);

        drop(server_tx);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(client.connection_attempts(), 2);
        assert_eq!(client.state(), ConnectionState::Connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_after_close_waits_for_cancelled_attempt() {
        let client = RealtimeClient::with_transport(&ClientConfig::default(), Arc::new(Hanging));
        client.connect("ws://slow/ws");
        tokio::time::sleep(Duration::from_millis(10)).await;

        client.close();
        client.connect("ws://slow/ws");
        assert_eq!(client.connection_attempts(), 1);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(client.connection_attempts(), 2);
    }
}
