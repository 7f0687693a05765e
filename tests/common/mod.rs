//! Scripted transport for driving `RealtimeClient` from tests.

#![allow(dead_code, clippy::panic)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};

use tutor_link::domain::{ClientEvent, ConnectionState};
use tutor_link::error::TransportError;
use tutor_link::ws::{Link, Transport};

/// Server half of one accepted link.
#[derive(Debug)]
pub struct ServerEnd {
    /// Frames the client wrote.
    pub received: mpsc::UnboundedReceiver<String>,
    /// Push frames to the client. Dropping it closes the link.
    pub push: mpsc::UnboundedSender<String>,
}

impl ServerEnd {
    /// Next frame from the client, decoded as JSON.
    pub async fn next_json(&mut self) -> serde_json::Value {
        let frame = tokio::time::timeout(Duration::from_secs(5), self.received.recv()).await;
        let Ok(Some(text)) = frame else {
            panic!("no frame from client");
        };
        let Ok(value) = serde_json::from_str(&text) else {
            panic!("client sent non-JSON frame: {text}");
        };
        value
    }

    /// Sends a raw frame to the client.
    pub fn push(&self, text: &str) {
        let Ok(()) = self.push.send(text.to_string()) else {
            panic!("client side of link is gone");
        };
    }
}

/// Transport whose connect outcomes are scripted by the test.
///
/// Each `connect` pops the next outcome (`true` = accept); when the script
/// is empty `default_accept` applies. Accepted links are handed to the test
/// through [`ScriptedTransport::accepted`].
#[derive(Debug)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<bool>>,
    default_accept: bool,
    attempts: AtomicUsize,
    servers: mpsc::UnboundedSender<ServerEnd>,
}

impl ScriptedTransport {
    /// Builds the transport and the receiver of accepted links.
    pub fn new(
        script: impl IntoIterator<Item = bool>,
        default_accept: bool,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEnd>) {
        let (servers, accepted) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            default_accept,
            attempts: AtomicUsize::new(0),
            servers,
        });
        (transport, accepted)
    }

    /// Connect calls observed so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Transport for ScriptedTransport {
    fn connect(&self, _url: &str) -> BoxFuture<'static, Result<Link, TransportError>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let accept = self.script.lock().pop_front().unwrap_or(self.default_accept);
        if !accept {
            return Box::pin(async { Err(TransportError::Connect("refused".to_string())) });
        }

        let (to_server, received) = mpsc::unbounded_channel();
        let (push, from_server) = mpsc::unbounded_channel();
        let _ = self.servers.send(ServerEnd { received, push });
        Box::pin(async move {
            Ok(Link {
                outgoing: to_server,
                incoming: from_server,
            })
        })
    }
}

/// Waits for the next accepted link.
pub async fn accept(accepted: &mut mpsc::UnboundedReceiver<ServerEnd>) -> ServerEnd {
    let next = tokio::time::timeout(Duration::from_secs(30), accepted.recv()).await;
    let Ok(Some(server)) = next else {
        panic!("client never connected");
    };
    server
}

/// Waits until an event matches `pred`, returning it.
pub async fn wait_for<F>(events: &mut broadcast::Receiver<ClientEvent>, mut pred: F) -> ClientEvent
where
    F: FnMut(&ClientEvent) -> bool,
{
    loop {
        let next = tokio::time::timeout(Duration::from_secs(30), events.recv()).await;
        let Ok(Ok(event)) = next else {
            panic!("expected event never arrived");
        };
        if pred(&event) {
            return event;
        }
    }
}

/// Waits for a transition into `state`.
pub async fn wait_for_state(events: &mut broadcast::Receiver<ClientEvent>, state: ConnectionState) {
    wait_for(events, |e| {
        matches!(e, ClientEvent::StateChanged { state: s, .. } if *s == state)
    })
    .await;
}
