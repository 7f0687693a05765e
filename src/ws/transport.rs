//! Transport seam between the reconnect state machine and the network.
//!
//! A [`Transport`] opens one [`Link`]: a pair of channels carrying text
//! frames. All WebSocket I/O lives behind it, so the client logic in
//! [`super::client`] stays testable with scripted transports.

use std::fmt;

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::config::is_websocket_url;
use crate::error::TransportError;

/// An open duplex text channel to the backend.
///
/// The link is closed from the client side by dropping `outgoing`. It is
/// fully closed once `incoming` yields `None`; only then may a new link be
/// opened.
#[derive(Debug)]
pub struct Link {
    /// Frames to send to the server.
    pub outgoing: mpsc::UnboundedSender<String>,
    /// Frames received from the server.
    pub incoming: mpsc::UnboundedReceiver<String>,
}

/// Factory for [`Link`]s.
pub trait Transport: Send + Sync + fmt::Debug + 'static {
    /// Opens a link to `url`.
    ///
    /// Resolves once the handshake completes.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the endpoint cannot be reached or
    /// refuses the upgrade.
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<Link, TransportError>>;
}

/// WebSocket transport over `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsTransport;

impl WsTransport {
    /// Creates the transport.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Transport for WsTransport {
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<Link, TransportError>> {
        let url = url.to_owned();
        Box::pin(async move {
            // tungstenite only checks the scheme after the TCP dial.
            if !is_websocket_url(&url) {
                return Err(TransportError::Protocol(format!(
                    "not a websocket url: {url}"
                )));
            }
            let (stream, response) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(map_ws_error)?;
            tracing::debug!(%url, status = %response.status(), "websocket handshake complete");

            let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
            let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
            tokio::spawn(run_bridge(stream, outgoing_rx, incoming_tx));

            Ok(Link {
                outgoing: outgoing_tx,
                incoming: incoming_rx,
            })
        })
    }
}

fn map_ws_error(err: tokio_tungstenite::tungstenite::Error) -> TransportError {
    use tokio_tungstenite::tungstenite::Error;
    match err {
        Error::Http(response) => {
            TransportError::Protocol(format!("upgrade refused: {}", response.status()))
        }
        Error::Url(e) => TransportError::Protocol(e.to_string()),
        other => TransportError::Connect(other.to_string()),
    }
}

/// Bridges the channel pair and the socket until either side goes away.
///
/// - Frames from `outgoing` are written as text messages.
/// - Text messages from the socket are forwarded to `incoming`.
/// - `outgoing` closing sends a Close frame; the socket closing or
///   erroring ends the task, which drops `incoming`.
async fn run_bridge<S>(
    stream: tokio_tungstenite::WebSocketStream<S>,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    incoming: mpsc::UnboundedSender<String>,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut ws_tx, mut ws_rx) = stream.split();

    loop {
        tokio::select! {
            // Frame from the client
            frame = outgoing.recv() => {
                match frame {
                    Some(text) => {
                        if let Err(e) = ws_tx.send(Message::text(text)).await {
                            tracing::warn!(error = %e, "websocket write failed");
                            break;
                        }
                    }
                    None => {
                        if let Err(e) = ws_tx.close().await {
                            tracing::debug!(error = %e, "websocket close handshake failed");
                        }
                        break;
                    }
                }
            }
            // Message from the server
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if incoming.send(text.as_str().to_owned()).is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        tracing::debug!(len = data.len(), "ignoring binary websocket frame");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::debug!(?frame, "server closed websocket");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "websocket read failed");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::debug!("websocket bridge finished");
}
