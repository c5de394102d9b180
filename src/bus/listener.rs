//! Subscription side of the bus: a reconnecting `graphql-ws` client.
//!
//! The listener forwards every received event into an mpsc channel and keeps
//! the socket alive across drops, backing off exponentially between attempts.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use secrecy::SecretString;
use tokio::sync::{Notify, mpsc};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tracing::{debug, info, trace, warn};

use super::protocol::{ClientMessage, SUBPROTOCOL, ServerMessage};
use crate::config::secrets::connection_params;
use crate::error::{Error, Result};
use crate::event::Event;

const OPERATION_ID: &str = "1";

type Socket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Configuration for the subscription listener.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// `ws://` or `wss://` endpoint.
    pub url: String,
    /// Event name pattern, `*` for everything.
    pub pattern: String,
    pub token: Option<SecretString>,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
}

impl ListenerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pattern: "*".to_string(),
            token: None,
            min_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Exponential reconnect delay, doubling from `min` up to `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            current: min,
        }
    }

    /// Delay before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.min;
    }
}

/// Connection lifecycle, as reported to an optional status channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerStatus {
    Connecting,
    Connected,
    Reconnected,
    Disconnected,
    Reconnecting,
}

impl fmt::Display for ListenerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ListenerStatus::Connecting => "Client Connecting",
            ListenerStatus::Connected => "Client Connected",
            ListenerStatus::Reconnected => "Client Reconnected",
            ListenerStatus::Disconnected => "Client Disconnected",
            ListenerStatus::Reconnecting => "Client Reconnecting",
        };
        f.write_str(text)
    }
}

/// A status update rendered as a data-less event, for the console.
impl From<ListenerStatus> for Event {
    fn from(status: ListenerStatus) -> Self {
        Event::new(status.to_string(), serde_json::Value::Null)
    }
}

/// How a session ended without an error.
enum SessionEnd {
    /// Server closed the socket or completed the subscription.
    Closed,
    /// Nobody is reading events anymore.
    ReceiverGone,
    /// Shutdown was requested; the socket was closed cleanly.
    Shutdown,
}

struct Lifecycle {
    connected_once: bool,
    backoff: Backoff,
}

/// Reconnecting subscription client.
#[derive(Clone)]
pub struct EventListener {
    config: Arc<ListenerConfig>,
    shutdown: Arc<Notify>,
    status: Option<mpsc::UnboundedSender<ListenerStatus>>,
}

impl EventListener {
    pub fn new(config: ListenerConfig) -> Self {
        Self {
            config: Arc::new(config),
            shutdown: Arc::new(Notify::new()),
            status: None,
        }
    }

    /// Also report lifecycle changes on `tx`.
    pub fn with_status(mut self, tx: mpsc::UnboundedSender<ListenerStatus>) -> Self {
        self.status = Some(tx);
        self
    }

    /// Signal the listener to stop.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Receive events until shutdown or until `tx` is dropped.
    pub async fn run(&self, tx: mpsc::Sender<Event>) -> Result<()> {
        let mut lifecycle = Lifecycle {
            connected_once: false,
            backoff: Backoff::new(self.config.min_backoff, self.config.max_backoff),
        };

        loop {
            info!(url = %self.config.url, "client connecting");
            self.report(ListenerStatus::Connecting);

            match self.session(&tx, &mut lifecycle).await {
                Ok(SessionEnd::Shutdown) => {
                    info!("listener shutting down");
                    return Ok(());
                }
                Ok(SessionEnd::ReceiverGone) => {
                    debug!("event receiver dropped, stopping listener");
                    return Ok(());
                }
                Ok(SessionEnd::Closed) => warn!("client disconnected"),
                Err(e) => warn!(error = %e, "client disconnected"),
            }
            self.report(ListenerStatus::Disconnected);

            let delay = lifecycle.backoff.next_delay();
            info!(delay_ms = delay.as_millis() as u64, "client reconnecting");
            self.report(ListenerStatus::Reconnecting);
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("listener shutting down");
                    return Ok(());
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn report(&self, status: ListenerStatus) {
        if let Some(ref tx) = self.status {
            let _ = tx.send(status);
        }
    }

    /// One socket lifetime: handshake, subscribe, forward until it ends.
    async fn session(
        &self,
        tx: &mpsc::Sender<Event>,
        lifecycle: &mut Lifecycle,
    ) -> Result<SessionEnd> {
        let mut request = self
            .config
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::Bus(format!("bad subscription url {}: {e}", self.config.url)))?;
        request
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUBPROTOCOL));

        let connected = tokio::select! {
            _ = self.shutdown.notified() => return Ok(SessionEnd::Shutdown),
            connected = connect_async(request) => connected,
        };
        let (mut ws, _) =
            connected.map_err(|e| Error::Bus(format!("connect {}: {e}", self.config.url)))?;

        let init = ClientMessage::ConnectionInit {
            payload: connection_params(self.config.token.as_ref()),
        };
        ws.send(Message::text(init.to_text()?))
            .await
            .map_err(|e| Error::Bus(format!("send connection_init: {e}")))?;

        let mut subscribed = false;

        loop {
            let frame = tokio::select! {
                _ = self.shutdown.notified() => {
                    hang_up(&mut ws, subscribed).await;
                    return Ok(SessionEnd::Shutdown);
                }
                frame = ws.next() => frame,
            };
            let Some(frame) = frame else {
                return Ok(SessionEnd::Closed);
            };

            let frame = frame.map_err(|e| Error::Bus(format!("socket read: {e}")))?;
            let text = match frame {
                Message::Text(text) => text,
                Message::Close(reason) => {
                    debug!(?reason, "server closed socket");
                    return Ok(SessionEnd::Closed);
                }
                _ => continue,
            };

            let msg = match ServerMessage::parse(text.as_str()) {
                Ok(msg) => msg,
                Err(e) => {
                    debug!(error = %e, "ignoring unrecognized frame");
                    continue;
                }
            };

            match msg {
                ServerMessage::ConnectionAck if !subscribed => {
                    if lifecycle.connected_once {
                        info!("client reconnected");
                        self.report(ListenerStatus::Reconnected);
                    } else {
                        info!("client connected");
                        self.report(ListenerStatus::Connected);
                    }
                    lifecycle.connected_once = true;
                    lifecycle.backoff.reset();

                    let start =
                        ClientMessage::subscribe_events(OPERATION_ID, &self.config.pattern);
                    ws.send(Message::text(start.to_text()?))
                        .await
                        .map_err(|e| Error::Bus(format!("send start: {e}")))?;
                    subscribed = true;
                }
                ServerMessage::ConnectionAck => {}
                ServerMessage::KeepAlive => trace!("keep-alive"),
                ServerMessage::ConnectionError { payload } => {
                    return Err(Error::Bus(format!("connection rejected: {payload}")));
                }
                ServerMessage::Data { payload, .. } => {
                    let event = match payload.into_event() {
                        Ok(Some(event)) => event,
                        Ok(None) => continue,
                        Err(e) => {
                            warn!(error = %e, "skipping undecodable event");
                            continue;
                        }
                    };
                    if tx.send(event).await.is_err() {
                        hang_up(&mut ws, subscribed).await;
                        return Ok(SessionEnd::ReceiverGone);
                    }
                }
                ServerMessage::Error { payload, .. } => {
                    return Err(Error::Bus(format!("subscription failed: {payload}")));
                }
                ServerMessage::Complete { .. } => {
                    debug!("server completed subscription");
                    return Ok(SessionEnd::Closed);
                }
            }
        }
    }
}

/// Leave politely: `stop`, `connection_terminate`, then a close frame.
/// Send failures only mean the server is already gone.
async fn hang_up(ws: &mut Socket, subscribed: bool) {
    let mut goodbye = Vec::with_capacity(2);
    if subscribed {
        goodbye.push(ClientMessage::Stop {
            id: OPERATION_ID.to_string(),
        });
    }
    goodbye.push(ClientMessage::ConnectionTerminate);

    for msg in goodbye {
        let Ok(text) = msg.to_text() else { continue };
        if let Err(e) = ws.send(Message::text(text)).await {
            debug!(error = %e, "server gone before goodbye");
            return;
        }
    }
    if let Err(e) = ws.close(None).await {
        debug!(error = %e, "close handshake failed");
    }
}
