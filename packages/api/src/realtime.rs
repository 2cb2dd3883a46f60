//! # Realtime row changes
//!
//! Each [`RealtimeBackend::subscribe`] call opens its own websocket to the
//! realtime service and joins one channel on it:
//!
//! | Frame          | Topic              | When                                   |
//! |----------------|--------------------|----------------------------------------|
//! | `phx_join`     | `realtime:<table>` | after every connect                    |
//! | `heartbeat`    | `phoenix`          | every `realtime.heartbeat_interval_secs` |
//! | `access_token` | `realtime:<table>` | when the session token changes         |
//! | `phx_leave`    | `realtime:<table>` | when the subscription is released      |
//!
//! Incoming `postgres_changes` frames on the joined topic invoke the change
//! callback. The callback receives no payload; callers re-read the table.
//!
//! Only the first connect is reported to the caller. After that the socket
//! task owns the channel until the subscription is released: a closed or
//! failed connection is retried with exponential backoff (0.5 s doubling up
//! to 30 s) and rejoined with the latest session token. A successful rejoin
//! invokes the callback once, since changes made while disconnected were
//! never delivered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::{Sink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use store::{
    AuthChangeEvent, AuthEvent, AuthSubscription, BackendError, ChangeCallback, ChangeEvent,
    ChangeFilter, ChangeSubscription, RealtimeBackend, Unsubscribe,
};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::client::BackendClient;
use crate::error::RealtimeError;

const PROTOCOL_VERSION: &str = "1.0.0";
const RETRY_INITIAL: Duration = Duration::from_millis(500);
const RETRY_MAX: Duration = Duration::from_secs(30);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One frame of the channel protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PhoenixMessage {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
    #[serde(rename = "ref", default)]
    reference: Option<String>,
}

impl PhoenixMessage {
    fn new(topic: impl Into<String>, event: &str, payload: Value, reference: u64) -> Self {
        Self {
            topic: topic.into(),
            event: event.to_string(),
            payload,
            reference: Some(reference.to_string()),
        }
    }
}

/// A joined channel and what it forwards.
struct Channel {
    topic: String,
    filter: ChangeFilter,
    on_change: ChangeCallback,
    refs: AtomicU64,
}

impl Channel {
    fn next_ref(&self) -> u64 {
        self.refs.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn join(&self, table: &str, access_token: String) -> PhoenixMessage {
        let payload = json!({
            "config": {
                "broadcast": { "ack": false, "self": false },
                "presence": { "key": "" },
                "postgres_changes": [{
                    "event": self.filter.event.as_str(),
                    "schema": self.filter.schema,
                    "table": table,
                }],
                "private": false,
            },
            "access_token": access_token,
        });
        PhoenixMessage::new(&self.topic, "phx_join", payload, self.next_ref())
    }

    fn heartbeat(&self) -> PhoenixMessage {
        PhoenixMessage::new("phoenix", "heartbeat", json!({}), self.next_ref())
    }

    fn leave(&self) -> PhoenixMessage {
        PhoenixMessage::new(&self.topic, "phx_leave", json!({}), self.next_ref())
    }

    fn access_token(&self, access_token: &str) -> PhoenixMessage {
        let payload = json!({ "access_token": access_token });
        PhoenixMessage::new(&self.topic, "access_token", payload, self.next_ref())
    }

    /// Whether `frame` is a row change this channel forwards.
    fn is_change(&self, frame: &PhoenixMessage) -> bool {
        if frame.topic != self.topic {
            return false;
        }
        let kind = match frame.event.as_str() {
            "postgres_changes" => frame
                .payload
                .pointer("/data/type")
                .and_then(Value::as_str),
            // Older servers name the event after the row operation.
            other => Some(other),
        };
        kind.and_then(parse_event)
            .is_some_and(|event| self.filter.event.matches(event))
    }

    /// Dispatch one text frame. Returns `false` once the server has dropped
    /// the channel.
    fn handle_text(&self, text: &str) -> bool {
        let frame: PhoenixMessage = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!("Ignoring malformed realtime frame: {err}");
                return true;
            }
        };

        if self.is_change(&frame) {
            tracing::debug!(topic = %self.topic, "Row change received");
            (self.on_change)();
            return true;
        }

        match frame.event.as_str() {
            "phx_reply" if frame.topic == self.topic => {
                let status = frame.payload.get("status").and_then(Value::as_str);
                if status != Some("ok") {
                    tracing::warn!(topic = %self.topic, "Channel join refused: {}", frame.payload);
                }
            }
            "phx_error" | "phx_close" if frame.topic == self.topic => {
                tracing::warn!(topic = %self.topic, "Channel {}", frame.event);
                return false;
            }
            "system" => {
                if frame.payload.get("status").and_then(Value::as_str) == Some("error") {
                    tracing::warn!(topic = %self.topic, "Realtime error: {}", frame.payload);
                }
            }
            _ => {}
        }
        true
    }
}

fn parse_event(kind: &str) -> Option<ChangeEvent> {
    match kind {
        "INSERT" => Some(ChangeEvent::Insert),
        "UPDATE" => Some(ChangeEvent::Update),
        "DELETE" => Some(ChangeEvent::Delete),
        _ => None,
    }
}

impl BackendClient {
    fn websocket_url(&self) -> Result<Url, RealtimeError> {
        let mut url = self
            .base
            .join("realtime/v1/websocket")
            .map_err(|err| RealtimeError::Url(err.to_string()))?;
        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => return Err(RealtimeError::Url(format!("unsupported scheme {other}"))),
        };
        url.set_scheme(scheme)
            .map_err(|_| RealtimeError::Url(format!("cannot use scheme {scheme}")))?;
        url.query_pairs_mut()
            .append_pair("apikey", &self.anon_key)
            .append_pair("vsn", PROTOCOL_VERSION);
        Ok(url)
    }

    async fn open_channel(
        &self,
        table: &str,
        filter: ChangeFilter,
        on_change: ChangeCallback,
    ) -> Result<ChangeSubscription, RealtimeError> {
        // Listen before reading the token so no refresh slips in between.
        let auth = self.events.subscribe();
        let feed = Feed {
            channel: Channel {
                topic: format!("realtime:{table}"),
                filter,
                on_change,
                refs: AtomicU64::new(0),
            },
            table: table.to_string(),
            url: self.websocket_url()?,
            anon_key: self.anon_key.clone(),
            access_token: self.bearer().await,
            auth: Some(auth),
            heartbeat: self.heartbeat,
        };
        let socket = feed.connect().await?;
        tracing::info!(topic = %feed.channel.topic, "Realtime channel joined");

        let (stop_tx, stop_rx) = oneshot::channel();
        tokio::spawn(run_channel(feed, socket, stop_rx));

        Ok(ChangeSubscription::new(Unsubscribe::new(move || {
            let _ = stop_tx.send(());
        })))
    }
}

/// How a connection ended.
#[derive(Debug, PartialEq)]
enum Ended {
    Released,
    Dropped,
}

/// A channel together with what it takes to rejoin it.
struct Feed {
    channel: Channel,
    table: String,
    url: Url,
    anon_key: String,
    access_token: String,
    auth: Option<AuthSubscription>,
    heartbeat: Duration,
}

impl Feed {
    async fn connect(&self) -> Result<Socket, RealtimeError> {
        let (mut socket, _) = connect_async(self.url.as_str()).await?;
        let join = self.channel.join(&self.table, self.access_token.clone());
        send_frame(&mut socket, &join).await?;
        Ok(socket)
    }

    /// Follow the session token. Returns whether it changed.
    fn apply(&mut self, event: &AuthEvent) -> bool {
        let token = match (&event.kind, &event.session) {
            (AuthChangeEvent::SignedOut, _) | (_, None) => self.anon_key.clone(),
            (_, Some(session)) => session.access_token.clone(),
        };
        if token == self.access_token {
            return false;
        }
        self.access_token = token;
        true
    }

    /// Apply auth events that queued up while disconnected.
    fn catch_up(&mut self) {
        let mut pending = Vec::new();
        if let Some(auth) = self.auth.as_mut() {
            while let Some(event) = auth.try_next() {
                pending.push(event);
            }
        }
        for event in pending {
            self.apply(&event);
        }
    }

    /// Serve one joined connection until it drops or the subscription is
    /// released.
    async fn serve(&mut self, socket: Socket, stop: &mut oneshot::Receiver<()>) -> Ended {
        let (mut sink, mut stream) = socket.split();
        let mut ticker = tokio::time::interval(self.heartbeat);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = &mut *stop => {
                    if let Err(err) = send_frame(&mut sink, &self.channel.leave()).await {
                        tracing::debug!("Could not leave channel: {err}");
                    }
                    let _ = sink.close().await;
                    tracing::info!(topic = %self.channel.topic, "Realtime channel released");
                    return Ended::Released;
                }
                _ = ticker.tick() => {
                    if let Err(err) = send_frame(&mut sink, &self.channel.heartbeat()).await {
                        tracing::warn!(topic = %self.channel.topic, "Heartbeat failed: {err}");
                        return Ended::Dropped;
                    }
                }
                event = next_auth(&mut self.auth) => match event {
                    Some(event) => {
                        if self.apply(&event) {
                            let frame = self.channel.access_token(&self.access_token);
                            if let Err(err) = send_frame(&mut sink, &frame).await {
                                tracing::warn!(topic = %self.channel.topic, "Token update failed: {err}");
                                return Ended::Dropped;
                            }
                        }
                    }
                    None => self.auth = None,
                },
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if !self.channel.handle_text(&text) {
                            return Ended::Dropped;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(topic = %self.channel.topic, "Realtime connection closed");
                        return Ended::Dropped;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::warn!(topic = %self.channel.topic, "Realtime connection failed: {err}");
                        return Ended::Dropped;
                    }
                },
            }
        }
    }
}

async fn next_auth(auth: &mut Option<AuthSubscription>) -> Option<AuthEvent> {
    match auth {
        Some(auth) => auth.next().await,
        None => std::future::pending().await,
    }
}

async fn send_frame<S>(sink: &mut S, frame: &PhoenixMessage) -> Result<(), RealtimeError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let text = serde_json::to_string(frame)?;
    sink.send(Message::Text(text)).await?;
    Ok(())
}

/// Keep the channel joined until `stop` fires, reconnecting as needed.
async fn run_channel(mut feed: Feed, socket: Socket, mut stop: oneshot::Receiver<()>) {
    let mut socket = Some(socket);
    let mut delay = RETRY_INITIAL;

    loop {
        if let Some(socket) = socket.take() {
            let started = Instant::now();
            if feed.serve(socket, &mut stop).await == Ended::Released {
                return;
            }
            // A connection that held up for a while starts the backoff over.
            if started.elapsed() >= feed.heartbeat {
                delay = RETRY_INITIAL;
            }
        }

        tracing::info!(topic = %feed.channel.topic, "Reconnecting in {delay:?}");
        tokio::select! {
            _ = &mut stop => {
                tracing::info!(topic = %feed.channel.topic, "Realtime channel released");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
        delay = (delay * 2).min(RETRY_MAX);

        feed.catch_up();
        match feed.connect().await {
            Ok(rejoined) => {
                tracing::info!(topic = %feed.channel.topic, "Realtime channel rejoined");
                (feed.channel.on_change)();
                socket = Some(rejoined);
            }
            Err(err) => {
                tracing::warn!(topic = %feed.channel.topic, "Realtime reconnect failed: {err}");
            }
        }
    }
}

#[async_trait]
impl RealtimeBackend for BackendClient {
    async fn subscribe(
        &self,
        table: &str,
        filter: ChangeFilter,
        on_change: ChangeCallback,
    ) -> Result<ChangeSubscription, BackendError> {
        self.open_channel(table, filter, on_change)
            .await
            .map_err(|err| {
                tracing::error!(table, "Realtime subscription failed: {err}");
                BackendError::from(err)
            })
    }
}
