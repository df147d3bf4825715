//! Connection manager.
//!
//! [`EventClient`] is a cheap, cloneable handle. All state lives in a single
//! background task that serializes commands, socket events, keepalive ticks
//! and reconnect timers through one `select!` loop, so the connection state,
//! the topic set and the retry counter are never mutated concurrently.
//!
//! State machine:
//!
//! ```text
//! Disconnected --connect--> Connecting --open ok--> Connected
//!      ^                        |                      |
//!      |                   open failed           transport error
//!      |                        v                      v
//!      +------------------- Error <--------------------+
//!      |                                               |
//!      +---------------- socket closed <---------------+
//! ```
//!
//! After a close that was not requested through [`EventClient::disconnect`],
//! a reconnect is scheduled with exponential backoff until the attempt budget
//! is spent.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Sleep;
use tracing::{debug, info, warn};

use casefeed_core::codec;
use casefeed_core::security::{connection_url, redact_url};
use casefeed_core::{
    AuthToken, ConnectionState, ControlFrame, InboundEvent, ReconnectPolicy, Topic,
    TransportError,
};
use casefeed_settings::ClientSettings;

use crate::keepalive::Keepalive;
use crate::subscriptions::SubscriptionRegistry;
use crate::transport::{Connection, Transport, WsTransport};

/// Capacity of the state transition broadcast.
const STATE_CHANNEL_CAPACITY: usize = 64;

// ── Configuration ───────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base endpoint; the token is appended per attempt.
    pub url: String,
    pub policy: ReconnectPolicy,
    pub keepalive_interval: Duration,
    pub connect_timeout: Duration,
    /// Capacity of the inbound event broadcast. Slow consumers lag rather
    /// than block the socket.
    pub event_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from(&ClientSettings::default())
    }
}

impl From<&ClientSettings> for ClientConfig {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            url: settings.url.clone(),
            policy: ReconnectPolicy::new(
                settings.max_reconnect_attempts,
                Duration::from_millis(settings.reconnect_base_delay_ms),
            ),
            keepalive_interval: Duration::from_millis(settings.keepalive_interval_ms),
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            event_buffer: settings.event_buffer_size.max(1),
        }
    }
}

impl ClientConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

// ── Errors & status ─────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("event client task has stopped")]
    Stopped,
}

/// Snapshot of the connection manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientStatus {
    pub state: ConnectionState,
    /// Automatic attempts made since the last successful open.
    pub reconnect_attempts: u32,
    pub reconnect_pending: bool,
    pub topics: Vec<Topic>,
}

// ── Handle ──────────────────────────────────────────────────────────────────

enum Command {
    Connect(Option<AuthToken>),
    Disconnect,
    Subscribe(Topic),
    Unsubscribe(Topic),
    Status(oneshot::Sender<ClientStatus>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to the event client.
///
/// Commands are fire-and-forget: transport failures surface only through the
/// state stream. Dropping the last handle closes the socket and stops the
/// background task.
#[derive(Clone)]
pub struct EventClient {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    transitions: broadcast::Sender<ConnectionState>,
    events: broadcast::Sender<Arc<InboundEvent>>,
}

impl EventClient {
    /// Spawn the client task on the current tokio runtime.
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        let (transitions, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);
        let (events, _) = broadcast::channel(config.event_buffer.max(1));

        let task = ClientTask {
            keepalive: Keepalive::new(config.keepalive_interval),
            config,
            transport,
            commands: command_rx,
            state_tx,
            transitions: transitions.clone(),
            events: events.clone(),
            registry: SubscriptionRegistry::new(),
            link: Link::Idle,
            token: None,
            attempts: 0,
            intentional_close: false,
            reconnect: None,
        };
        drop(tokio::spawn(task.run()));

        Self {
            commands,
            state,
            transitions,
            events,
        }
    }

    /// Client over the real WebSocket transport.
    pub fn websocket(config: ClientConfig) -> Self {
        Self::new(config, Arc::new(WsTransport))
    }

    /// Open the connection with `token` and a full retry budget.
    ///
    /// No-op while connected: the live socket and its original token are
    /// kept. While an attempt is in flight (first open or automatic retry)
    /// that attempt is abandoned and a new one starts with `token`.
    pub fn connect(&self, token: Option<AuthToken>) {
        self.send(Command::Connect(token));
    }

    /// Close the connection and cancel any pending reconnect.
    pub fn disconnect(&self) {
        self.send(Command::Disconnect);
    }

    pub fn subscribe(&self, topic: impl Into<Topic>) {
        self.send(Command::Subscribe(topic.into()));
    }

    pub fn unsubscribe(&self, topic: impl Into<Topic>) {
        self.send(Command::Unsubscribe(topic.into()));
    }

    /// Latest connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Current-value view of the state.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Every transition, in order, from the moment of subscribing.
    pub fn state_changes(&self) -> broadcast::Receiver<ConnectionState> {
        self.transitions.subscribe()
    }

    /// Decoded inbound events, from the moment of subscribing.
    pub fn events(&self) -> broadcast::Receiver<Arc<InboundEvent>> {
        self.events.subscribe()
    }

    pub async fn status(&self) -> Result<ClientStatus, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Status(tx))
            .map_err(|_| ClientError::Stopped)?;
        rx.await.map_err(|_| ClientError::Stopped)
    }

    /// Close the socket and stop the background task for every handle.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Shutdown(tx))
            .map_err(|_| ClientError::Stopped)?;
        rx.await.map_err(|_| ClientError::Stopped)
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("event client stopped, command ignored");
        }
    }
}

// ── Background task ─────────────────────────────────────────────────────────

enum Link {
    Idle,
    Opening(BoxFuture<'static, Result<Box<dyn Connection>, TransportError>>),
    Open(Box<dyn Connection>),
}

enum LinkEvent {
    Opened(Result<Box<dyn Connection>, TransportError>),
    Frame(String),
    Failed(TransportError),
    Closed,
}

/// Drive whatever the link is doing. Pending forever while idle.
async fn poll_link(link: &mut Link) -> LinkEvent {
    match link {
        Link::Idle => std::future::pending().await,
        Link::Opening(open) => LinkEvent::Opened(open.await),
        Link::Open(conn) => match conn.recv().await {
            Some(Ok(text)) => LinkEvent::Frame(text),
            Some(Err(e)) => LinkEvent::Failed(e),
            None => LinkEvent::Closed,
        },
    }
}

async fn reconnect_due(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

struct ClientTask {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    commands: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<ConnectionState>,
    transitions: broadcast::Sender<ConnectionState>,
    events: broadcast::Sender<Arc<InboundEvent>>,
    registry: SubscriptionRegistry,
    keepalive: Keepalive,
    link: Link,
    token: Option<AuthToken>,
    attempts: u32,
    /// Set by `disconnect()`; suppresses reconnect scheduling on close.
    intentional_close: bool,
    reconnect: Option<Pin<Box<Sleep>>>,
}

impl ClientTask {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown(ack)) => {
                        self.teardown().await;
                        let _ = ack.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.teardown().await;
                        break;
                    }
                },
                event = poll_link(&mut self.link) => self.handle_link(event).await,
                () = self.keepalive.tick() => {
                    self.send_frame(&ControlFrame::ping()).await;
                }
                () = reconnect_due(&mut self.reconnect) => {
                    self.reconnect = None;
                    info!(attempt = self.attempts, "reconnecting");
                    self.begin_connect();
                }
            }
        }
        debug!("event client task stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect(token) => self.connect(token),
            Command::Disconnect => self.disconnect().await,
            Command::Subscribe(topic) => {
                if !self.registry.insert(topic.clone()) {
                    debug!(%topic, "already subscribed");
                }
                if self.current_state().is_connected()
                    && !self.send_frame(&ControlFrame::subscribe(topic.clone())).await
                {
                    warn!(%topic, "subscribe not delivered, replayed on next connect");
                }
            }
            Command::Unsubscribe(topic) => {
                if !self.registry.remove(&topic) {
                    debug!(%topic, "not subscribed");
                }
                if self.current_state().is_connected()
                    && !self.send_frame(&ControlFrame::unsubscribe(topic.clone())).await
                {
                    warn!(%topic, "unsubscribe not delivered, server may keep sending");
                }
            }
            Command::Status(reply) => {
                let _ = reply.send(ClientStatus {
                    state: self.current_state(),
                    reconnect_attempts: self.attempts,
                    reconnect_pending: self.reconnect.is_some(),
                    topics: self.registry.topics(),
                });
            }
            // handled in the loop
            Command::Shutdown(_) => {}
        }
    }

    fn connect(&mut self, token: Option<AuthToken>) {
        match self.link {
            Link::Open(_) => {
                debug!("connect ignored, already connected");
                return;
            }
            Link::Opening(_) => debug!("connect while connecting, restarting the attempt"),
            Link::Idle => {}
        }
        // Dropping an in-flight open abandons it; its outcome never arrives.
        self.intentional_close = false;
        self.reconnect = None;
        self.attempts = 0;
        self.token = token;
        self.begin_connect();
    }

    async fn disconnect(&mut self) {
        self.intentional_close = true;
        self.reconnect = None;
        self.keepalive.stop();
        match std::mem::replace(&mut self.link, Link::Idle) {
            Link::Open(mut conn) => conn.close().await,
            Link::Opening(_) => debug!("abandoning connection attempt"),
            Link::Idle => {}
        }
        self.on_closed();
    }

    async fn teardown(&mut self) {
        self.disconnect().await;
    }

    fn begin_connect(&mut self) {
        self.keepalive.stop();
        let url = connection_url(&self.config.url, self.token.as_ref());
        info!(url = redact_url(&url), attempt = self.attempts, "opening connection");

        let transport = Arc::clone(&self.transport);
        let timeout = self.config.connect_timeout;
        self.link = Link::Opening(Box::pin(async move {
            match tokio::time::timeout(timeout, transport.open(&url)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(timeout)),
            }
        }));
        self.set_state(ConnectionState::Connecting);
    }

    async fn handle_link(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Opened(Ok(conn)) => {
                self.link = Link::Open(conn);
                self.attempts = 0;
                self.set_state(ConnectionState::Connected);
                info!(topics = self.registry.len(), "connected");
                for frame in self.registry.replay_frames() {
                    if !self.send_frame(&frame).await {
                        return;
                    }
                }
                self.keepalive.start();
            }
            LinkEvent::Opened(Err(e)) => {
                self.link = Link::Idle;
                self.fail(e).await;
            }
            LinkEvent::Frame(text) => match codec::decode(&text) {
                Ok(event) => {
                    debug!(event_type = %event.event_type, id = %event.id, "event received");
                    let _ = self.events.send(Arc::new(event));
                }
                Err(e) => warn!(error = %e, "dropping malformed frame"),
            },
            LinkEvent::Failed(e) => self.fail(e).await,
            LinkEvent::Closed => {
                info!("connection closed by peer");
                self.link = Link::Idle;
                self.on_closed();
            }
        }
    }

    /// Send over the open socket. A failed send is treated as a transport
    /// error. Returns whether the link is still open.
    async fn send_frame(&mut self, frame: &ControlFrame) -> bool {
        let Link::Open(conn) = &mut self.link else {
            return false;
        };
        let text = match codec::encode(frame) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "failed to encode control frame");
                return true;
            }
        };
        match conn.send(text).await {
            Ok(()) => true,
            Err(e) => {
                self.fail(e).await;
                false
            }
        }
    }

    /// Transport error: Error, then release the socket and treat as closed.
    async fn fail(&mut self, error: TransportError) {
        warn!(error = %error, kind = error.error_kind(), "transport error");
        self.keepalive.stop();
        self.set_state(ConnectionState::Error);
        if let Link::Open(mut conn) = std::mem::replace(&mut self.link, Link::Idle) {
            conn.close().await;
        }
        self.on_closed();
    }

    fn on_closed(&mut self) {
        self.keepalive.stop();
        self.set_state(ConnectionState::Disconnected);
        if self.intentional_close {
            return;
        }
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        let policy = self.config.policy;
        if !policy.allows(self.attempts) {
            warn!(
                attempts = self.attempts,
                "reconnect attempts exhausted, waiting for an explicit connect"
            );
            return;
        }
        self.attempts += 1;
        let delay = policy.delay_for(self.attempts);
        info!(
            attempt = self.attempts,
            max_attempts = policy.max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "scheduling reconnect"
        );
        self.reconnect = Some(Box::pin(tokio::time::sleep(delay)));
    }

    fn current_state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn set_state(&mut self, next: ConnectionState) {
        let previous = self.state_tx.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "connection state");
            let _ = self.transitions.send(next);
        }
    }
}
