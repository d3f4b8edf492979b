//! Realtime connection manager.
//!
//! Owns one logical session with the backend: opens the socket, decodes and
//! routes inbound frames, sends keep-alive pings (admin), and reconnects with
//! linear backoff until the attempt ceiling is reached or `disconnect()` is
//! called.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use sb_core::config::{AppConfig, RealtimeConfig};
use sb_core::constants;

use crate::endpoint::{Endpoint, Variant};
use crate::events::{CloseInfo, ConnectionState, Event, EventDispatcher, EventType, Listener};
use crate::frame::{self, Frame};
use crate::reconnect::ReconnectPolicy;
use crate::transport::{Connection, Transport, TungsteniteTransport, WireMessage};

/// Tuning for one client instance.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,
    /// Base reconnect delay; attempt N waits N times this.
    pub reconnect_delay: Duration,
    /// Keep-alive ping interval. `None` sends no pings at all.
    pub keepalive: Option<Duration>,
}

impl ClientOptions {
    /// Defaults for the agent dashboard: pings on open and every 30 seconds.
    pub fn admin() -> Self {
        Self {
            max_reconnect_attempts: constants::MAX_RECONNECT_ATTEMPTS,
            reconnect_delay: Duration::from_millis(constants::RECONNECT_DELAY_MS),
            keepalive: Some(Duration::from_millis(constants::KEEPALIVE_INTERVAL_MS)),
        }
    }

    /// Defaults for the customer widget: no keep-alive.
    pub fn widget() -> Self {
        Self {
            keepalive: None,
            ..Self::admin()
        }
    }

    /// Options from configuration. Keep-alive only applies to admin sessions.
    pub fn from_config(variant: Variant, config: &RealtimeConfig) -> Self {
        Self {
            max_reconnect_attempts: config.max_reconnect_attempts,
            reconnect_delay: config.reconnect_delay(),
            keepalive: match variant {
                Variant::Admin => config.ping_interval(),
                Variant::Widget => None,
            },
        }
    }
}

enum Outgoing {
    Frame(String),
    Close,
}

/// Mutable session state. Every lifecycle decision is made under this lock.
struct Session {
    /// Bumped by every open and by `disconnect()`; stale tasks compare it.
    generation: u64,
    identity: Option<String>,
    intentional_close: bool,
    policy: ReconnectPolicy,
    /// Present only while a socket is open.
    outbound: Option<mpsc::UnboundedSender<Outgoing>>,
    connection_task: Option<JoinHandle<()>>,
    reconnect_task: Option<JoinHandle<()>>,
}

struct Inner<T> {
    endpoint: Endpoint,
    transport: T,
    dispatcher: EventDispatcher,
    state_tx: watch::Sender<ConnectionState>,
    keepalive: Option<Duration>,
    session: Mutex<Session>,
}

/// Reconnecting realtime client for one admin or widget session.
///
/// Cloning shares the same session. Must be used from within a Tokio
/// runtime: socket I/O and reconnect timers run on spawned tasks, and
/// listeners are called on those tasks.
pub struct RealtimeClient<T: Transport = TungsteniteTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for RealtimeClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl RealtimeClient<TungsteniteTransport> {
    /// Create a client over the production WebSocket transport.
    pub fn new(endpoint: Endpoint, options: ClientOptions) -> Self {
        Self::with_transport(endpoint, TungsteniteTransport::default(), options)
    }

    /// Create a client for `variant` from the application configuration.
    pub fn from_config(variant: Variant, config: &AppConfig) -> Self {
        Self::new(
            Endpoint::from_config(variant, config),
            ClientOptions::from_config(variant, &config.realtime),
        )
    }
}

impl<T: Transport> RealtimeClient<T> {
    /// Create a client over a custom transport.
    pub fn with_transport(endpoint: Endpoint, transport: T, options: ClientOptions) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            inner: Arc::new(Inner {
                endpoint,
                transport,
                dispatcher: EventDispatcher::new(),
                state_tx,
                keepalive: options.keepalive,
                session: Mutex::new(Session {
                    generation: 0,
                    identity: None,
                    intentional_close: false,
                    policy: ReconnectPolicy::new(
                        options.max_reconnect_attempts,
                        options.reconnect_delay,
                    ),
                    outbound: None,
                    connection_task: None,
                    reconnect_task: None,
                }),
            }),
        }
    }

    /// Open a session for `identity` (auth token or conversation id).
    ///
    /// Returns immediately; progress is reported through events. A live
    /// socket is replaced without emitting `disconnected`, a pending
    /// reconnect is cancelled and the attempt counter starts over.
    pub fn connect(&self, identity: impl Into<String>) {
        {
            let mut session = self.inner.session();
            session.intentional_close = false;
            session.identity = Some(identity.into());
            session.policy.reset();
            if let Some(timer) = session.reconnect_task.take() {
                timer.abort();
            }
        }
        self.inner.open(ConnectionState::Connecting, None);
    }

    /// Close the session for good.
    ///
    /// Cancels any pending reconnect, closes the socket (or abandons a
    /// handshake in flight) and drops every listener. Safe to call repeatedly.
    pub fn disconnect(&self) {
        let first = {
            let mut session = self.inner.session();
            let first = !session.intentional_close;
            session.intentional_close = true;
            session.generation += 1;
            if let Some(timer) = session.reconnect_task.take() {
                timer.abort();
            }
            session.close_socket();
            self.inner.set_state(ConnectionState::ClosedIntentionally);
            first
        };

        self.inner.dispatcher.clear();
        if first {
            info!("{} socket disconnected", self.variant_name());
        }
    }

    /// Serialize `data` and queue it for the open socket.
    ///
    /// Returns `false` (and logs a warning) when no socket is open; the frame
    /// is dropped, not buffered.
    pub fn send<S: Serialize + ?Sized>(&self, data: &S) -> bool {
        let text = match serde_json::to_string(data) {
            Ok(text) => text,
            Err(e) => {
                error!("failed to serialize outbound frame: {e}");
                return false;
            }
        };

        let queued = match &self.inner.session().outbound {
            Some(tx) => tx.send(Outgoing::Frame(text)).is_ok(),
            None => false,
        };
        if !queued {
            warn!("{} socket is not connected, frame dropped", self.variant_name());
        }
        queued
    }

    /// Widget typing indicator.
    pub fn send_typing(&self, is_typing: bool) -> bool {
        self.send(&frame::widget_typing(is_typing))
    }

    /// Agent typing indicator on a ticket thread.
    pub fn send_ticket_typing(&self, ticket_id: i64, is_typing: bool) -> bool {
        self.send(&frame::ticket_typing(ticket_id, is_typing))
    }

    pub fn subscribe_to_ticket(&self, ticket_id: i64) -> bool {
        self.send(&frame::subscribe_ticket(ticket_id))
    }

    pub fn unsubscribe_from_ticket(&self, ticket_id: i64) -> bool {
        self.send(&frame::unsubscribe_ticket(ticket_id))
    }

    pub fn subscribe_to_stats(&self) -> bool {
        self.send(&frame::subscribe_stats())
    }

    /// Register a listener. See [`EventDispatcher::on`].
    pub fn on(&self, event_type: impl Into<EventType>, listener: Listener) {
        self.inner.dispatcher.on(event_type, listener);
    }

    /// Unregister a listener. See [`EventDispatcher::off`].
    pub fn off(&self, event_type: impl Into<EventType>, listener: &Listener) {
        self.inner.dispatcher.off(event_type, listener);
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.inner.dispatcher
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Whether a socket is open and accepting frames.
    pub fn is_connected(&self) -> bool {
        self.inner.session().outbound.is_some()
    }

    /// Reconnect attempts scheduled since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.session().policy.attempts()
    }

    /// Identity passed to the last `connect()`.
    pub fn identity(&self) -> Option<String> {
        self.inner.session().identity.clone()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }

    fn variant_name(&self) -> &'static str {
        self.inner.endpoint.variant().name()
    }
}

impl Session {
    /// Ask an open socket to close, or abandon a handshake in flight.
    fn close_socket(&mut self) {
        match self.outbound.take() {
            Some(tx) => {
                let _ = tx.send(Outgoing::Close);
                self.connection_task = None;
            }
            None => {
                if let Some(task) = self.connection_task.take() {
                    task.abort();
                }
            }
        }
    }
}

impl<T: Transport> Inner<T> {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn variant_name(&self) -> &'static str {
        self.endpoint.variant().name()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.session().generation == generation
    }

    /// Update the connection state and notify watchers.
    fn set_state(&self, new_state: ConnectionState) {
        let variant = self.variant_name();
        self.state_tx.send_if_modified(|state| {
            if *state == new_state {
                return false;
            }
            info!("{variant} socket state: {state} -> {new_state}");
            *state = new_state;
            true
        });
    }

    fn emit(&self, event_type: &EventType, event: &Event) {
        self.dispatcher.emit(event_type, event);
    }

    /// Start a new socket for the stored identity.
    ///
    /// `scheduled_by` is the generation a reconnect timer was armed under;
    /// the open is skipped if anything happened since.
    fn open(self: &Arc<Self>, state: ConnectionState, scheduled_by: Option<u64>) {
        let (generation, url) = {
            let mut session = self.session();
            if let Some(armed) = scheduled_by {
                if session.intentional_close || session.generation != armed {
                    debug!("stale reconnect timer ignored");
                    return;
                }
            }

            session.generation += 1;
            let generation = session.generation;
            session.close_socket();

            let identity = session.identity.clone().unwrap_or_default();
            match self.endpoint.url_for(&identity) {
                Ok(url) => {
                    self.set_state(state);
                    (generation, url)
                }
                Err(e) => {
                    drop(session);
                    error!("cannot build {} socket url: {e}", self.variant_name());
                    self.emit(&EventType::Error, &Event::Error(e.to_string()));
                    self.handle_reconnect(generation);
                    return;
                }
            }
        };

        // The admin URL carries the token; only the path is logged.
        info!(
            "{} socket connecting to {}{}",
            self.variant_name(),
            self.endpoint.origin(),
            url.path()
        );

        let task = tokio::spawn(Arc::clone(self).run_session(generation, url.to_string()));
        let mut session = self.session();
        if session.generation == generation {
            session.connection_task = Some(task);
        }
    }

    /// One socket, from handshake to close.
    async fn run_session(self: Arc<Self>, generation: u64, url: String) {
        let variant = self.variant_name();

        let Connection {
            mut sink,
            mut stream,
        } = match self.transport.connect(&url).await {
            Ok(connection) => connection,
            Err(e) => {
                if self.is_current(generation) {
                    warn!("{variant} socket failed to open: {e}");
                    self.emit(&EventType::Error, &Event::Error(e.to_string()));
                    self.emit(
                        &EventType::Disconnected,
                        &Event::Disconnected(CloseInfo::abnormal()),
                    );
                    self.handle_reconnect(generation);
                }
                return;
            }
        };

        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let ping_text = frame::ping().to_string();
        if self.keepalive.is_some() {
            let _ = out_tx.send(Outgoing::Frame(ping_text.clone()));
        }
        {
            let mut session = self.session();
            if session.generation != generation {
                debug!("superseded {variant} connection dropped");
                return;
            }
            session.outbound = Some(out_tx);
            session.policy.reset();
            self.set_state(ConnectionState::Connected);
        }
        info!("{variant} socket connected");
        self.emit(&EventType::Connected, &Event::Connected);

        let mut keepalive = self.keepalive.map(|period| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        let close = loop {
            let outgoing = tokio::select! {
                incoming = stream.next() => match incoming {
                    Some(Ok(WireMessage::Text(text))) => {
                        self.handle_text(&text);
                        continue;
                    }
                    Some(Ok(WireMessage::Close(info))) => {
                        break info.unwrap_or_else(|| CloseInfo::new(CloseInfo::NO_STATUS, ""));
                    }
                    Some(Err(e)) => {
                        error!("{variant} socket error: {e}");
                        self.emit(&EventType::Error, &Event::Error(e.to_string()));
                        break CloseInfo::abnormal();
                    }
                    None => break CloseInfo::abnormal(),
                },
                queued = out_rx.recv() => queued.unwrap_or(Outgoing::Close),
                _ = next_tick(&mut keepalive) => {
                    debug!("{variant} keep-alive ping");
                    Outgoing::Frame(ping_text.clone())
                }
            };

            match outgoing {
                Outgoing::Frame(text) => {
                    debug!("{variant} socket send: {text}");
                    if let Err(e) = sink.send(WireMessage::Text(text)).await {
                        error!("{variant} socket write failed: {e}");
                        self.emit(&EventType::Error, &Event::Error(e.to_string()));
                        break CloseInfo::abnormal();
                    }
                }
                Outgoing::Close => {
                    let info = CloseInfo::new(CloseInfo::NORMAL, "");
                    if let Err(e) = sink.send(WireMessage::Close(Some(info.clone()))).await {
                        debug!("{variant} close frame not delivered: {e}");
                    }
                    break info;
                }
            }
        };

        {
            let mut session = self.session();
            if session.generation != generation {
                debug!("superseded {variant} socket closed");
                return;
            }
            session.outbound = None;
        }

        info!(
            "{variant} socket closed (code {}, reason {:?})",
            close.code, close.reason
        );
        self.emit(&EventType::Disconnected, &Event::Disconnected(close));
        self.handle_reconnect(generation);
    }

    /// Decode one text frame and route it to listeners.
    fn handle_text(&self, text: &str) {
        let frame = match Frame::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                error!("{} socket dropped malformed frame: {e}", self.variant_name());
                return;
            }
        };
        if matches!(frame, Frame::Pong) {
            debug!("pong received");
            return;
        }

        debug!(
            "{} socket frame: {}",
            self.variant_name(),
            frame.kind().unwrap_or("<untyped>")
        );
        let own_type = frame.event_type();
        let event = Event::Frame(frame);
        if let Some(event_type) = own_type.filter(|t| *t != EventType::Message) {
            self.emit(&event_type, &event);
        }
        self.emit(&EventType::Message, &event);
    }

    /// Schedule the next reconnect, or give up when the ceiling is reached.
    fn handle_reconnect(self: &Arc<Self>, generation: u64) {
        let mut session = self.session();
        if session.intentional_close || session.generation != generation {
            return;
        }

        let max = session.policy.max_attempts();
        match session.policy.next_attempt() {
            None => {
                self.set_state(ConnectionState::Disconnected);
                drop(session);
                error!(
                    "{} socket: max reconnection attempts ({max}) reached",
                    self.variant_name()
                );
                self.emit(&EventType::MaxReconnectAttempts, &Event::MaxReconnectAttempts);
            }
            Some((attempt, delay)) => {
                self.set_state(ConnectionState::Reconnecting);
                warn!(
                    "{} socket reconnecting in {}ms (attempt {attempt}/{max})",
                    self.variant_name(),
                    delay.as_millis()
                );

                let inner = Arc::clone(self);
                let timer = tokio::spawn(async move {
                    sleep(delay).await;
                    inner.open(ConnectionState::Reconnecting, Some(generation));
                });
                if let Some(previous) = session.reconnect_task.replace(timer) {
                    previous.abort();
                }
            }
        }
    }
}

/// Next keep-alive tick, or never when keep-alive is off.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
