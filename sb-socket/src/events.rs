//! Realtime event types and the listener registry.
//!
//! Defines the events the client emits (lifecycle plus one per frame type)
//! and a dispatcher that calls registered listeners synchronously, in the
//! order they subscribed.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::frame::Frame;

/// Everything a listener can subscribe to.
///
/// Lifecycle events are produced by the client itself; the rest map 1:1 to
/// the `type` field of inbound frames.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// The socket opened (`connected`).
    Connected,
    /// The socket closed (`disconnected`).
    Disconnected,
    /// Transport failure, or an `error` frame from the backend (`error`).
    Error,
    /// The reconnect ceiling was reached (`maxReconnectAttempts`).
    MaxReconnectAttempts,
    /// Every decoded frame except `pong` (`message`).
    Message,
    Ping,
    Pong,
    Typing,
    AgentJoined,
    AgentLeft,
    ConversationEscalated,
    ConversationClosed,
    NewTicket,
    TicketUpdate,
    NewMessage,
    Stats,
    /// Unknown/unhandled frame type.
    Unknown(String),
}

impl EventType {
    /// Parse an event name.
    pub fn from_str(s: &str) -> Self {
        match s {
            "connected" => Self::Connected,
            "disconnected" => Self::Disconnected,
            "error" => Self::Error,
            "maxReconnectAttempts" => Self::MaxReconnectAttempts,
            "message" => Self::Message,
            "ping" => Self::Ping,
            "pong" => Self::Pong,
            "typing" => Self::Typing,
            "agent_joined" => Self::AgentJoined,
            "agent_left" => Self::AgentLeft,
            "conversation_escalated" => Self::ConversationEscalated,
            "conversation_closed" => Self::ConversationClosed,
            "new_ticket" => Self::NewTicket,
            "ticket_update" => Self::TicketUpdate,
            "new_message" => Self::NewMessage,
            "stats" => Self::Stats,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Convert to the event name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
            Self::MaxReconnectAttempts => "maxReconnectAttempts",
            Self::Message => "message",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Typing => "typing",
            Self::AgentJoined => "agent_joined",
            Self::AgentLeft => "agent_left",
            Self::ConversationEscalated => "conversation_escalated",
            Self::ConversationClosed => "conversation_closed",
            Self::NewTicket => "new_ticket",
            Self::TicketUpdate => "ticket_update",
            Self::NewMessage => "new_message",
            Self::Stats => "stats",
            Self::Unknown(s) => s.as_str(),
        }
    }

    /// Whether the client produces this event itself rather than a frame.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::Connected | Self::Disconnected | Self::MaxReconnectAttempts
        )
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Close code and reason reported with `disconnected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

impl CloseInfo {
    /// Normal closure.
    pub const NORMAL: u16 = 1000;
    /// Close frame without a status code.
    pub const NO_STATUS: u16 = 1005;
    /// Connection dropped without a close frame.
    pub const ABNORMAL: u16 = 1006;

    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub fn abnormal() -> Self {
        Self::new(Self::ABNORMAL, "")
    }
}

/// Payload handed to listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connected,
    Disconnected(CloseInfo),
    /// Transport error description.
    Error(String),
    MaxReconnectAttempts,
    /// A decoded inbound frame.
    Frame(Frame),
}

impl Event {
    /// The frame carried by this event, if any.
    pub fn frame(&self) -> Option<&Frame> {
        match self {
            Event::Frame(frame) => Some(frame),
            _ => None,
        }
    }
}

/// A registered callback. Identity (for `off`) is the allocation behind the Arc.
pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Listener registry keyed by event type.
///
/// Cloning shares the registry. Listeners run on the emitting task; the
/// registry lock is released before any listener is called, so listeners may
/// register, unregister or send re-entrantly.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    listeners: Arc<Mutex<HashMap<EventType, Vec<Listener>>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<EventType, Vec<Listener>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a listener. Registering the same listener twice calls it twice.
    pub fn on(&self, event_type: impl Into<EventType>, listener: Listener) {
        self.registry()
            .entry(event_type.into())
            .or_default()
            .push(listener);
    }

    /// Remove every registration of `listener` for `event_type`.
    pub fn off(&self, event_type: impl Into<EventType>, listener: &Listener) {
        let event_type = event_type.into();
        let mut registry = self.registry();
        if let Some(list) = registry.get_mut(&event_type) {
            list.retain(|l| !same_listener(l, listener));
            if list.is_empty() {
                registry.remove(&event_type);
            }
        }
    }

    /// Call every listener of `event_type` in subscription order.
    ///
    /// A panicking listener is logged and skipped; the rest still run.
    pub fn emit(&self, event_type: &EventType, event: &Event) {
        let snapshot: Vec<Listener> = match self.registry().get(event_type) {
            Some(list) => list.clone(),
            None => return,
        };

        debug!("emitting {event_type} to {} listener(s)", snapshot.len());
        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!("listener for {event_type} panicked");
            }
        }
    }

    /// Drop every listener.
    pub fn clear(&self) {
        self.registry().clear();
    }

    /// Number of listeners registered for `event_type`.
    pub fn listener_count(&self, event_type: impl Into<EventType>) -> usize {
        self.registry()
            .get(&event_type.into())
            .map_or(0, Vec::len)
    }
}

fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Connection state for the realtime client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected and not trying to connect.
    Disconnected,
    /// Opening the first socket of a session.
    Connecting,
    /// Socket open, frames flowing.
    Connected,
    /// Connection lost, a reconnect is scheduled or in flight.
    Reconnecting,
    /// `disconnect()` was called; no automatic reconnects.
    ClosedIntentionally,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::ClosedIntentionally => write!(f, "closed"),
        }
    }
}
