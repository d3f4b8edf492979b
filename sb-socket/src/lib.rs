//! SupportBot Socket - realtime client for the support backend.
//!
//! This crate provides the WebSocket session shared by the admin dashboard and
//! the customer chat widget:
//! - Frame codec for the JSON messages exchanged with the backend
//! - Listener registry keyed by event type
//! - Automatic reconnection with linear backoff and an attempt ceiling
//! - Keep-alive pings for the admin session
//! - A transport seam so sessions can run over an in-memory double in tests

pub mod endpoint;
pub mod events;
pub mod frame;
pub mod manager;
pub mod reconnect;
pub mod transport;

// Re-export key types
pub use endpoint::{Endpoint, Variant};
pub use events::{CloseInfo, ConnectionState, Event, EventDispatcher, EventType, Listener};
pub use frame::{
    AgentPayload, ChatMessagePayload, ConversationNotice, Frame, ServerErrorPayload,
    StatsPayload, TicketMessagePayload, TicketPayload, TypingPayload,
};
pub use manager::{ClientOptions, RealtimeClient};
pub use reconnect::ReconnectPolicy;
pub use transport::{Connection, Transport, TungsteniteTransport, WireMessage};
