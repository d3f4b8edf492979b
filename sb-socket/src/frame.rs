//! JSON frames exchanged over the realtime socket.
//!
//! Inbound text is decoded once into [`Frame`]; listeners never see raw text.
//! Outbound frames are built by the constructors at the bottom of this module.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use sb_core::error::{SbError, SbResult};

use crate::events::EventType;

/// Typing indicator. The widget backend sends `is_typing`, the admin
/// dashboard uses `isTyping` + `ticketId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingPayload {
    #[serde(alias = "isTyping", default)]
    pub is_typing: bool,
    #[serde(alias = "ticketId", default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
}

/// A chat message pushed into a widget conversation (bot or agent reply).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessagePayload {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// An agent joined or left a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<i64>,
}

/// Escalation or closure of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationNotice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Ticket snapshot broadcast to admin sessions (`new_ticket`, `ticket_update`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketPayload {
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl TicketPayload {
    /// Ticket id from the snapshot, when present.
    pub fn ticket_id(&self) -> Option<i64> {
        self.data.get("id").and_then(Value::as_i64)
    }
}

/// A message added to a ticket thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketMessagePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub data: Value,
}

/// Dashboard statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsPayload {
    pub data: Value,
}

/// Error reported by the backend over the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerErrorPayload {
    #[serde(default)]
    pub message: String,
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Ping,
    /// Keep-alive reply. Swallowed by the client.
    Pong,
    Typing(TypingPayload),
    Message(ChatMessagePayload),
    AgentJoined(AgentPayload),
    AgentLeft(AgentPayload),
    ConversationEscalated(ConversationNotice),
    ConversationClosed(ConversationNotice),
    NewTicket(TicketPayload),
    TicketUpdate(TicketPayload),
    NewMessage(TicketMessagePayload),
    Stats(StatsPayload),
    Error(ServerErrorPayload),
    /// A `type` this client has no model for, or a known type whose payload
    /// did not match its model.
    Other { kind: String, data: Value },
    /// Valid JSON without a string `type` field.
    Untyped(Value),
}

impl Frame {
    /// Decode one text message. Fails only when the text is not JSON.
    pub fn decode(text: &str) -> SbResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| SbError::Serialization(format!("frame parse error: {e}")))?;
        Ok(Self::from_value(value))
    }

    /// Classify an already-parsed JSON value.
    pub fn from_value(value: Value) -> Self {
        let kind = match value
            .get("type")
            .and_then(Value::as_str)
            .filter(|kind| !kind.is_empty())
        {
            Some(kind) => kind.to_string(),
            None => return Frame::Untyped(value),
        };

        let decoded = match kind.as_str() {
            "ping" => Some(Frame::Ping),
            "pong" => Some(Frame::Pong),
            "typing" => typed(&value).map(Frame::Typing),
            "message" => typed(&value).map(Frame::Message),
            "agent_joined" => typed(&value).map(Frame::AgentJoined),
            "agent_left" => typed(&value).map(Frame::AgentLeft),
            "conversation_escalated" => typed(&value).map(Frame::ConversationEscalated),
            "conversation_closed" => typed(&value).map(Frame::ConversationClosed),
            "new_ticket" => typed(&value).map(Frame::NewTicket),
            "ticket_update" => typed(&value).map(Frame::TicketUpdate),
            "new_message" => typed(&value).map(Frame::NewMessage),
            "stats" => typed(&value).map(Frame::Stats),
            "error" => typed(&value).map(Frame::Error),
            _ => None,
        };

        decoded.unwrap_or(Frame::Other { kind, data: value })
    }

    /// The `type` string carried by the frame, if any.
    pub fn kind(&self) -> Option<&str> {
        Some(match self {
            Frame::Ping => "ping",
            Frame::Pong => "pong",
            Frame::Typing(_) => "typing",
            Frame::Message(_) => "message",
            Frame::AgentJoined(_) => "agent_joined",
            Frame::AgentLeft(_) => "agent_left",
            Frame::ConversationEscalated(_) => "conversation_escalated",
            Frame::ConversationClosed(_) => "conversation_closed",
            Frame::NewTicket(_) => "new_ticket",
            Frame::TicketUpdate(_) => "ticket_update",
            Frame::NewMessage(_) => "new_message",
            Frame::Stats(_) => "stats",
            Frame::Error(_) => "error",
            Frame::Other { kind, .. } => kind.as_str(),
            Frame::Untyped(_) => return None,
        })
    }

    /// Event type this frame is dispatched under, besides `message`.
    pub fn event_type(&self) -> Option<EventType> {
        self.kind().map(EventType::from_str)
    }

    /// Re-encode the frame as JSON, for display.
    pub fn to_value(&self) -> Value {
        fn tagged<T: Serialize>(kind: &str, payload: &T) -> Value {
            let mut value = serde_json::to_value(payload).unwrap_or(Value::Null);
            match value.as_object_mut() {
                Some(map) => {
                    map.insert("type".into(), Value::String(kind.into()));
                    value
                }
                None => json!({ "type": kind }),
            }
        }

        match self {
            Frame::Ping => json!({ "type": "ping" }),
            Frame::Pong => json!({ "type": "pong" }),
            Frame::Typing(p) => tagged("typing", p),
            Frame::Message(p) => tagged("message", p),
            Frame::AgentJoined(p) => tagged("agent_joined", p),
            Frame::AgentLeft(p) => tagged("agent_left", p),
            Frame::ConversationEscalated(p) => tagged("conversation_escalated", p),
            Frame::ConversationClosed(p) => tagged("conversation_closed", p),
            Frame::NewTicket(p) => tagged("new_ticket", p),
            Frame::TicketUpdate(p) => tagged("ticket_update", p),
            Frame::NewMessage(p) => tagged("new_message", p),
            Frame::Stats(p) => tagged("stats", p),
            Frame::Error(p) => tagged("error", p),
            Frame::Other { data, .. } | Frame::Untyped(data) => data.clone(),
        }
    }
}

fn typed<T: serde::de::DeserializeOwned>(value: &Value) -> Option<T> {
    serde_json::from_value(value.clone()).ok()
}

// Outbound frames

/// Keep-alive ping.
pub fn ping() -> Value {
    json!({ "type": "ping" })
}

/// Widget typing indicator.
pub fn widget_typing(is_typing: bool) -> Value {
    json!({ "type": "typing", "is_typing": is_typing })
}

/// Admin typing indicator on a ticket thread.
pub fn ticket_typing(ticket_id: i64, is_typing: bool) -> Value {
    json!({ "type": "typing", "ticketId": ticket_id, "isTyping": is_typing })
}

/// Subscribe to updates for one ticket.
pub fn subscribe_ticket(ticket_id: i64) -> Value {
    json!({ "type": "subscribe", "channel": "ticket", "ticketId": ticket_id })
}

/// Stop receiving updates for one ticket.
pub fn unsubscribe_ticket(ticket_id: i64) -> Value {
    json!({ "type": "unsubscribe", "channel": "ticket", "ticketId": ticket_id })
}

/// Subscribe to dashboard statistics.
pub fn subscribe_stats() -> Value {
    json!({ "type": "subscribe", "channel": "stats" })
}
