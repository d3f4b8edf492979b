//! Response types for the support backend REST API.
//!
//! The backend returns bare JSON objects (no envelope). Errors follow the
//! FastAPI convention `{"detail": ...}`; a few handlers use `{"message": ...}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// FastAPI error detail: a string, or a list of validation errors.
    #[serde(default)]
    pub detail: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// Best human-readable message from an error response body.
    ///
    /// Falls back to the raw text when the body is not JSON.
    pub fn message_from(body: &str) -> String {
        let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
        let from_json = parsed.and_then(|b| match b.detail {
            Some(Value::String(s)) => Some(s),
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|item| {
                        item.get("msg")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .unwrap_or_else(|| item.to_string())
                    })
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            Some(other) => Some(other.to_string()),
            None => b.message,
        });
        from_json.unwrap_or_else(|| body.trim().to_string())
    }
}

/// Logged-in agent profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
}

/// `POST /auth/login` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

/// `GET /auth/verify` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub user: Option<Value>,
}

/// A support ticket as listed in the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<i64>,
    #[serde(default)]
    pub assigned_to_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Ticket {
    /// Subject line, or a placeholder.
    pub fn title(&self) -> &str {
        self.subject.as_deref().unwrap_or("(no subject)")
    }
}

/// A widget conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub escalated: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// One message in a conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: Option<String>,
    /// `user`, `assistant` or `system`.
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// `POST /chat/start` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartedConversation {
    pub conversation_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// `POST /chat/message` response: the bot's reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// `GET /chat/history/{id}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHistory {
    pub conversation: Conversation,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// `POST /chat/escalate` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationResult {
    pub ticket_id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Generic `{status, message}` acknowledgement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_string() {
        let msg = ApiErrorBody::message_from(r#"{"detail":"Conversation not found"}"#);
        assert_eq!(msg, "Conversation not found");
    }

    #[test]
    fn test_error_detail_validation_list() {
        let body = r#"{"detail":[{"loc":["body","rating"],"msg":"field required","type":"value_error.missing"},{"msg":"value is not a valid integer"}]}"#;
        assert_eq!(
            ApiErrorBody::message_from(body),
            "field required; value is not a valid integer"
        );
    }

    #[test]
    fn test_error_message_and_plain_text() {
        assert_eq!(ApiErrorBody::message_from(r#"{"message":"Sesión expirada"}"#), "Sesión expirada");
        assert_eq!(ApiErrorBody::message_from("Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn test_ticket_parsing() {
        let json = serde_json::json!({
            "id": 3,
            "conversation_id": "c-1",
            "subject": "Escalation: card",
            "status": "open",
            "priority": "high",
            "category": "card",
            "assigned_to": null,
            "tags": ["card", "high"],
            "conversation_history": []
        });
        let ticket: Ticket = serde_json::from_value(json).unwrap();
        assert_eq!(ticket.id, 3);
        assert_eq!(ticket.title(), "Escalation: card");
        assert_eq!(ticket.assigned_to, None);
        assert_eq!(ticket.tags, vec!["card", "high"]);
    }

    #[test]
    fn test_started_conversation_parsing() {
        let json = serde_json::json!({
            "conversation_id": "0b9f",
            "status": "started",
            "messages": [{
                "id": "msg_0",
                "conversation_id": "0b9f",
                "role": "assistant",
                "content": "Hola",
                "timestamp": "2024-05-01T10:00:00",
                "metadata": {"type": "welcome"}
            }]
        });
        let started: StartedConversation = serde_json::from_value(json).unwrap();
        assert_eq!(started.conversation_id, "0b9f");
        assert_eq!(started.messages.len(), 1);
        assert_eq!(started.messages[0].role, "assistant");
    }
}
