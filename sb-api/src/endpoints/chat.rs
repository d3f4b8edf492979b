//! Public chat endpoints used by the widget.
//!
//! None of these need authentication; the conversation id is the only
//! handle the widget holds.

use serde_json::{json, Value};
use tracing::info;

use sb_core::constants::{self, categories, priorities};
use sb_core::error::{SbError, SbResult};

use crate::client::ApiClient;
use crate::endpoints::tickets::validate_text;
use crate::response::{ChatHistory, ChatReply, EscalationResult, StartedConversation, StatusResponse};

/// Source tag the backend records for widget conversations.
pub const WIDGET_SOURCE: &str = "web-widget";

/// Anonymous visitor id used when the widget has none configured.
pub fn fallback_user_id() -> String {
    format!("user_{}", chrono::Utc::now().timestamp_millis())
}

impl ApiClient {
    /// Open a conversation for a visitor.
    pub async fn start_conversation(&self, user_id: Option<&str>) -> SbResult<StartedConversation> {
        let user_id = user_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(fallback_user_id);
        let body = json!({
            "user_id": user_id,
            "metadata": { "source": WIDGET_SOURCE },
        });

        let started: StartedConversation = self.post_json("/chat/start", &body).await?;
        info!("conversation {} started for {}", started.conversation_id, user_id);
        Ok(started)
    }

    /// Send a visitor message and wait for the bot's answer.
    pub async fn send_chat_message(
        &self,
        conversation_id: &str,
        message: &str,
        context: Option<Value>,
    ) -> SbResult<ChatReply> {
        let message = validate_text(message)?;
        let body = json!({
            "conversation_id": conversation_id,
            "message": message,
            "context": context.unwrap_or_else(|| json!({})),
        });
        self.post_json("/chat/message", &body).await
    }

    /// Full transcript of a conversation.
    pub async fn chat_history(&self, conversation_id: &str) -> SbResult<ChatHistory> {
        self.get_json(&format!("/chat/history/{conversation_id}"))
            .await
    }

    /// Hand the conversation over to a human agent. Creates a ticket.
    pub async fn escalate_conversation(
        &self,
        conversation_id: &str,
        category: &str,
        priority: &str,
        description: Option<&str>,
    ) -> SbResult<EscalationResult> {
        if !constants::is_one_of(category, categories::ALL) {
            return Err(SbError::InvalidInput(format!("unknown category: {category}")));
        }
        if !constants::is_one_of(priority, priorities::ALL) {
            return Err(SbError::InvalidInput(format!("unknown priority: {priority}")));
        }
        let body = json!({
            "conversation_id": conversation_id,
            "category": category,
            "priority": priority,
            "description": description.unwrap_or("Customer requested human assistance"),
            "metadata": { "source": WIDGET_SOURCE },
        });

        let result: EscalationResult = self.post_json("/chat/escalate", &body).await?;
        info!("conversation {} escalated as ticket #{}", conversation_id, result.ticket_id);
        Ok(result)
    }

    /// Close a conversation, optionally attaching free-form feedback.
    pub async fn end_conversation(
        &self,
        conversation_id: &str,
        feedback: Option<Value>,
    ) -> SbResult<StatusResponse> {
        let body = json!({
            "conversation_id": conversation_id,
            "feedback": feedback,
        });
        self.post_json("/chat/end", &body).await
    }

    /// Rate a conversation from 1 to 5.
    pub async fn send_feedback(
        &self,
        conversation_id: &str,
        rating: u8,
        comment: Option<&str>,
    ) -> SbResult<StatusResponse> {
        if !(1..=5).contains(&rating) {
            return Err(SbError::InvalidInput(format!("rating must be 1-5, got {rating}")));
        }
        let body = json!({
            "conversation_id": conversation_id,
            "rating": rating,
            "comment": comment.unwrap_or(""),
        });
        self.post_json("/chat/feedback", &body).await
    }

    /// Widget theme, features and quick replies.
    pub async fn widget_config(&self) -> SbResult<Value> {
        self.get_json("/chat/config").await
    }

    /// Backend liveness probe.
    pub async fn health(&self) -> SbResult<Value> {
        self.get_json("/health").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_core::config::ServerConfig;

    #[test]
    fn test_fallback_user_id_format() {
        let id = fallback_user_id();
        let millis = id.strip_prefix("user_").unwrap();
        assert!(millis.parse::<i64>().unwrap() > 1_600_000_000_000);
    }

    #[tokio::test]
    async fn test_escalation_validates_before_request() {
        let client = ApiClient::new(&ServerConfig::default()).unwrap();
        let err = client
            .escalate_conversation("c-1", "crypto", "high", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SbError::InvalidInput(_)));

        let err = client
            .escalate_conversation("c-1", "card", "whenever", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SbError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_feedback_rating_range() {
        let client = ApiClient::new(&ServerConfig::default()).unwrap();
        for rating in [0, 6] {
            let err = client.send_feedback("c-1", rating, None).await.unwrap_err();
            assert!(matches!(err, SbError::InvalidInput(_)));
        }
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let client = ApiClient::new(&ServerConfig::default()).unwrap();
        let err = client.send_chat_message("c-1", "  ", None).await.unwrap_err();
        assert!(matches!(err, SbError::InvalidInput(_)));
    }
}
