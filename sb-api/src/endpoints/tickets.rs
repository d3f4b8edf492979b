//! Ticket endpoints used by the admin dashboard.

use serde::Serialize;
use serde_json::{json, Value};
use url::form_urlencoded;

use sb_core::constants::{self, priorities, ticket_status};
use sb_core::error::{SbError, SbResult};

use crate::client::ApiClient;
use crate::endpoints::Listing;
use crate::response::Ticket;

/// Filters for the ticket list. `None` or `"all"` means no filter.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TicketFilters {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
}

impl TicketFilters {
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Encoded query string, empty when no filter applies.
    pub fn query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in [
            ("status", &self.status),
            ("priority", &self.priority),
            ("category", &self.category),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty() && *v != "all") {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }

    fn path(&self) -> String {
        let query = self.query_string();
        if query.is_empty() {
            "/tickets".to_string()
        } else {
            format!("/tickets?{query}")
        }
    }
}

impl ApiClient {
    /// List tickets matching the filters.
    pub async fn list_tickets(&self, filters: &TicketFilters) -> SbResult<Vec<Ticket>> {
        let resp: Listing<Ticket> = self.get_json(&filters.path()).await?;
        Ok(resp.into_items())
    }

    /// Get a ticket by id.
    pub async fn get_ticket(&self, ticket_id: i64) -> SbResult<Ticket> {
        self.get_json(&format!("/tickets/{ticket_id}")).await
    }

    /// Assign a ticket to an agent.
    pub async fn assign_ticket(&self, ticket_id: i64, agent_id: i64) -> SbResult<Value> {
        let body = json!({ "agentId": agent_id });
        self.post_json(&format!("/tickets/{ticket_id}/assign"), &body)
            .await
    }

    /// Move a ticket to another status.
    pub async fn update_ticket_status(&self, ticket_id: i64, status: &str) -> SbResult<Value> {
        if !constants::is_one_of(status, ticket_status::ALL) {
            return Err(SbError::InvalidInput(format!("unknown ticket status: {status}")));
        }
        let body = json!({ "status": status });
        self.patch_json(&format!("/tickets/{ticket_id}/status"), &body)
            .await
    }

    /// Change a ticket's priority.
    pub async fn update_ticket_priority(&self, ticket_id: i64, priority: &str) -> SbResult<Value> {
        if !constants::is_one_of(priority, priorities::ALL) {
            return Err(SbError::InvalidInput(format!("unknown priority: {priority}")));
        }
        let body = json!({ "priority": priority });
        self.patch_json(&format!("/tickets/{ticket_id}/priority"), &body)
            .await
    }

    /// Messages exchanged on a ticket.
    pub async fn ticket_messages(&self, ticket_id: i64) -> SbResult<Vec<Value>> {
        let resp: Listing<Value> = self
            .get_json(&format!("/tickets/{ticket_id}/messages"))
            .await?;
        Ok(resp.into_items())
    }

    /// Reply to the customer on a ticket.
    pub async fn send_ticket_message(&self, ticket_id: i64, message: &str) -> SbResult<Value> {
        let message = validate_text(message)?;
        let body = json!({ "message": message });
        self.post_json(&format!("/tickets/{ticket_id}/messages"), &body)
            .await
    }

    /// Add an internal note to a ticket.
    pub async fn add_ticket_note(&self, ticket_id: i64, note: &str) -> SbResult<Value> {
        let note = validate_text(note)?;
        let body = json!({ "note": note });
        self.post_json(&format!("/tickets/{ticket_id}/notes"), &body)
            .await
    }

    /// Audit trail of a ticket.
    pub async fn ticket_history(&self, ticket_id: i64) -> SbResult<Vec<Value>> {
        let resp: Listing<Value> = self
            .get_json(&format!("/tickets/{ticket_id}/history"))
            .await?;
        Ok(resp.into_items())
    }
}

/// Trim user-entered text and enforce the length limit.
pub(crate) fn validate_text(text: &str) -> SbResult<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SbError::InvalidInput("message is empty".into()));
    }
    if text.chars().count() > constants::MAX_MESSAGE_LENGTH {
        return Err(SbError::InvalidInput(format!(
            "message exceeds {} characters",
            constants::MAX_MESSAGE_LENGTH
        )));
    }
    Ok(text)
}
