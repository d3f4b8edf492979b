//! Admin conversation listing.

use sb_core::error::SbResult;

use crate::client::ApiClient;
use crate::endpoints::Listing;
use crate::response::Conversation;

impl ApiClient {
    /// List conversations, optionally filtered by status.
    pub async fn list_conversations(
        &self,
        status: Option<&str>,
        limit: u32,
    ) -> SbResult<Vec<Conversation>> {
        let resp: Listing<Conversation> = self
            .get_json(&conversations_path(status, limit))
            .await?;
        Ok(resp.into_items())
    }

    /// Get a single conversation by id.
    pub async fn get_conversation(&self, id: &str) -> SbResult<Conversation> {
        self.get_json(&format!("/conversations/{id}")).await
    }
}

fn conversations_path(status: Option<&str>, limit: u32) -> String {
    match status.filter(|s| !s.is_empty() && *s != "all") {
        Some(status) => format!("/conversations/?status={status}&limit={limit}"),
        None => format!("/conversations/?limit={limit}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversations_path() {
        assert_eq!(conversations_path(None, 20), "/conversations/?limit=20");
        assert_eq!(conversations_path(Some("all"), 5), "/conversations/?limit=5");
        assert_eq!(
            conversations_path(Some("active"), 50),
            "/conversations/?status=active&limit=50"
        );
    }
}
