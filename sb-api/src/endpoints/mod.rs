//! API endpoint modules organized by category.
//!
//! Each module adds typed methods on [`ApiClient`](crate::ApiClient) for a
//! group of related backend routes.

pub mod auth;
pub mod chat;
pub mod conversations;
pub mod tickets;

use serde::Deserialize;

/// List endpoints answer either with a bare array or wrapped in an object
/// keyed by the collection name plus a total.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "tickets", alias = "conversations", alias = "messages", alias = "items")]
        items: Vec<T>,
    },
}

impl<T> Listing<T> {
    pub(crate) fn into_items(self) -> Vec<T> {
        match self {
            Listing::Bare(items) | Listing::Wrapped { items } => items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_accepts_both_shapes() {
        let bare: Listing<i64> = serde_json::from_str("[1,2]").unwrap();
        assert_eq!(bare.into_items(), vec![1, 2]);

        let wrapped: Listing<i64> = serde_json::from_str(r#"{"tickets":[3],"total":1}"#).unwrap();
        assert_eq!(wrapped.into_items(), vec![3]);
    }
}
