//! SupportBot API - HTTP client for the support backend REST API.
//!
//! This crate provides a typed HTTP client for the endpoint groups the admin
//! dashboard and the chat widget talk to: authentication, tickets,
//! conversations and the public chat API. It handles bearer authentication,
//! custom headers, timeouts, FastAPI error bodies and automatic retry with
//! exponential backoff.

pub mod client;
pub mod endpoints;
pub mod response;

// Re-export key types
pub use client::{ApiClient, RetryConfig};
pub use endpoints::tickets::TicketFilters;
pub use endpoints::chat::fallback_user_id;
pub use response::{
    ApiErrorBody, ChatHistory, ChatMessage, ChatReply, Conversation, EscalationResult,
    LoginResponse, StartedConversation, StatusResponse, Ticket, UserInfo, VerifyResponse,
};
