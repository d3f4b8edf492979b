//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "SupportBot";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// REST API version prefix.
pub const API_VERSION: &str = "v1";

/// Default backend address used when nothing is configured.
pub const DEFAULT_SERVER_ADDRESS: &str = "http://localhost:8000";

/// Default REST request timeout in milliseconds.
pub const DEFAULT_API_TIMEOUT_MS: u64 = 30_000;

/// Base delay between realtime reconnect attempts; attempt N waits N times this.
pub const RECONNECT_DELAY_MS: u64 = 3_000;

/// Consecutive reconnect attempts before the client gives up.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Keep-alive ping interval for the admin realtime session.
pub const KEEPALIVE_INTERVAL_MS: u64 = 30_000;

/// Admin realtime endpoint path (token goes in the query string).
pub const ADMIN_WS_PATH: &str = "/api/v1/conversations/ws/admin";

/// Widget realtime endpoint path prefix (conversation id is appended).
pub const WIDGET_WS_PATH: &str = "/ws/chat";

/// Maximum length of a chat message typed into the widget.
pub const MAX_MESSAGE_LENGTH: usize = 1000;

/// Escalation categories accepted by `/chat/escalate`.
pub mod categories {
    pub const GENERAL: &str = "general";
    pub const TECHNICAL: &str = "technical";
    pub const ACCOUNT: &str = "account";
    pub const TRANSACTION: &str = "transaction";
    pub const LOAN: &str = "loan";
    pub const CARD: &str = "card";
    pub const COMPLAINT: &str = "complaint";
    pub const OTHER: &str = "other";

    pub const ALL: &[&str] = &[
        GENERAL, TECHNICAL, ACCOUNT, TRANSACTION, LOAN, CARD, COMPLAINT, OTHER,
    ];
}

/// Ticket and escalation priorities.
pub mod priorities {
    pub const LOW: &str = "low";
    pub const MEDIUM: &str = "medium";
    pub const HIGH: &str = "high";
    pub const URGENT: &str = "urgent";

    pub const ALL: &[&str] = &[LOW, MEDIUM, HIGH, URGENT];
}

/// Ticket workflow statuses.
pub mod ticket_status {
    pub const OPEN: &str = "open";
    pub const IN_PROGRESS: &str = "in_progress";
    pub const WAITING: &str = "waiting";
    pub const RESOLVED: &str = "resolved";
    pub const CLOSED: &str = "closed";

    pub const ALL: &[&str] = &[OPEN, IN_PROGRESS, WAITING, RESOLVED, CLOSED];
}

/// Check a value against one of the constant lists above.
pub fn is_one_of(value: &str, allowed: &[&str]) -> bool {
    allowed.iter().any(|a| a.eq_ignore_ascii_case(value))
}
