//! CLI command implementations.

pub mod chat;
pub mod login;
pub mod monitor;
pub mod status;
pub mod tickets;

use std::sync::Arc;

use console::style;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use sb_api::ApiClient;
use sb_core::config::ConfigHandle;
use sb_core::error::{SbError, SbResult};
use sb_socket::{Event, EventType, Frame, RealtimeClient, Transport};

/// Helper to create an API client from config, carrying the stored token.
pub async fn create_api_client(config: &ConfigHandle) -> SbResult<ApiClient> {
    let cfg = config.read().await;
    ApiClient::from_config(&cfg)
}

/// Like [`create_api_client`] but fails early without a token.
pub async fn create_agent_client(config: &ConfigHandle) -> SbResult<ApiClient> {
    let client = create_api_client(config).await?;
    if !client.has_token() {
        return Err(SbError::AuthFailed(
            "not logged in; run `supportbot login` first".into(),
        ));
    }
    Ok(client)
}

/// Funnel every event of a realtime client into a channel, once each.
///
/// Frames are taken from the `message` listener, which sees all of them;
/// the lifecycle listeners only forward lifecycle events so server `error`
/// frames are not reported twice.
pub fn forward_events<T: Transport>(
    client: &RealtimeClient<T>,
) -> mpsc::UnboundedReceiver<(EventType, Event)> {
    let (tx, rx) = mpsc::unbounded_channel();

    let frames = tx.clone();
    client.on(
        EventType::Message,
        Arc::new(move |event: &Event| {
            if let Some(frame) = event.frame() {
                let event_type = frame.event_type().unwrap_or(EventType::Message);
                let _ = frames.send((event_type, event.clone()));
            }
        }),
    );

    for event_type in [
        EventType::Connected,
        EventType::Disconnected,
        EventType::Error,
        EventType::MaxReconnectAttempts,
    ] {
        let lifecycle = tx.clone();
        let kind = event_type.clone();
        client.on(
            event_type,
            Arc::new(move |event: &Event| {
                if event.frame().is_none() {
                    let _ = lifecycle.send((kind.clone(), event.clone()));
                }
            }),
        );
    }

    rx
}

/// Print a value as pretty JSON.
pub fn print_json(value: &Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// Truncate a string to a maximum number of characters, appending an ellipsis.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

/// One-line human description of a realtime event.
pub fn describe_event(event_type: &EventType, event: &Event) -> String {
    match event {
        Event::Connected => style("connected").green().to_string(),
        Event::Disconnected(close) if close.reason.is_empty() => {
            format!("{} (code {})", style("disconnected").yellow(), close.code)
        }
        Event::Disconnected(close) => format!(
            "{} (code {}: {})",
            style("disconnected").yellow(),
            close.code,
            close.reason
        ),
        Event::Error(message) => format!("{} {message}", style("error").red()),
        Event::MaxReconnectAttempts => style("gave up reconnecting").red().bold().to_string(),
        Event::Frame(frame) => describe_frame(frame).unwrap_or_else(|| {
            format!("{}: {}", event_type, frame.to_value())
        }),
    }
}

fn describe_frame(frame: &Frame) -> Option<String> {
    let text = match frame {
        Frame::Typing(p) => {
            let who = p.agent_name.as_deref().unwrap_or("someone");
            match (p.is_typing, p.ticket_id) {
                (true, Some(id)) => format!("{who} is typing on ticket #{id}"),
                (true, None) => format!("{who} is typing..."),
                (false, _) => format!("{who} stopped typing"),
            }
        }
        Frame::Message(p) => format!("{}: {}", p.sender.as_deref().unwrap_or("bot"), p.message),
        Frame::AgentJoined(p) => format!(
            "agent {} joined",
            p.agent_name.as_deref().unwrap_or("(unknown)")
        ),
        Frame::AgentLeft(p) => format!(
            "agent {} left",
            p.agent_name.as_deref().unwrap_or("(unknown)")
        ),
        Frame::ConversationEscalated(n) => match n.ticket_id {
            Some(id) => format!("conversation escalated as ticket #{id}"),
            None => "conversation escalated".to_string(),
        },
        Frame::ConversationClosed(n) => format!(
            "conversation closed{}",
            n.message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
        ),
        Frame::NewTicket(p) => format!(
            "new ticket #{} {}",
            p.ticket_id().unwrap_or_default(),
            p.data.get("subject").and_then(Value::as_str).unwrap_or("")
        ),
        Frame::TicketUpdate(p) => format!(
            "ticket #{} updated ({})",
            p.ticket_id().unwrap_or_default(),
            p.data.get("status").and_then(Value::as_str).unwrap_or("?")
        ),
        Frame::NewMessage(p) => format!(
            "new message on ticket #{}",
            p.ticket_id.unwrap_or_default()
        ),
        Frame::Stats(p) => format!("stats {}", p.data),
        Frame::Error(p) => format!("{} {}", style("server error").red(), p.message),
        Frame::Ping | Frame::Pong | Frame::Other { .. } | Frame::Untyped(_) => return None,
    };
    Some(text)
}

/// JSON line for `--format json` event output.
pub fn event_json(event_type: &EventType, event: &Event) -> Value {
    let data = match event {
        Event::Connected | Event::MaxReconnectAttempts => Value::Null,
        Event::Disconnected(close) => json!({ "code": close.code, "reason": close.reason }),
        Event::Error(message) => json!({ "message": message }),
        Event::Frame(frame) => frame.to_value(),
    };
    json!({
        "event": event_type.as_str(),
        "at": chrono::Utc::now().to_rfc3339(),
        "data": data,
    })
}
