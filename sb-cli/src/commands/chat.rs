//! Chat command - talk to the assistant as a widget visitor.
//!
//! Messages go out over REST; agent replies, typing indicators and
//! escalation notices arrive over the widget realtime channel.

use console::style;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use sb_api::{ApiClient, ChatMessage};
use sb_core::config::ConfigHandle;
use sb_core::constants::{categories, priorities};
use sb_core::error::{SbError, SbResult};
use sb_socket::{Event, EventType, Frame, RealtimeClient, Variant};

use crate::OutputFormat;

/// In-session commands typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Say(&'a str),
    Escalate {
        category: &'a str,
        priority: &'a str,
    },
    End,
    Quit,
    Empty,
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let mut words = line.split_whitespace();
    match words.next() {
        Some("/quit") | Some("/exit") => Input::Quit,
        Some("/end") => Input::End,
        Some("/escalate") => Input::Escalate {
            category: words.next().unwrap_or(categories::GENERAL),
            priority: words.next().unwrap_or(priorities::MEDIUM),
        },
        _ => Input::Say(line),
    }
}

/// Run the chat command.
pub async fn run(config: ConfigHandle, user_id: Option<String>, format: OutputFormat) -> SbResult<()> {
    let (api, socket, user_id) = {
        let cfg = config.read().await;
        let user_id = user_id.or_else(|| {
            Some(cfg.widget.user_id.clone()).filter(|id| !id.is_empty())
        });
        (
            ApiClient::new(&cfg.server)?,
            RealtimeClient::from_config(Variant::Widget, &cfg),
            user_id,
        )
    };

    let started = api.start_conversation(user_id.as_deref()).await?;
    let conversation_id = started.conversation_id.clone();

    match format {
        OutputFormat::Json => super::print_json(&json!({
            "conversation_id": conversation_id,
            "messages": started.messages,
        })),
        OutputFormat::Text => {
            println!(
                "{} Conversation {} (/escalate [category] [priority], /end, /quit)",
                style("[chat]").bold().dim(),
                conversation_id
            );
            for message in &started.messages {
                print_transcript_line(message);
            }
        }
    }

    let mut events = super::forward_events(&socket);
    socket.connect(conversation_id.clone());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let outcome = loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(SbError::Io(e)),
                };

                match parse_input(&line) {
                    Input::Empty => {}
                    Input::Quit => break Ok(()),
                    Input::End => {
                        let ended = api.end_conversation(&conversation_id, None).await;
                        if let (Ok(_), OutputFormat::Text) = (&ended, format) {
                            println!("  {}", style("conversation ended").dim());
                        }
                        break ended.map(|_| ());
                    }
                    Input::Escalate { category, priority } => {
                        match api.escalate_conversation(&conversation_id, category, priority, None).await {
                            Ok(result) => match format {
                                OutputFormat::Json => super::print_json(&json!({
                                    "ticket_id": result.ticket_id,
                                    "status": result.status,
                                })),
                                OutputFormat::Text => println!(
                                    "  {} ticket #{} opened, an agent will join shortly",
                                    style("escalated").yellow().bold(),
                                    result.ticket_id
                                ),
                            },
                            Err(e) => eprintln!("  {} {e}", style("escalation failed:").red()),
                        }
                    }
                    Input::Say(text) => {
                        socket.send_typing(true);
                        let reply = api.send_chat_message(&conversation_id, text, None).await;
                        socket.send_typing(false);
                        match reply {
                            Ok(reply) => match format {
                                OutputFormat::Json => super::print_json(&json!({
                                    "reply": reply.message,
                                    "metadata": reply.metadata,
                                })),
                                OutputFormat::Text => {
                                    println!("  {} {}", style("bot:").blue().bold(), reply.message)
                                }
                            },
                            Err(e) => eprintln!("  {} {e}", style("send failed:").red()),
                        }
                    }
                }
            }
            received = events.recv() => {
                let Some((event_type, event)) = received else {
                    break Ok(());
                };
                print_event(&event_type, &event, format);
                match event {
                    Event::Frame(Frame::ConversationClosed(_)) => break Ok(()),
                    Event::MaxReconnectAttempts => {
                        warn!("live updates unavailable; replies still arrive over REST");
                    }
                    _ => {}
                }
            }
            _ = tokio::signal::ctrl_c() => break Ok(()),
        }
    };

    socket.disconnect();
    outcome
}

fn print_transcript_line(message: &ChatMessage) {
    let who = match message.role.as_str() {
        "assistant" => style("bot:").blue().bold(),
        "user" => style("you:").bold(),
        _ => style("system:").dim(),
    };
    println!("  {who} {}", message.content);
}

fn print_event(event_type: &EventType, event: &Event, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", super::event_json(event_type, event)),
        OutputFormat::Text => match event {
            // Lifecycle chatter is logged; only show what the visitor would see.
            Event::Connected | Event::Disconnected(_) | Event::Error(_) => {}
            _ => println!("  {}", super::describe_event(event_type, event)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("   "), Input::Empty);
        assert_eq!(parse_input(" hola "), Input::Say("hola"));
        assert_eq!(parse_input("/quit"), Input::Quit);
        assert_eq!(parse_input("/end"), Input::End);
        assert_eq!(
            parse_input("/escalate"),
            Input::Escalate {
                category: "general",
                priority: "medium"
            }
        );
        assert_eq!(
            parse_input("/escalate card urgent"),
            Input::Escalate {
                category: "card",
                priority: "urgent"
            }
        );
    }
}
