//! Ticket commands.

use clap::Subcommand;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use console::style;
use serde_json::{json, Value};

use sb_api::{Ticket, TicketFilters};
use sb_core::config::ConfigHandle;
use sb_core::error::SbResult;

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum TicketsAction {
    /// List tickets.
    List {
        /// Filter by status (open, in_progress, waiting, resolved, closed, all).
        #[arg(short, long)]
        status: Option<String>,
        /// Filter by priority (low, medium, high, urgent, all).
        #[arg(short, long)]
        priority: Option<String>,
        /// Filter by category (account, card, loan, ...).
        #[arg(long)]
        category: Option<String>,
    },
    /// Show a ticket with its messages.
    Show {
        /// Ticket id.
        id: i64,
        /// Also show the audit history.
        #[arg(long)]
        history: bool,
    },
    /// Assign a ticket to an agent.
    Assign {
        /// Ticket id.
        id: i64,
        /// Agent id.
        agent: i64,
    },
    /// Change a ticket's status.
    Status {
        /// Ticket id.
        id: i64,
        /// New status.
        status: String,
    },
    /// Change a ticket's priority.
    Priority {
        /// Ticket id.
        id: i64,
        /// New priority.
        priority: String,
    },
    /// Reply to the customer on a ticket.
    Reply {
        /// Ticket id.
        id: i64,
        /// Message text.
        text: String,
    },
    /// Add an internal note.
    Note {
        /// Ticket id.
        id: i64,
        /// Note text.
        text: String,
    },
}

pub async fn run(config: ConfigHandle, action: TicketsAction, format: OutputFormat) -> SbResult<()> {
    let api = super::create_agent_client(&config).await?;

    match action {
        TicketsAction::List { status, priority, category } => {
            let filters = TicketFilters {
                status,
                priority,
                category,
            };
            let tickets = api.list_tickets(&filters).await?;

            match format {
                OutputFormat::Json => super::print_json(&json!(tickets)),
                OutputFormat::Text => {
                    if tickets.is_empty() {
                        println!("No tickets match.");
                    } else {
                        println!("{}", ticket_table(&tickets));
                        println!("{} ticket(s)", tickets.len());
                    }
                }
            }
        }
        TicketsAction::Show { id, history } => {
            let ticket = api.get_ticket(id).await?;
            let messages = api.ticket_messages(id).await.unwrap_or_default();
            let audit = if history {
                Some(api.ticket_history(id).await?)
            } else {
                None
            };

            match format {
                OutputFormat::Json => super::print_json(&json!({
                    "ticket": ticket,
                    "messages": messages,
                    "history": audit,
                })),
                OutputFormat::Text => {
                    print_ticket(&ticket);
                    if !messages.is_empty() {
                        println!();
                        println!("{}", style("Messages").bold().underlined());
                        for message in &messages {
                            println!("  {}", describe_entry(message));
                        }
                    }
                    if let Some(entries) = audit {
                        println!();
                        println!("{}", style("History").bold().underlined());
                        for entry in &entries {
                            println!("  {}", describe_entry(entry));
                        }
                    }
                }
            }
        }
        TicketsAction::Assign { id, agent } => {
            let result = api.assign_ticket(id, agent).await?;
            report(format, &result, &format!("Ticket #{id} assigned to agent {agent}"));
        }
        TicketsAction::Status { id, status } => {
            let result = api.update_ticket_status(id, &status).await?;
            report(format, &result, &format!("Ticket #{id} is now {status}"));
        }
        TicketsAction::Priority { id, priority } => {
            let result = api.update_ticket_priority(id, &priority).await?;
            report(format, &result, &format!("Ticket #{id} priority set to {priority}"));
        }
        TicketsAction::Reply { id, text } => {
            let result = api.send_ticket_message(id, &text).await?;
            report(format, &result, &format!("Reply sent on ticket #{id}"));
        }
        TicketsAction::Note { id, text } => {
            let result = api.add_ticket_note(id, &text).await?;
            report(format, &result, &format!("Note added to ticket #{id}"));
        }
    }

    Ok(())
}

fn ticket_table(tickets: &[Ticket]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Subject", "Status", "Priority", "Category", "Assignee", "Updated"]);

    for ticket in tickets {
        table.add_row(vec![
            ticket.id.to_string(),
            super::truncate(ticket.title(), 40),
            ticket.status.clone().unwrap_or_default(),
            ticket.priority.clone().unwrap_or_default(),
            ticket.category.clone().unwrap_or_default(),
            assignee(ticket),
            ticket.updated_at.clone().unwrap_or_default(),
        ]);
    }
    table
}

fn assignee(ticket: &Ticket) -> String {
    match (&ticket.assigned_to_name, ticket.assigned_to) {
        (Some(name), _) => name.clone(),
        (None, Some(id)) => format!("agent {id}"),
        (None, None) => "-".to_string(),
    }
}

fn print_ticket(ticket: &Ticket) {
    println!("{}", style(format!("Ticket #{}", ticket.id)).bold().underlined());
    println!("  Subject:   {}", ticket.title());
    println!("  Status:    {}", ticket.status.as_deref().unwrap_or("-"));
    println!("  Priority:  {}", ticket.priority.as_deref().unwrap_or("-"));
    println!("  Category:  {}", ticket.category.as_deref().unwrap_or("-"));
    println!("  Assignee:  {}", assignee(ticket));
    if let Some(name) = &ticket.customer_name {
        println!(
            "  Customer:  {} {}",
            name,
            ticket
                .customer_email
                .as_deref()
                .map(|e| format!("<{e}>"))
                .unwrap_or_default()
        );
    }
    if let Some(conversation) = &ticket.conversation_id {
        println!("  Chat:      {conversation}");
    }
    if let Some(description) = &ticket.description {
        println!("  {}", style(description).dim());
    }
}

/// Render a message or history entry whose shape varies by backend version.
fn describe_entry(entry: &Value) -> String {
    let text = ["message", "content", "note", "action", "description"]
        .iter()
        .find_map(|key| entry.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| entry.to_string());
    let who = ["sender", "author", "agent_name", "role"]
        .iter()
        .find_map(|key| entry.get(*key).and_then(Value::as_str));
    let when = ["timestamp", "created_at"]
        .iter()
        .find_map(|key| entry.get(*key).and_then(Value::as_str));

    match (when, who) {
        (Some(when), Some(who)) => format!("{} {}: {text}", style(when).dim(), who),
        (None, Some(who)) => format!("{who}: {text}"),
        (Some(when), None) => format!("{} {text}", style(when).dim()),
        (None, None) => text,
    }
}

fn report(format: OutputFormat, result: &Value, summary: &str) {
    match format {
        OutputFormat::Json => super::print_json(result),
        OutputFormat::Text => println!("{} {summary}", style("OK").green().bold()),
    }
}
