//! Monitor command - follow the agent realtime channel.

use console::style;
use tracing::warn;

use sb_core::config::ConfigHandle;
use sb_core::error::{SbError, SbResult};
use sb_socket::{Event, RealtimeClient, Variant};

use crate::OutputFormat;

/// Run the monitor command.
pub async fn run(
    config: ConfigHandle,
    tickets: Vec<i64>,
    stats: bool,
    format: OutputFormat,
) -> SbResult<()> {
    let (client, token) = {
        let cfg = config.read().await;
        if !cfg.is_logged_in() {
            return Err(SbError::AuthFailed(
                "not logged in; run `supportbot login` first".into(),
            ));
        }
        (
            RealtimeClient::from_config(Variant::Admin, &cfg),
            cfg.auth.token.clone(),
        )
    };

    let mut events = super::forward_events(&client);

    if let OutputFormat::Text = format {
        let endpoint = client.endpoint();
        println!(
            "{} Connecting to {}{} (Ctrl+C to stop)",
            style("[monitor]").bold().dim(),
            endpoint.origin(),
            endpoint.path()
        );
    }
    client.connect(token);

    let outcome = loop {
        tokio::select! {
            received = events.recv() => {
                let Some((event_type, event)) = received else {
                    break Ok(());
                };

                // Subscriptions do not survive a reconnect; renew them on every open.
                if let Event::Connected = event {
                    for ticket_id in &tickets {
                        if !client.subscribe_to_ticket(*ticket_id) {
                            warn!("could not subscribe to ticket {ticket_id}");
                        }
                    }
                    if stats {
                        client.subscribe_to_stats();
                    }
                }

                match format {
                    OutputFormat::Json => println!("{}", super::event_json(&event_type, &event)),
                    OutputFormat::Text => println!(
                        "  {} {} {}",
                        style(chrono::Local::now().format("%H:%M:%S")).dim(),
                        style(format!("[{event_type}]")).cyan(),
                        super::describe_event(&event_type, &event)
                    ),
                }

                if let Event::MaxReconnectAttempts = event {
                    break Err(SbError::Socket("realtime channel lost".into()));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if let OutputFormat::Text = format {
                    println!("\n  Disconnecting...");
                }
                break Ok(());
            }
        }
    };

    client.disconnect();
    outcome
}
