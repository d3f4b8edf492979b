//! Status command - show backend health and client configuration.

use console::style;
use serde_json::json;

use sb_core::config::ConfigHandle;
use sb_core::error::SbResult;
use sb_socket::{Endpoint, Variant};

use crate::OutputFormat;

/// Run the status command.
pub async fn run(config: ConfigHandle, format: OutputFormat) -> SbResult<()> {
    let cfg = config.read().await.clone();
    let api = super::create_api_client(&config).await?;

    let start = std::time::Instant::now();
    let health = api.health().await;
    let latency_ms = start.elapsed().as_millis();

    let token_valid = if cfg.is_logged_in() {
        Some(api.verify_token().await.unwrap_or(false))
    } else {
        None
    };

    let admin = Endpoint::from_config(Variant::Admin, &cfg);
    let widget = Endpoint::from_config(Variant::Widget, &cfg);

    match format {
        OutputFormat::Json => {
            super::print_json(&json!({
                "api_root": api.api_root(),
                "reachable": health.is_ok(),
                "latency_ms": latency_ms,
                "health": health.as_ref().ok(),
                "error": health.as_ref().err().map(|e| e.to_string()),
                "admin_socket": format!("{}{}", admin.origin(), admin.path()),
                "widget_socket": format!("{}{}", widget.origin(), widget.path()),
                "logged_in": cfg.is_logged_in(),
                "token_valid": token_valid,
                "email": cfg.auth.email,
            }));
        }
        OutputFormat::Text => {
            println!("{}", style("Backend").bold().underlined());
            println!("  API:       {}", api.api_root());
            match &health {
                Ok(body) => println!(
                    "  Status:    {} ({}ms) {}",
                    style("reachable").green(),
                    latency_ms,
                    body.get("status").and_then(|s| s.as_str()).unwrap_or("")
                ),
                Err(e) => println!("  Status:    {} ({e})", style("unreachable").red()),
            }

            println!();
            println!("{}", style("Realtime").bold().underlined());
            println!("  Admin:     {}{}", admin.origin(), admin.path());
            println!("  Widget:    {}{}", widget.origin(), widget.path());
            println!(
                "  Reconnect: {} attempts, {}ms x attempt",
                cfg.realtime.max_reconnect_attempts, cfg.realtime.reconnect_delay_ms
            );
            match cfg.realtime.ping_interval() {
                Some(every) => println!("  Keep-alive: every {}s (admin)", every.as_secs()),
                None => println!("  Keep-alive: off"),
            }

            println!();
            println!("{}", style("Agent").bold().underlined());
            match token_valid {
                None => println!("  Token:     {}", style("not logged in").yellow()),
                Some(true) => println!(
                    "  Token:     {} {}",
                    style("valid").green(),
                    cfg.auth.email
                ),
                Some(false) => println!(
                    "  Token:     {} (run `supportbot login`)",
                    style("expired or rejected").red()
                ),
            }
        }
    }

    Ok(())
}
