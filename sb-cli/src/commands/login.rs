//! Login command - obtain an agent token.

use console::style;
use dialoguer::{Input, Password};
use serde_json::json;

use sb_core::config::ConfigHandle;
use sb_core::error::{SbError, SbResult};

use crate::OutputFormat;

/// Run the login command.
pub async fn run(
    config: ConfigHandle,
    email: Option<String>,
    password: Option<String>,
    save: bool,
    format: OutputFormat,
) -> SbResult<()> {
    // Determine email: arg > config > interactive prompt
    let email = match email {
        Some(e) => e,
        None => {
            let remembered = config.read().await.auth.email.clone();
            let mut prompt = Input::<String>::new().with_prompt("Email");
            if !remembered.is_empty() {
                prompt = prompt.default(remembered);
            }
            prompt
                .interact_text()
                .map_err(|e| SbError::Internal(e.to_string()))?
        }
    };

    let password = match password {
        Some(p) => p,
        None => Password::new()
            .with_prompt("Password")
            .interact()
            .map_err(|e| SbError::Internal(e.to_string()))?,
    };

    let mut api = super::create_api_client(&config).await?;
    let login = api.login(&email, &password).await?;

    {
        let mut cfg = config.write().await;
        cfg.auth.token = login.token.clone();
        cfg.auth.email = login.user.email.clone();
    }

    let saved_to = if save { Some(config.save().await?) } else { None };

    match format {
        OutputFormat::Json => super::print_json(&json!({
            "user": login.user,
            "saved_to": saved_to.as_ref().map(|p| p.display().to_string()),
        })),
        OutputFormat::Text => {
            println!(
                "{} Logged in as {} <{}> ({})",
                style("OK").green().bold(),
                login.user.name,
                login.user.email,
                login.user.role
            );
            match saved_to {
                Some(path) => println!("  Token saved to {}", path.display()),
                None => println!(
                    "  {} Token kept for this run only; pass --save to store it.",
                    style("note").dim()
                ),
            }
        }
    }

    Ok(())
}
