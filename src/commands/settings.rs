//! Persisted settings management

use crate::cli::SettingsCommand;
use crate::commands::AppContext;
use crate::error::{ChatwireError, Result};
use crate::store::Theme;

use colored::Colorize;

/// Handle settings commands
pub fn handle_settings(ctx: &AppContext, command: SettingsCommand) -> Result<()> {
    match command {
        SettingsCommand::Show => {
            let override_url = ctx.settings.webhook_url();
            println!("Webhook URL:  {}", ctx.webhook_url());
            match override_url {
                Some(_) => println!("              (persisted override)"),
                None => println!("              (from config, default {})", ctx.config.webhook.url),
            }
            println!("Theme:        {}", ctx.settings.theme().as_str());
            println!("Sidebar open: {}", ctx.settings.sidebar_open());
            Ok(())
        }
        SettingsCommand::SetUrl { url } => {
            url::Url::parse(&url)
                .map_err(|e| ChatwireError::Config(format!("invalid URL '{}': {}", url, e)))?;
            ctx.settings.set_webhook_url(&url)?;
            println!("{}", "Webhook URL saved.".green());
            Ok(())
        }
        SettingsCommand::ClearUrl => {
            ctx.settings.clear_webhook_url()?;
            println!("{}", "Webhook URL override removed.".green());
            Ok(())
        }
        SettingsCommand::SetTheme { theme } => {
            let theme = match theme.as_str() {
                "light" => Theme::Light,
                "dark" => Theme::Dark,
                other => {
                    return Err(ChatwireError::Config(format!(
                        "unknown theme '{}', expected light or dark",
                        other
                    ))
                    .into())
                }
            };
            ctx.settings.set_theme(theme)?;
            println!("{}", format!("Theme set to {}.", theme.as_str()).green());
            Ok(())
        }
        SettingsCommand::SetSidebar { open } => {
            ctx.settings.set_sidebar_open(open)?;
            println!("{}", "Sidebar preference saved.".green());
            Ok(())
        }
    }
}
