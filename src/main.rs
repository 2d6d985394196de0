//! Chatwire - terminal chat client
//!
//! Main entry point: initializes tracing, loads configuration, opens the
//! store, and dispatches to the command handlers.

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chatwire::cli::{Cli, Commands};
use chatwire::commands::{self, AppContext};
use chatwire::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Mirror a CLI store override into the environment so the store opener
    // picks it up without threading the path everywhere.
    if let Some(store_dir) = &cli.store_dir {
        std::env::set_var("CHATWIRE_STORE_DIR", store_dir);
        tracing::debug!("Using store directory override: {}", store_dir.display());
    }

    let config = Config::load(&cli.config)?;
    config.validate()?;

    let ctx = AppContext::initialize(config)?;

    match cli.command {
        Commands::Chat { url } => {
            tracing::info!("Starting interactive chat");
            commands::chat::run_chat(ctx, url).await
        }
        Commands::History { command } => commands::history::handle_history(&ctx, command),
        Commands::Logs { command } => commands::logs::handle_logs(&ctx, command),
        Commands::Auth { command } => commands::auth::handle_auth(&ctx, command),
        Commands::Settings { command } => commands::settings::handle_settings(&ctx, command),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chatwire={}", default_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
