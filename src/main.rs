//! RecruitChat - recruiting assistant chat client
//!
#![doc = "RecruitChat - recruiting assistant chat client"]
#![doc = "Main entry point for the RecruitChat terminal front-end."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recruitchat::cli::{Cli, Commands};
use recruitchat::commands::{self, Services};
use recruitchat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration; warnings go to a plain subscriber until the
    // configured one is installed
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = {
        let _bootstrap = tracing::subscriber::set_default(
            tracing_subscriber::registry()
                .with(env_filter(cli.verbose))
                .with(tracing_subscriber::fmt::layer()),
        );
        Config::load(config_path, &cli)?
    };

    // Initialize tracing
    init_tracing(cli.verbose, config.logging.json);

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { session } => {
            if let Some(s) = &session {
                tracing::debug!("Resuming session: {}", s);
            }
            commands::chat::run_chat(config, session).await?;
            Ok(())
        }
        Commands::Send { session, text } => {
            commands::chat::run_send(config, session, text).await?;
            Ok(())
        }
        Commands::Sessions { command } => {
            tracing::info!("Starting sessions command");
            let services = Services::from_config(&config)?;
            commands::sessions::handle_sessions(&services, command).await?;
            Ok(())
        }
        Commands::Favorites { command } => {
            tracing::info!("Starting favorites command");
            let services = Services::from_config(&config)?;
            commands::favorites::handle_favorites(&services, command).await?;
            Ok(())
        }
        Commands::Postings { command } => {
            tracing::info!("Starting postings command");
            let services = Services::from_config(&config)?;
            commands::postings::handle_postings(&services, command).await?;
            Ok(())
        }
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose {
        "recruitchat=debug"
    } else {
        "recruitchat=info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool, json: bool) {
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}
