use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{debug, info};

use super::run::RunCommand;
use crate::chat::{HttpBackend, RequestCoordinator, DEFAULT_GREETING};
use crate::config::Config;
use crate::{session, tui};

/// Backchat - a terminal chat client for a remote assistant endpoint
#[derive(Parser)]
#[command(
    name = "backchat",
    version,
    about = "A terminal chat client for a remote assistant endpoint",
    long_about = r#"Backchat keeps a running conversation with a remote assistant.

Examples:
  backchat                             # Start the interactive chat
  backchat run "explain this error"    # Send a single prompt and print the reply
  backchat --base-url http://host:8000 # Point at a different endpoint"#
)]
pub struct Cli {
    /// Base URL of the assistant endpoint (overrides config and environment)
    #[arg(short = 'u', long = "base-url", global = true)]
    pub base_url: Option<String>,

    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a single prompt non-interactively
    Run(RunCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        if self.debug {
            debug!("Debug logging enabled");
        }

        let mut config = Config::init().await?;
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        config.validate()?;
        debug!("Using endpoint: {}", config.base_url);

        match self.command {
            Some(Commands::Run(run_cmd)) => run_cmd.execute(&config).await,
            None => self.start_interactive_mode(&config).await,
        }
    }

    async fn start_interactive_mode(&self, config: &Config) -> Result<()> {
        info!("Starting interactive mode");

        let coordinator = build_coordinator(config)?;
        tui::run(coordinator).await?;

        info!("Application finished");
        Ok(())
    }
}

/// Wire the conversation core together from configuration.
pub fn build_coordinator(config: &Config) -> Result<RequestCoordinator> {
    let session_id = session::get_or_create(&config.data_dir)?;
    debug!("Session id: {}", session_id);

    let backend = Arc::new(HttpBackend::new(config.base_url.clone()));
    let greeting = config
        .greeting
        .clone()
        .unwrap_or_else(|| DEFAULT_GREETING.to_string());

    Ok(RequestCoordinator::new(backend, session_id, greeting))
}
