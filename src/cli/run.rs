use anyhow::{anyhow, Result};
use clap::Args;
use std::io::{self, Read};
use tracing::{debug, info};

use super::root::build_coordinator;
use crate::chat::Role;
use crate::config::Config;

/// Send a single prompt non-interactively
#[derive(Args)]
pub struct RunCommand {
    /// The prompt to send. If not provided, will read from stdin
    pub prompt: Vec<String>,
}

impl RunCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        debug!("Executing run command");

        let prompt = self.get_prompt()?;

        if prompt.trim().is_empty() {
            return Err(anyhow!(
                "No prompt provided. Use arguments or pipe input via stdin."
            ));
        }

        info!(
            "Sending prompt: {}",
            prompt.chars().take(50).collect::<String>()
        );

        let coordinator = build_coordinator(config)?;
        coordinator.send(&prompt).await;

        let state = coordinator.snapshot().await;
        if let Some(error) = state.last_error {
            return Err(anyhow!("{}", error));
        }

        let reply = state
            .transcript
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .ok_or_else(|| anyhow!("No reply received"))?;
        println!("{}", reply.content);

        Ok(())
    }

    fn get_prompt(&self) -> Result<String> {
        if !self.prompt.is_empty() {
            Ok(self.prompt.join(" "))
        } else {
            debug!("Reading prompt from stdin");
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| anyhow!("Failed to read from stdin: {}", e))?;
            Ok(buffer)
        }
    }
}
