//! OpsHub CLI - terminal interface for the admin API and its streaming agents.

mod cli_args;
mod commands;
mod interactive;
mod simple_output;
mod socket;
mod ui_writer_impl;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use opshub_agents::{AgentClient, HttpAgentClient};
use opshub_config::Config;
use opshub_core::{Conversation, Workflow};

pub use cli_args::{Cli, Command};
use commands::run_command;
use interactive::{run_interactive, stream_turn};
use simple_output::SimpleOutput;
use socket::run_socket_chat;
use ui_writer_impl::ConsoleUiWriter;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(&cli);

    let config = load_config_with_cli_overrides(&cli)?;
    let workflow = selected_workflow(&config)?;
    debug!(
        "Agents at {}, API at {}, workflow {:?}",
        config.agents.base_url, config.api.base_url, workflow
    );

    let output = SimpleOutput::new();
    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => {
            let conversation = Conversation::new(agent_client(&config)?, ConsoleUiWriter::new(), workflow);
            run_interactive(conversation).await
        }
        Command::Send { message, raw: true } => {
            let client = agent_client(&config)?;
            let agent = opshub_core::agent_for(workflow);
            let response = client.send_message(agent, &message).await?;
            output.print_json(&response);
            Ok(())
        }
        Command::Send { message, raw: false } => {
            let mut conversation =
                Conversation::new(agent_client(&config)?, ConsoleUiWriter::new(), workflow);
            stream_turn(&mut conversation, &message).await
        }
        Command::Socket => {
            run_socket_chat(&config.chat_socket_url(), workflow, ConsoleUiWriter::new()).await
        }
        command => run_command(command, &config, &output).await,
    }
}

// --- Helper functions ---

fn initialize_logging(cli: &Cli) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if cli.verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env();
    for target in ["opshub", "opshub_cli", "opshub_core", "opshub_agents", "opshub_config"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config_with_cli_overrides(cli: &Cli) -> Result<Config> {
    Config::load_with_overrides(
        cli.config.as_deref(),
        cli.agent_url.clone(),
        cli.api_url.clone(),
        cli.workflow.clone(),
    )
}

fn selected_workflow(config: &Config) -> Result<Option<Workflow>> {
    config
        .agents
        .default_workflow
        .as_deref()
        .map(str::parse::<Workflow>)
        .transpose()
        .context("Invalid workflow")
}

fn agent_client(config: &Config) -> Result<Arc<dyn AgentClient>> {
    let client = HttpAgentClient::new(
        &config.agents.base_url,
        Duration::from_secs(config.agents.connect_timeout_seconds),
    )
    .context("Failed to create agent client")?;
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_from_config() {
        let mut config = Config::default();
        assert_eq!(selected_workflow(&config).unwrap(), None);

        config.agents.default_workflow = Some("access".to_string());
        assert_eq!(
            selected_workflow(&config).unwrap(),
            Some(Workflow::AccessWorkflow)
        );

        config.agents.default_workflow = Some("payroll".to_string());
        assert!(selected_workflow(&config).is_err());
    }
}
