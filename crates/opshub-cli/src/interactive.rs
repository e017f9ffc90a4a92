//! Interactive chat with an agent workflow.

use anyhow::Result;
use opshub_core::ui_writer::UiWriter;
use opshub_core::{Conversation, Role, Workflow};
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor, Editor};
use tracing::{debug, error};

use crate::simple_output::SimpleOutput;

const HISTORY_FILE: &str = ".opshub_history";

pub fn build_prompt(workflow: Option<Workflow>) -> String {
    let name = match workflow {
        Some(workflow) => workflow.title(),
        None => "opshub",
    };
    format!("{}> ", name)
}

/// Stream one answer, letting Ctrl-C stop it without leaving the chat.
pub async fn stream_turn<W: UiWriter>(conversation: &mut Conversation<W>, input: &str) -> Result<()> {
    conversation.begin(input).await?;

    let watcher = conversation.cancel_handle().map(|token| {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        })
    });

    while conversation.next().await.is_some() {}
    conversation.ui().flush();

    if let Some(watcher) = watcher {
        watcher.abort();
    }
    Ok(())
}

/// Handle a control command. Returns true if the command was handled and the loop should continue.
pub fn handle_command<W: UiWriter>(
    input: &str,
    conversation: &mut Conversation<W>,
    output: &SimpleOutput,
) -> bool {
    let mut parts = input.splitn(2, ' ');
    let command = parts.next().unwrap_or_default();
    let argument = parts.next().map(str::trim).filter(|a| !a.is_empty());

    match command {
        "/help" => {
            output.print("");
            output.print("📖 Control Commands:");
            output.print("  /workflow [name] - Show or switch workflow (intune, access, resource)");
            output.print("  /clear           - Clear the conversation");
            output.print("  /history         - Print the conversation so far");
            output.print("  /help            - Show this help message");
            output.print("  exit/quit        - Exit the chat");
            output.print("");
            true
        }
        "/workflow" => {
            match argument {
                None => {
                    let current = conversation.workflow();
                    output.print(&format!(
                        "Current workflow: {} (agent '{}')",
                        current.map(|w| w.title()).unwrap_or("default"),
                        conversation.agent()
                    ));
                    for workflow in Workflow::ALL {
                        output.print(&format!("  {} - {}", workflow, workflow.title()));
                    }
                }
                Some(name) => match name.parse::<Workflow>() {
                    Ok(workflow) => {
                        conversation.select_workflow(Some(workflow));
                        output.print_status(&format!("switched to {}", workflow.title()), "done");
                    }
                    Err(e) => output.print(&format!("❌ {}", e)),
                },
            }
            true
        }
        "/clear" => {
            conversation.clear();
            output.print_status("conversation cleared", "done");
            true
        }
        "/history" => {
            for message in conversation.transcript().messages() {
                let who = match message.role {
                    Role::User => "you".to_string(),
                    Role::Assistant => message
                        .agent_name
                        .clone()
                        .unwrap_or_else(|| "agent".to_string()),
                    Role::Tool => "tool".to_string(),
                };
                output.print(&format!(
                    "[{}] {}: {}",
                    message.timestamp.format("%H:%M:%S"),
                    who,
                    message.content
                ));
            }
            true
        }
        _ => {
            output.print(&format!("Unknown command: {} (try /help)", command));
            true
        }
    }
}

pub async fn run_interactive<W: UiWriter>(mut conversation: Conversation<W>) -> Result<()> {
    let output = SimpleOutput::new();
    output.print("🤖 OpsHub agent chat. Type /help for commands.");

    let config = Config::builder().auto_add_history(false).build();
    let mut rl: DefaultEditor = Editor::with_config(config)?;

    // Try to load history from a file in the user's home directory
    let history_file = dirs::home_dir().map(|mut path| {
        path.push(HISTORY_FILE);
        path
    });

    if let Some(ref history_path) = history_file {
        let _ = rl.load_history(history_path);
    }

    loop {
        let readline = rl.readline(&build_prompt(conversation.workflow()));
        match readline {
            Ok(line) => {
                let input = line.trim().to_string();

                if input.is_empty() {
                    continue;
                }

                if input == "exit" || input == "quit" {
                    break;
                }

                rl.add_history_entry(&input)?;

                if input.starts_with('/') && handle_command(&input, &mut conversation, &output) {
                    continue;
                }

                if let Err(e) = stream_turn(&mut conversation, &input).await {
                    debug!("Turn failed before streaming: {:#}", e);
                }
            }
            Err(ReadlineError::Interrupted) => {
                output.print("CTRL-C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                output.print("CTRL-D");
                break;
            }
            Err(err) => {
                error!("Error: {:?}", err);
                break;
            }
        }
    }

    if let Some(ref history_path) = history_file {
        let _ = rl.save_history(history_path);
    }

    output.print("👋 Goodbye!");
    Ok(())
}
