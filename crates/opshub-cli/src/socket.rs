//! Chat over the `/ws/chat/{clientId}` socket.

use anyhow::{Context, Result};
use opshub_agents::ChatSocket;
use opshub_core::ui_writer::UiWriter;
use opshub_core::{SocketChat, TurnEnd, Workflow};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, info};

use crate::interactive::build_prompt;
use crate::simple_output::SimpleOutput;

pub async fn run_socket_chat<W: UiWriter>(url: &str, workflow: Option<Workflow>, ui: W) -> Result<()> {
    let output = SimpleOutput::new();
    let socket = ChatSocket::connect(url)
        .await
        .with_context(|| format!("Failed to connect to {}", url))?;
    let mut chat = SocketChat::new(socket, ui, workflow);
    info!("Connected to chat socket {}", chat.url());
    output.print(&format!("🔌 Connected to {}", chat.url()));

    let mut rl = DefaultEditor::new()?;

    loop {
        if !chat.drain_pending() {
            break;
        }
        match rl.readline(&build_prompt(workflow)) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input == "exit" || input == "quit" {
                    break;
                }
                rl.add_history_entry(input)?;

                let end = chat.send(input).await?;
                chat.ui().flush();
                debug!("Socket turn ended: {:?}", end);
                if end == TurnEnd::Closed {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    if !chat.is_closed() {
        chat.close().await?;
    }
    output.print("👋 Goodbye!");
    Ok(())
}
