//! Chat over the `/ws/chat/{clientId}` socket.
//!
//! The server never marks the end of a turn. Each graph node that finishes
//! pushes its own `message` frame, so one question can be answered by several
//! nodes in turn. A turn settles once the socket stays quiet for the settle
//! window after a message. Frames that arrive later are kept and shown as
//! their own messages before the next turn starts.

use std::time::Duration;

use anyhow::{Context, Result};
use opshub_agents::{AgentError, ChatReceiver, ChatSender, ChatSocket, ServerEvent};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::transcript::{Applied, Transcript, CONNECTION_FAILED_TEXT};
use crate::ui_writer::UiWriter;
use crate::workflow::Workflow;

/// Agent named in socket messages that carry no agent of their own
pub const DEFAULT_SOCKET_AGENT: &str = "Supervisor";

/// Quiet time after a message before the turn counts as answered
pub const TURN_SETTLE: Duration = Duration::from_millis(1500);

type SocketEvents = mpsc::Receiver<Result<ServerEvent, AgentError>>;

/// How a socket turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEnd {
    /// No further frames within the settle window
    Settled,
    /// The server reported an error
    Errored,
    /// The socket closed or failed; no further turns are possible
    Closed,
}

pub struct SocketChat<W: UiWriter> {
    sender: ChatSender,
    events: SocketEvents,
    reader: JoinHandle<()>,
    ui: W,
    workflow: Option<Workflow>,
    transcript: Transcript,
    settle: Duration,
    closed: bool,
}

/// Forward server events into a channel until the socket closes or the
/// channel's receiver goes away.
fn spawn_reader(mut receiver: ChatReceiver) -> (SocketEvents, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(100);
    let handle = tokio::spawn(async move {
        loop {
            let next = tokio::select! {
                _ = tx.closed() => break,
                next = receiver.next_event() => next,
            };
            let Some(item) = next else {
                debug!("Chat socket reader finished");
                break;
            };
            let failed = item.is_err();
            if tx.send(item).await.is_err() || failed {
                break;
            }
        }
    });
    (rx, handle)
}

impl<W: UiWriter> SocketChat<W> {
    pub fn new(socket: ChatSocket, ui: W, workflow: Option<Workflow>) -> Self {
        let (sender, receiver) = socket.split();
        let (events, reader) = spawn_reader(receiver);
        Self {
            sender,
            events,
            reader,
            ui,
            workflow,
            transcript: Transcript::new(),
            settle: TURN_SETTLE,
            closed: false,
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn url(&self) -> &str {
        self.sender.url()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn ui(&self) -> &W {
        &self.ui
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Show frames that arrived since the last turn settled.
    ///
    /// Returns false once the socket has closed.
    pub fn drain_pending(&mut self) -> bool {
        while !self.closed {
            match self.events.try_recv() {
                Ok(Ok(event)) => {
                    debug!("Late socket event: {:?}", event);
                    self.apply(&event);
                }
                Ok(Err(e)) => self.fail(e),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.mark_closed(),
            }
        }
        !self.closed
    }

    /// Send one message and show the answer until the turn ends.
    pub async fn send(&mut self, text: &str) -> Result<TurnEnd> {
        if !self.drain_pending() {
            anyhow::bail!("Chat socket is closed");
        }
        self.finish_placeholder();

        self.transcript.push_user(text);
        self.transcript.open_placeholder(Some(DEFAULT_SOCKET_AGENT));
        self.ui.print_agent_prompt(DEFAULT_SOCKET_AGENT);

        let workflow = self.workflow.map(|w| w.as_str());
        if let Err(e) = self.sender.send(text, workflow).await {
            self.transcript.fail_connection();
            self.ui.print_error(CONNECTION_FAILED_TEXT);
            self.closed = true;
            return Err(e).context("Failed to send chat message");
        }

        Ok(self.receive_turn().await)
    }

    async fn receive_turn(&mut self) -> TurnEnd {
        let mut answered = false;
        loop {
            let next = if answered {
                match tokio::time::timeout(self.settle, self.events.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        debug!("Socket quiet for {:?}, turn complete", self.settle);
                        return TurnEnd::Settled;
                    }
                }
            } else {
                self.events.recv().await
            };

            match next {
                Some(Ok(event)) => {
                    debug!("Socket event: {:?}", event);
                    answered |= matches!(event, ServerEvent::Message { .. });
                    if let Applied::Errored = self.apply(&event) {
                        return TurnEnd::Errored;
                    }
                }
                Some(Err(e)) => {
                    self.fail(e);
                    return TurnEnd::Closed;
                }
                None => {
                    warn!("Chat socket closed mid-turn");
                    self.mark_closed();
                    return TurnEnd::Closed;
                }
            }
        }
    }

    pub async fn close(self) -> Result<()> {
        self.reader.abort();
        self.sender.close().await?;
        Ok(())
    }

    fn apply(&mut self, event: &ServerEvent) -> Applied {
        // Each node's answer gets its own message
        if self.transcript.placeholder().is_none() && !matches!(event, ServerEvent::Error { .. }) {
            let agent = match event {
                ServerEvent::Message {
                    agent: Some(agent), ..
                } => agent.as_str(),
                _ => DEFAULT_SOCKET_AGENT,
            };
            self.transcript.open_placeholder(Some(agent));
            self.ui.print_agent_prompt(agent);
        }

        let applied = self.transcript.apply_server_event(event);
        match &applied {
            Applied::Appended(text) => self.ui.print_agent_response(text),
            Applied::Replaced => {
                if let Some(last) = self.transcript.messages().last() {
                    self.ui.replace_agent_response(&last.content);
                }
                self.ui.finish_response();
            }
            Applied::Errored => {
                if let Some(last) = self.transcript.messages().last() {
                    self.ui.print_error(&last.content);
                }
            }
            Applied::ToolInserted(_) | Applied::Ignored => {}
        }
        applied
    }

    fn fail(&mut self, error: AgentError) {
        warn!("Chat socket failed: {}", error);
        self.transcript.apply_server_event(&ServerEvent::Error {
            message: error.to_string(),
        });
        if let Some(last) = self.transcript.messages().last() {
            self.ui.print_error(&last.content);
        }
        self.closed = true;
    }

    fn mark_closed(&mut self) {
        if !self.closed {
            info!("Chat socket closed by server");
            self.finish_placeholder();
            self.ui.println("🔌 Chat socket closed by server");
            self.closed = true;
        }
    }

    fn finish_placeholder(&mut self) {
        if self.transcript.finish().is_some() {
            self.ui.finish_response();
        }
    }
}
