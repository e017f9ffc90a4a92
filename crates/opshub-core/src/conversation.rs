//! A chat with one agent workflow.
//!
//! The conversation owns the transcript and at most one active stream.
//! Starting a new send cancels whatever was streaming before, finalizing its
//! placeholder with the text received so far.

use std::sync::Arc;

use anyhow::{Context, Result};
use opshub_agents::{AgentClient, AgentError, AgentId, EventStream, StreamEvent};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::transcript::{Applied, Transcript, CONNECTION_FAILED_TEXT};
use crate::ui_writer::UiWriter;
use crate::workflow::{agent_for, agent_name_for, Workflow};

struct ActiveStream {
    agent: AgentId,
    events: EventStream,
    cancel: CancellationToken,
}

pub struct Conversation<W: UiWriter> {
    client: Arc<dyn AgentClient>,
    ui: W,
    workflow: Option<Workflow>,
    transcript: Transcript,
    active: Option<ActiveStream>,
}

impl<W: UiWriter> Conversation<W> {
    pub fn new(client: Arc<dyn AgentClient>, ui: W, workflow: Option<Workflow>) -> Self {
        Self {
            client,
            ui,
            workflow,
            transcript: Transcript::new(),
            active: None,
        }
    }

    pub fn workflow(&self) -> Option<Workflow> {
        self.workflow
    }

    pub fn agent(&self) -> AgentId {
        agent_for(self.workflow)
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn ui(&self) -> &W {
        &self.ui
    }

    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    /// Token that stops the active stream when cancelled, e.g. from a Ctrl-C
    /// handler running on another task.
    pub fn cancel_handle(&self) -> Option<CancellationToken> {
        self.active.as_ref().map(|a| a.cancel.clone())
    }

    /// Switch workflow. The transcript starts over.
    pub fn select_workflow(&mut self, workflow: Option<Workflow>) {
        self.cancel();
        self.workflow = workflow;
        self.transcript.clear();
        info!(
            "Selected workflow {} (agent '{}')",
            workflow.map(|w| w.as_str()).unwrap_or("default"),
            self.agent()
        );
    }

    pub fn clear(&mut self) {
        self.cancel();
        self.transcript.clear();
    }

    /// Stop the active stream, keeping whatever text already arrived.
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            info!("Cancelled stream from agent '{}'", active.agent);
            self.finish_placeholder();
        }
    }

    /// Post `text` to the workflow's agent and open the stream of its answer.
    ///
    /// On failure the placeholder shows the agent's rejection, or the
    /// connection error when no response arrived, and the cause is returned.
    pub async fn begin(&mut self, text: &str) -> Result<()> {
        self.cancel();

        let agent = self.agent();
        let agent_name = agent_name_for(self.workflow);
        self.transcript.push_user(text);
        self.transcript.open_placeholder(Some(agent_name));
        self.ui.print_agent_prompt(agent_name);

        info!("Sending message to agent '{}' via {}", agent, self.client.name());
        match self.client.stream_message(agent, text).await {
            Ok(events) => {
                self.active = Some(ActiveStream {
                    agent,
                    events,
                    cancel: CancellationToken::new(),
                });
                Ok(())
            }
            Err(e @ AgentError::Status { .. }) => {
                error!("Agent '{}' rejected the message: {}", agent, e);
                self.apply(&StreamEvent::Error {
                    content: e.to_string(),
                });
                Err(e).with_context(|| format!("Agent '{}' rejected the message", agent))
            }
            Err(e) => {
                error!("Failed to open stream to agent '{}': {}", agent, e);
                self.transcript.fail_connection();
                self.ui.print_error(CONNECTION_FAILED_TEXT);
                Err(e).with_context(|| format!("Failed to connect to agent '{}'", agent))
            }
        }
    }

    /// Wait for the next event of the active stream and fold it in.
    ///
    /// Returns `None` once the stream has ended or was cancelled.
    pub async fn next(&mut self) -> Option<Applied> {
        let polled = {
            let active = self.active.as_mut()?;
            tokio::select! {
                biased;
                _ = active.cancel.cancelled() => None,
                item = active.events.next() => Some(item),
            }
        };

        let Some(item) = polled else {
            debug!("Stream cancelled while waiting for an event");
            self.active = None;
            self.finish_placeholder();
            return None;
        };

        match item {
            Some(Ok(event)) => {
                debug!("Applying {} event", event.kind());
                Some(self.apply(&event))
            }
            Some(Err(e)) => {
                warn!("Agent stream failed: {}", e);
                self.active = None;
                Some(self.apply(&StreamEvent::Error {
                    content: e.to_string(),
                }))
            }
            None => {
                if let Some(active) = self.active.take() {
                    debug!("Stream from agent '{}' ended", active.agent);
                }
                self.finish_placeholder();
                None
            }
        }
    }

    /// Send a message and stream the whole answer.
    ///
    /// Returns the final assistant text, if the turn produced one.
    pub async fn send(&mut self, text: &str) -> Result<Option<String>> {
        self.begin(text).await?;
        while self.next().await.is_some() {}
        self.ui.flush();

        Ok(self
            .transcript
            .messages()
            .iter()
            .rev()
            .find(|m| m.role == crate::transcript::Role::Assistant)
            .map(|m| m.content.clone()))
    }

    fn apply(&mut self, event: &StreamEvent) -> Applied {
        let applied = self.transcript.apply(event);
        match &applied {
            Applied::Appended(text) => self.ui.print_agent_response(text),
            Applied::Replaced => {
                if let Some(placeholder) = self.transcript.placeholder() {
                    self.ui.replace_agent_response(&placeholder.content);
                }
            }
            Applied::ToolInserted(index) => {
                if let Some(call) = self.transcript.messages()[*index].tool_call.as_ref() {
                    self.ui
                        .notify(&format!("Agent is using tool: {}", call.name));
                    self.ui.print_tool_call(call);
                }
            }
            Applied::Errored => {
                if let Some(last) = self.transcript.messages().last() {
                    self.ui.print_error(&last.content);
                }
            }
            Applied::Ignored => {}
        }
        applied
    }

    fn finish_placeholder(&mut self) {
        if self.transcript.finish().is_some() {
            self.ui.finish_response();
        }
    }
}

impl<W: UiWriter> Drop for Conversation<W> {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }
}
