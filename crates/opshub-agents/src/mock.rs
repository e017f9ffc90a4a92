//! Mock agent for testing
//!
//! Scripts the events an agent would stream back so conversation logic can be
//! exercised without a server.
//!
//! # Example
//!
//! ```rust,ignore
//! use opshub_agents::mock::{MockAgent, MockReply};
//!
//! let agent = MockAgent::new()
//!     .with_reply(MockReply::chunks(vec!["Hello, ", "world!"]));
//! ```

use crate::client::{AgentClient, AgentId, EventStream};
use crate::events::StreamEvent;
use crate::AgentError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// One scripted step of a mock response
#[derive(Debug, Clone)]
pub enum MockStep {
    Event(StreamEvent),
    /// Transport failure mid-stream
    Fail(String),
    /// Stop sending and keep the stream open until the receiver goes away
    Hang,
}

/// A scripted response to one message
#[derive(Debug, Clone, Default)]
pub struct MockReply {
    pub steps: Vec<MockStep>,
}

impl MockReply {
    pub fn chunks(chunks: Vec<&str>) -> Self {
        Self {
            steps: chunks
                .into_iter()
                .map(|c| {
                    MockStep::Event(StreamEvent::MessageChunk {
                        content: c.to_string(),
                    })
                })
                .collect(),
        }
    }

    pub fn status(text: &str) -> Self {
        Self::default().then_status(text)
    }

    pub fn then_chunk(mut self, text: &str) -> Self {
        self.steps.push(MockStep::Event(StreamEvent::MessageChunk {
            content: text.to_string(),
        }));
        self
    }

    /// Status update carrying the accumulated answer
    pub fn then_status(mut self, text: &str) -> Self {
        self.steps.push(MockStep::Event(StreamEvent::StatusUpdate {
            data: json!({"status": {"state": "TASK_STATE_WORKING", "message": {"parts": [{"text": text}]}}}),
        }));
        self
    }

    pub fn then_tool(mut self, name: &str, parameters: Value, result: Option<&str>) -> Self {
        self.steps.push(MockStep::Event(StreamEvent::ToolCall {
            data: json!({
                "type": "tool_call",
                "tool_name": name,
                "parameters": parameters,
                "result": result,
                "duration": 0.25,
            }),
        }));
        self
    }

    pub fn then_error(mut self, text: &str) -> Self {
        self.steps.push(MockStep::Event(StreamEvent::Error {
            content: text.to_string(),
        }));
        self
    }

    pub fn then_fail(mut self, reason: &str) -> Self {
        self.steps.push(MockStep::Fail(reason.to_string()));
        self
    }

    pub fn then_hang(mut self) -> Self {
        self.steps.push(MockStep::Hang);
        self
    }
}

/// A message the mock received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub agent: AgentId,
    pub text: String,
}

/// Agent client that replays scripted replies in order.
///
/// When the script runs out, further sends get an empty stream.
#[derive(Clone, Default)]
pub struct MockAgent {
    replies: Arc<Mutex<Vec<MockReply>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    refuse: Option<String>,
}

impl MockAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, reply: MockReply) -> Self {
        self.replies.lock().unwrap().push(reply);
        self
    }

    /// Fail every request before any stream is opened
    pub fn refusing(mut self, reason: &str) -> Self {
        self.refuse = Some(reason.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, agent: AgentId, text: &str) -> Result<(), AgentError> {
        self.calls.lock().unwrap().push(RecordedCall {
            agent,
            text: text.to_string(),
        });
        match &self.refuse {
            Some(reason) => Err(AgentError::Stream(reason.clone())),
            None => Ok(()),
        }
    }

    fn next_reply(&self) -> MockReply {
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            MockReply::default()
        } else {
            replies.remove(0)
        }
    }
}

#[async_trait]
impl AgentClient for MockAgent {
    async fn stream_message(&self, agent: AgentId, text: &str) -> Result<EventStream, AgentError> {
        self.record(agent, text)?;
        let reply = self.next_reply();
        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            for step in reply.steps {
                match step {
                    MockStep::Event(event) => {
                        if tx.send(Ok(event)).await.is_err() {
                            return;
                        }
                    }
                    MockStep::Fail(reason) => {
                        let _ = tx.send(Err(AgentError::Stream(reason))).await;
                        return;
                    }
                    MockStep::Hang => {
                        tx.closed().await;
                        return;
                    }
                }
            }
        });

        Ok(ReceiverStream::new(rx))
    }

    async fn send_message(&self, agent: AgentId, text: &str) -> Result<Value, AgentError> {
        self.record(agent, text)?;
        let content: String = self
            .next_reply()
            .steps
            .into_iter()
            .filter_map(|step| match step {
                MockStep::Event(StreamEvent::MessageChunk { content }) => Some(content),
                _ => None,
            })
            .collect();
        Ok(json!({"message": {"role": "ROLE_AGENT", "parts": [{"text": content}]}}))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
