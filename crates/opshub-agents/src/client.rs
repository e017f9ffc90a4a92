use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};

use crate::events::{StreamEvent, StreamStats};
use crate::streaming::{read_frames, FrameStream};
use crate::AgentError;

/// Events of one agent response, in arrival order.
pub type EventStream = ReceiverStream<Result<StreamEvent, AgentError>>;

/// Backend agent workflows reachable under `/agents/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentId {
    Vm,
    Intune,
    Access,
    Resource,
}

impl AgentId {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentId::Vm => "vm",
            AgentId::Intune => "intune",
            AgentId::Access => "access",
            AgentId::Resource => "resource",
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentId {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vm" => Ok(AgentId::Vm),
            "intune" => Ok(AgentId::Intune),
            "access" => Ok(AgentId::Access),
            "resource" => Ok(AgentId::Resource),
            other => Err(AgentError::UnknownAgent(other.to_string())),
        }
    }
}

/// Body of `message:send` and `message:stream`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageRequest {
    pub message: OutboundMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutboundMessage {
    pub role: String,
    pub content: Vec<TextPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextPart {
    pub text: String,
}

impl MessageRequest {
    pub fn user(text: &str) -> Self {
        Self {
            message: OutboundMessage {
                role: "ROLE_USER".to_string(),
                content: vec![TextPart {
                    text: text.to_string(),
                }],
            },
        }
    }
}

/// Trait for agent backends
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Send a message and stream the agent's response as normalized events
    async fn stream_message(&self, agent: AgentId, text: &str) -> Result<EventStream, AgentError>;

    /// Send a message and wait for the complete JSON response
    async fn send_message(&self, agent: AgentId, text: &str)
        -> Result<serde_json::Value, AgentError>;

    /// Get the client name, for logs
    fn name(&self) -> &str;
}

/// Agent client over the HTTP streaming endpoint.
#[derive(Clone)]
pub struct HttpAgentClient {
    client: Client,
    base_url: String,
}

impl HttpAgentClient {
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self, AgentError> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/{agent}/v1/message:{method}`
    pub fn endpoint(&self, agent: AgentId, method: &str) -> String {
        format!("{}/{}/v1/message:{}", self.base_url, agent, method)
    }

    async fn post(&self, url: &str, text: &str) -> Result<reqwest::Response, AgentError> {
        let response = self
            .client
            .post(url)
            .json(&MessageRequest::user(text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::Status { status, body });
        }
        Ok(response)
    }
}

/// Forward normalized events from a frame stream into `tx`.
///
/// Returns the stream counters once the frames end or the receiver is dropped.
/// Dropping the receiver also drops `frames`, closing the upstream response
/// even while it is idle.
pub async fn pump_events(
    mut frames: FrameStream,
    tx: mpsc::Sender<Result<StreamEvent, AgentError>>,
) -> StreamStats {
    let mut stats = StreamStats::default();

    loop {
        let frame = tokio::select! {
            _ = tx.closed() => {
                debug!("Receiver dropped, closing upstream");
                break;
            }
            frame = frames.next() => frame,
        };
        let Some(frame) = frame else {
            break;
        };

        match frame {
            Ok(payload) => {
                if let Some(event) = stats.record(&payload) {
                    debug!("Received agent event: {}", event.kind());
                    if tx.send(Ok(event)).await.is_err() {
                        debug!("Receiver dropped, stopping stream");
                        break;
                    }
                }
            }
            Err(e) => {
                error!("Stream error: {}", e);
                let _ = tx.send(Err(e)).await;
                break;
            }
        }
    }

    stats
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn stream_message(&self, agent: AgentId, text: &str) -> Result<EventStream, AgentError> {
        let url = self.endpoint(agent, "stream");
        debug!("Sending streaming request to agent '{}': {}", agent, url);

        let response = self.post(&url, text).await?;
        let frames = read_frames(response.bytes_stream());
        let (tx, rx) = mpsc::channel(100);

        tokio::spawn(async move {
            let stats = pump_events(frames, tx).await;
            info!(
                "Agent '{}' stream completed - frames: {}, events: {}, dropped: {}",
                agent, stats.frames, stats.events, stats.dropped
            );
        });

        Ok(ReceiverStream::new(rx))
    }

    async fn send_message(
        &self,
        agent: AgentId,
        text: &str,
    ) -> Result<serde_json::Value, AgentError> {
        let url = self.endpoint(agent, "send");
        debug!("Sending unary request to agent '{}': {}", agent, url);

        let response = self.post(&url, text).await?;
        Ok(response.json().await?)
    }

    fn name(&self) -> &str {
        "http"
    }
}
