//! Client for the `/ws/chat/{client_id}` endpoint.
//!
//! The socket carries JSON text frames both ways. Outbound frames are
//! `{"message": ..., "workflow": ...}`; inbound frames are [`ServerEvent`]s.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::AgentError;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Frames pushed by the chat server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    /// Streaming token from the model
    Token { value: String },
    /// Final message from a named agent node
    Message {
        #[serde(default)]
        agent: Option<String>,
        content: String,
    },
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
}

/// Parse one inbound text frame. Unknown frame types yield `None`.
pub fn parse_server_event(text: &str) -> Option<ServerEvent> {
    match serde_json::from_str::<ServerEvent>(text) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Ignoring unrecognised chat frame: {} - Data: {}", e, text);
            None
        }
    }
}

/// Open chat socket
pub struct ChatSocket {
    sender: ChatSender,
    receiver: ChatReceiver,
}

/// Writing half of a [`ChatSocket`]
pub struct ChatSender {
    sink: SplitSink<Socket, Message>,
    url: String,
}

/// Reading half of a [`ChatSocket`]
pub struct ChatReceiver {
    stream: SplitStream<Socket>,
}

impl ChatSocket {
    pub async fn connect(url: &str) -> Result<Self, AgentError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(url).await?;
        let (sink, stream) = ws_stream.split();
        debug!("Connected to chat socket {}", url);

        Ok(Self {
            sender: ChatSender {
                sink,
                url: url.to_string(),
            },
            receiver: ChatReceiver { stream },
        })
    }

    pub fn url(&self) -> &str {
        self.sender.url()
    }

    pub async fn send(&mut self, message: &str, workflow: Option<&str>) -> Result<(), AgentError> {
        self.sender.send(message, workflow).await
    }

    /// Next server event. `None` once the server closes the socket.
    pub async fn next_event(&mut self) -> Option<Result<ServerEvent, AgentError>> {
        self.receiver.next_event().await
    }

    pub async fn close(self) -> Result<(), AgentError> {
        self.sender.close().await
    }

    /// Separate the halves so events can be read on another task.
    pub fn split(self) -> (ChatSender, ChatReceiver) {
        (self.sender, self.receiver)
    }
}

impl ChatSender {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn send(&mut self, message: &str, workflow: Option<&str>) -> Result<(), AgentError> {
        let request = ChatRequest {
            message: message.to_string(),
            workflow: workflow.map(str::to_string),
        };
        let text = serde_json::to_string(&request)?;
        self.sink.send(Message::Text(text.into())).await?;
        Ok(())
    }

    pub async fn close(mut self) -> Result<(), AgentError> {
        self.sink.close().await?;
        Ok(())
    }
}

impl ChatReceiver {
    /// Next server event. `None` once the server closes the socket.
    ///
    /// Cancel safe: a frame is only consumed when its event is returned.
    pub async fn next_event(&mut self) -> Option<Result<ServerEvent, AgentError>> {
        while let Some(result) = self.stream.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    if let Some(event) = parse_server_event(&text) {
                        return Some(Ok(event));
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("Chat server sent close frame");
                    return None;
                }
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
        None
    }
}
