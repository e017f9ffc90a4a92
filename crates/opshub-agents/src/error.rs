use thiserror::Error;

/// Errors raised while talking to an agent or the chat socket.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Agent API error {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The response body broke off mid-stream
    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Chat socket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown agent '{0}'. Valid agents: vm, intune, access, resource")]
    UnknownAgent(String),
}
