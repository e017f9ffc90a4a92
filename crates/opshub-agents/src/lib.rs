//! Clients for the OpsHub agent gateway.
//!
//! * [`streaming`] reads `text/event-stream` bodies into raw payloads
//! * [`events`] normalizes payloads into [`StreamEvent`]s
//! * [`client`] posts messages to agents and streams their events back
//! * [`websocket`] speaks the `/ws/chat` protocol

pub mod client;
mod error;
pub mod events;
pub mod mock;
pub mod streaming;
pub mod websocket;

pub use client::{AgentClient, AgentId, EventStream, HttpAgentClient, MessageRequest};
pub use error::AgentError;
pub use events::{classify, normalize, Decoded, StreamEvent, StreamStats, TASK_STATE_FAILED};
pub use mock::{MockAgent, MockReply};
pub use streaming::{decode_utf8_streaming, read_frames, FrameStream, SseDecoder, DONE_MARKER};
pub use websocket::{ChatReceiver, ChatSender, ChatSocket, ServerEvent};
