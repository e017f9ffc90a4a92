//! OpsHub client core.
//!
//! Folds agent stream events into a chat transcript, drives one conversation
//! at a time over HTTP or the chat socket, and wraps the REST backend and the
//! signed-in session.

pub mod api;
pub mod conversation;
pub mod mock_data;
pub mod models;
pub mod session;
pub mod socket_chat;
pub mod transcript;
pub mod ui_writer;
pub mod workflow;

pub use api::ApiClient;
pub use conversation::Conversation;
pub use session::{AuthUser, Session, SessionStore};
pub use socket_chat::{SocketChat, TurnEnd};
pub use transcript::{reduce, Applied, ChatMessage, Role, ToolCall, Transcript};
pub use ui_writer::{NullUiWriter, UiWriter};
pub use workflow::{agent_for, Workflow};
