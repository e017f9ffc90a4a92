//! Ordered chat transcript and the reducer that folds stream events into it.
//!
//! The last message may be a *placeholder*: the assistant turn that is still
//! streaming. Text events grow the placeholder; tool calls are inserted just
//! ahead of it so the streaming answer always stays at the bottom and tool
//! cards appear in the order they were emitted.

use chrono::{DateTime, Utc};
use opshub_agents::{ServerEvent, StreamEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CONNECTION_FAILED_TEXT: &str = "❌ Failed to connect to agent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// A backend action reported by the agent, shown as a card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub parameters: Value,
    pub result: Option<Value>,
    pub execution_time_seconds: f64,
    /// No result has been reported yet
    pub is_executing: bool,
}

impl ToolCall {
    /// Build from a `tool_call` event payload
    /// (`{tool_name, parameters, result, duration}`).
    pub fn from_event_data(data: &Value) -> Self {
        let result = data
            .get("result")
            .filter(|r| match r {
                Value::Null => false,
                Value::String(s) => !s.is_empty(),
                Value::Bool(b) => *b,
                _ => true,
            })
            .cloned();

        Self {
            name: data
                .get("tool_name")
                .and_then(Value::as_str)
                .filter(|n| !n.is_empty())
                .unwrap_or("Tool Call")
                .to_string(),
            parameters: data.get("parameters").cloned().unwrap_or(Value::Null),
            is_executing: result.is_none(),
            result,
            execution_time_seconds: data.get("duration").and_then(Value::as_f64).unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub agent_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Still receiving content; immutable once false
    pub is_streaming: bool,
    pub tool_call: Option<ToolCall>,
}

impl ChatMessage {
    fn new(role: Role, content: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content,
            agent_name: None,
            timestamp: Utc::now(),
            is_streaming: false,
            tool_call: None,
        }
    }

    pub fn user(content: &str) -> Self {
        Self::new(Role::User, content.to_string())
    }

    /// Empty assistant turn that stream events will fill in
    pub fn placeholder(agent_name: Option<&str>) -> Self {
        let mut message = Self::new(Role::Assistant, String::new());
        message.agent_name = agent_name.map(str::to_string);
        message.is_streaming = true;
        message
    }

    pub fn assistant(content: &str, agent_name: Option<&str>) -> Self {
        let mut message = Self::new(Role::Assistant, content.to_string());
        message.agent_name = agent_name.map(str::to_string);
        message
    }

    pub fn tool(call: ToolCall) -> Self {
        let mut message = Self::new(Role::Tool, call.name.clone());
        message.tool_call = Some(call);
        message
    }

    pub fn is_placeholder(&self) -> bool {
        self.role == Role::Assistant && self.is_streaming
    }
}

/// What an event did to the transcript
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// Text appended to the placeholder
    Appended(String),
    /// Placeholder content replaced with the accumulated text
    Replaced,
    /// Tool message inserted at this index
    ToolInserted(usize),
    /// Placeholder finalized with an error
    Errored,
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn push_user(&mut self, content: &str) -> &ChatMessage {
        self.messages.push(ChatMessage::user(content));
        &self.messages[self.messages.len() - 1]
    }

    pub fn open_placeholder(&mut self, agent_name: Option<&str>) -> &ChatMessage {
        self.messages.push(ChatMessage::placeholder(agent_name));
        &self.messages[self.messages.len() - 1]
    }

    /// The in-progress assistant turn, if the transcript ends with one
    pub fn placeholder(&self) -> Option<&ChatMessage> {
        self.messages.last().filter(|m| m.is_placeholder())
    }

    fn placeholder_mut(&mut self) -> Option<&mut ChatMessage> {
        self.messages.last_mut().filter(|m| m.is_placeholder())
    }

    fn placeholder_or_open(&mut self) -> &mut ChatMessage {
        if self.placeholder().is_none() {
            let agent_name = self.last_agent_name();
            self.messages.push(ChatMessage::placeholder(agent_name.as_deref()));
        }
        let last = self.messages.len() - 1;
        &mut self.messages[last]
    }

    fn last_agent_name(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find_map(|m| m.agent_name.clone())
    }

    /// Fold one stream event into the transcript.
    pub fn apply(&mut self, event: &StreamEvent) -> Applied {
        match event {
            StreamEvent::MessageChunk { content } => {
                let placeholder = self.placeholder_or_open();
                placeholder.content.push_str(content);
                Applied::Appended(content.clone())
            }
            StreamEvent::StatusUpdate { .. } => match event.status_text() {
                Some(text) => {
                    let text = text.to_string();
                    let placeholder = self.placeholder_or_open();
                    placeholder.content = text;
                    Applied::Replaced
                }
                None => Applied::Ignored,
            },
            StreamEvent::ToolCall { data } => {
                let message = ChatMessage::tool(ToolCall::from_event_data(data));
                let index = if self.placeholder().is_some() {
                    self.messages.len() - 1
                } else {
                    self.messages.len()
                };
                self.messages.insert(index, message);
                Applied::ToolInserted(index)
            }
            StreamEvent::Error { content } => {
                let text = format!("❌ Error: {}", content);
                match self.placeholder_mut() {
                    Some(placeholder) => {
                        placeholder.content = text;
                        placeholder.is_streaming = false;
                    }
                    None => {
                        let agent_name = self.last_agent_name();
                        self.messages
                            .push(ChatMessage::assistant(&text, agent_name.as_deref()));
                    }
                }
                Applied::Errored
            }
        }
    }

    /// Fold one chat socket frame into the transcript.
    pub fn apply_server_event(&mut self, event: &ServerEvent) -> Applied {
        match event {
            ServerEvent::Token { value } => self.apply(&StreamEvent::MessageChunk {
                content: value.clone(),
            }),
            ServerEvent::Message { agent, content } => {
                let placeholder = self.placeholder_or_open();
                placeholder.content = content.clone();
                if agent.is_some() {
                    placeholder.agent_name = agent.clone();
                }
                placeholder.is_streaming = false;
                Applied::Replaced
            }
            ServerEvent::Error { message } => self.apply(&StreamEvent::Error {
                content: message.clone(),
            }),
        }
    }

    /// Mark the streaming answer complete. Returns its final content.
    pub fn finish(&mut self) -> Option<String> {
        let placeholder = self.placeholder_mut()?;
        placeholder.is_streaming = false;
        Some(placeholder.content.clone())
    }

    /// The request never produced a stream
    pub fn fail_connection(&mut self) {
        let placeholder = self.placeholder_or_open();
        placeholder.content = CONNECTION_FAILED_TEXT.to_string();
        placeholder.is_streaming = false;
    }
}

/// Pure form of [`Transcript::apply`]: the next message list for `event`.
pub fn reduce(messages: Vec<ChatMessage>, event: &StreamEvent) -> Vec<ChatMessage> {
    let mut transcript = Transcript::from_messages(messages);
    transcript.apply(event);
    transcript.into_messages()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk(text: &str) -> StreamEvent {
        StreamEvent::MessageChunk {
            content: text.to_string(),
        }
    }

    fn tool(name: &str) -> StreamEvent {
        StreamEvent::ToolCall {
            data: json!({"type": "tool_call", "tool_name": name, "parameters": {}}),
        }
    }

    #[test]
    fn test_chunks_accumulate_in_placeholder() {
        let mut transcript = Transcript::new();
        transcript.push_user("hi");
        transcript.open_placeholder(Some("Intune Agent"));

        transcript.apply(&chunk("Hel"));
        transcript.apply(&chunk("lo"));

        assert_eq!(transcript.len(), 2);
        let placeholder = transcript.placeholder().unwrap();
        assert_eq!(placeholder.content, "Hello");
        assert_eq!(placeholder.agent_name.as_deref(), Some("Intune Agent"));
    }

    #[test]
    fn test_chunk_without_placeholder_opens_one() {
        let mut transcript = Transcript::new();
        transcript.push_user("hi");

        assert_eq!(transcript.apply(&chunk("x")), Applied::Appended("x".to_string()));
        assert_eq!(transcript.len(), 2);
        assert!(transcript.messages()[1].is_placeholder());
    }

    #[test]
    fn test_status_update_replaces_content() {
        let mut transcript = Transcript::new();
        transcript.open_placeholder(None);
        transcript.apply(&chunk("partial"));

        let status = StreamEvent::StatusUpdate {
            data: json!({"status": {"message": {"parts": [{"text": "Hello"}]}}}),
        };
        assert_eq!(transcript.apply(&status), Applied::Replaced);
        assert_eq!(transcript.placeholder().unwrap().content, "Hello");
    }

    #[test]
    fn test_status_update_without_text_is_ignored() {
        let mut transcript = Transcript::new();
        transcript.open_placeholder(None);
        let status = StreamEvent::StatusUpdate {
            data: json!({"status": {"state": "TASK_STATE_WORKING"}}),
        };
        assert_eq!(transcript.apply(&status), Applied::Ignored);
        assert_eq!(transcript.placeholder().unwrap().content, "");
    }

    #[test]
    fn test_tool_call_goes_ahead_of_placeholder() {
        let mut transcript = Transcript::new();
        transcript.push_user("hi");
        transcript.open_placeholder(None);

        assert_eq!(transcript.apply(&tool("lookup_user")), Applied::ToolInserted(1));
        transcript.apply(&chunk("answer"));
        assert_eq!(transcript.apply(&tool("create_ticket")), Applied::ToolInserted(2));

        let roles: Vec<Role> = transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Tool, Role::Tool, Role::Assistant]);
        assert_eq!(transcript.messages()[1].content, "lookup_user");
        assert_eq!(transcript.messages()[2].content, "create_ticket");
        assert_eq!(transcript.placeholder().unwrap().content, "answer");
    }

    #[test]
    fn test_tool_call_without_placeholder_is_appended() {
        let mut transcript = Transcript::new();
        transcript.push_user("hi");
        assert_eq!(transcript.apply(&tool("x")), Applied::ToolInserted(1));
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn test_error_finalizes_placeholder() {
        let mut transcript = Transcript::new();
        transcript.open_placeholder(None);
        transcript.apply(&chunk("half"));

        transcript.apply(&StreamEvent::Error {
            content: "boom".to_string(),
        });

        let last = transcript.messages().last().unwrap();
        assert_eq!(last.content, "❌ Error: boom");
        assert!(!last.is_streaming);
        assert!(transcript.placeholder().is_none());
    }

    #[test]
    fn test_finished_message_is_not_reopened() {
        let mut transcript = Transcript::new();
        transcript.open_placeholder(None);
        transcript.apply(&chunk("first"));
        assert_eq!(transcript.finish().as_deref(), Some("first"));

        transcript.apply(&chunk("second"));

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[0].content, "first");
        assert_eq!(transcript.messages()[1].content, "second");
    }

    #[test]
    fn test_tool_call_from_event_data() {
        let call = ToolCall::from_event_data(&json!({
            "tool_name": "wipe_device",
            "parameters": {"device_id": "D002"},
            "result": "wiped",
            "duration": 1.5
        }));
        assert_eq!(call.name, "wipe_device");
        assert_eq!(call.result, Some(json!("wiped")));
        assert_eq!(call.execution_time_seconds, 1.5);
        assert!(!call.is_executing);

        let pending = ToolCall::from_event_data(&json!({"result": ""}));
        assert_eq!(pending.name, "Tool Call");
        assert!(pending.is_executing);
        assert_eq!(pending.execution_time_seconds, 0.0);
    }

    #[test]
    fn test_socket_message_finalizes_with_agent_name() {
        let mut transcript = Transcript::new();
        transcript.open_placeholder(None);
        transcript.apply_server_event(&ServerEvent::Token {
            value: "draft".to_string(),
        });
        transcript.apply_server_event(&ServerEvent::Message {
            agent: Some("Supervisor".to_string()),
            content: "Final answer".to_string(),
        });

        let last = transcript.messages().last().unwrap();
        assert_eq!(last.content, "Final answer");
        assert_eq!(last.agent_name.as_deref(), Some("Supervisor"));
        assert!(!last.is_streaming);
    }

    #[test]
    fn test_reduce_is_apply_on_a_copy() {
        let messages = vec![ChatMessage::placeholder(None)];
        let next = reduce(messages.clone(), &chunk("a"));
        assert_eq!(messages[0].content, "");
        assert_eq!(next[0].content, "a");
    }
}
