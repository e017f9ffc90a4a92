use crate::transcript::ToolCall;
use std::sync::Mutex;

/// Interface for UI output operations
/// Lets the conversation render to a terminal, a log, or nothing at all
/// without knowing which.
pub trait UiWriter: Send + Sync {
    /// Print a message with a newline
    fn println(&self, message: &str);

    /// Print the typing indicator for the agent about to answer
    fn print_agent_prompt(&self, agent_name: &str);

    /// Print streamed answer text
    fn print_agent_response(&self, content: &str);

    /// A status update replaced the answer text shown so far
    fn replace_agent_response(&self, content: &str);

    /// Print a tool card
    fn print_tool_call(&self, call: &ToolCall);

    /// Short transient notice ("Agent is using tool: ...")
    fn notify(&self, message: &str);

    /// Print an error line
    fn print_error(&self, message: &str);

    /// The current answer is complete
    fn finish_response(&self) {}

    /// Flush any buffered output
    fn flush(&self);
}

/// A no-op implementation for when UI output is not needed
pub struct NullUiWriter;

impl UiWriter for NullUiWriter {
    fn println(&self, _message: &str) {}
    fn print_agent_prompt(&self, _agent_name: &str) {}
    fn print_agent_response(&self, _content: &str) {}
    fn replace_agent_response(&self, _content: &str) {}
    fn print_tool_call(&self, _call: &ToolCall) {}
    fn notify(&self, _message: &str) {}
    fn print_error(&self, _message: &str) {}
    fn flush(&self) {}
}

/// Keeps every call as a line of text, for tests
#[derive(Default)]
pub struct RecordingUiWriter {
    lines: Mutex<Vec<String>>,
}

impl RecordingUiWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn push(&self, line: String) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }
}

impl UiWriter for RecordingUiWriter {
    fn println(&self, message: &str) {
        self.push(message.to_string());
    }

    fn print_agent_prompt(&self, agent_name: &str) {
        self.push(format!("prompt:{}", agent_name));
    }

    fn print_agent_response(&self, content: &str) {
        self.push(format!("response:{}", content));
    }

    fn replace_agent_response(&self, content: &str) {
        self.push(format!("replace:{}", content));
    }

    fn print_tool_call(&self, call: &ToolCall) {
        self.push(format!("tool:{}", call.name));
    }

    fn notify(&self, message: &str) {
        self.push(format!("notify:{}", message));
    }

    fn print_error(&self, message: &str) {
        self.push(format!("error:{}", message));
    }

    fn finish_response(&self) {
        self.push("finish".to_string());
    }

    fn flush(&self) {}
}

impl<W: UiWriter + ?Sized> UiWriter for std::sync::Arc<W> {
    fn println(&self, message: &str) {
        (**self).println(message)
    }
    fn print_agent_prompt(&self, agent_name: &str) {
        (**self).print_agent_prompt(agent_name)
    }
    fn print_agent_response(&self, content: &str) {
        (**self).print_agent_response(content)
    }
    fn replace_agent_response(&self, content: &str) {
        (**self).replace_agent_response(content)
    }
    fn print_tool_call(&self, call: &ToolCall) {
        (**self).print_tool_call(call)
    }
    fn notify(&self, message: &str) {
        (**self).notify(message)
    }
    fn print_error(&self, message: &str) {
        (**self).print_error(message)
    }
    fn finish_response(&self) {
        (**self).finish_response()
    }
    fn flush(&self) {
        (**self).flush()
    }
}
