use crossterm::style::{Color, ResetColor, SetForegroundColor};
use opshub_core::ui_writer::UiWriter;
use opshub_core::ToolCall;
use std::io::{self, Write};
use std::sync::Mutex;

/// Console implementation of UiWriter that prints to stdout
pub struct ConsoleUiWriter {
    /// Answer text already on screen for the current turn
    shown: Mutex<String>,
    /// The cursor is mid-line after streamed text
    line_open: Mutex<bool>,
}

impl ConsoleUiWriter {
    pub fn new() -> Self {
        Self {
            shown: Mutex::new(String::new()),
            line_open: Mutex::new(false),
        }
    }

    fn close_line(&self) {
        if let Ok(mut open) = self.line_open.lock() {
            if *open {
                println!();
                *open = false;
            }
        }
    }

    fn write_answer(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        print!("{}", text);
        let _ = io::stdout().flush();
        if let Ok(mut open) = self.line_open.lock() {
            *open = !text.ends_with('\n');
        }
    }
}

impl Default for ConsoleUiWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl UiWriter for ConsoleUiWriter {
    fn println(&self, message: &str) {
        self.close_line();
        println!("{}", message);
    }

    fn print_agent_prompt(&self, agent_name: &str) {
        self.close_line();
        if let Ok(mut shown) = self.shown.lock() {
            shown.clear();
        }
        println!(
            "{}{}:{}",
            SetForegroundColor(Color::Cyan),
            agent_name,
            ResetColor
        );
    }

    fn print_agent_response(&self, content: &str) {
        if let Ok(mut shown) = self.shown.lock() {
            shown.push_str(content);
        }
        self.write_answer(content);
    }

    fn replace_agent_response(&self, content: &str) {
        // Status updates carry the whole answer so far. Print only what is new
        // when it extends the text on screen, otherwise start over below.
        let suffix = {
            let Ok(mut shown) = self.shown.lock() else {
                return;
            };
            let suffix = match content.strip_prefix(shown.as_str()) {
                Some(rest) => rest.to_string(),
                None => {
                    if !shown.is_empty() {
                        self.close_line();
                    }
                    content.to_string()
                }
            };
            *shown = content.to_string();
            suffix
        };
        self.write_answer(&suffix);
    }

    fn print_tool_call(&self, call: &ToolCall) {
        self.close_line();
        let params = serde_json::to_string(&call.parameters).unwrap_or_default();
        println!(
            "{} ● {}{} {}",
            SetForegroundColor(Color::Magenta),
            call.name,
            ResetColor,
            params
        );
        match &call.result {
            Some(result) => {
                let result = match result {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                println!(
                    "{}   └─ {} ({:.2}s){}",
                    SetForegroundColor(Color::DarkGrey),
                    result,
                    call.execution_time_seconds,
                    ResetColor
                );
            }
            None => println!(
                "{}   └─ running...{}",
                SetForegroundColor(Color::DarkGrey),
                ResetColor
            ),
        }
        // Text after the card continues the same answer
        if let Ok(mut shown) = self.shown.lock() {
            shown.clear();
        }
    }

    fn notify(&self, message: &str) {
        self.close_line();
        println!(
            "{}⚙ {}{}",
            SetForegroundColor(Color::DarkYellow),
            message,
            ResetColor
        );
    }

    fn print_error(&self, message: &str) {
        self.close_line();
        println!("{}{}{}", SetForegroundColor(Color::Red), message, ResetColor);
    }

    fn finish_response(&self) {
        self.close_line();
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
    }
}
