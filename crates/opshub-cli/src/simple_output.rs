use crossterm::style::{Color, ResetColor, SetForegroundColor};
use opshub_core::models::Record;
use serde_json::Value;

/// Simple output helper for printing messages
#[derive(Clone)]
pub struct SimpleOutput;

impl SimpleOutput {
    pub fn new() -> Self {
        SimpleOutput
    }

    pub fn print(&self, message: &str) {
        println!("{}", message);
    }

    /// Format: "opshub: <message> ... [status]"
    pub fn print_status(&self, message: &str, status: &str) {
        let color = match status {
            "done" | "ok" => Color::Green,
            "failed" | "error" => Color::Red,
            _ => Color::Yellow,
        };
        println!(
            "{}opshub:{} {} ... {}[{}]{}",
            SetForegroundColor(Color::Cyan),
            ResetColor,
            message,
            SetForegroundColor(color),
            status,
            ResetColor
        );
    }

    pub fn print_records<R: Record>(&self, records: &[R]) {
        if records.is_empty() {
            self.print("(none)");
            return;
        }
        let width = records.iter().map(|r| r.key().len()).max().unwrap_or(0);
        for record in records {
            println!(
                "{}{:<width$}{}  {}",
                SetForegroundColor(Color::Yellow),
                record.key(),
                ResetColor,
                record.summary(),
                width = width
            );
        }
    }

    /// One line per item, using its `name` when it has one
    pub fn print_values(&self, items: &[Value]) {
        if items.is_empty() {
            self.print("(none)");
            return;
        }
        for item in items {
            self.print(&value_line(item));
        }
    }

    pub fn print_json(&self, value: &Value) {
        match serde_json::to_string_pretty(value) {
            Ok(pretty) => self.print(&pretty),
            Err(_) => self.print(&value.to_string()),
        }
    }
}

impl Default for SimpleOutput {
    fn default() -> Self {
        Self::new()
    }
}

pub fn value_line(item: &Value) -> String {
    let id = item.get("id").map(|id| match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });
    let name = item.get("name").and_then(Value::as_str);
    match (id, name) {
        (Some(id), Some(name)) => format!("{}  {}", id, name),
        (None, Some(name)) => name.to_string(),
        _ => item.to_string(),
    }
}
