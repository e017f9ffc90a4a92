//! Records returned by the REST backend.
//!
//! Only the fields the CLI shows are typed. Everything else the server sends
//! is kept in `extra` so a record survives a fetch-edit-update cycle intact.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::session::AuthUser;

/// One line of a listing
pub trait Record {
    fn key(&self) -> String;
    fn summary(&self) -> String;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for Ticket {
    fn key(&self) -> String {
        self.ticket_id.clone()
    }

    fn summary(&self) -> String {
        format!(
            "{} [{}] {} ({})",
            self.title,
            self.priority,
            self.status,
            self.assignee_email.as_deref().unwrap_or("unassigned")
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub request_id: String,
    pub user_email: String,
    pub resource: String,
    pub action: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for AccessRequest {
    fn key(&self) -> String {
        self.request_id.clone()
    }

    fn summary(&self) -> String {
        format!(
            "{} requests {} on {} ({})",
            self.user_email, self.action, self.resource, self.status
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_sku: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for User {
    fn key(&self) -> String {
        self.id.to_string()
    }

    fn summary(&self) -> String {
        format!(
            "{} <{}> {} {} ({})",
            self.username,
            self.email,
            self.department.as_deref().unwrap_or("-"),
            self.license_sku.as_deref().unwrap_or("-"),
            self.status
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub profile_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub os_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for Device {
    fn key(&self) -> String {
        self.device_id.clone()
    }

    fn summary(&self) -> String {
        format!(
            "{} {} {} ({}, last sync {})",
            self.serial_number,
            self.user_email,
            self.os_version,
            self.status,
            self.last_sync.as_deref().unwrap_or("never")
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Email {
    pub email_id: String,
    pub sender: String,
    #[serde(default)]
    pub recipient: String,
    pub subject: String,
    #[serde(default)]
    pub body_snippet: String,
    #[serde(default)]
    pub importance: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_received: Option<String>,
    #[serde(default)]
    pub has_attachment: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Email {
    pub fn is_unread(&self) -> bool {
        self.status.eq_ignore_ascii_case("unread")
    }
}

impl Record for Email {
    fn key(&self) -> String {
        self.email_id.clone()
    }

    fn summary(&self) -> String {
        let marker = if self.is_unread() { "*" } else { " " };
        format!("{} {}: {}", marker, self.sender, self.subject)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub expires: Option<String>,
    pub user: AuthUser,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_survive() {
        let raw = json!({
            "id": 3,
            "ticket_id": "INC0019283",
            "title": "Email sync failing",
            "status": "New",
            "priority": "1 - Critical",
            "work_notes": "[]",
            "tags": "mobile,email"
        });
        let ticket: Ticket = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(ticket.extra["tags"], "mobile,email");
        assert_eq!(ticket.description, "");

        let back = serde_json::to_value(&ticket).unwrap();
        assert_eq!(back["work_notes"], raw["work_notes"]);
        assert_eq!(back["id"], 3);
    }

    #[test]
    fn test_email_unread_marker() {
        let email: Email = serde_json::from_value(json!({
            "email_id": "E001",
            "sender": "IT Support",
            "subject": "Password Expiry",
            "status": "Unread"
        }))
        .unwrap();
        assert!(email.summary().starts_with("* IT Support"));
    }
}
