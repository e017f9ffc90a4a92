//! Demo records served when the backend is unreachable and
//! `api.mock_fallback` is enabled.

use crate::models::{AccessRequest, Device, Email, Ticket, User};

fn some(s: &str) -> Option<String> {
    Some(s.to_string())
}

pub fn tickets() -> Vec<Ticket> {
    [
        ("INC0019283", "Email sync failing on mobile devices", "1 - Critical", "New", None, "10 mins ago"),
        ("RITM004921", "Request for New Laptop - MacBook Pro", "3 - Moderate", "Work in Progress", some("john.doe@contoso.com"), "2 hours ago"),
        ("INC0019255", "SAP Login Timeout Issue", "2 - High", "Resolved", some("servicedesk@contoso.com"), "Yesterday"),
        ("CHG0003921", "Upgrade Database Server cluster", "2 - High", "Scheduled", some("dba-team@contoso.com"), "2 days ago"),
    ]
    .into_iter()
    .map(|(id, title, priority, status, assignee, updated)| Ticket {
        ticket_id: id.to_string(),
        title: title.to_string(),
        priority: priority.to_string(),
        status: status.to_string(),
        assignee_email: assignee,
        updated_date: some(updated),
        ..Default::default()
    })
    .collect()
}

pub fn access_requests() -> Vec<AccessRequest> {
    [
        ("REQ-2024-001", "alice.smith@contoso.com", "SAP_FINANCE_READ", "Read", "Pending"),
        ("REQ-2024-002", "bob.jones@contoso.com", "SAP_HR_ADMIN", "Admin", "Approved"),
        ("REQ-2024-003", "charlie.day@contoso.com", "SAP_LOGISTICS_WRITE", "Write", "Pending"),
    ]
    .into_iter()
    .map(|(id, user, resource, action, status)| AccessRequest {
        request_id: id.to_string(),
        user_email: user.to_string(),
        resource: resource.to_string(),
        action: action.to_string(),
        status: status.to_string(),
        ..Default::default()
    })
    .collect()
}

pub fn users() -> Vec<User> {
    [
        (1, "John Doe", "john.doe@contoso.com", "E5", "Active", "IT"),
        (2, "Jane Smith", "jane.smith@contoso.com", "E3", "Active", "Sales"),
        (3, "Bob Johnson", "bob.j@contoso.com", "F1", "Blocked", "Retail"),
        (4, "Alice Wong", "alice.w@contoso.com", "E5", "Active", "Finance"),
    ]
    .into_iter()
    .map(|(id, name, email, license, status, department)| User {
        id,
        username: name.to_string(),
        email: email.to_string(),
        role: "user".to_string(),
        status: status.to_string(),
        department: some(department),
        license_sku: some(license),
        ..Default::default()
    })
    .collect()
}

pub fn devices() -> Vec<Device> {
    [
        ("dev1", "LAPTOP-JD-01", "john.doe@contoso.com", "Windows 10", "Compliant", "Just now"),
        ("dev2", "IPHONE-13-JS", "jane.smith@contoso.com", "iOS 16.0", "Non-Compliant", "2 days ago"),
        ("dev3", "ANDROID-WORK-02", "bob.j@contoso.com", "Android 12", "Compliant", "1 hour ago"),
    ]
    .into_iter()
    .map(|(id, serial, user, os, status, sync)| Device {
        device_id: id.to_string(),
        serial_number: serial.to_string(),
        user_email: user.to_string(),
        profile_name: "Standard".to_string(),
        status: status.to_string(),
        os_version: os.to_string(),
        last_sync: some(sync),
        ..Default::default()
    })
    .collect()
}

pub fn emails() -> Vec<Email> {
    [
        ("E001", "IT Support", "Password Expiry Notification", "Your password for account CORP\\JDoe is set to expire in 3 days...", "10:42 AM", true),
        ("E002", "Alice Smith", "Re: SAP Access Request", "Hi John, I have submitted the GRC request for the new finance role...", "09:15 AM", false),
        ("E003", "Microsoft Viva", "Your daily briefing", "You have 4 meetings today. Prepare for \"Q4 Roadmap Review\"...", "08:00 AM", false),
        ("E004", "ServiceNow", "INC-99281 Assigned to Group", "Incident INC-99281 has been routed to your assignment group...", "Yesterday", true),
        ("E005", "HR Bot", "Open Enrollment Begins", "It is that time of year again! Review your benefits package...", "Yesterday", false),
    ]
    .into_iter()
    .map(|(id, from, subject, preview, time, unread)| Email {
        email_id: id.to_string(),
        sender: from.to_string(),
        recipient: "john.doe@contoso.com".to_string(),
        subject: subject.to_string(),
        body_snippet: preview.to_string(),
        importance: "Normal".to_string(),
        status: if unread { "Unread" } else { "Read" }.to_string(),
        date_received: some(time),
        ..Default::default()
    })
    .collect()
}
