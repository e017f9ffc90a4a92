//! REST client for the OpsHub backend.

use std::time::Duration;

use anyhow::{Context, Result};
use opshub_config::ApiConfig;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::mock_data;
use crate::models::{AccessRequest, Device, Email, LoginResponse, Ticket, User};
use crate::session::Session;

/// Query filters for list calls, e.g. `[("status", "Open")]`
pub type Filters<'a> = &'a [(&'a str, &'a str)];

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    mock_fallback: bool,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: None,
            mock_fallback: config.mock_fallback,
        })
    }

    /// Authenticate requests as the session's user
    pub fn with_session(mut self, session: Option<&Session>) -> Self {
        self.token = session.map(|s| s.token.clone());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        query: Filters<'_>,
        body: Option<Value>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("{} {}", method, url);

        let mut request = self.client.request(method, &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("API error: {}", status.as_u16());
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Invalid response from {}", url))
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.call(Method::GET, endpoint, &[], None).await
    }

    async fn post(&self, endpoint: &str, body: Option<Value>) -> Result<Value> {
        self.call(Method::POST, endpoint, &[], body).await
    }

    async fn put(&self, endpoint: &str, body: Value) -> Result<Value> {
        self.call(Method::PUT, endpoint, &[], Some(body)).await
    }

    /// List call that falls back to demo data when the backend fails and
    /// fallback is enabled.
    async fn list_or_mock<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        filters: Filters<'_>,
        mock: fn() -> Vec<T>,
    ) -> Result<Vec<T>> {
        match self.call(Method::GET, endpoint, filters, None).await {
            Ok(records) => Ok(records),
            Err(e) if self.mock_fallback => {
                warn!("{} unavailable, using demo data: {:#}", endpoint, e);
                Ok(mock())
            }
            Err(e) => Err(e),
        }
    }

    /// List call whose body is only trusted when it is an array
    async fn list_loose(&self, endpoint: &str) -> Result<Vec<Value>> {
        match self.get::<Value>(endpoint).await? {
            Value::Array(items) => Ok(items),
            other => {
                debug!("{} returned a non-array body, treating as empty: {}", endpoint, other);
                Ok(Vec::new())
            }
        }
    }

    // Auth

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let url = format!("{}/auth/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({"email": email, "password": password}))
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        if !response.status().is_success() {
            debug!("Login rejected with status {}", response.status());
            anyhow::bail!("Invalid credentials");
        }
        response
            .json::<LoginResponse>()
            .await
            .context("Invalid login response")
    }

    // Tickets

    pub async fn list_tickets(&self, filters: Filters<'_>) -> Result<Vec<Ticket>> {
        self.list_or_mock("/tickets", filters, mock_data::tickets).await
    }

    pub async fn get_ticket(&self, ticket_id: &str) -> Result<Ticket> {
        self.get(&format!("/tickets/{}", ticket_id)).await
    }

    pub async fn create_ticket(&self, data: Value) -> Result<Value> {
        self.post("/tickets", Some(data)).await
    }

    pub async fn update_ticket(&self, ticket_id: &str, data: Value) -> Result<Value> {
        self.put(&format!("/tickets/{}", ticket_id), data).await
    }

    pub async fn assign_ticket_to_group(&self, ticket_id: &str, group_name: &str) -> Result<Value> {
        self.post(
            &format!("/tickets/{}/assign-group", ticket_id),
            Some(json!({"group_name": group_name})),
        )
        .await
    }

    pub async fn add_work_note(&self, ticket_id: &str, note: &str, author_email: &str) -> Result<Value> {
        self.post(
            &format!("/tickets/{}/work-notes", ticket_id),
            Some(json!({"note": note, "author_email": author_email})),
        )
        .await
    }

    pub async fn escalate_ticket(&self, ticket_id: &str, reason: &str) -> Result<Value> {
        self.post(
            &format!("/tickets/{}/escalate", ticket_id),
            Some(json!({"reason": reason})),
        )
        .await
    }

    // Access requests

    pub async fn list_access_requests(&self, filters: Filters<'_>) -> Result<Vec<AccessRequest>> {
        self.list_or_mock("/access-requests", filters, mock_data::access_requests)
            .await
    }

    pub async fn get_access_request(&self, request_id: &str) -> Result<AccessRequest> {
        self.get(&format!("/access-requests/{}", request_id)).await
    }

    pub async fn create_access_request(&self, data: Value) -> Result<Value> {
        self.post("/access-requests", Some(data)).await
    }

    pub async fn approve_access_request(&self, request_id: &str, approver_email: &str) -> Result<Value> {
        self.post(
            &format!("/access-requests/{}/approve", request_id),
            Some(json!({"approver_email": approver_email, "approved": true})),
        )
        .await
    }

    /// Rejection goes through the approve endpoint with `approved: false`
    pub async fn reject_access_request(
        &self,
        request_id: &str,
        approver_email: &str,
        reason: &str,
    ) -> Result<Value> {
        self.post(
            &format!("/access-requests/{}/approve", request_id),
            Some(json!({"approver_email": approver_email, "approved": false, "reason": reason})),
        )
        .await
    }

    pub async fn calculate_risk(&self, resource: &str, action: &str) -> Result<Value> {
        self.post(
            "/access-requests/calculate-risk",
            Some(json!({"resource": resource, "action": action})),
        )
        .await
    }

    // Users

    pub async fn list_users(&self, filters: Filters<'_>) -> Result<Vec<User>> {
        self.list_or_mock("/users", filters, mock_data::users).await
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User> {
        self.get(&format!("/users/{}", user_id)).await
    }

    pub async fn create_user(&self, data: Value) -> Result<Value> {
        self.post("/users", Some(data)).await
    }

    pub async fn update_user(&self, user_id: i64, data: Value) -> Result<Value> {
        self.put(&format!("/users/{}", user_id), data).await
    }

    pub async fn deactivate_user(&self, user_email: &str) -> Result<Value> {
        self.post("/users/deactivate", Some(json!({"user_email": user_email})))
            .await
    }

    pub async fn assign_license(&self, user_email: &str, license_sku: &str) -> Result<Value> {
        self.post(
            "/users/assign-license",
            Some(json!({"user_email": user_email, "license_sku": license_sku})),
        )
        .await
    }

    // Devices

    pub async fn list_devices(&self, filters: Filters<'_>) -> Result<Vec<Device>> {
        self.list_or_mock("/devices", filters, mock_data::devices).await
    }

    pub async fn get_device(&self, device_id: &str) -> Result<Device> {
        self.get(&format!("/devices/{}", device_id)).await
    }

    pub async fn provision_device(&self, data: Value) -> Result<Value> {
        self.post("/devices", Some(data)).await
    }

    pub async fn update_device_status(&self, device_id: &str, status: &str) -> Result<Value> {
        self.put(&format!("/devices/{}/status", device_id), json!({"status": status}))
            .await
    }

    pub async fn check_compliance(&self, device_id: &str) -> Result<Value> {
        self.post(&format!("/devices/{}/check-compliance", device_id), None)
            .await
    }

    pub async fn wipe_device(&self, device_id: &str, admin_email: &str, confirmation: bool) -> Result<Value> {
        self.post(
            &format!("/devices/{}/wipe", device_id),
            Some(json!({"admin_email": admin_email, "confirmation": confirmation})),
        )
        .await
    }

    // Emails

    pub async fn list_emails(&self, filters: Filters<'_>) -> Result<Vec<Email>> {
        self.list_or_mock("/emails", filters, mock_data::emails).await
    }

    pub async fn get_email(&self, email_id: &str) -> Result<Email> {
        self.get(&format!("/emails/{}", email_id)).await
    }

    pub async fn send_email(&self, data: Value) -> Result<Value> {
        self.post("/emails", Some(data)).await
    }

    pub async fn mark_email_read(&self, email_id: &str) -> Result<Value> {
        self.post(&format!("/emails/{}/mark-read", email_id), None).await
    }

    pub async fn reply_to_email(&self, email_id: &str, body: &str, reply_all: bool) -> Result<Value> {
        self.post(
            &format!("/emails/{}/reply", email_id),
            Some(json!({"body": body, "reply_all": reply_all})),
        )
        .await
    }

    // Cloud resources

    pub async fn list_vms(&self) -> Result<Vec<Value>> {
        self.list_loose("/resources/vms").await
    }

    pub async fn list_apps(&self) -> Result<Vec<Value>> {
        self.list_loose("/resources/apps").await
    }

    pub async fn list_resource_groups(&self) -> Result<Vec<Value>> {
        self.list_loose("/resources/rgs").await
    }

    pub async fn list_service_accounts(&self) -> Result<Vec<Value>> {
        self.list_loose("/resources/service-accounts").await
    }

    // RBAC

    pub async fn list_applications(&self) -> Result<Vec<Value>> {
        self.list_loose("/rbac/applications").await
    }

    pub async fn list_flavors(&self) -> Result<Vec<Value>> {
        self.list_loose("/rbac/flavors").await
    }

    pub async fn list_roles(&self, application_id: Option<i64>) -> Result<Vec<Value>> {
        match application_id {
            Some(id) => self.list_loose(&format!("/rbac/roles?application_id={}", id)).await,
            None => self.list_loose("/rbac/roles").await,
        }
    }

    pub async fn user_roles(&self, user_id: i64) -> Result<Vec<Value>> {
        self.list_loose(&format!("/rbac/users/{}/roles", user_id)).await
    }

    pub async fn assign_role(&self, user_id: i64, role_id: i64) -> Result<Value> {
        self.post(
            "/rbac/assign",
            Some(json!({"user_id": user_id, "role_id": role_id})),
        )
        .await
    }
}
