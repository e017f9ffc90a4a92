//! Handlers for the non-chat subcommands.

use anyhow::{Context, Result};
use opshub_config::Config;
use opshub_core::session::{ADMIN_ROLE, APPROVER_ROLE};
use opshub_core::{ApiClient, Session, SessionStore};
use serde_json::Value;
use tracing::{debug, info};

use crate::cli_args::{
    AccessCommand, Command, DeviceCommand, EmailCommand, RbacCommand, ResourceKind,
    TicketCommand, UserCommand,
};
use crate::simple_output::SimpleOutput;

/// Keep only the filters that were given
pub fn filters<'a>(pairs: &[(&'a str, Option<&'a str>)]) -> Vec<(&'a str, &'a str)> {
    pairs
        .iter()
        .filter_map(|(key, value)| value.map(|v| (*key, v)))
        .collect()
}

pub fn parse_payload(json: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(json).context("Invalid JSON payload")?;
    if !value.is_object() {
        anyhow::bail!("JSON payload must be an object");
    }
    Ok(value)
}

/// Role a command needs. Users and RBAC are admin pages, approvals need an approver.
pub fn required_role(command: &Command) -> Option<&'static str> {
    match command {
        Command::Users(_) | Command::Rbac(_) => Some(ADMIN_ROLE),
        Command::Access(AccessCommand::Approve { .. } | AccessCommand::Reject { .. }) => {
            Some(APPROVER_ROLE)
        }
        _ => None,
    }
}

/// Refuse a command the signed-in user's role does not cover.
///
/// Signed-out calls go through and the backend decides.
pub fn check_role(command: &Command, session: Option<&Session>) -> Result<()> {
    if let (Some(role), Some(session)) = (required_role(command), session) {
        if !session.permits(Some(role)) {
            anyhow::bail!(
                "This command requires the '{}' role; {} is signed in as '{}'",
                role,
                session.user.email,
                session.user.role
            );
        }
    }
    Ok(())
}

fn api_client(config: &Config, session: Option<&Session>) -> Result<ApiClient> {
    Ok(ApiClient::new(&config.api)?.with_session(session))
}

/// Run a REST or session subcommand. Chat subcommands are handled elsewhere.
pub async fn run_command(command: Command, config: &Config, output: &SimpleOutput) -> Result<()> {
    let store = SessionStore::new(config.session_file());
    let session = store.load();
    debug!(
        "Session: {}",
        session
            .as_ref()
            .map(|s| s.user.email.as_str())
            .unwrap_or("signed out")
    );
    check_role(&command, session.as_ref())?;
    let api = api_client(config, session.as_ref())?;

    match command {
        Command::Login { email, password } => {
            let login = api.login(&email, &password).await?;
            let session = Session::new(login.token, login.user);
            store.save(&session)?;
            info!("Signed in as {}", session.user.email);
            output.print_status(
                &format!("signed in as {} ({})", session.user.username, session.user.role),
                "done",
            );
        }
        Command::Logout => {
            store.clear()?;
            output.print_status("signed out", "done");
        }
        Command::Whoami => match session {
            Some(session) => {
                let user = &session.user;
                output.print(&format!("{} <{}>", user.username, user.email));
                output.print(&format!("  role: {}", user.role));
                if let Some(title) = &user.job_title {
                    output.print(&format!("  title: {}", title));
                }
                if let Some(department) = &user.department {
                    output.print(&format!("  department: {}", department));
                }
            }
            None => output.print("Not signed in"),
        },
        Command::Tickets(cmd) => run_tickets(cmd, &api, output).await?,
        Command::Access(cmd) => run_access(cmd, &api, output).await?,
        Command::Users(cmd) => run_users(cmd, &api, output).await?,
        Command::Devices(cmd) => run_devices(cmd, &api, output).await?,
        Command::Emails(cmd) => run_emails(cmd, &api, output).await?,
        Command::Resources { kind } => {
            let items = match kind {
                ResourceKind::Vms => api.list_vms().await?,
                ResourceKind::Apps => api.list_apps().await?,
                ResourceKind::Rgs => api.list_resource_groups().await?,
                ResourceKind::ServiceAccounts => api.list_service_accounts().await?,
            };
            output.print_values(&items);
        }
        Command::Rbac(cmd) => run_rbac(cmd, &api, output).await?,
        Command::Chat | Command::Send { .. } | Command::Socket => {
            anyhow::bail!("Chat commands are not REST commands")
        }
    }
    Ok(())
}

async fn run_tickets(cmd: TicketCommand, api: &ApiClient, output: &SimpleOutput) -> Result<()> {
    match cmd {
        TicketCommand::List { status, priority } => {
            let query = filters(&[("status", status.as_deref()), ("priority", priority.as_deref())]);
            output.print_records(&api.list_tickets(&query).await?);
        }
        TicketCommand::Show { id } => {
            let ticket = api.get_ticket(&id).await?;
            output.print_json(&serde_json::to_value(ticket)?);
        }
        TicketCommand::Create { json } => output.print_json(&api.create_ticket(parse_payload(&json)?).await?),
        TicketCommand::Update { id, json } => {
            output.print_json(&api.update_ticket(&id, parse_payload(&json)?).await?)
        }
        TicketCommand::AssignGroup { id, group } => {
            output.print_json(&api.assign_ticket_to_group(&id, &group).await?)
        }
        TicketCommand::Note { id, note, author } => {
            output.print_json(&api.add_work_note(&id, &note, &author).await?)
        }
        TicketCommand::Escalate { id, reason } => {
            output.print_json(&api.escalate_ticket(&id, &reason).await?)
        }
    }
    Ok(())
}

async fn run_access(cmd: AccessCommand, api: &ApiClient, output: &SimpleOutput) -> Result<()> {
    match cmd {
        AccessCommand::List { status } => {
            let query = filters(&[("status", status.as_deref())]);
            output.print_records(&api.list_access_requests(&query).await?);
        }
        AccessCommand::Show { id } => {
            output.print_json(&serde_json::to_value(api.get_access_request(&id).await?)?)
        }
        AccessCommand::Create { json } => {
            output.print_json(&api.create_access_request(parse_payload(&json)?).await?)
        }
        AccessCommand::Approve { id, approver } => {
            output.print_json(&api.approve_access_request(&id, &approver).await?)
        }
        AccessCommand::Reject { id, approver, reason } => {
            output.print_json(&api.reject_access_request(&id, &approver, &reason).await?)
        }
        AccessCommand::Risk { resource, action } => {
            output.print_json(&api.calculate_risk(&resource, &action).await?)
        }
    }
    Ok(())
}

async fn run_users(cmd: UserCommand, api: &ApiClient, output: &SimpleOutput) -> Result<()> {
    match cmd {
        UserCommand::List { department } => {
            let query = filters(&[("department", department.as_deref())]);
            output.print_records(&api.list_users(&query).await?);
        }
        UserCommand::Show { id } => output.print_json(&serde_json::to_value(api.get_user(id).await?)?),
        UserCommand::Create { json } => output.print_json(&api.create_user(parse_payload(&json)?).await?),
        UserCommand::Update { id, json } => {
            output.print_json(&api.update_user(id, parse_payload(&json)?).await?)
        }
        UserCommand::Deactivate { email } => output.print_json(&api.deactivate_user(&email).await?),
        UserCommand::License { email, sku } => {
            output.print_json(&api.assign_license(&email, &sku).await?)
        }
    }
    Ok(())
}

async fn run_devices(cmd: DeviceCommand, api: &ApiClient, output: &SimpleOutput) -> Result<()> {
    match cmd {
        DeviceCommand::List { status } => {
            let query = filters(&[("status", status.as_deref())]);
            output.print_records(&api.list_devices(&query).await?);
        }
        DeviceCommand::Show { id } => {
            output.print_json(&serde_json::to_value(api.get_device(&id).await?)?)
        }
        DeviceCommand::Provision { json } => {
            output.print_json(&api.provision_device(parse_payload(&json)?).await?)
        }
        DeviceCommand::Status { id, status } => {
            output.print_json(&api.update_device_status(&id, &status).await?)
        }
        DeviceCommand::Compliance { id } => output.print_json(&api.check_compliance(&id).await?),
        DeviceCommand::Wipe { id, admin, yes } => {
            if !yes {
                anyhow::bail!("Refusing to wipe {} without --yes", id);
            }
            output.print_json(&api.wipe_device(&id, &admin, yes).await?)
        }
    }
    Ok(())
}

async fn run_emails(cmd: EmailCommand, api: &ApiClient, output: &SimpleOutput) -> Result<()> {
    match cmd {
        EmailCommand::List { status } => {
            let query = filters(&[("status", status.as_deref())]);
            output.print_records(&api.list_emails(&query).await?);
        }
        EmailCommand::Show { id } => output.print_json(&serde_json::to_value(api.get_email(&id).await?)?),
        EmailCommand::Send { json } => output.print_json(&api.send_email(parse_payload(&json)?).await?),
        EmailCommand::Read { id } => output.print_json(&api.mark_email_read(&id).await?),
        EmailCommand::Reply { id, body, all } => {
            output.print_json(&api.reply_to_email(&id, &body, all).await?)
        }
    }
    Ok(())
}

async fn run_rbac(cmd: RbacCommand, api: &ApiClient, output: &SimpleOutput) -> Result<()> {
    match cmd {
        RbacCommand::Apps => output.print_values(&api.list_applications().await?),
        RbacCommand::Flavors => output.print_values(&api.list_flavors().await?),
        RbacCommand::Roles { application_id } => {
            output.print_values(&api.list_roles(application_id).await?)
        }
        RbacCommand::UserRoles { user_id } => output.print_values(&api.user_roles(user_id).await?),
        RbacCommand::Assign { user_id, role_id } => {
            output.print_json(&api.assign_role(user_id, role_id).await?)
        }
    }
    Ok(())
}
