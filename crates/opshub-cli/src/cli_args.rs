//! CLI argument parsing for OpsHub.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Clone, Debug)]
#[command(name = "opshub")]
#[command(about = "Terminal client for the OpsHub admin API and its streaming agents")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override the agent gateway base URL
    #[arg(long, value_name = "URL", global = true)]
    pub agent_url: Option<String>,

    /// Override the REST API base URL
    #[arg(long, value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Workflow to chat with (intune, access, resource)
    #[arg(short, long, value_name = "WORKFLOW", global = true)]
    pub workflow: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Interactive chat with an agent workflow (the default)
    Chat,

    /// Send one message and print the streamed answer
    Send {
        message: String,

        /// Use the unary endpoint and print the raw JSON response
        #[arg(long)]
        raw: bool,
    },

    /// Interactive chat over the /ws/chat socket
    Socket,

    /// Sign in and store the session
    Login {
        email: String,

        /// Password (read from OPSHUB_PASSWORD when omitted)
        #[arg(long, env = "OPSHUB_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    #[command(subcommand)]
    Tickets(TicketCommand),

    #[command(subcommand)]
    Access(AccessCommand),

    #[command(subcommand)]
    Users(UserCommand),

    #[command(subcommand)]
    Devices(DeviceCommand),

    #[command(subcommand)]
    Emails(EmailCommand),

    /// List cloud resources
    Resources {
        #[arg(value_enum)]
        kind: ResourceKind,
    },

    #[command(subcommand)]
    Rbac(RbacCommand),
}

/// ServiceNow tickets
#[derive(Subcommand, Clone, Debug)]
pub enum TicketCommand {
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
    },
    Show {
        id: String,
    },
    /// Create from a JSON object
    Create {
        json: String,
    },
    /// Update from a JSON object
    Update {
        id: String,
        json: String,
    },
    AssignGroup {
        id: String,
        group: String,
    },
    Note {
        id: String,
        note: String,
        #[arg(long)]
        author: String,
    },
    Escalate {
        id: String,
        reason: String,
    },
}

/// Access requests
#[derive(Subcommand, Clone, Debug)]
pub enum AccessCommand {
    List {
        #[arg(long)]
        status: Option<String>,
    },
    Show {
        id: String,
    },
    Create {
        json: String,
    },
    Approve {
        id: String,
        #[arg(long)]
        approver: String,
    },
    Reject {
        id: String,
        #[arg(long)]
        approver: String,
        #[arg(long)]
        reason: String,
    },
    Risk {
        resource: String,
        action: String,
    },
}

/// Users and licenses
#[derive(Subcommand, Clone, Debug)]
pub enum UserCommand {
    List {
        #[arg(long)]
        department: Option<String>,
    },
    Show {
        id: i64,
    },
    Create {
        json: String,
    },
    Update {
        id: i64,
        json: String,
    },
    Deactivate {
        email: String,
    },
    License {
        email: String,
        sku: String,
    },
}

/// Intune devices
#[derive(Subcommand, Clone, Debug)]
pub enum DeviceCommand {
    List {
        #[arg(long)]
        status: Option<String>,
    },
    Show {
        id: String,
    },
    Provision {
        json: String,
    },
    Status {
        id: String,
        status: String,
    },
    Compliance {
        id: String,
    },
    Wipe {
        id: String,
        #[arg(long)]
        admin: String,
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
}

/// Mailbox
#[derive(Subcommand, Clone, Debug)]
pub enum EmailCommand {
    List {
        #[arg(long)]
        status: Option<String>,
    },
    Show {
        id: String,
    },
    Send {
        json: String,
    },
    Read {
        id: String,
    },
    Reply {
        id: String,
        body: String,
        #[arg(long)]
        all: bool,
    },
}

/// Role-based access control
#[derive(Subcommand, Clone, Debug)]
pub enum RbacCommand {
    Apps,
    Flavors,
    Roles {
        #[arg(long = "app")]
        application_id: Option<i64>,
    },
    UserRoles {
        user_id: i64,
    },
    Assign {
        user_id: i64,
        role_id: i64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Vms,
    Apps,
    Rgs,
    ServiceAccounts,
}
