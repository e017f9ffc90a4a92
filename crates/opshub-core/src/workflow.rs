use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use opshub_agents::AgentId;
use serde::{Deserialize, Serialize};

/// Chat workflows offered to the user, each backed by one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Workflow {
    IntuneCopilot,
    AccessWorkflow,
    ResourceProvisioning,
}

impl Workflow {
    pub const ALL: [Workflow; 3] = [
        Workflow::IntuneCopilot,
        Workflow::AccessWorkflow,
        Workflow::ResourceProvisioning,
    ];

    pub fn agent_id(&self) -> AgentId {
        match self {
            Workflow::IntuneCopilot => AgentId::Intune,
            Workflow::AccessWorkflow => AgentId::Access,
            Workflow::ResourceProvisioning => AgentId::Resource,
        }
    }

    /// Name shown next to the typing indicator
    pub fn agent_name(&self) -> &'static str {
        match self {
            Workflow::IntuneCopilot => "Intune Agent",
            Workflow::AccessWorkflow => "Access Agent",
            Workflow::ResourceProvisioning => "Resource Agent",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Workflow::IntuneCopilot => "Intune Copilot",
            Workflow::AccessWorkflow => "App Access Bot",
            Workflow::ResourceProvisioning => "Resource Agent",
        }
    }

    /// Wire name used by the chat socket
    pub fn as_str(&self) -> &'static str {
        match self {
            Workflow::IntuneCopilot => "INTUNE_COPILOT",
            Workflow::AccessWorkflow => "ACCESS_WORKFLOW",
            Workflow::ResourceProvisioning => "RESOURCE_PROVISIONING",
        }
    }
}

/// Agent for an optional selection. Nothing selected talks to Intune.
pub fn agent_for(workflow: Option<Workflow>) -> AgentId {
    workflow.map(|w| w.agent_id()).unwrap_or(AgentId::Intune)
}

pub fn agent_name_for(workflow: Option<Workflow>) -> &'static str {
    workflow
        .unwrap_or(Workflow::IntuneCopilot)
        .agent_name()
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Workflow {
    type Err = anyhow::Error;

    /// Accepts the wire name or the short agent name, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "INTUNE_COPILOT" | "INTUNE" => Ok(Workflow::IntuneCopilot),
            "ACCESS_WORKFLOW" | "ACCESS" => Ok(Workflow::AccessWorkflow),
            "RESOURCE_PROVISIONING" | "RESOURCE" => Ok(Workflow::ResourceProvisioning),
            _ => anyhow::bail!(
                "Unknown workflow '{}'. Valid workflows: intune, access, resource",
                s
            ),
        }
    }
}
