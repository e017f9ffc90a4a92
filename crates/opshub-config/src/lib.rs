use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default locations searched when no explicit config path is given, in order.
const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "./opshub.toml",
    "~/.config/opshub/config.toml",
    "~/.opshub.toml",
];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub agents: AgentsConfig,
    pub api: ApiConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Streaming agent endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Base URL of the agent gateway, e.g. "http://localhost:8006/agents"
    pub base_url: String,

    /// Workflow selected when the chat starts (intune, access, resource)
    pub default_workflow: Option<String>,

    /// Connect timeout for the streaming request. The stream itself never times out.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

fn default_connect_timeout() -> u64 {
    10
}

/// REST backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API, e.g. "http://localhost:8000/api"
    pub base_url: String,

    /// Return static demo data when a list call fails instead of propagating the error
    #[serde(default)]
    pub mock_fallback: bool,

    pub timeout_seconds: u64,
}

/// WebSocket chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Base URL for `/ws/chat/{client_id}`
    pub ws_base_url: String,
    pub client_id: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            ws_base_url: "ws://localhost:8000".to_string(),
            client_id: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Where the auth session is stored. Defaults to ~/.config/opshub/session.json
    pub path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agents: AgentsConfig {
                base_url: "http://localhost:8006/agents".to_string(),
                default_workflow: None,
                connect_timeout_seconds: default_connect_timeout(),
            },
            api: ApiConfig {
                base_url: "http://localhost:8000/api".to_string(),
                mock_fallback: true,
                timeout_seconds: 30,
            },
            chat: ChatConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Config {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let config_path_to_load = match config_path {
            Some(path) => {
                if !Path::new(path).exists() {
                    anyhow::bail!("Config file '{}' does not exist", path);
                }
                Some(path.to_string())
            }
            None => DEFAULT_CONFIG_PATHS.iter().find_map(|path| {
                let expanded_path = shellexpand::tilde(path);
                if Path::new(expanded_path.as_ref()).exists() {
                    Some(expanded_path.to_string())
                } else {
                    None
                }
            }),
        };

        let Some(path) = config_path_to_load else {
            // First run: write the defaults so the user has something to edit
            let default_config = Self::default();
            let config_file = config_dir().join("config.toml");
            std::fs::create_dir_all(config_dir()).ok();

            match default_config.save(&config_file) {
                Ok(()) => info!("Created default configuration at: {}", config_file.display()),
                Err(e) => warn!("Could not save default config: {}", e),
            }
            return Ok(default_config);
        };

        let config_content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&config_content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config '{}': {}", path, e))?;
        config.validate()?;

        Ok(config)
    }

    /// Check that every configured endpoint has a scheme the clients can speak.
    pub fn validate(&self) -> Result<()> {
        validate_url("agents.base_url", &self.agents.base_url, &["http://", "https://"])?;
        validate_url("api.base_url", &self.api.base_url, &["http://", "https://"])?;
        validate_url("chat.ws_base_url", &self.chat.ws_base_url, &["ws://", "wss://"])?;

        if self.chat.client_id.trim().is_empty() {
            anyhow::bail!("chat.client_id must not be empty");
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    pub fn load_with_overrides(
        config_path: Option<&str>,
        agent_url_override: Option<String>,
        api_url_override: Option<String>,
        workflow_override: Option<String>,
    ) -> Result<Self> {
        let mut config = Self::load(config_path)?;

        if let Some(url) = agent_url_override {
            config.agents.base_url = url;
        }
        if let Some(url) = api_url_override {
            config.api.base_url = url;
        }
        if let Some(workflow) = workflow_override {
            config.agents.default_workflow = Some(workflow);
        }

        config.validate()?;
        Ok(config)
    }

    /// Resolved location of the session file
    pub fn session_file(&self) -> PathBuf {
        match &self.session.path {
            Some(path) => PathBuf::from(shellexpand::tilde(path).as_ref()),
            None => config_dir().join("session.json"),
        }
    }

    /// `{ws_base_url}/ws/chat/{client_id}`
    pub fn chat_socket_url(&self) -> String {
        format!(
            "{}/ws/chat/{}",
            self.chat.ws_base_url.trim_end_matches('/'),
            self.chat.client_id
        )
    }
}

/// ~/.config/opshub, or the current directory when there is no home
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .map(|mut path| {
            path.push(".config");
            path.push("opshub");
            path
        })
        .unwrap_or_else(|| PathBuf::from("."))
}

fn validate_url(field: &str, url: &str, schemes: &[&str]) -> Result<()> {
    if !schemes.iter().any(|scheme| url.starts_with(scheme)) {
        anyhow::bail!(
            "Invalid {} '{}'. Expected a URL starting with one of: {}",
            field,
            url,
            schemes.join(", ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests;
