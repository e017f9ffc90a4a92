//! Signed-in state: the bearer token and the user it belongs to.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const ADMIN_ROLE: &str = "admin";
pub const APPROVER_ROLE: &str = "approver";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: AuthUser,
}

impl Session {
    pub fn new(token: impl Into<String>, user: AuthUser) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    /// Admins pass every role check.
    pub fn permits(&self, required_role: Option<&str>) -> bool {
        match required_role {
            None => true,
            Some(role) => self.user.role == role || self.user.role == ADMIN_ROLE,
        }
    }
}

/// Reads and writes the session file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session.
    ///
    /// A missing file means signed out. A file that cannot be parsed, or that
    /// holds an empty token, is removed and also treated as signed out.
    pub fn load(&self) -> Option<Session> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!("No session at {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<Session>(&contents) {
            Ok(session) if !session.token.is_empty() => Some(session),
            Ok(_) => {
                warn!("Session at {} has no token, removing it", self.path.display());
                self.discard();
                None
            }
            Err(e) => {
                warn!("Failed to restore session from {}: {}", self.path.display(), e);
                self.discard();
                None
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create session directory {}", parent.display())
            })?;
        }
        let json = serde_json::to_string_pretty(session).context("Failed to serialize session")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write session to {}", self.path.display()))?;
        debug!("Saved session for {} to {}", session.user.email, self.path.display());
        Ok(())
    }

    /// Sign out. Clearing an absent session is not an error.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove session {}", self.path.display())),
        }
    }

    fn discard(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove session {}: {}", self.path.display(), e);
        }
    }
}
