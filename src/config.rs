//! Configuration loading and management
//!
//! Handles parsing of `taskhub.toml` configuration files: storage location,
//! the default actor, and the user directory principals are resolved from.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::principal::{Principal, Role};

pub const CONFIG_FILENAME: &str = "taskhub.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Actor configuration
    #[serde(default)]
    pub actor: ActorConfig,

    /// User directory
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            actor: ActorConfig::default(),
            users: vec![],
        }
    }
}

/// Storage-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `tasks.json` and `comments.jsonl`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".taskhub")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Actor-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Default user selector when none specified
    #[serde(default)]
    pub default: String,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            default: String::new(),
        }
    }
}

/// One user directory entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntry {
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,

    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Employee
}

impl UserEntry {
    pub fn to_principal(&self) -> Principal {
        Principal {
            id: self.id.clone(),
            name: self.name.clone(),
            employee_id: self.employee_id.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

impl Config {
    /// Load configuration from a `taskhub.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory, or return defaults
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILENAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve a user by id, email, or employee id. Selectors are trusted
    /// identifiers, matched exactly.
    pub fn principal(&self, selector: &str) -> Result<Principal> {
        self.users
            .iter()
            .find(|user| {
                user.id == selector
                    || user.email.as_deref() == Some(selector)
                    || user.employee_id.as_deref() == Some(selector)
            })
            .map(UserEntry::to_principal)
            .ok_or_else(|| Error::UnknownUser(selector.to_string()))
    }

    /// The configured default actor, if any
    pub fn default_principal(&self) -> Result<Option<Principal>> {
        let selector = self.actor.default.trim();
        if selector.is_empty() {
            return Ok(None);
        }
        self.principal(selector).map(Some)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for user in &self.users {
            let id = user.id.trim();
            if id.is_empty() {
                return Err(Error::InvalidConfig(
                    "users.id cannot be empty".to_string(),
                ));
            }
            if user.name.trim().is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "users.name cannot be empty for user '{id}'"
                )));
            }
            if !seen.insert(id.to_string()) {
                return Err(Error::InvalidConfig(format!(
                    "users has duplicate id '{id}'"
                )));
            }
        }

        let default = self.actor.default.trim();
        if !default.is_empty() && !self.users.is_empty() && self.lookup(default).is_none() {
            return Err(Error::InvalidConfig(format!(
                "actor.default '{default}' does not match any user"
            )));
        }

        Ok(())
    }

    fn lookup(&self, selector: &str) -> Option<&UserEntry> {
        self.users.iter().find(|user| {
            user.id == selector
                || user.email.as_deref() == Some(selector)
                || user.employee_id.as_deref() == Some(selector)
        })
    }
}
