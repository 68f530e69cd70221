//! Configuration types for trawl-connect
//!
//! An import run is described by one [`ImportConfig`]: a single store
//! connection plus a map of named entities, each bound to one collection
//! and one command pair.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use validator::Validate;

use crate::error::{ConnectorError, ConnectorResult};
use crate::stream::CursorErrorPolicy;
use crate::types::SensitiveString;

/// Pre-compiled regex for environment variable expansion
/// Pattern: ${VAR} or ${VAR:-default}
static ENV_VAR_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("env var regex pattern is invalid - this is a bug")
});

/// Root import configuration
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ImportConfig {
    /// Configuration version
    #[serde(default = "default_version")]
    pub version: String,

    /// Store connection configuration
    pub store: StoreConfig,

    /// Entities to import, keyed by entity name
    #[serde(default)]
    pub entities: HashMap<String, EntityConfig>,
}

/// Store connection configuration
#[derive(Debug, Clone, Deserialize, Serialize, Validate, JsonSchema)]
pub struct StoreConfig {
    /// Backend kind ("mongodb" or "memory")
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Store endpoint host
    #[serde(default = "default_host")]
    pub host: String,

    /// Store endpoint port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Optional credential user name
    #[serde(default)]
    pub username: Option<String>,

    /// Credential password, required when `username` is set
    #[serde(default)]
    pub password: Option<SensitiveString>,

    /// Target database name
    ///
    /// An absent key deserializes to an empty string and is rejected by
    /// validation rather than by the YAML parser.
    #[serde(default)]
    #[validate(length(min = 1, message = "database is required"))]
    pub database: String,

    /// Session open timeout in milliseconds (0 = no timeout)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Per-pull cursor fetch timeout in milliseconds (0 = no timeout)
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// How a driver fault during a pull is surfaced
    #[serde(default)]
    pub cursor_error_policy: CursorErrorPolicy,
}

/// Per-entity import configuration
#[derive(Debug, Clone, Deserialize, Serialize, Validate, JsonSchema)]
pub struct EntityConfig {
    /// Collection to read from
    #[serde(default)]
    #[validate(length(min = 1, message = "collection is required"))]
    pub collection: String,

    /// Primary query command (full import)
    #[serde(default = "default_command")]
    pub command: String,

    /// Delta query command (incremental import); falls back to `command`
    /// when absent
    #[serde(default)]
    pub delta_command: Option<String>,

    /// Per-field transform configuration
    #[serde(default)]
    pub fields: Vec<FieldConfig>,

    /// Whether this entity is imported
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Per-field transform configuration
#[derive(Debug, Clone, Deserialize, Serialize, Validate, JsonSchema)]
pub struct FieldConfig {
    /// Row column the transform applies to
    #[serde(default)]
    #[validate(length(min = 1, message = "column is required"))]
    pub column: String,

    /// Identifier-hash hint; token-substituted against the row and context
    /// variables, then parsed as a boolean (absent or unparsable = disabled)
    #[serde(default)]
    pub hash_identifier: Option<String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_kind() -> String {
    "mongodb".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    27017
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_fetch_timeout_ms() -> u64 {
    30_000
}

fn default_command() -> String {
    "{}".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
            database: String::new(),
            connect_timeout_ms: default_connect_timeout_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            cursor_error_policy: CursorErrorPolicy::default(),
        }
    }
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            collection: String::new(),
            command: default_command(),
            delta_command: None,
            fields: Vec::new(),
            enabled: true,
        }
    }
}

impl StoreConfig {
    /// Validate the credential pair
    ///
    /// A user name without a password cannot authenticate; catching it here
    /// fails fast instead of at session open.
    pub fn validate_credentials(&self) -> std::result::Result<(), String> {
        if self.username.is_some() && self.password.is_none() {
            return Err("password is required when username is set".to_string());
        }
        Ok(())
    }
}

impl ImportConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> ConnectorResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(content: &str) -> ConnectorResult<Self> {
        let expanded = Self::expand_env_vars(content);
        let config: Self = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Expand environment variables in the format ${VAR} or ${VAR:-default}
    ///
    /// An unset variable without a default is left untouched: command
    /// templates carry `${name}` tokens that are substituted at query time,
    /// not at load time.
    fn expand_env_vars(content: &str) -> String {
        ENV_VAR_REGEX
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                let default = caps.get(2).map(|m| m.as_str());

                match std::env::var(var_name) {
                    Ok(value) => value,
                    Err(_) => match default {
                        Some(d) => d.to_string(),
                        None => caps[0].to_string(),
                    },
                }
            })
            .to_string()
    }

    /// Validate configuration
    pub fn validate(&self) -> ConnectorResult<()> {
        self.store
            .validate()
            .map_err(|e| ConnectorError::config(format!("store: {}", e)))?;
        self.store
            .validate_credentials()
            .map_err(|e| ConnectorError::config(format!("store: {}", e)))?;

        for (name, entity) in &self.entities {
            entity
                .validate()
                .map_err(|e| ConnectorError::config(format!("entity '{}': {}", name, e)))?;
            for field in &entity.fields {
                field.validate().map_err(|e| {
                    ConnectorError::config(format!("entity '{}': field: {}", name, e))
                })?;
            }
        }

        Ok(())
    }

    /// Get enabled entities
    pub fn enabled_entities(&self) -> impl Iterator<Item = (&String, &EntityConfig)> {
        self.entities.iter().filter(|(_, e)| e.enabled)
    }
}
