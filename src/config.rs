//! Server configuration.
//!
//! A single YAML file carries the listen address, persistence settings, the
//! ordered mock definition list, and an optional default response for
//! unmatched requests.

use crate::definition::{MockDefinition, ResponseTemplate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default)]
    pub listen: ListenConfig,

    /// Persistence engines
    #[serde(default)]
    pub persist: PersistConfig,

    /// Ordered list of mock definitions
    #[serde(default)]
    pub mocks: Vec<MockDefinition>,

    /// Response returned when no mock matches
    #[serde(default)]
    pub default_response: Option<ResponseTemplate>,
}

impl ServerConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (i, mock) in self.mocks.iter().enumerate() {
            mock.validate()
                .map_err(|e| anyhow::anyhow!("mock {} ({:?}): {}", i, mock.name, e))?;
        }
        if let Some(default) = &self.default_response {
            default.validate()?;
        }
        self.persist.validate()?;
        Ok(())
    }
}

/// Listen address configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListenConfig {
    /// Bind address
    #[serde(default = "default_ip")]
    pub ip: String,

    /// Port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            ip: default_ip(),
            port: default_port(),
        }
    }
}

fn default_ip() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8083
}

/// Persistence engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistConfig {
    /// Root directory for the file engine; the engine is registered only
    /// when a path is set
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Engine used when a mock leaves its engine name empty
    #[serde(default = "default_engine")]
    pub default_engine: String,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            path: None,
            default_engine: default_engine(),
        }
    }
}

fn default_engine() -> String {
    "memory".to_string()
}

impl PersistConfig {
    /// Validate the persistence settings.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !matches!(self.default_engine.as_str(), "memory" | "file") {
            anyhow::bail!("unknown default engine: {:?}", self.default_engine);
        }
        if self.default_engine == "file" && self.path.is_none() {
            anyhow::bail!("default engine is \"file\" but no persist path is set");
        }
        Ok(())
    }
}
