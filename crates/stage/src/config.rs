//! Stage configuration via `flowstage.toml`
//!
//! A stage's property values and auto-terminated relationships live in a
//! small TOML file. Missing fields fall back to defaults; property values not
//! set here fall back to the stage's descriptor defaults.

use crate::error::{ConfigError, ConfigResult};
use crate::log::LogLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Config file name looked up by hosts.
pub const CONFIG_FILE_NAME: &str = "flowstage.toml";

/// Stage configuration loaded from `flowstage.toml`.
///
/// # Example
///
/// ```toml
/// # Identifier used in logs; defaults to the stage's own identifier
/// # identifier = "case-convert"
///
/// # Relationships whose records are dropped at commit
/// auto_terminate = []
///
/// [properties]
/// Case = "upper"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Identifier override for logging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Relationships with no downstream queue.
    #[serde(default)]
    pub auto_terminate: Vec<String>,
    /// Minimum level for host logging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
    /// Property values by name.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl StageConfig {
    /// Set one property value.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Add an auto-terminated relationship.
    pub fn with_auto_terminate(mut self, relationship: impl Into<String>) -> Self {
        self.auto_terminate.push(relationship.into());
        self
    }

    /// Default config file content, with comments.
    pub fn default_toml() -> &'static str {
        r#"# flowstage stage configuration

# Identifier used in logs; defaults to the stage's own identifier
# identifier = "case-convert"

# Relationships whose records are dropped at commit instead of queued
auto_terminate = []

# Minimum host log level: "trace", "debug", "info", "warn" or "error"
# log_level = "info"

[properties]
# Case = "upper"
# Suffix = ""
"#
    }

    /// Parse configuration text.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Write the default config file if none exists yet.
    pub fn write_default_if_missing(path: &Path) -> ConfigResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    /// Serialize this configuration to a file, replacing any existing one.
    pub fn write_to_file(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
