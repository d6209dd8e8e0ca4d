//! # Configuration
//!
//! Optional TOML file with three sections, all defaulted:
//!
//! ```toml
//! [data]
//! path = "data/markdowns.csv"
//! schema = "auto"            # auto | wide | long
//!
//! [aliases]
//! "Units On Hand" = "stock_level"
//! "Disc 1" = "markdown_1"
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! ```
//!
//! Command-line flags override file values.

use crate::loader::SchemaChoice;
use markstage_core::{Field, FieldAliases, MarkstageError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub data: DataConfig,
    /// Extra header spellings, mapped to canonical field names.
    pub aliases: BTreeMap<String, String>,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub path: Option<PathBuf>,
    pub schema: SchemaChoice,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load a config file, or defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, MarkstageError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let metadata = std::fs::metadata(path).map_err(|e| {
            MarkstageError::ConfigError(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(MarkstageError::ConfigError(format!(
                "Config file {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            MarkstageError::ConfigError(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        let config = Self::parse(&text)?;
        tracing::debug!(path = %path.display(), aliases = config.aliases.len(), "config loaded");
        Ok(config)
    }

    /// Parse config text.
    pub fn parse(text: &str) -> Result<Self, MarkstageError> {
        toml::from_str(text).map_err(|e| MarkstageError::ConfigError(e.to_string()))
    }

    /// The builtin alias table extended with the `[aliases]` section.
    ///
    /// A value that is not a canonical field name is a config error.
    pub fn field_aliases(&self) -> Result<FieldAliases, MarkstageError> {
        let mut aliases = FieldAliases::builtin();
        for (spelling, canonical) in &self.aliases {
            let field: Field = canonical.parse().map_err(|e: String| {
                MarkstageError::ConfigError(format!("alias '{}': {}", spelling, e))
            })?;
            match aliases.insert(spelling, field) {
                Some(previous) if previous != field => {
                    tracing::warn!(
                        spelling = %spelling,
                        from = %previous,
                        to = %field,
                        "alias overrides builtin mapping"
                    );
                }
                _ => {}
            }
        }
        Ok(aliases)
    }
}
