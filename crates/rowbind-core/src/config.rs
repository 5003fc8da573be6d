//! Mapper configuration.
//!
//! [`MapperConfig`] is deserialized from JSON and defaults sensibly, so an
//! empty `{}` file is valid. The two output toggles replace process-wide
//! flags: they travel with the mapper that was built from them.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::Error;

/// Environment variable consulted by [`MapperConfig::with_env_override`].
pub const CONNECTION_STRING_ENV: &str = "ROWBIND_CONNECTION_STRING";

/// Settings for a mapper instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Connection string handed to the driver when a connection is opened.
    pub connection_string: Option<String>,
    /// Log a warning for result columns that have no mapped property.
    pub print_warnings: bool,
    /// Echo every statement at `info` level before it executes.
    pub print_sqls: bool,
}

impl MapperConfig {
    /// Config with only a connection string set.
    pub fn with_connection_string(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: Some(connection_string.into()),
            ..Self::default()
        }
    }

    /// Deserialize a `MapperConfig` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str).map_err(|e| Error::Config(format!("parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Replace the connection string with `ROWBIND_CONNECTION_STRING` when set.
    pub fn with_env_override(self) -> Self {
        self.with_override_from(std::env::var(CONNECTION_STRING_ENV).ok())
    }

    fn with_override_from(mut self, value: Option<String>) -> Self {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            self.connection_string = Some(value);
        }
        self
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        match self.connection_string.as_deref() {
            None => warnings.push(
                "connection_string is not set; it must be assigned before first use".into(),
            ),
            Some(s) if s.trim().is_empty() => {
                warnings.push("connection_string is empty".into());
            }
            Some(_) => {}
        }

        warnings
    }
}
