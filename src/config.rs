//! Configuration System
//!
//! Layered configuration: built-in defaults, then the user's global config
//! file, then an explicit file, then `OEXPLORER__*` environment variables.

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

mod facade;
mod merge_policy;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Coordinator settings
    #[serde(default)]
    pub explorer: ExplorerSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// File-backed providers
    #[serde(default)]
    pub fixtures: FixtureConfig,
}

/// Coordinator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorerSettings {
    /// Capacity of the event broadcast channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    64
}

impl Default for ExplorerSettings {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
        }
    }
}

/// Fixture providers keyed by provider id, plus node providers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureConfig {
    #[serde(default)]
    pub providers: BTreeMap<String, FixtureProviderConfig>,

    #[serde(default)]
    pub node_providers: Vec<FixtureNodeProviderConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureProviderConfig {
    /// TOML tree file
    pub tree: PathBuf,

    /// Delay before each expansion response is delivered
    #[serde(default)]
    pub response_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureNodeProviderConfig {
    pub provider_id: String,
    pub supported_provider_id: String,
    #[serde(default)]
    pub group: String,
    pub tree: PathBuf,
    #[serde(default)]
    pub response_delay_ms: u64,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Explorer(String),
    Logging(String),
    Fixture(String, String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Explorer(msg) => write!(f, "Explorer: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
            ValidationError::Fixture(name, msg) => write!(f, "Fixture '{}': {}", name, msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ExplorerConfig {
    /// Validate the entire configuration, reporting every problem found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.explorer.event_capacity == 0 {
            errors.push(ValidationError::Explorer(
                "event_capacity must be greater than zero".to_string(),
            ));
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        for (id, provider) in &self.fixtures.providers {
            if provider.tree.as_os_str().is_empty() {
                errors.push(ValidationError::Fixture(
                    id.clone(),
                    "tree path cannot be empty".to_string(),
                ));
            }
        }

        for node_provider in &self.fixtures.node_providers {
            let id = &node_provider.provider_id;
            if id.is_empty() {
                errors.push(ValidationError::Fixture(
                    id.clone(),
                    "node provider id cannot be empty".to_string(),
                ));
            }
            if node_provider.tree.as_os_str().is_empty() {
                errors.push(ValidationError::Fixture(
                    id.clone(),
                    "tree path cannot be empty".to_string(),
                ));
            }
            if !self
                .fixtures
                .providers
                .contains_key(&node_provider.supported_provider_id)
            {
                errors.push(ValidationError::Fixture(
                    id.clone(),
                    format!(
                        "supported provider '{}' is not configured",
                        node_provider.supported_provider_id
                    ),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
