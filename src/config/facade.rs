//! Config loader facade.

use super::{merge_policy, sources, ExplorerConfig};
use crate::error::ExplorerError;
use config::Config;
use std::path::Path;

/// Builds an [`ExplorerConfig`] from the layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults, the global file, `path` when given, then environment
    pub fn load(path: Option<&Path>) -> Result<ExplorerConfig, ExplorerError> {
        let mut builder = merge_policy::builder_with_defaults()?;
        builder = sources::add_global_file(builder)?;
        if let Some(path) = path {
            builder = sources::add_explicit_file(builder, path)?;
        }
        builder = sources::add_environment(builder);
        Self::finish(builder.build()?)
    }

    /// Load defaults plus a single file, ignoring global and environment sources
    pub fn load_from_file(path: &Path) -> Result<ExplorerConfig, ExplorerError> {
        let builder = sources::add_explicit_file(merge_policy::builder_with_defaults()?, path)?;
        Self::finish(builder.build()?)
    }

    fn finish(config: Config) -> Result<ExplorerConfig, ExplorerError> {
        let config: ExplorerConfig = config.try_deserialize()?;
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ExplorerError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;
        Ok(config)
    }
}
