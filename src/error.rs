//! Error types for the Object Explorer coordinator.

use thiserror::Error;

/// Errors surfaced by the coordinator, its providers and its ambient stack.
///
/// The type is `Clone` because one merged expansion outcome resolves every
/// caller attached to the same in-flight request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExplorerError {
    #[error("Provider doesn't exist. id: {0}")]
    ProviderNotRegistered(String),

    #[error("Session cannot be found. id: {0}")]
    SessionNotFound(String),

    #[error("Provider {provider_id} failed to expand {node_path}: {message}")]
    ProviderExpansion {
        provider_id: String,
        node_path: String,
        message: String,
    },

    #[error("{0}")]
    AggregateExpansionFailure(String),

    #[error("Failed to create Object Explorer session: {0}")]
    SessionCreationFailure(String),

    #[error("Tree node not found: {node_path} (connection {connection_id})")]
    NodeNotFound {
        connection_id: String,
        node_path: String,
    },

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("The object explorer server tree view is already registered")]
    ViewAlreadyRegistered,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ExplorerError {
    pub(crate) fn node_not_found(connection_id: &str, node_path: &str) -> Self {
        ExplorerError::NodeNotFound {
            connection_id: connection_id.to_string(),
            node_path: node_path.to_string(),
        }
    }
}

impl From<config::ConfigError> for ExplorerError {
    fn from(err: config::ConfigError) -> Self {
        ExplorerError::ConfigError(err.to_string())
    }
}
