//! Connection profiles as seen by the coordinator.
//!
//! Credential handling lives outside this crate; a profile only identifies the
//! connection and carries the options a provider needs to open a session.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A saved connection the explorer can open a session against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    /// Stable identity used to key the active node table
    pub id: String,
    /// Primary provider id that owns sessions for this connection
    pub provider_name: String,
    pub server_name: String,
    #[serde(default)]
    pub database_name: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl ConnectionProfile {
    pub fn new(
        id: impl Into<String>,
        provider_name: impl Into<String>,
        server_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            provider_name: provider_name.into(),
            server_name: server_name.into(),
            database_name: None,
            user_name: None,
            options: BTreeMap::new(),
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database_name = Some(database.into());
        self
    }

    /// Flatten the profile into the option bag handed to `create_session`.
    pub fn to_connection_info(&self) -> ConnectionInfo {
        let mut options = self.options.clone();
        options.insert("server".to_string(), self.server_name.clone());
        if let Some(database) = &self.database_name {
            options.insert("database".to_string(), database.clone());
        }
        if let Some(user) = &self.user_name {
            options.insert("user".to_string(), user.clone());
        }
        ConnectionInfo { options }
    }
}

/// Provider-facing connection options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub options: BTreeMap<String, String>,
}

impl ConnectionInfo {
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}
