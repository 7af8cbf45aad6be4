//! Data records exchanged with providers.
//!
//! These mirror the provider contract field for field and serialize with
//! camelCase names so fixtures and logs read the same as provider payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Descriptive metadata attached to a node by its provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    #[serde(default)]
    pub metadata_type_name: Option<String>,
    #[serde(default)]
    pub urn: Option<String>,
    pub name: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub parent_type_name: Option<String>,
}

/// A property a node can be filtered on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFilterProperty {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub filter_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// An active filter on a node's children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFilter {
    pub name: String,
    pub operator: String,
    pub value: Value,
}

/// Provider-supplied description of one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub node_path: String,
    #[serde(default)]
    pub parent_node_path: Option<String>,
    pub node_type: String,
    #[serde(default)]
    pub object_type: Option<String>,
    pub label: String,
    #[serde(default)]
    pub is_leaf: bool,
    #[serde(default)]
    pub node_sub_type: Option<String>,
    #[serde(default)]
    pub node_status: Option<String>,
    #[serde(default)]
    pub metadata: Option<ObjectMetadata>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub icon_type: Option<String>,
    #[serde(default)]
    pub child_provider: Option<String>,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub filterable_properties: Vec<NodeFilterProperty>,
}

impl NodeInfo {
    pub fn new(
        node_path: impl Into<String>,
        node_type: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            node_path: node_path.into(),
            node_type: node_type.into(),
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_leaf(mut self, is_leaf: bool) -> Self {
        self.is_leaf = is_leaf;
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.node_status = Some(status.into());
        self
    }

    pub fn with_metadata(mut self, metadata: ObjectMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Request sent to a provider to expand or refresh one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandNodeInfo {
    pub session_id: String,
    pub node_path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<NodeFilter>,
}

/// Merged result of one expansion, as returned to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandInfo {
    pub session_id: String,
    pub node_path: String,
    pub nodes: Vec<NodeInfo>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl ExpandInfo {
    /// Result used to release waiters when a session closes under them.
    pub fn empty(session_id: impl Into<String>, node_path: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            node_path: node_path.into(),
            nodes: Vec::new(),
            error_message: None,
        }
    }
}

/// Asynchronous per-provider answer to an expand or refresh request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExpandResponse {
    pub provider_id: String,
    pub session_id: String,
    pub node_path: String,
    #[serde(default)]
    pub nodes: Vec<NodeInfo>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl NodeExpandResponse {
    pub fn success(
        provider_id: impl Into<String>,
        session_id: impl Into<String>,
        node_path: impl Into<String>,
        nodes: Vec<NodeInfo>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            session_id: session_id.into(),
            node_path: node_path.into(),
            nodes,
            error_message: None,
        }
    }

    pub fn failure(
        provider_id: impl Into<String>,
        session_id: impl Into<String>,
        node_path: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            session_id: session_id.into(),
            node_path: node_path.into(),
            nodes: Vec::new(),
            error_message: Some(error_message.into()),
        }
    }

    /// True when the response carries a non-empty error message.
    pub fn is_error(&self) -> bool {
        self.error_message
            .as_deref()
            .map(|m| !m.is_empty())
            .unwrap_or(false)
    }
}

/// Session handle returned by a provider's `create_session`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectExplorerSession {
    pub session_id: String,
    pub success: bool,
    #[serde(default)]
    pub root_node: Option<NodeInfo>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseSessionInfo {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseSessionResponse {
    pub session_id: String,
    pub success: bool,
}

/// Search request forwarded to a provider's `find_nodes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindNodesInfo {
    pub session_id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub name: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub parent_object_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindNodesResponse {
    pub nodes: Vec<NodeInfo>,
}
