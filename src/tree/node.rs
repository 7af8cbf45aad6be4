//! Tree node representation

use crate::types::{NodeFilter, NodeFilterProperty, NodeInfo, ObjectMetadata};
use serde::Serialize;
use serde_json::Value;

/// Well-known node type names
pub mod node_types {
    pub const SERVER: &str = "Server";
    pub const DATABASE: &str = "Database";
    pub const FOLDER: &str = "Folder";
    /// Synthesized for failed expansions
    pub const ERROR: &str = "error";
}

/// Status shared by every database leaf that cannot be expanded.
pub const UNAVAILABLE_STATUS: &str = "Unavailable";

/// Arena key of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// One node of a connection's Object Explorer tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: NodeId,
    pub node_type: String,
    pub object_type: Option<String>,
    pub label: String,
    pub is_always_leaf: bool,
    pub node_path: String,
    pub parent_node_path: Option<String>,
    pub node_sub_type: Option<String>,
    pub node_status: Option<String>,
    pub metadata: Option<ObjectMetadata>,
    pub icon_type: Option<String>,
    pub child_provider: Option<String>,
    pub payload: Option<Value>,
    /// Message carried by synthesized error nodes
    pub error_message: Option<String>,
    /// Set when the last expansion of this node failed
    pub error_state_message: Option<String>,
    /// Next child resolution refreshes instead of expanding
    pub force_refresh: bool,
    pub filterable_properties: Vec<NodeFilterProperty>,
    pub filters: Vec<NodeFilter>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Option<Vec<NodeId>>,
}

impl TreeNode {
    /// Build a node from provider info.
    ///
    /// Database nodes show their status in the label. A database leaf gets the
    /// shared [`UNAVAILABLE_STATUS`]; any other database node has its status
    /// cleared.
    pub fn from_info(id: NodeId, mut info: NodeInfo, parent: Option<NodeId>) -> Self {
        if info.node_type == node_types::DATABASE {
            if let Some(status) = info.node_status.as_deref().filter(|s| !s.is_empty()) {
                info.label = format!("{} ({})", info.label, status);
            }
            info.node_status = if info.is_leaf {
                Some(UNAVAILABLE_STATUS.to_string())
            } else {
                None
            };
        }

        Self {
            id,
            node_type: info.node_type,
            object_type: info.object_type,
            label: info.label,
            is_always_leaf: info.is_leaf,
            node_path: info.node_path,
            parent_node_path: info.parent_node_path,
            node_sub_type: info.node_sub_type,
            node_status: info.node_status,
            metadata: info.metadata,
            icon_type: info.icon_type,
            child_provider: info.child_provider,
            payload: info.payload,
            error_message: info.error_message,
            error_state_message: None,
            force_refresh: false,
            filterable_properties: info.filterable_properties,
            filters: Vec::new(),
            parent,
            children: None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child ids, or `None` while the children are unresolved
    pub fn children(&self) -> Option<&[NodeId]> {
        self.children.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.children.is_some()
    }

    pub fn is_error_node(&self) -> bool {
        self.node_type == node_types::ERROR
    }

    pub fn is_database(&self) -> bool {
        self.node_type == node_types::DATABASE
    }

    pub fn to_node_info(&self) -> NodeInfo {
        NodeInfo {
            node_path: self.node_path.clone(),
            parent_node_path: self.parent_node_path.clone(),
            node_type: self.node_type.clone(),
            object_type: self.object_type.clone(),
            label: self.label.clone(),
            is_leaf: self.is_always_leaf,
            node_sub_type: self.node_sub_type.clone(),
            node_status: self.node_status.clone(),
            metadata: self.metadata.clone(),
            error_message: self.error_message.clone(),
            icon_type: self.icon_type.clone(),
            child_provider: self.child_provider.clone(),
            payload: self.payload.clone(),
            filterable_properties: self.filterable_properties.clone(),
        }
    }
}
