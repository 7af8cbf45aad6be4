//! View Adapter boundary
//!
//! The coordinator does not render anything. A tree-rendering surface plugs in
//! through [`ViewAdapter`] and receives change notifications through the
//! [`EventHub`] broadcast channel.

use crate::connection::ConnectionProfile;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

/// Collapsible state requested of the view for one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TreeItemCollapsibleState {
    None,
    Collapsed,
    Expanded,
}

/// Identity of an item as the view knows it.
///
/// Connection roots are shown as the connection itself, every other node as
/// a raw node item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TreeItem {
    Connection(String),
    Node {
        connection_id: String,
        node_path: String,
    },
}

impl TreeItem {
    pub fn connection_id(&self) -> &str {
        match self {
            TreeItem::Connection(id) => id,
            TreeItem::Node { connection_id, .. } => connection_id,
        }
    }
}

/// Handle through which callers address a tree node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeHandle {
    pub connection_id: String,
    pub node_path: String,
}

impl NodeHandle {
    pub fn new(connection_id: impl Into<String>, node_path: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            node_path: node_path.into(),
        }
    }
}

/// Profile and database of the current selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedContext {
    pub profile: ConnectionProfile,
    pub database_name: Option<String>,
}

/// Operations the coordinator needs from a tree-rendering surface
#[async_trait]
pub trait ViewAdapter: Send + Sync {
    /// Whether the view currently shows `item` expanded
    fn is_expanded(&self, item: &TreeItem) -> bool;

    async fn reveal(&self, item: &TreeItem);

    async fn set_expanded_state(&self, item: &TreeItem, state: TreeItemCollapsibleState);

    async fn set_selected(&self, item: &TreeItem, selected: bool, clear_other_selections: bool);

    async fn refresh_element(&self, item: &TreeItem);

    fn selection(&self) -> Vec<TreeItem>;

    fn is_focused(&self) -> bool;
}

/// Notifications published to view subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplorerEvent {
    /// The node set of a connection changed, possibly with an error to show
    NodesUpdated {
        connection_id: Option<String>,
        error_message: Option<String>,
    },
    SelectionOrFocusChanged,
}

/// Broadcast hub for [`ExplorerEvent`]s
#[derive(Debug, Clone)]
pub struct EventHub {
    sender: broadcast::Sender<ExplorerEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExplorerEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ExplorerEvent) {
        if self.sender.send(event).is_err() {
            trace!("No event subscribers");
        }
    }

    pub fn nodes_updated(&self, connection_id: Option<&str>, error_message: Option<&str>) {
        self.emit(ExplorerEvent::NodesUpdated {
            connection_id: connection_id.map(str::to_string),
            error_message: error_message.map(str::to_string),
        });
    }
}
