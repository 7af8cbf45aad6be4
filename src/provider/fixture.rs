//! File-backed providers
//!
//! A fixture tree is a TOML document with a `[root]` table and nested
//! `[[children]]` arrays. [`FixtureProvider`] serves it as a primary provider
//! and [`FixtureNodeProvider`] as a node provider. Both answer expansions the
//! way real providers do: the call returns at once and the nodes arrive later
//! through a [`ResponseSink`].
//!
//! ```toml
//! [root]
//! path = "/server"
//! label = "localhost"
//! node_type = "Server"
//!
//! [[root.children]]
//! path = "/server/Databases"
//! label = "Databases"
//! ```

use crate::config::FixtureConfig;
use crate::connection::ConnectionInfo;
use crate::error::ExplorerError;
use crate::explorer::{ObjectExplorer, ResponseSink};
use crate::provider::{NodeProvider, Provider};
use crate::tree::node::node_types;
use crate::types::{
    CloseSessionInfo, CloseSessionResponse, ExpandNodeInfo, FindNodesInfo, FindNodesResponse,
    NodeExpandResponse, NodeInfo, ObjectExplorerSession, ObjectMetadata,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

fn default_node_type() -> String {
    node_types::FOLDER.to_string()
}

/// One node of a fixture file
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureNode {
    pub path: String,
    pub label: String,
    #[serde(default = "default_node_type")]
    pub node_type: String,
    #[serde(default)]
    pub is_leaf: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub sub_type: Option<String>,
    /// Object name; the label is used when absent
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    /// Answer expansions of this node with an error instead of children
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub children: Vec<FixtureNode>,
}

impl FixtureNode {
    fn to_node_info(&self, parent_path: Option<&str>) -> NodeInfo {
        NodeInfo {
            node_path: self.path.clone(),
            parent_node_path: parent_path.map(str::to_string),
            node_type: self.node_type.clone(),
            label: self.label.clone(),
            is_leaf: self.is_leaf,
            node_sub_type: self.sub_type.clone(),
            node_status: self.status.clone(),
            metadata: Some(ObjectMetadata {
                metadata_type_name: Some(self.node_type.clone()),
                name: self.name.clone().unwrap_or_else(|| self.label.clone()),
                schema: self.schema.clone(),
                ..ObjectMetadata::default()
            }),
            ..NodeInfo::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct FixtureDocument {
    root: FixtureNode,
}

/// Parsed fixture tree with a per-path index of expansion answers
#[derive(Debug, Clone)]
pub struct FixtureTree {
    root: NodeInfo,
    expansions: HashMap<String, Result<Vec<NodeInfo>, String>>,
    nodes: Vec<NodeInfo>,
}

impl FixtureTree {
    pub fn load(path: &Path) -> Result<Self, ExplorerError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExplorerError::ConfigError(format!("Failed to read fixture {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ExplorerError::ConfigError(msg) => {
                ExplorerError::ConfigError(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ExplorerError> {
        let document: FixtureDocument = toml::from_str(content)
            .map_err(|e| ExplorerError::ConfigError(format!("Invalid fixture tree: {}", e)))?;

        let mut tree = Self {
            root: document.root.to_node_info(None),
            expansions: HashMap::new(),
            nodes: Vec::new(),
        };
        let mut stack = vec![&document.root];
        while let Some(node) = stack.pop() {
            if tree.expansions.contains_key(&node.path) {
                return Err(ExplorerError::ConfigError(format!(
                    "Duplicate fixture node path: {}",
                    node.path
                )));
            }
            let answer = match &node.error {
                Some(message) => Err(message.clone()),
                None => Ok(node
                    .children
                    .iter()
                    .map(|child| child.to_node_info(Some(&node.path)))
                    .collect()),
            };
            tree.expansions.insert(node.path.clone(), answer);
            for child in &node.children {
                tree.nodes.push(child.to_node_info(Some(&node.path)));
                stack.push(child);
            }
        }
        Ok(tree)
    }

    pub fn root(&self) -> &NodeInfo {
        &self.root
    }

    pub fn contains(&self, node_path: &str) -> bool {
        self.expansions.contains_key(node_path)
    }

    /// Children of `node_path`, its declared error, or `None` if unknown
    pub fn expansion(&self, node_path: &str) -> Option<&Result<Vec<NodeInfo>, String>> {
        self.expansions.get(node_path)
    }

    /// Nodes matching a search: type case-insensitively, name and schema exactly
    pub fn find(&self, query: &FindNodesInfo) -> Vec<NodeInfo> {
        self.nodes
            .iter()
            .filter(|node| node.node_type.eq_ignore_ascii_case(&query.node_type))
            .filter(|node| {
                let metadata = node.metadata.as_ref();
                let name_matches = query.name.is_empty()
                    || metadata.map(|m| m.name == query.name).unwrap_or(false);
                let schema_matches = match &query.schema {
                    Some(schema) => metadata
                        .and_then(|m| m.schema.as_deref())
                        .map(|s| s == schema)
                        .unwrap_or(false),
                    None => true,
                };
                name_matches && schema_matches
            })
            .cloned()
            .collect()
    }

    fn respond(&self, provider_id: &str, request: &ExpandNodeInfo) -> NodeExpandResponse {
        match self.expansion(&request.node_path) {
            Some(Ok(nodes)) => NodeExpandResponse::success(
                provider_id,
                request.session_id.clone(),
                request.node_path.clone(),
                nodes.clone(),
            ),
            Some(Err(message)) => NodeExpandResponse::failure(
                provider_id,
                request.session_id.clone(),
                request.node_path.clone(),
                message.clone(),
            ),
            None => NodeExpandResponse::failure(
                provider_id,
                request.session_id.clone(),
                request.node_path.clone(),
                format!("Node not found: {}", request.node_path),
            ),
        }
    }
}

/// Deliver `response` from a background task after `delay`
fn deliver_later(sink: &ResponseSink, delay: Duration, response: NodeExpandResponse) {
    let sink = sink.clone();
    tokio::spawn(async move {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        sink.deliver(response);
    });
}

/// Primary provider serving a [`FixtureTree`]
pub struct FixtureProvider {
    provider_id: String,
    tree: Arc<FixtureTree>,
    sink: ResponseSink,
    delay: Duration,
    sessions: Mutex<HashSet<String>>,
    next_session: AtomicU64,
}

impl FixtureProvider {
    pub fn new(provider_id: impl Into<String>, tree: Arc<FixtureTree>, sink: ResponseSink) -> Self {
        Self {
            provider_id: provider_id.into(),
            tree,
            sink,
            delay: Duration::ZERO,
            sessions: Mutex::new(HashSet::new()),
            next_session: AtomicU64::new(1),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn require_session(&self, session_id: &str) -> Result<(), ExplorerError> {
        if self.sessions.lock().contains(session_id) {
            Ok(())
        } else {
            Err(ExplorerError::ProviderRequestFailed(format!(
                "{}: unknown session {}",
                self.provider_id, session_id
            )))
        }
    }

    fn start(&self, request: ExpandNodeInfo) -> Result<bool, ExplorerError> {
        self.require_session(&request.session_id)?;
        trace!(provider_id = %self.provider_id, node_path = %request.node_path, "Fixture expansion");
        let response = self.tree.respond(&self.provider_id, &request);
        deliver_later(&self.sink, self.delay, response);
        Ok(true)
    }
}

#[async_trait]
impl Provider for FixtureProvider {
    async fn create_session(
        &self,
        connection: ConnectionInfo,
    ) -> Result<ObjectExplorerSession, ExplorerError> {
        let n = self.next_session.fetch_add(1, Ordering::Relaxed);
        let session_id = format!("{}-session-{}", self.provider_id, n);
        self.sessions.lock().insert(session_id.clone());
        debug!(
            provider_id = %self.provider_id,
            session_id = %session_id,
            server = connection.option("server").unwrap_or_default(),
            "Fixture session opened"
        );
        Ok(ObjectExplorerSession {
            session_id,
            success: true,
            root_node: Some(self.tree.root().clone()),
            error_message: None,
        })
    }

    async fn expand_node(&self, request: ExpandNodeInfo) -> Result<bool, ExplorerError> {
        self.start(request)
    }

    async fn refresh_node(&self, request: ExpandNodeInfo) -> Result<bool, ExplorerError> {
        self.start(request)
    }

    async fn close_session(
        &self,
        request: CloseSessionInfo,
    ) -> Result<CloseSessionResponse, ExplorerError> {
        let success = self.sessions.lock().remove(&request.session_id);
        Ok(CloseSessionResponse {
            session_id: request.session_id,
            success,
        })
    }

    async fn find_nodes(&self, request: FindNodesInfo) -> Result<FindNodesResponse, ExplorerError> {
        self.require_session(&request.session_id)?;
        Ok(FindNodesResponse {
            nodes: self.tree.find(&request),
        })
    }
}

/// Node provider contributing the children its own fixture tree declares.
///
/// Paths missing from its tree are declined.
pub struct FixtureNodeProvider {
    provider_id: String,
    supported_provider_id: String,
    group: String,
    tree: Arc<FixtureTree>,
    sink: ResponseSink,
    delay: Duration,
    sessions: Mutex<HashSet<String>>,
}

impl FixtureNodeProvider {
    pub fn new(
        provider_id: impl Into<String>,
        supported_provider_id: impl Into<String>,
        group: impl Into<String>,
        tree: Arc<FixtureTree>,
        sink: ResponseSink,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            supported_provider_id: supported_provider_id.into(),
            group: group.into(),
            tree,
            sink,
            delay: Duration::ZERO,
            sessions: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn knows_session(&self, session_id: &str) -> bool {
        self.sessions.lock().contains(session_id)
    }

    fn start(&self, request: ExpandNodeInfo) -> bool {
        if !self.tree.contains(&request.node_path) {
            return false;
        }
        let response = self.tree.respond(&self.provider_id, &request);
        deliver_later(&self.sink, self.delay, response);
        true
    }
}

#[async_trait]
impl NodeProvider for FixtureNodeProvider {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn supported_provider_id(&self) -> &str {
        &self.supported_provider_id
    }

    fn group(&self) -> &str {
        &self.group
    }

    async fn handle_session_open(
        &self,
        session: &ObjectExplorerSession,
    ) -> Result<bool, ExplorerError> {
        self.sessions.lock().insert(session.session_id.clone());
        Ok(true)
    }

    async fn handle_session_close(&self, request: CloseSessionInfo) -> Result<(), ExplorerError> {
        self.sessions.lock().remove(&request.session_id);
        Ok(())
    }

    async fn expand_node(&self, request: ExpandNodeInfo) -> Result<bool, ExplorerError> {
        Ok(self.start(request))
    }

    async fn refresh_node(&self, request: ExpandNodeInfo) -> Result<bool, ExplorerError> {
        Ok(self.start(request))
    }
}

/// Register every configured fixture provider with `explorer`.
///
/// Relative tree paths are resolved against `base_dir`. Returns the primary
/// provider ids in configuration order.
pub fn register_fixtures(
    explorer: &ObjectExplorer,
    fixtures: &FixtureConfig,
    base_dir: &Path,
) -> Result<Vec<String>, ExplorerError> {
    let mut ids = Vec::new();
    for (provider_id, provider) in &fixtures.providers {
        let tree = Arc::new(FixtureTree::load(&base_dir.join(&provider.tree))?);
        let fixture = FixtureProvider::new(provider_id.clone(), tree, explorer.response_sink())
            .with_delay(Duration::from_millis(provider.response_delay_ms));
        explorer.register_provider(provider_id.clone(), Arc::new(fixture));
        ids.push(provider_id.clone());
    }
    for node_provider in &fixtures.node_providers {
        let tree = Arc::new(FixtureTree::load(&base_dir.join(&node_provider.tree))?);
        let fixture = FixtureNodeProvider::new(
            node_provider.provider_id.clone(),
            node_provider.supported_provider_id.clone(),
            node_provider.group.clone(),
            tree,
            explorer.response_sink(),
        )
        .with_delay(Duration::from_millis(node_provider.response_delay_ms));
        explorer.register_node_provider(Arc::new(fixture));
    }
    debug!(providers = ids.len(), node_providers = fixtures.node_providers.len(), "Registered fixtures");
    Ok(ids)
}
