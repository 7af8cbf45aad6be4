//! Object Explorer coordinator
//!
//! [`ObjectExplorer`] owns the provider registry, the session table and the
//! per-connection trees. All of it sits behind one mutex that is only held in
//! short synchronous sections, never across a provider call or a wait on a
//! completion signal.

use crate::config::ExplorerSettings;
use crate::connection::ConnectionProfile;
use crate::error::ExplorerError;
use crate::expansion::{merge_results, PendingExpansion, PendingExpansionStatus};
use crate::provider::{ExpansionTarget, NodeProvider, Provider, ProviderRegistry};
use crate::session::{SessionStatus, SessionTable};
use crate::tree::path::select_next_child;
use crate::tree::{TreeArena, TreeNode};
use crate::types::{
    CloseSessionInfo, CloseSessionResponse, ExpandInfo, ExpandNodeInfo, FindNodesInfo,
    NodeExpandResponse, NodeFilter, NodeInfo, ObjectExplorerSession,
};
use crate::view::{
    EventHub, ExplorerEvent, NodeHandle, SelectedContext, TreeItem, TreeItemCollapsibleState,
    ViewAdapter,
};
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use std::collections::hash_map::Entry;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};

/// Materialized tree of one connection
#[derive(Debug)]
struct ConnectionTree {
    provider_id: String,
    connection: ConnectionProfile,
    session: ObjectExplorerSession,
    arena: TreeArena,
}

#[derive(Default)]
struct ExplorerState {
    registry: ProviderRegistry,
    sessions: SessionTable,
    /// Active node table, keyed by connection id
    trees: BTreeMap<String, ConnectionTree>,
}

struct ExplorerInner {
    state: Mutex<ExplorerState>,
    events: EventHub,
    view: RwLock<Option<Arc<dyn ViewAdapter>>>,
}

/// Session and node-expansion coordinator.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct ObjectExplorer {
    inner: Arc<ExplorerInner>,
}

/// Channel through which providers deliver expansion responses.
///
/// Holds a weak reference so a provider keeping a sink does not keep the
/// coordinator alive.
#[derive(Clone)]
pub struct ResponseSink {
    inner: Weak<ExplorerInner>,
}

impl ResponseSink {
    pub fn deliver(&self, response: NodeExpandResponse) {
        match self.inner.upgrade() {
            Some(inner) => inner.record_response(response),
            None => debug!(
                session_id = %response.session_id,
                node_path = %response.node_path,
                "Dropping expansion response, explorer is gone"
            ),
        }
    }
}

impl std::fmt::Debug for ResponseSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseSink")
            .field("attached", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl Default for ObjectExplorer {
    fn default() -> Self {
        Self::new(&ExplorerSettings::default())
    }
}

impl ObjectExplorer {
    pub fn new(settings: &ExplorerSettings) -> Self {
        Self {
            inner: Arc::new(ExplorerInner {
                state: Mutex::new(ExplorerState::default()),
                events: EventHub::new(settings.event_capacity),
                view: RwLock::new(None),
            }),
        }
    }

    // ---- Providers ----

    pub fn register_provider(&self, provider_id: impl Into<String>, provider: Arc<dyn Provider>) {
        self.inner.state.lock().registry.register_provider(provider_id, provider);
    }

    pub fn register_node_provider(&self, node_provider: Arc<dyn NodeProvider>) {
        self.inner.state.lock().registry.register_node_provider(node_provider);
    }

    pub fn is_registered(&self, provider_id: &str) -> bool {
        self.inner.state.lock().registry.is_registered(provider_id)
    }

    /// Sink to hand to providers for their asynchronous responses
    pub fn response_sink(&self) -> ResponseSink {
        ResponseSink {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExplorerEvent> {
        self.inner.events.subscribe()
    }

    // ---- Sessions ----

    /// Open a session through the primary provider for `provider_id`.
    ///
    /// When the provider answers with a root node the connection's tree is
    /// built and every node provider under `provider_id` is told about the
    /// session.
    pub async fn create_session(
        &self,
        provider_id: &str,
        connection: &ConnectionProfile,
    ) -> Result<ObjectExplorerSession, ExplorerError> {
        let provider = self.inner.state.lock().registry.get_or_error(provider_id)?;

        let session = provider
            .create_session(connection.to_connection_info())
            .await
            .map_err(|e| ExplorerError::SessionCreationFailure(e.to_string()))?;

        if session.session_id.is_empty() {
            error!(
                provider_id = %provider_id,
                connection_id = %connection.id,
                "Provider returned a session without an id"
            );
            return Err(ExplorerError::SessionCreationFailure(format!(
                "The session ID returned by provider \"{}\" for connection \"{}\" is invalid.",
                provider_id, connection.id
            )));
        }
        if !session.success {
            let message = session
                .error_message
                .clone()
                .unwrap_or_else(|| "Failed to create Object Explorer session".to_string());
            error!(provider_id = %provider_id, error = %message, "Session creation failed");
            return Err(ExplorerError::SessionCreationFailure(message));
        }

        let node_providers = {
            let mut state = self.inner.state.lock();
            state.sessions.insert(SessionStatus::new(
                provider_id,
                connection.clone(),
                session.clone(),
            ));
            if let Some(root) = session.root_node.clone() {
                state.trees.insert(
                    connection.id.clone(),
                    ConnectionTree {
                        provider_id: provider_id.to_string(),
                        connection: connection.clone(),
                        session: session.clone(),
                        arena: TreeArena::new(root),
                    },
                );
            }
            state.registry.node_providers(provider_id)
        };
        info!(
            provider_id = %provider_id,
            connection_id = %connection.id,
            session_id = %session.session_id,
            "Object Explorer session created"
        );

        for node_provider in node_providers {
            match node_provider.handle_session_open(&session).await {
                Ok(true) => {}
                Ok(false) => debug!(
                    provider_id = %node_provider.provider_id(),
                    session_id = %session.session_id,
                    "Node provider declined session"
                ),
                Err(e) => warn!(
                    provider_id = %node_provider.provider_id(),
                    session_id = %session.session_id,
                    error = %e,
                    "Node provider failed to open session"
                ),
            }
        }

        let error_message = if session.root_node.is_none() {
            Some(
                session
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "Session has no root node".to_string()),
            )
        } else {
            None
        };
        self.inner
            .events
            .nodes_updated(Some(&connection.id), error_message.as_deref());
        Ok(session)
    }

    /// The session object of the connection's tree, if it has one
    pub fn get_session(&self, session_id: &str) -> Option<ObjectExplorerSession> {
        let state = self.inner.state.lock();
        let status = state.sessions.get(session_id)?;
        state
            .trees
            .get(&status.connection.id)
            .map(|tree| tree.session.clone())
    }

    pub fn get_session_connection_profile(&self, session_id: &str) -> Option<ConnectionProfile> {
        self.inner
            .state
            .lock()
            .sessions
            .get(session_id)
            .map(|status| status.connection.clone())
    }

    /// Close a session.
    ///
    /// Outstanding expansions are released with an empty result before any
    /// provider is contacted. Node provider failures are logged and ignored.
    /// Removing the session entry is left to the caller.
    pub async fn close_session(
        &self,
        provider_id: &str,
        session: &ObjectExplorerSession,
    ) -> Result<CloseSessionResponse, ExplorerError> {
        let session_id = session.session_id.clone();
        let (drained, provider, node_providers) = {
            let mut state = self.inner.state.lock();
            (
                state.sessions.drain_pending(&session_id),
                state.registry.get(provider_id),
                state.registry.node_providers(provider_id),
            )
        };

        for (node_path, pending) in drained {
            trace!(session_id = %session_id, node_path = %node_path, "Releasing pending expansion on close");
            pending.resolve(Ok(ExpandInfo::empty(session_id.clone(), node_path)));
        }

        let provider =
            provider.ok_or_else(|| ExplorerError::ProviderNotRegistered(provider_id.to_string()))?;

        for node_provider in node_providers {
            let request = CloseSessionInfo {
                session_id: session_id.clone(),
            };
            if let Err(e) = node_provider.handle_session_close(request).await {
                warn!(
                    provider_id = %node_provider.provider_id(),
                    session_id = %session_id,
                    error = %e,
                    "Node provider failed to close session"
                );
            }
        }

        let response = provider
            .close_session(CloseSessionInfo {
                session_id: session_id.clone(),
            })
            .await?;
        info!(provider_id = %provider_id, session_id = %session_id, "Object Explorer session closed");
        Ok(response)
    }

    // ---- Expansion ----

    pub async fn expand_node(
        &self,
        provider_id: &str,
        session: &ObjectExplorerSession,
        node_path: &str,
    ) -> Result<ExpandInfo, ExplorerError> {
        self.expand_or_refresh(provider_id, session, node_path, false).await
    }

    pub async fn refresh_node(
        &self,
        provider_id: &str,
        session: &ObjectExplorerSession,
        node_path: &str,
    ) -> Result<ExpandInfo, ExplorerError> {
        self.expand_or_refresh(provider_id, session, node_path, true).await
    }

    /// Accept one provider's asynchronous expansion response
    pub fn on_node_expanded(&self, response: NodeExpandResponse) {
        self.inner.record_response(response);
    }

    /// Diagnostics for an outstanding expansion
    pub fn pending_expansion(&self, session_id: &str, node_path: &str) -> Option<PendingExpansionStatus> {
        self.inner
            .state
            .lock()
            .sessions
            .get(session_id)
            .and_then(|status| status.nodes.get(node_path))
            .map(PendingExpansion::status)
    }

    /// Expand or refresh one node, sharing any fan-out already in flight for
    /// the same session and path.
    async fn expand_or_refresh(
        &self,
        provider_id: &str,
        session: &ObjectExplorerSession,
        node_path: &str,
        refresh: bool,
    ) -> Result<ExpandInfo, ExplorerError> {
        let session_id = session.session_id.clone();
        let (receiver, fan_out, filters) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let targets = state.registry.expansion_targets(provider_id)?;
            let status = state
                .sessions
                .get_mut(&session_id)
                .ok_or_else(|| ExplorerError::SessionNotFound(session_id.clone()))?;

            let filters = match state.trees.get_mut(&status.connection.id) {
                Some(tree) => {
                    let filters = tree
                        .arena
                        .find_by_path(node_path)
                        .and_then(|id| tree.arena.get(id))
                        .map(|node| node.filters.clone())
                        .unwrap_or_default();
                    if !filters.is_empty() {
                        tree.arena.cache_filters(node_path, filters.clone());
                    }
                    filters
                }
                None => Vec::new(),
            };

            match status.nodes.entry(node_path.to_string()) {
                Entry::Occupied(mut entry) => {
                    debug!(
                        session_id = %session_id,
                        node_path = %node_path,
                        expansion_id = entry.get().id().as_u64(),
                        "Attached to in-flight expansion"
                    );
                    (entry.get_mut().attach(), None, filters)
                }
                Entry::Vacant(entry) => {
                    let provider_ids: Vec<String> =
                        targets.iter().map(|t| t.provider_id().to_string()).collect();
                    debug!(
                        session_id = %session_id,
                        node_path = %node_path,
                        refresh,
                        providers = %provider_ids.join(", "),
                        "Fanning out node expansion"
                    );
                    let pending = entry.insert(PendingExpansion::new(provider_ids, refresh));
                    (pending.attach(), Some(targets), filters)
                }
            }
        };

        if let Some(targets) = fan_out {
            let request = ExpandNodeInfo {
                session_id: session_id.clone(),
                node_path: node_path.to_string(),
                filters,
            };
            // Provider calls outlive any single caller.
            tokio::spawn(Arc::clone(&self.inner).fan_out(targets, request, refresh));
        }

        receiver
            .await
            .map_err(|_| ExplorerError::SessionNotFound(session_id.clone()))?
    }

    // ---- Trees ----

    /// Expand a tree node and install its children.
    ///
    /// A node whose last expansion failed, or that is flagged for a forced
    /// refresh, is refreshed instead.
    pub async fn resolve_tree_node_children(
        &self,
        connection_id: &str,
        node_path: &str,
    ) -> Result<Vec<TreeNode>, ExplorerError> {
        let refresh = {
            let mut state = self.inner.state.lock();
            let node = state
                .trees
                .get_mut(connection_id)
                .and_then(|tree| {
                    let id = tree.arena.find_by_path(node_path)?;
                    tree.arena.get_mut(id)
                })
                .ok_or_else(|| ExplorerError::node_not_found(connection_id, node_path))?;
            let refresh = node.error_state_message.is_some() || node.force_refresh;
            node.force_refresh = false;
            refresh
        };
        self.expand_or_refresh_tree_node(connection_id, node_path, refresh).await
    }

    /// Refresh a tree node, replacing its children wholesale
    pub async fn refresh_tree_node(
        &self,
        connection_id: &str,
        node_path: &str,
    ) -> Result<Vec<TreeNode>, ExplorerError> {
        self.expand_or_refresh_tree_node(connection_id, node_path, true).await
    }

    async fn expand_or_refresh_tree_node(
        &self,
        connection_id: &str,
        node_path: &str,
        refresh: bool,
    ) -> Result<Vec<TreeNode>, ExplorerError> {
        let (provider_id, session, path) = {
            let state = self.inner.state.lock();
            let tree = state
                .trees
                .get(connection_id)
                .ok_or_else(|| ExplorerError::node_not_found(connection_id, node_path))?;
            let node = tree
                .arena
                .find_by_path(node_path)
                .and_then(|id| tree.arena.get(id))
                .ok_or_else(|| ExplorerError::node_not_found(connection_id, node_path))?;
            (tree.provider_id.clone(), tree.session.clone(), node.node_path.clone())
        };

        let result = self.expand_or_refresh(&provider_id, &session, &path, refresh).await;

        let mut state = self.inner.state.lock();
        let tree = state
            .trees
            .get_mut(connection_id)
            .ok_or_else(|| ExplorerError::node_not_found(connection_id, &path))?;
        let id = tree
            .arena
            .find_by_path(&path)
            .ok_or_else(|| ExplorerError::node_not_found(connection_id, &path))?;

        match result {
            Ok(info) => {
                let ids = tree.arena.apply_expansion(id, info.nodes, refresh);
                Ok(ids
                    .into_iter()
                    .filter_map(|child| tree.arena.get(child).cloned())
                    .collect())
            }
            Err(e) => {
                if let Some(node) = tree.arena.get_mut(id) {
                    node.error_state_message = Some(e.to_string());
                }
                Err(e)
            }
        }
    }

    /// Walk from the connection root to `node_path`, expanding unresolved
    /// nodes on the way.
    ///
    /// Returns `Ok(None)` when the connection is unknown or no child leads to
    /// the path.
    pub async fn get_tree_node(
        &self,
        connection_id: &str,
        node_path: &str,
    ) -> Result<Option<TreeNode>, ExplorerError> {
        let mut current = {
            let state = self.inner.state.lock();
            let Some(tree) = state.trees.get(connection_id) else {
                return Ok(None);
            };
            if node_path.is_empty() {
                return Ok(Some(tree.arena.root().clone()));
            }
            tree.arena.root_id()
        };

        loop {
            let (current_path, needs_expansion) = {
                let state = self.inner.state.lock();
                let Some(node) = state
                    .trees
                    .get(connection_id)
                    .and_then(|tree| tree.arena.get(current))
                else {
                    return Ok(None);
                };
                if node.node_path == node_path {
                    return Ok(Some(node.clone()));
                }
                (
                    node.node_path.clone(),
                    !node.is_always_leaf && !node.is_resolved(),
                )
            };

            if needs_expansion {
                self.resolve_tree_node_children(connection_id, &current_path)
                    .await?;
            }

            let next = {
                let state = self.inner.state.lock();
                let Some(tree) = state.trees.get(connection_id) else {
                    return Ok(None);
                };
                let children = tree.arena.children(current).unwrap_or_default();
                select_next_child(children, &current_path, node_path).map(|child| child.id)
            };
            match next {
                Some(id) => current = id,
                None => return Ok(None),
            }
        }
    }

    /// Attach filters to a node; they travel with its next expansion and
    /// survive refreshes while the node stays filterable
    pub fn set_node_filters(
        &self,
        handle: &NodeHandle,
        filters: Vec<NodeFilter>,
    ) -> Result<(), ExplorerError> {
        let mut state = self.inner.state.lock();
        let node = state
            .trees
            .get_mut(&handle.connection_id)
            .and_then(|tree| {
                let id = tree.arena.find_by_path(&handle.node_path)?;
                tree.arena.get_mut(id)
            })
            .ok_or_else(|| ExplorerError::node_not_found(&handle.connection_id, &handle.node_path))?;
        node.filters = filters;
        Ok(())
    }

    /// Flag a node so its next child resolution refreshes
    pub fn mark_for_refresh(&self, handle: &NodeHandle) -> Result<(), ExplorerError> {
        let mut state = self.inner.state.lock();
        let node = state
            .trees
            .get_mut(&handle.connection_id)
            .and_then(|tree| {
                let id = tree.arena.find_by_path(&handle.node_path)?;
                tree.arena.get_mut(id)
            })
            .ok_or_else(|| ExplorerError::node_not_found(&handle.connection_id, &handle.node_path))?;
        node.force_refresh = true;
        Ok(())
    }

    /// Root node of a connection's tree
    pub fn get_object_explorer_node(&self, connection_id: &str) -> Option<TreeNode> {
        self.inner
            .state
            .lock()
            .trees
            .get(connection_id)
            .map(|tree| tree.arena.root().clone())
    }

    /// Root nodes of every connection with a materialized tree, ordered by
    /// connection id
    pub fn get_active_connection_nodes(&self) -> Vec<TreeNode> {
        self.inner
            .state
            .lock()
            .trees
            .values()
            .map(|tree| tree.arena.root().clone())
            .collect()
    }

    /// Resolved children of a tree node, in display order
    pub fn children_of(&self, handle: &NodeHandle) -> Option<Vec<TreeNode>> {
        let state = self.inner.state.lock();
        let tree = state.trees.get(&handle.connection_id)?;
        let id = tree.arena.find_by_path(&handle.node_path)?;
        tree.arena
            .children(id)
            .map(|children| children.into_iter().cloned().collect())
    }

    /// Make sure a connection has a session and tree, creating one on first use
    pub async fn update_object_explorer_nodes(
        &self,
        connection: &ConnectionProfile,
    ) -> Result<(), ExplorerError> {
        if self.inner.state.lock().trees.contains_key(&connection.id) {
            self.inner.events.nodes_updated(Some(&connection.id), None);
            return Ok(());
        }
        match self.create_session(&connection.provider_name, connection).await {
            Ok(_) => Ok(()),
            Err(e) => {
                self.inner
                    .events
                    .nodes_updated(Some(&connection.id), Some(&e.to_string()));
                Err(e)
            }
        }
    }

    /// Close the connection's session and drop its tree
    pub async fn delete_object_explorer_node(
        &self,
        connection: &ConnectionProfile,
    ) -> Result<(), ExplorerError> {
        let target = self
            .inner
            .state
            .lock()
            .trees
            .get(&connection.id)
            .map(|tree| (tree.provider_id.clone(), tree.session.clone()));
        let Some((provider_id, session)) = target else {
            return Ok(());
        };

        self.close_session(&provider_id, &session).await?;
        self.inner.discard(&connection.id, &session.session_id);
        Ok(())
    }

    /// Tear down a session the provider reports as disconnected
    pub async fn on_session_disconnected(&self, session: &ObjectExplorerSession) {
        let connection = self.get_session_connection_profile(&session.session_id);
        let Some(connection) = connection else {
            warn!(session_id = %session.session_id, "Cannot find disconnected session");
            return;
        };

        if let Err(e) = self.delete_object_explorer_node(&connection).await {
            error!(
                connection_id = %connection.id,
                session_id = %session.session_id,
                error = %e,
                "Failed to close disconnected session"
            );
        }
        self.inner.discard(&connection.id, &session.session_id);
        info!(connection_id = %connection.id, session_id = %session.session_id, "Session disconnected");
        self.inner
            .events
            .nodes_updated(Some(&connection.id), session.error_message.as_deref());
    }

    /// Ask the connection's provider for nodes matching `query`.
    ///
    /// The session id is filled in from the connection's tree; a connection
    /// without one yields no nodes.
    pub async fn find_nodes(
        &self,
        connection_id: &str,
        mut query: FindNodesInfo,
    ) -> Result<Vec<NodeInfo>, ExplorerError> {
        let provider = {
            let state = self.inner.state.lock();
            let Some(tree) = state.trees.get(connection_id) else {
                return Ok(Vec::new());
            };
            query.session_id = tree.session.session_id.clone();
            let provider_id = state
                .sessions
                .get(&query.session_id)
                .map(|status| status.provider_id.clone())
                .unwrap_or_else(|| tree.provider_id.clone());
            state.registry.get_or_error(&provider_id)?
        };
        let response = provider.find_nodes(query).await?;
        Ok(response.nodes)
    }

    // ---- View ----

    /// Attach the tree-rendering surface; only one may be registered
    pub fn register_view(&self, view: Arc<dyn ViewAdapter>) -> Result<(), ExplorerError> {
        let mut slot = self.inner.view.write();
        if slot.is_some() {
            return Err(ExplorerError::ViewAlreadyRegistered);
        }
        *slot = Some(view);
        Ok(())
    }

    /// Called by the view when its selection or focus changes
    pub fn notify_selection_or_focus_changed(&self) {
        self.inner.events.emit(ExplorerEvent::SelectionOrFocusChanged);
    }

    pub fn is_focused(&self) -> bool {
        self.view().map(|view| view.is_focused()).unwrap_or(false)
    }

    /// Children of a node as the view should show them; leaves have none
    pub async fn get_children(&self, handle: &NodeHandle) -> Result<Vec<TreeNode>, ExplorerError> {
        let Some(node) = self
            .get_tree_node(&handle.connection_id, &handle.node_path)
            .await?
        else {
            return Ok(Vec::new());
        };
        if node.is_always_leaf {
            return Ok(Vec::new());
        }
        if !node.is_resolved() {
            return self
                .resolve_tree_node_children(&handle.connection_id, &node.node_path)
                .await;
        }
        let handle = NodeHandle::new(handle.connection_id.clone(), node.node_path.clone());
        Ok(self.children_of(&handle).unwrap_or_default())
    }

    /// True only if the node and every ancestor are expanded in the view
    pub async fn is_expanded(&self, handle: &NodeHandle) -> Result<bool, ExplorerError> {
        let Some(view) = self.view() else {
            return Ok(false);
        };
        let Some(node) = self
            .get_tree_node(&handle.connection_id, &handle.node_path)
            .await?
        else {
            return Ok(false);
        };
        let items: Vec<TreeItem> = {
            let state = self.inner.state.lock();
            let Some(tree) = state.trees.get(&handle.connection_id) else {
                return Ok(false);
            };
            tree.arena
                .ancestry(node.id)
                .into_iter()
                .map(|n| tree_item(&handle.connection_id, n))
                .collect()
        };
        Ok(items.iter().all(|item| view.is_expanded(item)))
    }

    pub async fn set_node_expanded_state(
        &self,
        handle: &NodeHandle,
        state: TreeItemCollapsibleState,
    ) -> Result<(), ExplorerError> {
        let Some(item) = self.view_item(handle).await? else {
            return Ok(());
        };
        if let Some(view) = self.view() {
            if state == TreeItemCollapsibleState::Expanded {
                view.reveal(&item).await;
            }
            view.set_expanded_state(&item, state).await;
        }
        Ok(())
    }

    pub async fn set_node_selected(
        &self,
        handle: &NodeHandle,
        selected: bool,
        clear_other_selections: bool,
    ) -> Result<(), ExplorerError> {
        let Some(item) = self.view_item(handle).await? else {
            return Ok(());
        };
        if let Some(view) = self.view() {
            if selected {
                view.reveal(&item).await;
            }
            view.set_selected(&item, selected, clear_other_selections)
                .await;
        }
        Ok(())
    }

    /// Refresh a node from its providers, then refresh it in the view and
    /// expand it when it has children
    pub async fn refresh_node_in_view(
        &self,
        connection_id: &str,
        node_path: &str,
    ) -> Result<Option<TreeNode>, ExplorerError> {
        let Some(node) = self.get_tree_node(connection_id, node_path).await? else {
            return Ok(None);
        };
        self.refresh_tree_node(connection_id, &node.node_path).await?;

        let Some(node) = self.get_tree_node(connection_id, node_path).await? else {
            return Ok(None);
        };
        if let Some(view) = self.view() {
            let item = tree_item(connection_id, &node);
            view.refresh_element(&item).await;
            if node.children().map(|c| !c.is_empty()).unwrap_or(false) {
                view.reveal(&item).await;
                view.set_expanded_state(&item, TreeItemCollapsibleState::Expanded)
                    .await;
            }
        }
        Ok(Some(node))
    }

    /// Profile and database behind a single selected item.
    ///
    /// An unavailable database resolves to the server connection.
    pub fn get_selected_profile_and_database(&self) -> Option<SelectedContext> {
        let view = self.view()?;
        let selection = view.selection();
        let [selected] = selection.as_slice() else {
            return None;
        };

        let state = self.inner.state.lock();
        let tree = state.trees.get(selected.connection_id())?;
        match selected {
            TreeItem::Connection(_) => Some(SelectedContext {
                profile: tree.connection.clone(),
                database_name: None,
            }),
            TreeItem::Node { node_path, .. } => {
                let id = tree.arena.find_by_path(node_path)?;
                let node = tree.arena.get(id)?;
                let database_name = if node.is_database() && node.is_always_leaf {
                    None
                } else {
                    tree.arena.database_name(id)
                };
                Some(SelectedContext {
                    profile: tree.connection.clone(),
                    database_name,
                })
            }
        }
    }

    fn view(&self) -> Option<Arc<dyn ViewAdapter>> {
        self.inner.view.read().clone()
    }

    async fn view_item(&self, handle: &NodeHandle) -> Result<Option<TreeItem>, ExplorerError> {
        Ok(self
            .get_tree_node(&handle.connection_id, &handle.node_path)
            .await?
            .map(|node| tree_item(&handle.connection_id, &node)))
    }
}

/// The root is shown as its connection, every other node as itself
fn tree_item(connection_id: &str, node: &TreeNode) -> TreeItem {
    match node.parent() {
        None => TreeItem::Connection(connection_id.to_string()),
        Some(_) => TreeItem::Node {
            connection_id: connection_id.to_string(),
            node_path: node.node_path.clone(),
        },
    }
}

impl ExplorerInner {
    /// Call every target and record declines and call failures as results
    async fn fan_out(self: Arc<Self>, targets: Vec<ExpansionTarget>, request: ExpandNodeInfo, refresh: bool) {
        let calls = targets.into_iter().map(|target| {
            let request = request.clone();
            let inner = &self;
            async move {
                let target_id = target.provider_id().to_string();
                let session_id = request.session_id.clone();
                let node_path = request.node_path.clone();
                match target.expand_or_refresh(request, refresh).await {
                    Ok(true) => {}
                    Ok(false) => {
                        trace!(provider_id = %target_id, node_path = %node_path, "Provider declined expansion");
                        inner.record_response(NodeExpandResponse::success(
                            target_id,
                            session_id,
                            node_path,
                            Vec::new(),
                        ));
                    }
                    Err(e) => {
                        let failure = ExplorerError::ProviderExpansion {
                            provider_id: target_id.clone(),
                            node_path: node_path.clone(),
                            message: e.to_string(),
                        };
                        inner.record_response(NodeExpandResponse::failure(
                            target_id,
                            session_id,
                            node_path,
                            failure.to_string(),
                        ));
                    }
                }
            }
        });
        join_all(calls).await;
    }

    /// Accumulate a response and resolve the expansion once every provider in
    /// its fan-out set has answered
    fn record_response(&self, response: NodeExpandResponse) {
        let session_id = response.session_id.clone();
        let node_path = response.node_path.clone();

        let completed = {
            let mut state = self.state.lock();
            let Some(status) = state.sessions.get_mut(&session_id) else {
                warn!(
                    session_id = %session_id,
                    node_path = %node_path,
                    provider_id = %response.provider_id,
                    "Cannot find session for expansion response"
                );
                return;
            };
            let Some(pending) = status.nodes.get_mut(&node_path) else {
                warn!(
                    session_id = %session_id,
                    node_path = %node_path,
                    provider_id = %response.provider_id,
                    "Cannot find pending expansion for response"
                );
                return;
            };
            trace!(
                session_id = %session_id,
                node_path = %node_path,
                provider_id = %response.provider_id,
                nodes = response.nodes.len(),
                "Received expansion result"
            );
            pending.record(response);
            if !pending.is_complete() {
                return;
            }
            let connection_id = status.connection.id.clone();
            status
                .nodes
                .remove(&node_path)
                .map(|pending| (pending, connection_id))
        };

        let Some((pending, connection_id)) = completed else {
            return;
        };
        let outcome = merge_results(pending.providers(), pending.results(), &session_id, &node_path);
        match &outcome {
            Ok(info) if info.error_message.is_some() => self
                .events
                .nodes_updated(Some(&connection_id), info.error_message.as_deref()),
            Err(e) => self
                .events
                .nodes_updated(Some(&connection_id), Some(&e.to_string())),
            Ok(_) => {}
        }
        debug!(
            session_id = %session_id,
            node_path = %node_path,
            expansion_id = pending.id().as_u64(),
            ok = outcome.is_ok(),
            "Expansion complete"
        );
        pending.resolve(outcome);
    }

    /// Forget a connection's tree and session, releasing anything still pending
    fn discard(&self, connection_id: &str, session_id: &str) {
        let removed = {
            let mut state = self.state.lock();
            state.trees.remove(connection_id);
            state.sessions.remove(session_id)
        };
        if let Some(status) = removed {
            for (node_path, pending) in status.nodes {
                pending.resolve(Ok(ExpandInfo::empty(session_id, node_path)));
            }
            trace!(connection_id = %connection_id, session_id = %session_id, "Discarded session");
        }
    }
}
