//! Per-connection node arena

use crate::tree::node::{node_types, NodeId, TreeNode};
use crate::types::{NodeFilter, NodeInfo};
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Storage for one connection's materialized tree.
///
/// The path index doubles as the node cache: a plain expansion re-attaches a
/// node whose path is already materialized, a refresh rebuilds it. Error nodes
/// and nodes with an empty path are never indexed.
#[derive(Debug, Clone)]
pub struct TreeArena {
    nodes: HashMap<NodeId, TreeNode>,
    by_path: HashMap<String, NodeId>,
    filters: HashMap<String, Vec<NodeFilter>>,
    root: NodeId,
    next_id: u64,
}

impl TreeArena {
    /// Create an arena holding only the root node
    pub fn new(root: NodeInfo) -> Self {
        let mut arena = Self {
            nodes: HashMap::new(),
            by_path: HashMap::new(),
            filters: HashMap::new(),
            root: NodeId(0),
            next_id: 0,
        };
        arena.root = arena.insert(root, None);
        arena
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[&self.root]
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by path; the empty path is the root
    pub fn find_by_path(&self, node_path: &str) -> Option<NodeId> {
        if node_path.is_empty() || node_path == self.root().node_path {
            return Some(self.root);
        }
        self.by_path.get(node_path).copied()
    }

    /// Resolved children of `id` in provider order
    pub fn children(&self, id: NodeId) -> Option<Vec<&TreeNode>> {
        let node = self.nodes.get(&id)?;
        let children = node.children.as_ref()?;
        Some(children.iter().filter_map(|c| self.nodes.get(c)).collect())
    }

    /// `id` followed by each of its ancestors up to the root
    pub fn ancestry(&self, id: NodeId) -> Vec<&TreeNode> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(&id);
        while let Some(node) = current {
            chain.push(node);
            current = node.parent.and_then(|p| self.nodes.get(&p));
        }
        chain
    }

    /// Name of the database a node lives under, if any.
    pub fn database_name(&self, id: NodeId) -> Option<String> {
        self.ancestry(id)
            .into_iter()
            .find(|n| n.is_database())
            .map(|db| {
                db.metadata
                    .as_ref()
                    .map(|m| m.name.clone())
                    .unwrap_or_else(|| db.label.clone())
            })
    }

    /// Remember the filters applied to a node so a refresh can re-apply them
    pub fn cache_filters(&mut self, node_path: &str, filters: Vec<NodeFilter>) {
        if filters.is_empty() {
            self.filters.remove(node_path);
        } else {
            self.filters.insert(node_path.to_string(), filters);
        }
    }

    /// Install the result of expanding `parent`.
    ///
    /// On refresh the previous children subtrees are discarded first. On a
    /// plain expansion nodes already materialized under the same path are
    /// reused with their own subtrees. Previous children that are not part of
    /// the new set are torn down either way.
    pub fn apply_expansion(&mut self, parent: NodeId, infos: Vec<NodeInfo>, refresh: bool) -> Vec<NodeId> {
        let previous: Vec<NodeId> = self
            .nodes
            .get(&parent)
            .and_then(|n| n.children.clone())
            .unwrap_or_default();

        if refresh {
            for child in &previous {
                self.remove_subtree(*child);
            }
        }

        let mut ids = Vec::with_capacity(infos.len());
        let mut used = HashSet::new();
        for info in infos {
            let reusable = if refresh || !Self::indexable(&info) {
                None
            } else {
                self.by_path
                    .get(&info.node_path)
                    .copied()
                    .filter(|id| *id != parent && *id != self.root && !used.contains(id))
            };

            let id = match reusable {
                Some(id) => {
                    if let Some(node) = self.nodes.get_mut(&id) {
                        node.parent = Some(parent);
                    }
                    id
                }
                None => self.insert(info, Some(parent)),
            };
            used.insert(id);
            self.apply_cached_filters(id);
            ids.push(id);
        }

        if !refresh {
            for child in previous.into_iter().filter(|c| !used.contains(c)) {
                self.remove_subtree(child);
            }
        }

        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children = Some(ids.clone());
            node.error_state_message = None;
        }
        trace!(
            parent = %self.nodes.get(&parent).map(|n| n.node_path.as_str()).unwrap_or_default(),
            children = ids.len(),
            refresh,
            "Installed expanded children"
        );
        ids
    }

    /// Drop `id` and all of its descendants
    pub fn remove_subtree(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                if self.by_path.get(&node.node_path) == Some(&current) {
                    self.by_path.remove(&node.node_path);
                }
                if let Some(children) = node.children {
                    stack.extend(children);
                }
            }
        }
    }

    fn insert(&mut self, info: NodeInfo, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        if Self::indexable(&info) {
            self.by_path.insert(info.node_path.clone(), id);
        }
        self.nodes.insert(id, TreeNode::from_info(id, info, parent));
        id
    }

    fn apply_cached_filters(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if node.filterable_properties.is_empty() {
            self.filters.remove(&node.node_path);
            node.filters.clear();
        } else {
            node.filters = self.filters.get(&node.node_path).cloned().unwrap_or_default();
        }
    }

    fn indexable(info: &NodeInfo) -> bool {
        !info.node_path.is_empty() && info.node_type != node_types::ERROR
    }
}
