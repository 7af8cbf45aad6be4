//! CLI route: run context and command dispatch.

use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_children_text, format_found_text, format_node_text, format_outline, to_json,
    OutlineEntry,
};
use crate::config::{ConfigLoader, ExplorerConfig};
use crate::connection::ConnectionProfile;
use crate::explorer::ObjectExplorer;
use crate::provider::fixture::{register_fixtures, FixtureProvider, FixtureTree};
use crate::tree::TreeNode;
use crate::types::FindNodesInfo;
use crate::view::NodeHandle;
use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Provider id used for a tree passed with `--fixture`
pub const DEFAULT_FIXTURE_PROVIDER: &str = "fixture";

/// Runtime context for one CLI invocation: the coordinator with its providers
/// registered and the connection to browse.
pub struct RunContext {
    explorer: ObjectExplorer,
    connection: ConnectionProfile,
}

impl RunContext {
    pub fn new(
        config_path: Option<PathBuf>,
        fixture: Option<PathBuf>,
        provider: Option<String>,
        connection_id: String,
        server: String,
    ) -> Result<Self> {
        let config = ConfigLoader::load(config_path.as_deref())
            .context("Failed to load configuration")?;
        Self::from_config(&config, config_path.as_deref(), fixture, provider, connection_id, server)
    }

    pub fn from_config(
        config: &ExplorerConfig,
        config_path: Option<&Path>,
        fixture: Option<PathBuf>,
        provider: Option<String>,
        connection_id: String,
        server: String,
    ) -> Result<Self> {
        let explorer = ObjectExplorer::new(&config.explorer);
        let base_dir = config_path
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut provider_ids = register_fixtures(&explorer, &config.fixtures, &base_dir)?;

        if let Some(path) = fixture {
            let provider_id = provider
                .clone()
                .unwrap_or_else(|| DEFAULT_FIXTURE_PROVIDER.to_string());
            let tree = FixtureTree::load(&path)?;
            explorer.register_provider(
                provider_id.clone(),
                Arc::new(FixtureProvider::new(
                    provider_id.clone(),
                    Arc::new(tree),
                    explorer.response_sink(),
                )),
            );
            provider_ids.insert(0, provider_id);
        }

        let provider_id = match provider {
            Some(id) => id,
            None => provider_ids
                .first()
                .cloned()
                .ok_or_else(|| anyhow!("No provider configured; pass --fixture or add [fixtures.providers]"))?,
        };
        if !explorer.is_registered(&provider_id) {
            bail!("Provider '{}' is not configured", provider_id);
        }
        debug!(provider_id = %provider_id, connection_id = %connection_id, "CLI context ready");

        Ok(Self {
            explorer,
            connection: ConnectionProfile::new(connection_id, provider_id, server),
        })
    }

    pub fn explorer(&self) -> &ObjectExplorer {
        &self.explorer
    }

    /// Open the session, run `command`, and close the session again
    pub async fn execute(&self, command: &Commands) -> Result<String> {
        self.explorer
            .update_object_explorer_nodes(&self.connection)
            .await
            .context("Failed to open session")?;
        info!(connection_id = %self.connection.id, "Session ready");

        let result = self.dispatch(command).await;

        self.explorer
            .delete_object_explorer_node(&self.connection)
            .await
            .context("Failed to close session")?;
        result
    }

    async fn dispatch(&self, command: &Commands) -> Result<String> {
        match command {
            Commands::Tree { path, depth } => self.handle_tree(path, *depth).await,
            Commands::Expand {
                path,
                refresh,
                format,
            } => self.handle_expand(path, *refresh, format).await,
            Commands::Resolve { path, format } => self.handle_resolve(path, format).await,
            Commands::Find {
                node_type,
                name,
                schema,
                database,
                format,
            } => {
                let query = FindNodesInfo {
                    node_type: node_type.clone(),
                    name: name.clone(),
                    schema: schema.clone(),
                    database: database.clone(),
                    ..FindNodesInfo::default()
                };
                let nodes = self.explorer.find_nodes(&self.connection.id, query).await?;
                if format == "json" {
                    Ok(to_json(&nodes)?)
                } else {
                    Ok(format_found_text(&nodes))
                }
            }
        }
    }

    async fn resolve(&self, path: &str) -> Result<TreeNode> {
        self.explorer
            .get_tree_node(&self.connection.id, path)
            .await?
            .ok_or_else(|| anyhow!("Node not found: {}", path))
    }

    async fn handle_tree(&self, path: &str, depth: usize) -> Result<String> {
        let start = self.resolve(path).await?;
        let mut entries = Vec::new();
        let mut stack = vec![(start, 0usize)];
        while let Some((node, level)) = stack.pop() {
            let handle = NodeHandle::new(self.connection.id.clone(), node.node_path.clone());
            entries.push(OutlineEntry {
                depth: level,
                label: node.label.clone(),
                node_type: node.node_type.clone(),
                is_error: node.is_error_node(),
            });
            if level >= depth || node.is_always_leaf || node.is_error_node() {
                continue;
            }
            let children = self.explorer.get_children(&handle).await?;
            stack.extend(children.into_iter().rev().map(|child| (child, level + 1)));
        }
        Ok(format_outline(&entries))
    }

    async fn handle_expand(&self, path: &str, refresh: bool, format: &str) -> Result<String> {
        let node = self.resolve(path).await?;
        let children = if refresh {
            self.explorer
                .refresh_tree_node(&self.connection.id, &node.node_path)
                .await?
        } else {
            self.explorer
                .resolve_tree_node_children(&self.connection.id, &node.node_path)
                .await?
        };
        if format == "json" {
            let infos: Vec<_> = children.iter().map(TreeNode::to_node_info).collect();
            Ok(to_json(&infos)?)
        } else {
            Ok(format_children_text(&children))
        }
    }

    async fn handle_resolve(&self, path: &str, format: &str) -> Result<String> {
        let node = self.resolve(path).await?;
        if format == "json" {
            Ok(to_json(&node)?)
        } else {
            Ok(format_node_text(&node))
        }
    }
}
