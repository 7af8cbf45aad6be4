//! Provider Abstraction
//!
//! Object Explorer trees are supplied by pluggable backends. A primary
//! [`Provider`] owns sessions for one provider id and supplies the main tree;
//! any number of [`NodeProvider`]s registered under the same id contribute
//! supplementary children to the same nodes. Both answer expand and refresh
//! requests out of band through the coordinator's response channel.

use crate::connection::ConnectionInfo;
use crate::error::ExplorerError;
use crate::types::{
    CloseSessionInfo, CloseSessionResponse, ExpandNodeInfo, FindNodesInfo, FindNodesResponse,
    ObjectExplorerSession,
};
use async_trait::async_trait;
use std::sync::Arc;

pub mod fixture;
pub mod registry;

pub use registry::ProviderRegistry;

/// Primary provider contract
#[async_trait]
pub trait Provider: Send + Sync {
    /// Open a session for a connection
    async fn create_session(
        &self,
        connection: ConnectionInfo,
    ) -> Result<ObjectExplorerSession, ExplorerError>;

    /// Start expanding a node.
    ///
    /// `Ok(true)` promises a response through the response channel;
    /// `Ok(false)` declines and no response will follow.
    async fn expand_node(&self, request: ExpandNodeInfo) -> Result<bool, ExplorerError>;

    /// Same contract as [`Provider::expand_node`], bypassing provider caches
    async fn refresh_node(&self, request: ExpandNodeInfo) -> Result<bool, ExplorerError>;

    async fn close_session(
        &self,
        request: CloseSessionInfo,
    ) -> Result<CloseSessionResponse, ExplorerError>;

    async fn find_nodes(&self, request: FindNodesInfo) -> Result<FindNodesResponse, ExplorerError>;
}

/// Secondary provider contributing nodes under a primary provider's namespace
#[async_trait]
pub trait NodeProvider: Send + Sync {
    /// Id used to tag this provider's expansion responses
    fn provider_id(&self) -> &str;

    /// Primary provider id this node provider contributes to
    fn supported_provider_id(&self) -> &str;

    /// Merge ordering key, compared case-insensitively
    fn group(&self) -> &str;

    async fn handle_session_open(
        &self,
        session: &ObjectExplorerSession,
    ) -> Result<bool, ExplorerError>;

    async fn handle_session_close(&self, request: CloseSessionInfo) -> Result<(), ExplorerError>;

    async fn expand_node(&self, request: ExpandNodeInfo) -> Result<bool, ExplorerError>;

    async fn refresh_node(&self, request: ExpandNodeInfo) -> Result<bool, ExplorerError>;
}

/// One member of a fan-out set.
#[derive(Clone)]
pub enum ExpansionTarget {
    Primary {
        provider_id: String,
        provider: Arc<dyn Provider>,
    },
    Node(Arc<dyn NodeProvider>),
}

impl ExpansionTarget {
    /// Key under which this target's response is accumulated
    pub fn provider_id(&self) -> &str {
        match self {
            ExpansionTarget::Primary { provider_id, .. } => provider_id,
            ExpansionTarget::Node(node_provider) => node_provider.provider_id(),
        }
    }

    pub async fn expand_or_refresh(
        &self,
        request: ExpandNodeInfo,
        refresh: bool,
    ) -> Result<bool, ExplorerError> {
        match (self, refresh) {
            (ExpansionTarget::Primary { provider, .. }, false) => provider.expand_node(request).await,
            (ExpansionTarget::Primary { provider, .. }, true) => provider.refresh_node(request).await,
            (ExpansionTarget::Node(node_provider), false) => node_provider.expand_node(request).await,
            (ExpansionTarget::Node(node_provider), true) => node_provider.refresh_node(request).await,
        }
    }
}

impl std::fmt::Debug for ExpansionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpansionTarget::Primary { provider_id, .. } => {
                f.debug_tuple("Primary").field(provider_id).finish()
            }
            ExpansionTarget::Node(node_provider) => f
                .debug_struct("Node")
                .field("provider_id", &node_provider.provider_id())
                .field("group", &node_provider.group())
                .finish(),
        }
    }
}
