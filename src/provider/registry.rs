//! Provider registry: primary providers by id plus node providers grouped
//! under the primary id they support.

use crate::error::ExplorerError;
use crate::provider::{ExpansionTarget, NodeProvider, Provider};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Registry of the providers contributing to Object Explorer trees
///
/// Providers live for the lifetime of the registry; there is no removal.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
    node_providers: HashMap<String, Vec<Arc<dyn NodeProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a primary provider, replacing any previous one for `provider_id`
    pub fn register_provider(&mut self, provider_id: impl Into<String>, provider: Arc<dyn Provider>) {
        let provider_id = provider_id.into();
        if self.providers.insert(provider_id.clone(), provider).is_some() {
            debug!(provider_id = %provider_id, "Replaced registered provider");
        } else {
            trace!(provider_id = %provider_id, "Registered provider");
        }
    }

    /// Append a node provider to the list for its supported provider id
    pub fn register_node_provider(&mut self, node_provider: Arc<dyn NodeProvider>) {
        trace!(
            provider_id = %node_provider.provider_id(),
            supported_provider_id = %node_provider.supported_provider_id(),
            group = %node_provider.group(),
            "Registered node provider"
        );
        self.node_providers
            .entry(node_provider.supported_provider_id().to_string())
            .or_default()
            .push(node_provider);
    }

    pub fn is_registered(&self, provider_id: &str) -> bool {
        self.providers.contains_key(provider_id)
    }

    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(provider_id).cloned()
    }

    pub fn get_or_error(&self, provider_id: &str) -> Result<Arc<dyn Provider>, ExplorerError> {
        self.get(provider_id)
            .ok_or_else(|| ExplorerError::ProviderNotRegistered(provider_id.to_string()))
    }

    /// Node providers for `provider_id` in registration order
    pub fn node_providers(&self, provider_id: &str) -> Vec<Arc<dyn NodeProvider>> {
        self.node_providers
            .get(provider_id)
            .cloned()
            .unwrap_or_default()
    }

    /// The fan-out set for one expansion: the primary provider first, then its
    /// node providers in ascending case-insensitive group order.
    ///
    /// The sort is stable, so node providers sharing a group keep their
    /// registration order.
    pub fn expansion_targets(&self, provider_id: &str) -> Result<Vec<ExpansionTarget>, ExplorerError> {
        let provider = self.get_or_error(provider_id)?;
        let mut node_providers = self.node_providers(provider_id);
        node_providers.sort_by_cached_key(|p| p.group().to_lowercase());

        let mut targets = Vec::with_capacity(node_providers.len() + 1);
        targets.push(ExpansionTarget::Primary {
            provider_id: provider_id.to_string(),
            provider,
        });
        targets.extend(node_providers.into_iter().map(ExpansionTarget::Node));
        Ok(targets)
    }
}
