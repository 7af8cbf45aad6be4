//! Merge of per-provider expansion results

use crate::error::ExplorerError;
use crate::tree::node::node_types;
use crate::types::{ExpandInfo, NodeExpandResponse, NodeInfo};
use std::collections::HashMap;
use tracing::error;

/// Prefix used when more than one provider failed
pub const MULTIPLE_ERRORS_LABEL: &str = "Multiple errors:";

/// Combine accumulated results in fan-out order.
///
/// Nodes from every successful provider are concatenated in `providers` order.
/// Failed providers contribute a single synthesized error node at the front.
/// When nothing succeeded the combined message is returned as an error.
pub fn merge_results(
    providers: &[String],
    results: &HashMap<String, NodeExpandResponse>,
    session_id: &str,
    node_path: &str,
) -> Result<ExpandInfo, ExplorerError> {
    let mut nodes: Vec<NodeInfo> = Vec::new();
    let mut template: Option<&NodeExpandResponse> = None;
    let mut errors: Vec<&str> = Vec::new();

    for provider_id in providers {
        let Some(result) = results.get(provider_id) else {
            continue;
        };
        if result.is_error() {
            let message = result.error_message.as_deref().unwrap_or_default();
            error!(
                provider_id = %provider_id,
                session_id = %session_id,
                node_path = %node_path,
                error = %message,
                "Provider failed to expand node"
            );
            errors.push(message);
        } else {
            nodes.extend(result.nodes.iter().cloned());
            template = Some(result);
        }
    }

    let error_message = match errors.len() {
        0 => None,
        1 => Some(errors[0].to_string()),
        _ => Some(format!("{}\n{}", MULTIPLE_ERRORS_LABEL, errors.join("\n"))),
    };

    let Some(template) = template else {
        let message = error_message.unwrap_or_else(|| format!("No provider expanded {}", node_path));
        return Err(ExplorerError::AggregateExpansionFailure(message));
    };

    if let Some(message) = &error_message {
        nodes.insert(0, error_node(message));
    }

    Ok(ExpandInfo {
        session_id: template.session_id.clone(),
        node_path: template.node_path.clone(),
        nodes,
        error_message,
    })
}

fn error_node(message: &str) -> NodeInfo {
    NodeInfo {
        node_path: String::new(),
        node_type: node_types::ERROR.to_string(),
        object_type: Some(node_types::ERROR.to_string()),
        label: message.to_string(),
        is_leaf: true,
        error_message: Some(message.to_string()),
        ..NodeInfo::default()
    }
}
