//! CLI presentation: tables, tree outlines and JSON for explorer results.

use crate::tree::TreeNode;
use crate::types::NodeInfo;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use owo_colors::OwoColorize;

/// One line of a tree outline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub depth: usize,
    pub label: String,
    pub node_type: String,
    pub is_error: bool,
}

pub fn format_outline(entries: &[OutlineEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            let indent = "  ".repeat(entry.depth);
            if entry.is_error {
                format!("{}{}", indent, entry.label.red())
            } else {
                format!("{}{} {}", indent, entry.label, format!("[{}]", entry.node_type).dimmed())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_children_text(children: &[TreeNode]) -> String {
    if children.is_empty() {
        return "No children.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Label", "Type", "Path", "Leaf", "Status"]);
    for child in children {
        let label = if child.is_error_node() {
            child.label.red().to_string()
        } else {
            child.label.clone()
        };
        table.add_row(vec![
            label,
            child.node_type.clone(),
            child.node_path.clone(),
            if child.is_always_leaf { "yes" } else { "no" }.to_string(),
            child.node_status.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table.to_string()
}

pub fn format_node_text(node: &TreeNode) -> String {
    let mut lines = vec![
        format!("Path:   {}", node.node_path),
        format!("Label:  {}", node.label),
        format!("Type:   {}", node.node_type),
        format!("Leaf:   {}", node.is_always_leaf),
    ];
    if let Some(status) = &node.node_status {
        lines.push(format!("Status: {}", status));
    }
    if let Some(children) = node.children() {
        lines.push(format!("Children: {}", children.len()));
    }
    if let Some(message) = &node.error_state_message {
        lines.push(format!("Error:  {}", message.red()));
    }
    lines.join("\n")
}

pub fn format_found_text(nodes: &[NodeInfo]) -> String {
    if nodes.is_empty() {
        return "No matching nodes.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Name", "Schema", "Type", "Path"]);
    for node in nodes {
        let metadata = node.metadata.as_ref();
        table.add_row(vec![
            metadata.map(|m| m.name.clone()).unwrap_or_else(|| node.label.clone()),
            metadata
                .and_then(|m| m.schema.clone())
                .unwrap_or_else(|| "-".to_string()),
            node.node_type.clone(),
            node.node_path.clone(),
        ]);
    }
    table.to_string()
}

pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}
