//! Coordinator calls into the tree view

use crate::integration::test_utils::*;
use oexplorer::types::NodeInfo;
use oexplorer::view::{ExplorerEvent, NodeHandle, TreeItem, TreeItemCollapsibleState};
use oexplorer::{ExplorerError, ObjectExplorer};
use std::sync::Arc;

fn item(path: &str) -> TreeItem {
    TreeItem::Node {
        connection_id: "c1".to_string(),
        node_path: path.to_string(),
    }
}

async fn with_view() -> (ObjectExplorer, Arc<MockProvider>, Arc<RecordingView>) {
    let explorer = ObjectExplorer::default();
    let provider = MockProvider::install(&explorer, "prov1");
    provider.set_children(
        "/root",
        vec![NodeInfo::new("/root/sales", "Database", "sales")],
    );
    provider.set_children("/root/sales", vec![node("/root/sales/tables", "Tables")]);
    provider.set_children("/root/sales/tables", vec![leaf("/root/sales/tables/t", "t")]);
    explorer
        .update_object_explorer_nodes(&profile("c1", "prov1"))
        .await
        .unwrap();
    let view = Arc::new(RecordingView::default());
    explorer.register_view(view.clone()).unwrap();
    (explorer, provider, view)
}

#[tokio::test]
async fn only_one_view_may_register() {
    let (explorer, _provider, _view) = with_view().await;
    let err = explorer
        .register_view(Arc::new(RecordingView::default()))
        .unwrap_err();
    assert_eq!(err, ExplorerError::ViewAlreadyRegistered);
}

#[tokio::test]
async fn expanded_requires_every_ancestor() {
    let (explorer, _provider, view) = with_view().await;
    let tables = NodeHandle::new("c1", "/root/sales/tables");

    view.expand(item("/root/sales/tables"));
    view.expand(item("/root/sales"));
    assert!(!explorer.is_expanded(&tables).await.unwrap());

    view.expand(TreeItem::Connection("c1".to_string()));
    assert!(explorer.is_expanded(&tables).await.unwrap());
    assert!(!explorer
        .is_expanded(&NodeHandle::new("c1", "/root/missing"))
        .await
        .unwrap());
}

#[tokio::test]
async fn expanding_and_selecting_reveal_the_item() {
    let (explorer, _provider, view) = with_view().await;
    let sales = NodeHandle::new("c1", "/root/sales");

    explorer
        .set_node_expanded_state(&sales, TreeItemCollapsibleState::Expanded)
        .await
        .unwrap();
    explorer
        .set_node_expanded_state(&sales, TreeItemCollapsibleState::Collapsed)
        .await
        .unwrap();
    explorer.set_node_selected(&sales, true, true).await.unwrap();
    explorer
        .set_node_selected(&NodeHandle::new("c1", ""), false, false)
        .await
        .unwrap();

    assert_eq!(
        view.actions(),
        vec![
            ViewAction::Reveal(item("/root/sales")),
            ViewAction::SetExpanded(item("/root/sales"), TreeItemCollapsibleState::Expanded),
            ViewAction::SetExpanded(item("/root/sales"), TreeItemCollapsibleState::Collapsed),
            ViewAction::Reveal(item("/root/sales")),
            ViewAction::SetSelected(item("/root/sales"), true),
            ViewAction::SetSelected(TreeItem::Connection("c1".to_string()), false),
        ]
    );
}

#[tokio::test]
async fn refresh_in_view_expands_node_with_children() {
    let (explorer, provider, view) = with_view().await;

    let node = explorer
        .refresh_node_in_view("c1", "/root/sales")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(node.children().map(|c| c.len()), Some(1));
    assert_eq!(provider.count(CallKind::Refresh), 1);
    assert_eq!(
        view.actions(),
        vec![
            ViewAction::Refresh(item("/root/sales")),
            ViewAction::Reveal(item("/root/sales")),
            ViewAction::SetExpanded(item("/root/sales"), TreeItemCollapsibleState::Expanded),
        ]
    );
}

#[tokio::test]
async fn selection_resolves_profile_and_database() {
    let (explorer, _provider, view) = with_view().await;
    explorer
        .get_tree_node("c1", "/root/sales/tables")
        .await
        .unwrap()
        .unwrap();

    assert!(explorer.get_selected_profile_and_database().is_none());

    view.select(vec![item("/root/sales/tables")]);
    let selected = explorer.get_selected_profile_and_database().unwrap();
    assert_eq!(selected.profile.id, "c1");
    assert_eq!(selected.database_name.as_deref(), Some("sales"));

    view.select(vec![TreeItem::Connection("c1".to_string())]);
    let selected = explorer.get_selected_profile_and_database().unwrap();
    assert!(selected.database_name.is_none());

    view.select(vec![item("/root/sales"), item("/root/sales/tables")]);
    assert!(explorer.get_selected_profile_and_database().is_none());
}

#[tokio::test]
async fn unavailable_database_selects_the_server() {
    let explorer = ObjectExplorer::default();
    let provider = MockProvider::install(&explorer, "prov1");
    provider.set_children(
        "/root",
        vec![NodeInfo::new("/root/old", "Database", "old").with_leaf(true)],
    );
    explorer
        .update_object_explorer_nodes(&profile("c1", "prov1"))
        .await
        .unwrap();
    let view = Arc::new(RecordingView::default());
    explorer.register_view(view.clone()).unwrap();

    let old = explorer.get_tree_node("c1", "/root/old").await.unwrap().unwrap();
    assert_eq!(old.node_status.as_deref(), Some("Unavailable"));

    view.select(vec![item("/root/old")]);
    let selected = explorer.get_selected_profile_and_database().unwrap();
    assert!(selected.database_name.is_none());
}

#[tokio::test]
async fn focus_and_selection_notifications() {
    let (explorer, _provider, view) = with_view().await;
    let mut events = explorer.subscribe();

    assert!(!explorer.is_focused());
    view.focus(true);
    assert!(explorer.is_focused());

    explorer.notify_selection_or_focus_changed();
    assert_eq!(
        events.recv().await.unwrap(),
        ExplorerEvent::SelectionOrFocusChanged
    );
}

#[tokio::test]
async fn without_view_nothing_is_expanded() {
    let explorer = ObjectExplorer::default();
    MockProvider::install(&explorer, "prov1");
    explorer
        .update_object_explorer_nodes(&profile("c1", "prov1"))
        .await
        .unwrap();

    assert!(!explorer.is_expanded(&NodeHandle::new("c1", "/root")).await.unwrap());
    assert!(!explorer.is_focused());
    assert!(explorer.get_selected_profile_and_database().is_none());
    explorer
        .set_node_selected(&NodeHandle::new("c1", "/root"), true, true)
        .await
        .unwrap();
}
