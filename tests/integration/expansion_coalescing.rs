//! One fan-out per session and node path

use crate::integration::test_utils::*;
use oexplorer::types::{ExpandInfo, ObjectExplorerSession};
use oexplorer::{ExplorerError, ObjectExplorer};
use std::time::Duration;
use tokio::task::JoinHandle;

fn spawn_expand(
    explorer: &ObjectExplorer,
    session: &ObjectExplorerSession,
    node_path: &str,
    refresh: bool,
) -> JoinHandle<Result<ExpandInfo, ExplorerError>> {
    let explorer = explorer.clone();
    let session = session.clone();
    let node_path = node_path.to_string();
    tokio::spawn(async move {
        if refresh {
            explorer.refresh_node("prov1", &session, &node_path).await
        } else {
            explorer.expand_node("prov1", &session, &node_path).await
        }
    })
}

async fn wait_for_waiters(explorer: &ObjectExplorer, session_id: &str, node_path: &str, waiters: usize) {
    wait_until(|| {
        explorer
            .pending_expansion(session_id, node_path)
            .map(|status| status.waiters == waiters)
            .unwrap_or(false)
    })
    .await;
}

#[tokio::test]
async fn concurrent_expands_share_one_fan_out() {
    let explorer = ObjectExplorer::default();
    let provider = MockProvider::install(&explorer, "prov1");
    let node_provider = MockNodeProvider::install(&explorer, "np", "prov1", "aaa");
    provider.set_mode(ExpandMode::Manual);
    node_provider.set_mode(ExpandMode::Manual);
    let session = explorer
        .create_session("prov1", &profile("c1", "prov1"))
        .await
        .unwrap();

    let first = spawn_expand(&explorer, &session, "/root", false);
    let second = spawn_expand(&explorer, &session, "/root", false);
    wait_for_waiters(&explorer, &session.session_id, "/root", 2).await;

    provider.respond(&session.session_id, "/root", vec![leaf("/root/a", "a")]);
    assert!(explorer.pending_expansion(&session.session_id, "/root").is_some());
    node_provider.respond(&session.session_id, "/root", vec![leaf("/root/x", "x")]);

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert_eq!(first, second);
    assert_eq!(labels(&first.nodes), ["a", "x"]);
    assert_eq!(provider.count(CallKind::Expand), 1);
    assert_eq!(node_provider.count(CallKind::Expand), 1);
    assert!(explorer.pending_expansion(&session.session_id, "/root").is_none());
}

#[tokio::test]
async fn refresh_attaches_to_expansion_in_flight() {
    let explorer = ObjectExplorer::default();
    let provider = MockProvider::install(&explorer, "prov1");
    provider.set_mode(ExpandMode::Manual);
    let session = explorer
        .create_session("prov1", &profile("c1", "prov1"))
        .await
        .unwrap();

    let expand = spawn_expand(&explorer, &session, "/root", false);
    wait_for_waiters(&explorer, &session.session_id, "/root", 1).await;
    let refresh = spawn_expand(&explorer, &session, "/root", true);
    wait_for_waiters(&explorer, &session.session_id, "/root", 2).await;

    let status = explorer
        .pending_expansion(&session.session_id, "/root")
        .unwrap();
    assert!(!status.refresh);
    assert_eq!(status.providers, ["prov1"]);
    assert!(status.responded.is_empty());

    provider.respond(&session.session_id, "/root", vec![leaf("/root/a", "a")]);
    assert_eq!(labels(&expand.await.unwrap().unwrap().nodes), ["a"]);
    assert_eq!(labels(&refresh.await.unwrap().unwrap().nodes), ["a"]);
    assert_eq!(provider.count(CallKind::Expand), 1);
    assert_eq!(provider.count(CallKind::Refresh), 0);
}

#[tokio::test]
async fn completed_expansion_is_not_reused() {
    let explorer = ObjectExplorer::default();
    let provider = MockProvider::install(&explorer, "prov1");
    provider.set_children("/root", vec![leaf("/root/a", "a")]);
    let session = explorer
        .create_session("prov1", &profile("c1", "prov1"))
        .await
        .unwrap();

    explorer.expand_node("prov1", &session, "/root").await.unwrap();
    provider.set_children("/root", vec![leaf("/root/b", "b")]);
    let second = explorer.expand_node("prov1", &session, "/root").await.unwrap();

    assert_eq!(labels(&second.nodes), ["b"]);
    assert_eq!(provider.count(CallKind::Expand), 2);
}

#[tokio::test]
async fn different_paths_fan_out_independently() {
    let explorer = ObjectExplorer::default();
    let provider = MockProvider::install(&explorer, "prov1");
    provider.set_mode(ExpandMode::Manual);
    let session = explorer
        .create_session("prov1", &profile("c1", "prov1"))
        .await
        .unwrap();

    let root = spawn_expand(&explorer, &session, "/root", false);
    let tables = spawn_expand(&explorer, &session, "/root/tables", false);
    provider.wait_for(CallKind::Expand, 2).await;

    provider.respond(&session.session_id, "/root/tables", vec![leaf("/root/tables/t", "t")]);
    assert_eq!(labels(&tables.await.unwrap().unwrap().nodes), ["t"]);
    assert!(explorer.pending_expansion(&session.session_id, "/root").is_some());

    provider.respond(&session.session_id, "/root", vec![node("/root/tables", "Tables")]);
    assert_eq!(labels(&root.await.unwrap().unwrap().nodes), ["Tables"]);
}

#[tokio::test]
async fn unknown_session_fails_without_fan_out() {
    let explorer = ObjectExplorer::default();
    let provider = MockProvider::install(&explorer, "prov1");
    let session = ObjectExplorerSession {
        session_id: "missing".to_string(),
        success: true,
        ..ObjectExplorerSession::default()
    };

    let err = explorer
        .expand_node("prov1", &session, "/root")
        .await
        .unwrap_err();
    assert_eq!(err, ExplorerError::SessionNotFound("missing".to_string()));
    assert_eq!(provider.count(CallKind::Expand), 0);
}

#[tokio::test]
async fn unknown_provider_fails_without_fan_out() {
    let explorer = ObjectExplorer::default();
    let provider = MockProvider::install(&explorer, "prov1");
    let session = explorer
        .create_session("prov1", &profile("c1", "prov1"))
        .await
        .unwrap();

    let err = explorer
        .refresh_node("prov2", &session, "/root")
        .await
        .unwrap_err();
    assert_eq!(err, ExplorerError::ProviderNotRegistered("prov2".to_string()));
    assert_eq!(provider.count(CallKind::Refresh), 0);
    assert!(explorer.pending_expansion(&session.session_id, "/root").is_none());
}

#[tokio::test]
async fn declining_node_provider_contributes_nothing() {
    let explorer = ObjectExplorer::default();
    let provider = MockProvider::install(&explorer, "prov1");
    let node_provider = MockNodeProvider::install(&explorer, "np", "prov1", "aaa");
    provider.set_children("/root", vec![leaf("/root/a", "a")]);
    node_provider.set_mode(ExpandMode::Decline);
    let session = explorer
        .create_session("prov1", &profile("c1", "prov1"))
        .await
        .unwrap();

    let info = explorer.expand_node("prov1", &session, "/root").await.unwrap();
    assert_eq!(labels(&info.nodes), ["a"]);
    assert!(info.error_message.is_none());
    assert_eq!(node_provider.count(CallKind::Expand), 1);
}

#[tokio::test]
async fn dropped_caller_does_not_strand_attached_callers() {
    let explorer = ObjectExplorer::default();
    let provider = MockProvider::install(&explorer, "prov1");
    let slow = MockNodeProvider::install(&explorer, "slow", "prov1", "aaa");
    provider.set_children("/root", vec![leaf("/root/a", "a")]);
    slow.set_mode(ExpandMode::Decline);
    slow.set_call_delay(Duration::from_millis(50));
    let session = explorer
        .create_session("prov1", &profile("c1", "prov1"))
        .await
        .unwrap();

    let first = tokio::time::timeout(
        Duration::from_millis(10),
        explorer.expand_node("prov1", &session, "/root"),
    )
    .await;
    assert!(first.is_err());
    assert!(explorer.pending_expansion(&session.session_id, "/root").is_some());

    let second = spawn_expand(&explorer, &session, "/root", false);
    let second = tokio::time::timeout(Duration::from_secs(2), second)
        .await
        .expect("attached caller resolves")
        .unwrap()
        .unwrap();

    assert_eq!(labels(&second.nodes), ["a"]);
    assert_eq!(slow.count(CallKind::Expand), 1);
    assert_eq!(provider.count(CallKind::Expand), 1);
    assert!(explorer.pending_expansion(&session.session_id, "/root").is_none());
}

#[tokio::test]
async fn failed_provider_call_becomes_error_node() {
    let explorer = ObjectExplorer::default();
    let provider = MockProvider::install(&explorer, "prov1");
    let node_provider = MockNodeProvider::install(&explorer, "np", "prov1", "aaa");
    provider.set_children("/root", vec![leaf("/root/a", "a")]);
    node_provider.set_mode(ExpandMode::Fail("socket closed".to_string()));
    let session = explorer
        .create_session("prov1", &profile("c1", "prov1"))
        .await
        .unwrap();

    let info = explorer.expand_node("prov1", &session, "/root").await.unwrap();
    assert_eq!(info.nodes.len(), 2);
    assert_eq!(info.nodes[0].node_type, "error");
    assert!(info.nodes[0].label.contains("np"));
    assert!(info.nodes[0].label.contains("socket closed"));
    assert_eq!(info.nodes[1].label, "a");
}

#[tokio::test]
async fn requests_carry_session_and_path() {
    let explorer = ObjectExplorer::default();
    let provider = MockProvider::install(&explorer, "prov1");
    let session = explorer
        .create_session("prov1", &profile("c1", "prov1"))
        .await
        .unwrap();

    explorer.refresh_node("prov1", &session, "/root").await.unwrap();

    let calls = provider.calls();
    let refresh = calls
        .iter()
        .find(|call| call.kind == CallKind::Refresh)
        .unwrap();
    let request = refresh.request.as_ref().unwrap();
    assert_eq!(request.session_id, session.session_id);
    assert_eq!(request.node_path, "/root");
    assert!(request.filters.is_empty());
}
