//! Merged results keep provider order and fold errors into one node

use crate::integration::test_utils::*;
use oexplorer::expansion::MULTIPLE_ERRORS_LABEL;
use oexplorer::view::ExplorerEvent;
use oexplorer::{ExplorerError, ObjectExplorer};
use proptest::prelude::*;
use std::sync::Arc;

struct Fixture {
    explorer: ObjectExplorer,
    primary: Arc<MockProvider>,
    a: Arc<MockNodeProvider>,
    b: Arc<MockNodeProvider>,
}

/// prov1 with node providers B ("bbb", registered first) and A ("aaa"), all
/// answering by hand
fn manual_fixture() -> Fixture {
    let explorer = ObjectExplorer::default();
    let primary = MockProvider::install(&explorer, "prov1");
    let b = MockNodeProvider::install(&explorer, "B", "prov1", "bbb");
    let a = MockNodeProvider::install(&explorer, "A", "prov1", "aaa");
    primary.set_mode(ExpandMode::Manual);
    a.set_mode(ExpandMode::Manual);
    b.set_mode(ExpandMode::Manual);
    Fixture {
        explorer,
        primary,
        a,
        b,
    }
}

#[tokio::test]
async fn node_providers_merge_in_group_order() {
    let f = manual_fixture();
    let session = f
        .explorer
        .create_session("prov1", &profile("c1", "prov1"))
        .await
        .unwrap();
    let sid = session.session_id.clone();

    let explorer = f.explorer.clone();
    let expand = tokio::spawn(async move { explorer.expand_node("prov1", &session, "/root").await });
    f.b.wait_for(CallKind::Expand, 1).await;
    f.a.wait_for(CallKind::Expand, 1).await;

    f.b.respond(&sid, "/root", vec![leaf("/root/b1", "b1"), leaf("/root/b2", "b2")]);
    f.primary.respond(&sid, "/root", vec![leaf("/root/p", "p")]);
    f.a.respond(&sid, "/root", vec![leaf("/root/a1", "a1")]);

    let info = expand.await.unwrap().unwrap();
    assert_eq!(labels(&info.nodes), ["p", "a1", "b1", "b2"]);
    assert_eq!(info.session_id, sid);
    assert_eq!(info.node_path, "/root");
}

#[tokio::test]
async fn one_failure_yields_single_error_node_first() {
    let explorer = ObjectExplorer::default();
    let primary = MockProvider::install(&explorer, "prov1");
    let np = MockNodeProvider::install(&explorer, "np", "prov1", "aaa");
    primary.set_children("/root", vec![leaf("/root/a", "a"), leaf("/root/b", "b")]);
    np.set_mode(ExpandMode::Respond("timeout".to_string()));
    let session = explorer
        .create_session("prov1", &profile("c1", "prov1"))
        .await
        .unwrap();
    let mut events = explorer.subscribe();

    let info = explorer.expand_node("prov1", &session, "/root").await.unwrap();

    assert_eq!(labels(&info.nodes), ["timeout", "a", "b"]);
    let error = &info.nodes[0];
    assert_eq!(error.node_type, "error");
    assert_eq!(error.object_type.as_deref(), Some("error"));
    assert!(error.is_leaf);
    assert_eq!(error.node_path, "");
    assert_eq!(error.error_message.as_deref(), Some("timeout"));
    assert_eq!(info.error_message.as_deref(), Some("timeout"));
    assert_eq!(
        events.recv().await.unwrap(),
        ExplorerEvent::NodesUpdated {
            connection_id: Some("c1".to_string()),
            error_message: Some("timeout".to_string()),
        }
    );
}

#[tokio::test]
async fn several_failures_share_one_error_node() {
    let f = manual_fixture();
    let session = f
        .explorer
        .create_session("prov1", &profile("c1", "prov1"))
        .await
        .unwrap();
    let sid = session.session_id.clone();

    let explorer = f.explorer.clone();
    let expand = tokio::spawn(async move { explorer.expand_node("prov1", &session, "/root").await });
    f.b.wait_for(CallKind::Expand, 1).await;

    f.b.respond_error(&sid, "/root", "b failed");
    f.a.respond_error(&sid, "/root", "a failed");
    f.primary.respond(&sid, "/root", vec![leaf("/root/p", "p")]);

    let info = expand.await.unwrap().unwrap();
    assert_eq!(info.nodes.len(), 2);
    assert_eq!(
        info.nodes[0].label,
        format!("{}\na failed\nb failed", MULTIPLE_ERRORS_LABEL)
    );
    assert_eq!(info.nodes[1].label, "p");
}

#[tokio::test]
async fn total_failure_fails_the_request() {
    let explorer = ObjectExplorer::default();
    let primary = MockProvider::install(&explorer, "prov1");
    primary.set_mode(ExpandMode::Respond("login failed".to_string()));
    let session = explorer
        .create_session("prov1", &profile("c1", "prov1"))
        .await
        .unwrap();
    let mut events = explorer.subscribe();

    let err = explorer
        .expand_node("prov1", &session, "/root")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ExplorerError::AggregateExpansionFailure("login failed".to_string())
    );
    assert_eq!(
        events.recv().await.unwrap(),
        ExplorerEvent::NodesUpdated {
            connection_id: Some("c1".to_string()),
            error_message: Some("login failed".to_string()),
        }
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn merge_order_ignores_response_order(order in Just(vec![0usize, 1, 2]).prop_shuffle()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let merged = runtime.block_on(async move {
            let f = manual_fixture();
            let session = f
                .explorer
                .create_session("prov1", &profile("c1", "prov1"))
                .await
                .unwrap();
            let sid = session.session_id.clone();
            let explorer = f.explorer.clone();
            let expand =
                tokio::spawn(async move { explorer.expand_node("prov1", &session, "/root").await });
            f.primary.wait_for(CallKind::Expand, 1).await;
            f.a.wait_for(CallKind::Expand, 1).await;
            f.b.wait_for(CallKind::Expand, 1).await;

            for index in order {
                match index {
                    0 => f.primary.respond(&sid, "/root", vec![leaf("/root/p", "p")]),
                    1 => f.a.respond(&sid, "/root", vec![leaf("/root/a", "a")]),
                    _ => f.b.respond(&sid, "/root", vec![leaf("/root/b", "b")]),
                }
            }
            expand.await.unwrap().unwrap()
        });
        prop_assert_eq!(labels(&merged.nodes), vec!["p", "a", "b"]);
    }
}
