//! Unit tests for the per-kind watch loop

use super::*;
use crate::test_utils::{FakeSource, Script, deployment, deployments_kind};
use change_detector::ObjectCache;
use hub_client::MockHubClient;
use serde_json::json;

fn engine(hub: &MockHubClient) -> Arc<ChangeEngine> {
    Arc::new(
        ChangeEngine::new(Arc::new(ObjectCache::unbounded()), "test-key")
            .with_hub(Arc::new(hub.clone())),
    )
}

fn watch_loop(source: FakeSource, engine: Arc<ChangeEngine>) -> WatchLoop<FakeSource> {
    WatchLoop::new(Arc::new(source), deployments_kind(), engine)
}

#[tokio::test]
async fn test_lifecycle_emits_only_relevant_change() {
    let hub = MockHubClient::new("hub:50051");
    let engine = engine(&hub);
    let source = FakeSource::default().script(
        "deployments",
        Script::Stream(vec![
            Ok(Notification::Added(deployment("web", "1", 1))),
            Ok(Notification::Modified(deployment("web", "2", 3))),
            // resource version bump only
            Ok(Notification::Modified(deployment("web", "3", 3))),
            Ok(Notification::Deleted(deployment("web", "4", 3))),
        ]),
    );

    let summary = watch_loop(source, engine.clone()).run("0").await.unwrap();

    assert_eq!(summary.notifications, 4);
    assert_eq!(summary.changes, 1);
    assert_eq!(summary.last_resource_version.as_deref(), Some("4"));
    assert!(!summary.ended_with_error);

    let sent = hub.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].namespace, "default");
    assert_eq!(sent[0].name, "web");
    assert_eq!(sent[0].event_type, "Modified");
    let data: Value = serde_json::from_slice(&sent[0].data).unwrap();
    assert_eq!(data, json!({"/spec/replicas": {"old": 1, "new": 3}}));

    assert!(engine.cache().is_empty());
}

#[tokio::test]
async fn test_status_only_change_is_not_dispatched() {
    let hub = MockHubClient::new("hub:50051");
    let engine = engine(&hub);
    let mut updated = deployment("web", "2", 1);
    updated["status"]["readyReplicas"] = json!(1);
    let source = FakeSource::default().script(
        "deployments",
        Script::Stream(vec![
            Ok(Notification::Added(deployment("web", "1", 1))),
            Ok(Notification::Modified(updated.clone())),
        ]),
    );

    let summary = watch_loop(source, engine.clone()).run("0").await.unwrap();

    assert_eq!(summary.changes, 0);
    assert!(hub.sent().is_empty());
    let cached = engine.cache().get("default/deployments/web").unwrap();
    assert_eq!(*cached, updated);
}

#[tokio::test]
async fn test_bad_items_do_not_stop_the_stream() {
    let hub = MockHubClient::new("hub:50051");
    let engine = engine(&hub);
    let source = FakeSource::default().script(
        "deployments",
        Script::Stream(vec![
            Ok(Notification::Added(deployment("web", "1", 1))),
            Err(ControllerError::Watch("undecodable frame".to_string())),
            Ok(Notification::Added(json!({"kind": "Deployment"}))),
            Ok(Notification::Modified(deployment("web", "2", 2))),
        ]),
    );

    let summary = watch_loop(source, engine).run("0").await.unwrap();

    assert_eq!(summary.notifications, 3);
    assert_eq!(summary.changes, 1);
    assert_eq!(hub.sent().len(), 1);
}

#[tokio::test]
async fn test_bookmark_and_error_events_are_tracked() {
    let hub = MockHubClient::new("hub:50051");
    let source = FakeSource::default().script(
        "deployments",
        Script::Stream(vec![
            Ok(Notification::Bookmark {
                resource_version: "42".to_string(),
            }),
            Ok(Notification::Error("too old resource version".to_string())),
        ]),
    );

    let summary = watch_loop(source, engine(&hub)).run("7").await.unwrap();

    assert_eq!(summary.notifications, 2);
    assert_eq!(summary.last_resource_version.as_deref(), Some("42"));
    assert!(summary.ended_with_error);
    assert!(hub.sent().is_empty());
}

#[tokio::test]
async fn test_open_failure_is_an_error() {
    let hub = MockHubClient::new("hub:50051");
    let source = FakeSource::default().script("deployments", Script::Fail("forbidden".to_string()));
    let watch_loop = watch_loop(source, engine(&hub));

    let err = watch_loop.run("0").await.unwrap_err();

    assert!(matches!(err, ControllerError::Watch(_)));
    assert!(err.to_string().contains("forbidden"));
    assert_eq!(
        watch_loop.source.opened(),
        vec![("deployments".to_string(), "0".to_string())]
    );
}

#[tokio::test]
async fn test_failed_delivery_keeps_watching() {
    let hub = MockHubClient::new("hub:50051").failing("unavailable");
    let engine = engine(&hub);
    let source = FakeSource::default().script(
        "deployments",
        Script::Stream(vec![
            Ok(Notification::Added(deployment("web", "1", 1))),
            Ok(Notification::Modified(deployment("web", "2", 2))),
            Ok(Notification::Modified(deployment("web", "3", 3))),
        ]),
    );

    let summary = watch_loop(source, engine.clone()).run("0").await.unwrap();

    assert_eq!(summary.changes, 2);
    assert_eq!(
        *engine.cache().get("default/deployments/web").unwrap(),
        deployment("web", "3", 3)
    );
}
