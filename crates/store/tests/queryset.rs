mod common;

use std::sync::Arc;

use kubeset_core::Error;
use kubeset_kubehub::MockClusterApi;
use kubeset_schema::KindDeclaration;
use kubeset_search::Q;
use kubeset_store::{GetOutcome, RecordStore};

use common::{pod_schema, pods, session};

async fn pod_store() -> (Arc<MockClusterApi>, RecordStore) {
    let api = Arc::new(
        MockClusterApi::new()
            .with_definition("io.k8s.api.core.v1.Pod", pod_schema())
            .with_items("pods", None, pods()),
    );
    let objects = session(&api).objects(KindDeclaration::new("Pod")).await.unwrap();
    (api, objects.query())
}

fn names(store: &RecordStore) -> Vec<String> {
    store.cached().unwrap_or_default().iter().map(|r| r.name.clone()).collect()
}

#[tokio::test]
async fn fetches_once_and_derives_from_cache() {
    let (api, mut store) = pod_store().await;
    assert!(!store.is_fetched());
    assert_eq!(store.count().await.unwrap(), 3);
    assert!(store.is_fetched());
    assert_eq!(store.fetch_report().operation, "list_pod_for_all_namespaces");

    let mut default = store.filter(&Q::new("namespace", "default")).await.unwrap();
    let myapp = default.filter(&Q::new("labels__app", "myapp")).await.unwrap();
    assert_eq!(names(&myapp), vec!["pod1", "pod3"]);
    assert_eq!(api.list_calls().len(), 1);
    // the source keeps its full cache
    assert_eq!(store.cached().map(|c| c.len()), Some(3));
}

#[tokio::test]
async fn scenario_negation_ordering_and_get() {
    let (_api, mut store) = pod_store().await;
    let not_system = store.filter(&!Q::new("namespace", "kube-system")).await.unwrap();
    assert_eq!(names(&not_system), vec!["pod1", "pod3"]);

    let ordered = store.order_by(&["labels__app", "name"]).await.unwrap();
    assert_eq!(names(&ordered), vec!["pod1", "pod3", "pod2"]);

    let outcome = store.get(&Q::new("namespace", "default")).await.unwrap();
    assert_eq!(outcome, GetOutcome::Ambiguous(2));
    match outcome.into_result("Pod") {
        Err(Error::MultipleResults { count, .. }) => assert_eq!(count, 2),
        other => panic!("unexpected {other:?}"),
    }

    let none = store.get(&Q::new("name", "pod9")).await.unwrap();
    assert!(matches!(none.into_result("Pod"), Err(Error::NotFound { .. })));

    let one = store.get(&Q::new("name", "pod2")).await.unwrap().into_result("Pod").unwrap();
    assert_eq!(one.namespace.as_deref(), Some("kube-system"));
}

#[tokio::test]
async fn and_tree_equals_sequential_filters() {
    let (_api, mut store) = pod_store().await;
    let tree = store.filter(&(Q::new("labels__env", "prod") & Q::new("namespace", "default"))).await.unwrap();
    let mut step = store.filter(&Q::new("labels__env", "prod")).await.unwrap();
    let seq = step.filter(&Q::new("namespace", "default")).await.unwrap();
    assert_eq!(names(&tree), names(&seq));

    let excluded = store.exclude(&Q::new("labels__env", "prod")).await.unwrap();
    assert_eq!(names(&excluded), vec!["pod3"]);
}

#[tokio::test]
async fn clone_fresh_and_indexing() {
    let (api, mut store) = pod_store().await;
    let mut clone = store.clone();
    assert!(!clone.is_fetched());

    store.fetch().await.unwrap();
    let mut cached_clone = store.clone();
    assert!(cached_clone.is_fetched());
    assert_eq!(cached_clone.at(1).await.unwrap().unwrap().name, "pod2");
    assert!(cached_clone.at(5).await.unwrap().is_none());
    assert_eq!(cached_clone.slice(1..10).await.unwrap().len(), 2);
    assert_eq!(api.list_calls().len(), 1);

    let mut fresh = store.fresh();
    assert!(!fresh.is_fetched());
    assert!(fresh.exists().await.unwrap());
    assert_eq!(api.list_calls().len(), 2);

    assert_eq!(clone.len().await.unwrap(), 3);
    let all = clone.all().await.unwrap().into_records().await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(api.list_calls().len(), 3);
}

#[tokio::test]
async fn empty_order_by_keeps_order() {
    let (_api, mut store) = pod_store().await;
    let ordered = store.order_by::<&str>(&[]).await.unwrap();
    assert_eq!(names(&ordered), vec!["pod1", "pod2", "pod3"]);
}

#[tokio::test]
async fn equality_follows_cached_contents() {
    let (_api, mut store) = pod_store().await;
    assert_eq!(store, store.fresh());
    let all = store.all().await.unwrap();
    assert_eq!(all, store.clone());
    assert_ne!(all, store.fresh());
    let reversed = store.order_by(&["-name"]).await.unwrap();
    assert_ne!(all, reversed);
}

#[tokio::test]
async fn schema_timestamps_compare_as_time() {
    let event_schema = serde_json::json!({"properties": {
        "metadata": {"type": "object"},
        "reason": {"type": "string"},
        "lastTimestamp": {"type": "string", "format": "date-time"}
    }});
    let event = |name: &str, at: &str| {
        serde_json::json!({"metadata": {"name": name, "namespace": "default"}, "reason": "Pulled", "lastTimestamp": at})
    };
    let api = Arc::new(
        MockClusterApi::new()
            .with_definition("io.k8s.api.core.v1.Event", event_schema)
            .with_items("events", None, vec![event("e1", "2024-05-01T10:00:00Z"), event("e2", "2024-05-01T09:00:00-02:00")]),
    );
    let mut store = session(&api).objects(KindDeclaration::new("Event")).await.unwrap().query();

    let later = store.filter(&Q::new("lastTimestamp__gt", "2024-05-01T10:30:00Z")).await.unwrap();
    assert_eq!(names(&later), vec!["e2"]);

    let at_ten = store.filter(&Q::new("lastTimestamp", "2024-05-01T10:00:00+00:00")).await.unwrap();
    assert_eq!(names(&at_ten), vec!["e1"]);

    let newest_first = store.order_by(&["-lastTimestamp"]).await.unwrap();
    assert_eq!(names(&newest_first), vec!["e2", "e1"]);
}
