//! List and map cache objects.

mod common;

use std::collections::HashMap;

use common::{Cluster, eventually, json, key};
use strata_cache::{CacheError, ReplicationPolicy};

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn test_list_operations() {
    let cluster = Cluster::new();
    let ctx = cluster.instance();
    let friends = ctx.list(key("user", "friends", "u1"), ReplicationPolicy::Sync, json::<String>());

    assert!(friends.is_empty().await);
    friends.add("a".to_string()).await;
    friends.add("b".to_string()).await;
    friends.add("c".to_string()).await;

    assert_eq!(friends.size().await, 3);
    assert_eq!(friends.get(1).await.as_deref(), Some("b"));
    assert_eq!(friends.get(7).await, None);
    assert!(friends.contains(&"c".to_string()).await);

    assert!(friends.remove(&"b".to_string()).await);
    assert!(!friends.remove(&"zz".to_string()).await);
    assert_eq!(friends.set(0, "x".to_string()).await.unwrap(), "a");
    assert!(matches!(
        friends.set(5, "y".to_string()).await,
        Err(CacheError::IndexOutOfBounds { index: 5, len: 2 })
    ));
    assert_eq!(*friends.get_all().await, names(&["x", "c"]));

    ctx.wait_idle().await;
    assert_eq!(
        cluster.cache.value("user.friends.u1").as_deref(),
        Some(r#"["x","c"]"#)
    );

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_snapshots_do_not_see_later_writes() {
    let cluster = Cluster::new();
    let ctx = cluster.instance();
    let friends = ctx.list(key("user", "friends", "u1"), ReplicationPolicy::Sync, json::<String>());

    friends.replace_all(names(&["a", "b"])).await;
    let snapshot = friends.get_all().await;
    friends.add("c".to_string()).await;
    friends.set(0, "z".to_string()).await.unwrap();

    assert_eq!(*snapshot, names(&["a", "b"]));
    assert_eq!(*friends.get_all().await, names(&["z", "b", "c"]));

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_emptied_list_is_deleted() {
    let cluster = Cluster::new();
    let ctx = cluster.instance();
    let friends = ctx.list(key("user", "friends", "u1"), ReplicationPolicy::Both, json::<String>());

    friends.add("a".to_string()).await;
    ctx.wait_idle().await;
    assert!(cluster.cache.value("user.friends.u1").is_some());

    friends.remove(&"a".to_string()).await;
    ctx.wait_idle().await;
    assert_eq!(cluster.cache.value("user.friends.u1"), None);
    assert_eq!(cluster.cache.calls().del, 1);
    let doc = cluster.store.document("user", "u1").unwrap();
    assert!(!doc.contains_key("friends"));

    friends.add("b".to_string()).await;
    friends.clear().await;
    assert!(friends.is_empty().await);

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_unchanged_list_is_not_written() {
    let cluster = Cluster::new();
    let ctx = cluster.instance();
    let friends = ctx.list(key("user", "friends", "u1"), ReplicationPolicy::Sync, json::<String>());

    friends.add("a".to_string()).await;
    ctx.wait_idle().await;
    let calls = cluster.cache.calls();

    assert!(!friends.remove(&"missing".to_string()).await);
    assert!(friends.set(3, "b".to_string()).await.is_err());
    ctx.wait_idle().await;
    assert_eq!(cluster.cache.calls(), calls);

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_map_operations() {
    let cluster = Cluster::new();
    let ctx = cluster.instance();
    let inventory = ctx.map(
        key("user", "inventory", "u1"),
        ReplicationPolicy::Both,
        json::<String>(),
        json::<u32>(),
    );

    assert_eq!(inventory.put("sword".to_string(), 1).await, None);
    assert_eq!(inventory.put("sword".to_string(), 3).await, Some(1));
    assert_eq!(inventory.get(&"sword".to_string()).await, Some(3));
    assert!(inventory.contains_key(&"sword".to_string()).await);
    assert!(inventory.contains_value(&3).await);
    assert!(!inventory.contains_value(&1).await);
    assert_eq!(inventory.size().await, 1);

    ctx.wait_idle().await;
    assert_eq!(
        cluster.cache.value("user.inventory.u1").as_deref(),
        Some(r#"{"sword":3}"#)
    );
    let doc = cluster.store.document("user", "u1").unwrap();
    assert_eq!(
        strata_storage::field_value(&doc, "inventory"),
        Some(r#"{"sword":3}"#)
    );

    assert_eq!(inventory.remove(&"sword".to_string()).await, Some(3));
    assert_eq!(inventory.remove(&"sword".to_string()).await, None);
    assert!(inventory.is_empty().await);

    ctx.wait_idle().await;
    assert_eq!(cluster.cache.value("user.inventory.u1"), None);

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_map_with_numeric_keys() {
    let cluster = Cluster::new();
    let ctx = cluster.instance();
    let scores = ctx.map(
        key("user", "scores", "u1"),
        ReplicationPolicy::Sync,
        json::<u32>(),
        json::<i64>(),
    );

    scores.replace_all(HashMap::from([(1, -5)])).await;
    ctx.wait_idle().await;
    assert_eq!(cluster.cache.value("user.scores.u1").as_deref(), Some(r#"{"1":-5}"#));

    let peer = cluster.instance();
    let peer_scores = peer.map(
        key("user", "scores", "u1"),
        ReplicationPolicy::Sync,
        json::<u32>(),
        json::<i64>(),
    );
    assert_eq!(peer_scores.get(&1).await, Some(-5));

    ctx.shutdown().await;
    peer.shutdown().await;
}

#[tokio::test]
async fn test_mutation_refreshes_stale_base() {
    let cluster = Cluster::new();
    let a = cluster.started_instance().await;
    let b = cluster.started_instance().await;

    let friends_a = a.list(key("user", "friends", "u1"), ReplicationPolicy::Sync, json::<String>());
    let friends_b = b.list(key("user", "friends", "u1"), ReplicationPolicy::Sync, json::<String>());

    assert!(friends_b.is_empty().await);
    friends_a.replace_all(names(&["ann", "bob"])).await;
    a.wait_idle().await;
    assert!(eventually(|| !friends_b.is_fresh()).await);

    friends_b.add("cat".to_string()).await;
    assert_eq!(*friends_b.get_all().await, names(&["ann", "bob", "cat"]));

    b.wait_idle().await;
    assert!(eventually(|| !friends_a.is_fresh()).await);
    assert_eq!(*friends_a.get_all().await, names(&["ann", "bob", "cat"]));

    a.shutdown().await;
    b.shutdown().await;
}
