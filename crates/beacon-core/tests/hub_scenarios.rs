//! End-to-end hub behaviour against a scripted push server and in-memory
//! storage.

use beacon_core::{BeaconConfig, ConnectionStatus, FeedView, NotificationHub, StaticToken, AUTH_REQUIRED, CONNECTION_ERROR};
use beacon_model::NotificationId;
use beacon_store::{KeyValueStorage, MemoryStorage, SnapshotStore};
use beacon_test_utils::{item, scripted};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

fn config() -> BeaconConfig {
    let mut config = BeaconConfig::new().with_api_base_url("http://crm.test/api");
    config.reconnect_delay_ms = 1_000;
    config.max_reconnect_delay_ms = 8_000;
    config
}

fn storage_with(items: Vec<beacon_model::NotificationItem>) -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    SnapshotStore::with_default_key(storage.clone()).save(&items);
    storage
}

fn stored_ids(storage: &Arc<MemoryStorage>) -> Vec<i64> {
    let storage: Arc<dyn KeyValueStorage> = storage.clone();
    SnapshotStore::with_default_key(storage)
        .load()
        .notifications
        .iter()
        .map(|n| n.id.0)
        .collect()
}

fn ids(view: &FeedView) -> Vec<i64> {
    view.notifications.iter().map(|n| n.id.0).collect()
}

async fn wait_until(views: &mut watch::Receiver<FeedView>, pred: impl FnMut(&FeedView) -> bool) -> FeedView {
    tokio::time::timeout(Duration::from_secs(300), views.wait_for(pred))
        .await
        .expect("timed out waiting for hub view")
        .expect("hub dropped")
        .clone()
}

#[tokio::test(start_paused = true)]
async fn hydrates_before_connecting() {
    let storage = storage_with(vec![item(1, "stored", 10), item(2, "stored too", 20)]);
    let (connector, mut server) = scripted();

    let hub = NotificationHub::mount(&config(), storage, connector, &StaticToken::new("secret"));

    let view = hub.view();
    assert_eq!(ids(&view), vec![2, 1]);
    assert_eq!(view.unread_count, 2);
    assert!(!view.is_connected);

    let _session = server.accept().await;
    let view = wait_until(&mut hub.subscribe(), |v| v.is_connected).await;
    assert_eq!(view.status, ConnectionStatus::Connected);
    assert_eq!(view.last_error, None);
    assert_eq!(server.urls(), vec!["ws://crm.test/ws/notifications?token=secret".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn live_update_replaces_entry_with_same_id() {
    let storage = storage_with(Vec::new());
    let (connector, mut server) = scripted();
    let hub = NotificationHub::mount(&config(), storage.clone(), connector, &StaticToken::new("t"));
    let mut views = hub.subscribe();

    let session = server.accept().await;
    session.push(1, "T1", 10);
    wait_until(&mut views, |v| v.notifications.len() == 1).await;

    session.push(1, "T1-updated", 11);
    let view = wait_until(&mut views, |v| v.notifications.first().is_some_and(|n| n.title == "T1-updated")).await;

    assert_eq!(ids(&view), vec![1]);
    assert_eq!(view.unread_count, 1);
    assert_eq!(stored_ids(&storage), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn push_past_capacity_evicts_oldest() {
    let storage = storage_with((1..=50).map(|id| item(id, "old", id)).collect());
    let (connector, mut server) = scripted();
    let hub = NotificationHub::mount(&config(), storage.clone(), connector, &StaticToken::new("t"));
    let mut views = hub.subscribe();
    assert_eq!(hub.view().notifications.len(), 50);

    let session = server.accept().await;
    session.push(51, "newest", 100);
    let view = wait_until(&mut views, |v| v.notifications.first().is_some_and(|n| n.id.0 == 51)).await;

    assert_eq!(view.notifications.len(), 50);
    assert!(!ids(&view).contains(&1));
    assert_eq!(view.unread_count, 50);
    assert_eq!(stored_ids(&storage).len(), 50);
}

#[tokio::test(start_paused = true)]
async fn redelivery_after_reconnect_does_not_duplicate() {
    let (connector, mut server) = scripted();
    let hub = NotificationHub::mount(&config(), storage_with(Vec::new()), connector, &StaticToken::new("t"));
    let mut views = hub.subscribe();

    let first = server.accept().await;
    first.push(7, "once", 10);
    wait_until(&mut views, |v| v.notifications.len() == 1).await;

    first.close();
    wait_until(&mut views, |v| !v.is_connected).await;

    let second = server.accept().await;
    wait_until(&mut views, |v| v.is_connected).await;
    second.push(7, "once", 10);
    second.push(8, "twice", 11);

    let view = wait_until(&mut views, |v| v.notifications.len() == 2).await;
    assert_eq!(ids(&view), vec![8, 7]);
}

#[tokio::test(start_paused = true)]
async fn malformed_frames_leave_the_list_alone() {
    let storage = storage_with(vec![item(1, "kept", 1)]);
    let (connector, mut server) = scripted();
    let hub = NotificationHub::mount(&config(), storage, connector, &StaticToken::new("t"));
    let mut views = hub.subscribe();

    let session = server.accept().await;
    session.send_text("{not json");
    session.send_json(serde_json::json!({ "type": "notification", "data": { "title": "no id" } }));
    session.send_json(serde_json::json!({ "type": "typing", "user": 3 }));
    session.push(2, "after", 2);

    let view = wait_until(&mut views, |v| v.notifications.len() == 2).await;
    assert_eq!(ids(&view), vec![2, 1]);
    assert!(view.is_connected);
}

#[tokio::test(start_paused = true)]
async fn missing_token_reports_auth_required_and_never_connects() {
    let storage = storage_with(vec![item(1, "cached", 1)]);
    let (connector, server) = scripted();

    let hub = NotificationHub::mount(&config(), storage, connector, &StaticToken::none());
    tokio::time::sleep(Duration::from_secs(60)).await;

    let view = hub.view();
    assert_eq!(view.status, ConnectionStatus::AuthRequired);
    assert_eq!(view.last_error.as_deref(), Some(AUTH_REQUIRED));
    assert_eq!(ids(&view), vec![1]);
    assert_eq!(server.attempts(), 0);

    hub.reconnect();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(server.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn refused_connection_shows_error_then_recovers() {
    let (connector, mut server) = scripted();
    server.refuse_connections(true);
    let hub = NotificationHub::mount(&config(), storage_with(Vec::new()), connector, &StaticToken::new("t"));
    let mut views = hub.subscribe();

    let view = wait_until(&mut views, |v| v.status == ConnectionStatus::Error).await;
    assert_eq!(view.last_error.as_deref(), Some(CONNECTION_ERROR));

    server.refuse_connections(false);
    let _session = server.accept().await;
    let view = wait_until(&mut views, |v| v.is_connected).await;
    assert_eq!(view.last_error, None);
}

#[tokio::test(start_paused = true)]
async fn actions_persist_across_remounts() {
    let storage = storage_with(vec![item(1, "a", 1), item(2, "b", 2), item(3, "c", 3)]);
    let (connector, _server) = scripted();
    let hub = NotificationHub::mount(&config(), storage.clone(), connector, &StaticToken::none());

    assert!(hub.mark_as_read(NotificationId(2)));
    assert!(!hub.mark_as_read(NotificationId(2)));
    assert_eq!(hub.unread_count(), 2);
    hub.unmount();

    let remounted = NotificationHub::detached(&config(), storage.clone());
    assert_eq!(remounted.unread_count(), 2);
    assert_eq!(remounted.mark_all_as_read(), 2);

    remounted.clear_notifications();
    assert!(remounted.view().notifications.is_empty());
    assert!(NotificationHub::detached(&config(), storage).notifications().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unmount_closes_the_connection_and_stops_updates() {
    let storage = storage_with(Vec::new());
    let (connector, mut server) = scripted();
    let hub = NotificationHub::mount(&config(), storage.clone(), connector, &StaticToken::new("t"));
    let mut views = hub.subscribe();

    let session = server.accept().await;
    wait_until(&mut views, |v| v.is_connected).await;

    hub.unmount();
    let view = hub.view();
    assert_eq!(view.status, ConnectionStatus::Disconnected);
    assert!(!view.is_connected);

    hub.unmount();
    session.closed().await;
    session.push(5, "too late", 5);
    tokio::time::sleep(Duration::from_secs(60)).await;

    let view = hub.view();
    assert_eq!(view.status, ConnectionStatus::Disconnected);
    assert!(!view.is_connected && !view.is_connecting);
    assert!(!hub.is_connected());
    assert!(hub.notifications().is_empty());
    assert!(stored_ids(&storage).is_empty());
    assert_eq!(server.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn unreadable_snapshot_hydrates_empty() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set(beacon_store::DEFAULT_STORAGE_KEY, "{{{ definitely not json").unwrap();
    let (connector, _server) = scripted();

    let hub = NotificationHub::mount(&config(), storage, connector, &StaticToken::none());

    assert!(hub.notifications().is_empty());
    assert_eq!(hub.unread_count(), 0);
}
