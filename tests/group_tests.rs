// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Group broadcast and member subscription tests.
//!
//! These run on paused tokio time so the broadcast interval is exact.

use convoy_tracker::db::{MemoryStore, Store};
use convoy_tracker::error::AppError;
use convoy_tracker::location::{ManualLocationProvider, PermissionStatus};
use convoy_tracker::models::{GeoPoint, GroupLocation};
use convoy_tracker::services::GroupTracker;
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::fix_at;

const GROUP: &str = "group_g";
const ME: &str = "rider_me";

fn tracker(
    location: ManualLocationProvider,
) -> (
    GroupTracker<ManualLocationProvider, MemoryStore>,
    Arc<ManualLocationProvider>,
    Arc<MemoryStore>,
) {
    let location = Arc::new(location);
    location.set_position(fix_at(19.0760, 72.8777, 4.0, 0));
    let store = Arc::new(MemoryStore::new());
    let tracker = GroupTracker::new(ME, "Me", location.clone(), store.clone());
    (tracker, location, store)
}

fn member_row(user_id: &str, latitude: f64) -> GroupLocation {
    GroupLocation {
        group_id: GROUP.to_string(),
        user_id: user_id.to_string(),
        display_name: user_id.to_string(),
        point: GeoPoint {
            latitude,
            longitude: 72.8777,
        },
        speed_mps: 0.0,
        updated_at: "2024-01-01T10:00:00.000Z".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_broadcast_every_five_seconds() {
    let (tracker, _location, store) = tracker(ManualLocationProvider::granted());

    tracker.join(GROUP).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20_500)).await;

    assert_eq!(store.location_writes(GROUP, ME), 4);

    let rows = store.list_group_locations(GROUP).await.unwrap();
    assert_eq!(rows.len(), 1, "one live row per member, never appended");
    assert_eq!(rows[0].user_id, ME);
    assert_eq!(rows[0].speed_mps, 4.0);
}

#[tokio::test(start_paused = true)]
async fn test_no_first_write_before_one_period() {
    let (tracker, _location, store) = tracker(ManualLocationProvider::granted());

    tracker.join(GROUP).await.unwrap();
    tokio::time::sleep(Duration::from_millis(4_900)).await;

    assert_eq!(store.location_writes(GROUP, ME), 0);
}

#[tokio::test(start_paused = true)]
async fn test_broadcast_overwrites_with_latest_position() {
    let (tracker, location, store) = tracker(ManualLocationProvider::granted());

    tracker.join(GROUP).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5_500)).await;
    location.set_position(fix_at(19.0900, 72.8777, 11.0, 5));
    tokio::time::sleep(Duration::from_secs(5)).await;

    let rows = store.list_group_locations(GROUP).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].point.latitude, 19.0900);
    assert_eq!(rows[0].speed_mps, 11.0);
}

#[tokio::test(start_paused = true)]
async fn test_no_writes_without_permission() {
    let (tracker, location, store) = tracker(ManualLocationProvider::granted());

    tracker.join(GROUP).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(store.location_writes(GROUP, ME), 2);

    location.set_permission(PermissionStatus::Denied);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(store.location_writes(GROUP, ME), 2);

    // The loop keeps running and resumes once access is back.
    location.set_permission(PermissionStatus::Granted);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(store.location_writes(GROUP, ME), 3);
}

#[tokio::test(start_paused = true)]
async fn test_leave_stops_timer_and_subscription() {
    let (tracker, _location, store) = tracker(ManualLocationProvider::granted());

    tracker.join(GROUP).await.unwrap();
    assert_eq!(store.live_subscriptions(), 1);
    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(store.location_writes(GROUP, ME), 2);

    tracker.leave().await;

    assert_eq!(tracker.active_group().await, None);
    assert_eq!(store.live_subscriptions(), 0);

    store.upsert_group_location(&member_row("rider_b", 19.1)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(store.location_writes(GROUP, ME), 2);
    assert!(tracker.members().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_members_exclude_own_row() {
    let (tracker, _location, store) = tracker(ManualLocationProvider::granted());
    store.upsert_group_location(&member_row("rider_b", 19.1)).await.unwrap();

    let mut members = tracker.subscribe();
    tracker.join(GROUP).await.unwrap();

    members.changed().await.unwrap();
    assert_eq!(
        members.borrow_and_update().keys().cloned().collect::<Vec<_>>(),
        vec!["rider_b".to_string()]
    );

    // Our own broadcast lands in the store but never in the member map.
    tokio::time::sleep(Duration::from_millis(5_500)).await;
    assert_eq!(store.location_writes(GROUP, ME), 1);
    let current = tracker.members();
    assert_eq!(current.len(), 1);
    assert!(!current.contains_key(ME));

    // Remote changes replace the snapshot.
    store.upsert_group_location(&member_row("rider_c", 19.2)).await.unwrap();
    store.upsert_group_location(&member_row("rider_b", 19.3)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let current = tracker.members();
    assert_eq!(current.len(), 2);
    assert_eq!(current["rider_b"].point.latitude, 19.3);
}

#[tokio::test(start_paused = true)]
async fn test_joining_another_group_leaves_the_first() {
    let (tracker, _location, store) = tracker(ManualLocationProvider::granted());

    tracker.join(GROUP).await.unwrap();
    tracker.join(GROUP).await.unwrap();
    assert_eq!(store.live_subscriptions(), 1);

    tracker.join("group_h").await.unwrap();
    assert_eq!(tracker.active_group().await.as_deref(), Some("group_h"));
    assert_eq!(store.live_subscriptions(), 1);

    tokio::time::sleep(Duration::from_millis(5_500)).await;
    assert_eq!(store.location_writes(GROUP, ME), 0);
    assert_eq!(store.location_writes("group_h", ME), 1);
}

#[tokio::test(start_paused = true)]
async fn test_drop_tears_down_tasks() {
    let (tracker, _location, store) = tracker(ManualLocationProvider::granted());
    tracker.join(GROUP).await.unwrap();

    drop(tracker);
    tokio::time::sleep(Duration::from_secs(20)).await;

    assert_eq!(store.location_writes(GROUP, ME), 0);
    assert_eq!(store.live_subscriptions(), 0);
}

#[tokio::test]
async fn test_join_requires_group_id() {
    let (tracker, _location, _store) = tracker(ManualLocationProvider::granted());
    assert!(matches!(
        tracker.join("  ").await,
        Err(AppError::Validation(_))
    ));
}
