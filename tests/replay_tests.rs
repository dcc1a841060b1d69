// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end: a replayed fix log recorded, shared and saved.

use convoy_tracker::config::Config;
use convoy_tracker::db::{MemoryStore, Store};
use convoy_tracker::location::ReplayLocationProvider;
use convoy_tracker::services::distance::decode_path;
use convoy_tracker::services::SessionState;
use convoy_tracker::AppState;
use std::sync::Arc;

mod common;
use common::fix_at;

/// Twelve fixes, one per second, heading north roughly 110 m apart.
fn fix_log() -> String {
    (0..12)
        .map(|i| {
            let fix = fix_at(19.0760 + i as f64 * 0.001, 72.8777, 12.0, i);
            serde_json::to_string(&fix).unwrap()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test(start_paused = true)]
async fn test_replayed_ride_is_saved_and_shared() {
    let location = Arc::new(ReplayLocationProvider::from_json_lines(&fix_log(), 1.0).unwrap());
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let group = store.create_group("Sunday Riders").await.unwrap();

    let state = AppState::new(config.clone(), location.clone(), store.clone());

    state.group_tracker.join(&group.id).await.unwrap();
    state.recorder.start().await.unwrap();
    location.wait_finished().await;

    let snapshot = state.recorder.stop().await.unwrap();
    state.group_tracker.leave().await;

    assert_eq!(snapshot.state, SessionState::Stopped);
    assert_eq!(snapshot.path.len(), 12);
    assert!(snapshot.stats.distance_km > 1.1 && snapshot.stats.distance_km < 1.3);
    assert!(store.location_writes(&group.id, &config.user_id) >= 1);

    let ride = state.recorder.save("Marine Drive").await.unwrap();
    assert_eq!(ride.name, "Marine Drive");
    assert_eq!(ride.sport_type, "motorcycle");
    assert_eq!(ride.path, snapshot.path);

    let decoded = decode_path(ride.summary_polyline.as_deref().unwrap()).unwrap();
    assert_eq!(decoded.len(), 12);

    let feed = state.feed.recent(10).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].id, ride.id);
    assert_eq!(state.recorder.state().await, SessionState::Idle);
}
