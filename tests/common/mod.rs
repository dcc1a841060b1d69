// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{DateTime, TimeZone, Utc};
use convoy_tracker::db::{FirestoreDb, MemoryStore};
use convoy_tracker::location::ManualLocationProvider;
use convoy_tracker::models::{Fix, GeoPoint};
use convoy_tracker::services::{RideRecorder, RideSnapshot};
use convoy_tracker::time_utils::ManualClock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Session start used by every test clock.
#[allow(dead_code)]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
}

/// Fix at `secs` seconds after `t0()`.
#[allow(dead_code)]
pub fn fix_at(latitude: f64, longitude: f64, speed_mps: f64, secs: i64) -> Fix {
    Fix::new(
        GeoPoint::new(latitude, longitude).expect("valid test coordinate"),
        Some(speed_mps),
        t0() + chrono::Duration::seconds(secs),
    )
}

/// Recorder wired to in-memory collaborators.
#[allow(dead_code)]
pub struct RecorderHarness {
    pub location: Arc<ManualLocationProvider>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub recorder: RideRecorder<ManualLocationProvider, MemoryStore>,
    pub updates: watch::Receiver<RideSnapshot>,
}

#[allow(dead_code)]
pub fn recorder_harness(location: ManualLocationProvider) -> RecorderHarness {
    let location = Arc::new(location);
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let recorder = RideRecorder::new("rider_1", location.clone(), store.clone())
        .with_clock(clock.clone());
    let updates = recorder.subscribe();
    RecorderHarness {
        location,
        store,
        clock,
        recorder,
        updates,
    }
}

impl RecorderHarness {
    /// Push a fix and wait for the recorder to apply it.
    #[allow(dead_code)]
    pub async fn feed(&mut self, fix: Fix) -> RideSnapshot {
        let _ = self.updates.borrow_and_update();
        self.location.push_fix(fix);
        tokio::time::timeout(Duration::from_secs(5), self.updates.changed())
            .await
            .expect("recorder did not apply the fix")
            .expect("recorder dropped");
        self.updates.borrow_and_update().clone()
    }
}
