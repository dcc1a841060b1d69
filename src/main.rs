// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Convoy ride replay driver.
//!
//! Replays a recorded fix log through the ride recorder, optionally
//! sharing the position with a group, and saves the ride to Firestore.

use convoy_tracker::{
    config::Config, db::FirestoreDb, location::ReplayLocationProvider, AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(user_id = %config.user_id, "Starting Convoy tracker");

    let replay_file = config
        .replay_file
        .clone()
        .ok_or("REPLAY_FILE must point at a fix log")?;
    let ride_name = replay_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .replace(['_', '-'], " ");

    // Load the fix log
    tracing::info!(path = %replay_file.display(), "Loading fix log");
    let location = Arc::new(ReplayLocationProvider::load_from_file(
        &replay_file,
        config.replay_speedup,
    )?);

    // Initialize Firestore database
    let store = Arc::new(
        FirestoreDb::new(&config.gcp_project_id)
            .await?
            .with_poll_interval(config.subscription_poll_interval),
    );

    let state = AppState::new(config.clone(), location.clone(), store);

    if let Some(group_id) = &config.group_id {
        state.group_tracker.join(group_id).await?;
    }

    state.recorder.start().await?;
    location.wait_finished().await;
    let snapshot = state.recorder.stop().await?;
    state.group_tracker.leave().await;

    tracing::info!(
        points = snapshot.path.len(),
        distance_km = snapshot.stats.distance_km,
        avg_speed_kmh = snapshot.stats.avg_speed_kmh,
        "Replay finished"
    );

    match state.recorder.save(&ride_name).await {
        Ok(ride) => {
            tracing::info!(ride_id = %ride.id, "Ride saved to your feed");
            Ok(())
        }
        Err(e) => {
            let alert = e.alert();
            tracing::error!(title = %alert.title, message = %alert.message, "Ride not saved");
            Err(e.into())
        }
    }
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("convoy_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
