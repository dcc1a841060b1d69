// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ride recording session.
//!
//! Handles the recording workflow:
//! 1. Check (or request) location permission
//! 2. Watch position fixes and accumulate the path and stats
//! 3. Stop: unregister the watch and finalize the duration
//! 4. Save: validate and persist the ride, then clear the buffer
//!
//! Stop is final for a session; there is no pause state. A new `start`
//! begins a fresh session with an empty buffer.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::location::{LocationProvider, PermissionStatus, WatchOptions};
use crate::models::ride::DEFAULT_SPORT_TYPE;
use crate::models::{Fix, GeoPoint, NewRide, Ride, RideStats};
use crate::services::distance::encode_path;
use crate::services::tracking::TrackAccumulator;
use crate::time_utils::{format_utc_rfc3339, Clock, SystemClock};
use chrono::{DateTime, Utc};
use futures_util::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// Name used when a ride is saved without one.
pub const DEFAULT_RIDE_NAME: &str = "My Motorbike Ride";

/// Minimum number of fixes a ride needs to be saved.
pub const MIN_RIDE_POINTS: usize = 2;

/// Recording session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Stopped,
}

/// Point-in-time view of the session, republished after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct RideSnapshot {
    pub state: SessionState,
    pub path: Vec<GeoPoint>,
    pub stats: RideStats,
    pub current_speed_mps: f64,
}

struct Session {
    state: SessionState,
    track: TrackAccumulator,
    started_at: Option<DateTime<Utc>>,
}

impl Session {
    fn snapshot(&self) -> RideSnapshot {
        RideSnapshot {
            state: self.state,
            path: self.track.path().to_vec(),
            stats: self.track.stats(),
            current_speed_mps: self.track.current_speed_mps(),
        }
    }

    fn clear(&mut self) {
        self.state = SessionState::Idle;
        self.track.clear();
        self.started_at = None;
    }
}

/// Records one rider's sessions against a location provider and a store.
pub struct RideRecorder<L, S> {
    owner_id: String,
    location: Arc<L>,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    watch_options: WatchOptions,
    session: Arc<Mutex<Session>>,
    /// Kept outside `session` so drop can always reach it.
    sampler: std::sync::Mutex<Option<JoinHandle<()>>>,
    updates: Arc<watch::Sender<RideSnapshot>>,
}

impl<L: LocationProvider, S: Store> RideRecorder<L, S> {
    pub fn new(owner_id: impl Into<String>, location: Arc<L>, store: Arc<S>) -> Self {
        let session = Session {
            state: SessionState::Idle,
            track: TrackAccumulator::new(),
            started_at: None,
        };
        let (updates, _) = watch::channel(session.snapshot());
        Self {
            owner_id: owner_id.into(),
            location,
            store,
            clock: Arc::new(SystemClock),
            watch_options: WatchOptions::default(),
            session: Arc::new(Mutex::new(session)),
            sampler: std::sync::Mutex::new(None),
            updates: Arc::new(updates),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_watch_options(mut self, options: WatchOptions) -> Self {
        self.watch_options = options;
        self
    }

    /// Live session updates.
    pub fn subscribe(&self) -> watch::Receiver<RideSnapshot> {
        self.updates.subscribe()
    }

    pub async fn snapshot(&self) -> RideSnapshot {
        self.session.lock().await.snapshot()
    }

    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state
    }

    /// Begin a new recording session.
    ///
    /// Fails with `PermissionDenied` if location access is not granted;
    /// nothing is started in that case.
    pub async fn start(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.state == SessionState::Recording {
            return Err(AppError::InvalidState("Already recording".to_string()));
        }

        let mut status = self.location.permission_status().await;
        if status == PermissionStatus::Undetermined {
            status = self.location.request_permission().await;
        }
        if status != PermissionStatus::Granted {
            tracing::warn!(owner_id = %self.owner_id, ?status, "Location permission not granted");
            return Err(AppError::PermissionDenied);
        }

        let fixes = self.location.watch_position(self.watch_options)?;
        let started_at = self.clock.now();

        session.clear();
        session.state = SessionState::Recording;
        session.started_at = Some(started_at);
        let sampler = tokio::spawn(run_sampler(
            fixes,
            self.session.clone(),
            self.updates.clone(),
        ));
        if let Some(stale) = self.lock_sampler().replace(sampler) {
            stale.abort();
        }
        self.updates.send_replace(session.snapshot());

        tracing::info!(
            owner_id = %self.owner_id,
            started_at = %format_utc_rfc3339(started_at),
            "Recording started"
        );
        Ok(())
    }

    /// Stop recording.
    ///
    /// When this returns the location watch is gone and no later fix can
    /// change the path.
    pub async fn stop(&self) -> Result<RideSnapshot> {
        let (sampler, snapshot) = {
            let mut session = self.session.lock().await;
            match session.state {
                SessionState::Idle => {
                    return Err(AppError::InvalidState("Not recording".to_string()))
                }
                SessionState::Stopped => return Ok(session.snapshot()),
                SessionState::Recording => {}
            }

            session.state = SessionState::Stopped;
            if let Some(started_at) = session.started_at {
                let now = self.clock.now();
                session.track.set_elapsed(started_at, now);
            }
            let sampler = self.lock_sampler().take();
            (sampler, session.snapshot())
        };

        if let Some(sampler) = sampler {
            sampler.abort();
            // Ends once the task (and its location stream) has been dropped.
            let _ = sampler.await;
        }
        self.updates.send_replace(snapshot.clone());

        tracing::info!(
            owner_id = %self.owner_id,
            points = snapshot.path.len(),
            distance_km = snapshot.stats.distance_km,
            duration_s = snapshot.stats.duration_s,
            "Recording stopped"
        );
        Ok(snapshot)
    }

    /// Persist the stopped session as a ride.
    ///
    /// Rides with fewer than two fixes are rejected without touching the
    /// store. On a store failure the buffer is kept as is.
    pub async fn save(&self, name: &str) -> Result<Ride> {
        let mut session = self.session.lock().await;
        if session.state == SessionState::Recording {
            return Err(AppError::InvalidState(
                "Stop recording before saving".to_string(),
            ));
        }
        if session.track.len() < MIN_RIDE_POINTS {
            tracing::debug!(
                owner_id = %self.owner_id,
                points = session.track.len(),
                "Ride too short to save"
            );
            return Err(AppError::Validation("Ride is too short to save.".to_string()));
        }

        let path = session.track.path().to_vec();
        let summary_polyline = match encode_path(&path) {
            Ok(encoded) => Some(encoded),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode ride polyline");
                None
            }
        };
        let name = match name.trim() {
            "" => DEFAULT_RIDE_NAME,
            trimmed => trimmed,
        };

        let new_ride = NewRide {
            owner_id: self.owner_id.clone(),
            name: name.to_string(),
            sport_type: DEFAULT_SPORT_TYPE.to_string(),
            path,
            summary_polyline,
            stats: session.track.stats(),
            created_at: format_utc_rfc3339(self.clock.now()),
        };

        let ride = match self.store.create_ride(new_ride).await {
            Ok(ride) => ride,
            Err(e) => {
                tracing::error!(owner_id = %self.owner_id, error = %e, "Error saving ride");
                return Err(e);
            }
        };

        session.clear();
        self.updates.send_replace(session.snapshot());

        tracing::info!(
            ride_id = %ride.id,
            owner_id = %ride.owner_id,
            points = ride.path.len(),
            distance_km = ride.stats.distance_km,
            "Ride saved"
        );
        Ok(ride)
    }

    /// Discard a stopped session and return to idle.
    pub async fn reset(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.state == SessionState::Recording {
            return Err(AppError::InvalidState(
                "Stop recording before discarding".to_string(),
            ));
        }
        session.clear();
        self.updates.send_replace(session.snapshot());
        Ok(())
    }
}

impl<L, S> RideRecorder<L, S> {
    fn lock_sampler(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.sampler.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<L, S> Drop for RideRecorder<L, S> {
    fn drop(&mut self) {
        let sampler = self.sampler.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(sampler) = sampler.take() {
            sampler.abort();
        }
    }
}

/// Apply fixes from the watch until the session leaves `Recording`.
async fn run_sampler(
    mut fixes: BoxStream<'static, Fix>,
    session: Arc<Mutex<Session>>,
    updates: Arc<watch::Sender<RideSnapshot>>,
) {
    while let Some(fix) = fixes.next().await {
        let mut session = session.lock().await;
        if session.state != SessionState::Recording {
            break;
        }
        let Some(started_at) = session.started_at else {
            break;
        };
        if !fix.point.is_valid() {
            tracing::warn!(
                latitude = fix.point.latitude,
                longitude = fix.point.longitude,
                "Dropping fix with invalid coordinates"
            );
            continue;
        }

        let added_km = session.track.push(&fix, started_at);
        tracing::trace!(
            points = session.track.len(),
            added_km,
            speed_mps = session.track.current_speed_mps(),
            "Fix recorded"
        );
        updates.send_replace(session.snapshot());
    }
    tracing::debug!("Location watch ended");
}
