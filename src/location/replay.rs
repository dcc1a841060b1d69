// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location provider that replays a recorded fix log.
//!
//! The log is JSON lines, one [`Fix`] per line:
//! `{"latitude":19.076,"longitude":72.8777,"speed_mps":8.2,"timestamp":"2024-01-01T10:00:00Z"}`
//!
//! Fixes are filtered with the watch's minimum interval and displacement,
//! the way the platform positioning service throttles delivery. Delivered
//! fixes are restamped relative to when the watch started, so session
//! timing sees a live ride.

use super::{LocationProvider, PermissionStatus, WatchOptions};
use crate::error::{AppError, Result};
use crate::models::Fix;
use crate::services::distance::haversine_km;
use chrono::{DateTime, Utc};
use futures_util::stream::{BoxStream, StreamExt};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Slowest accepted replay rate. Lower values are raised to this.
pub const MIN_REPLAY_SPEEDUP: f64 = 0.01;

/// Replays fixes with their original spacing divided by `speedup`.
pub struct ReplayLocationProvider {
    fixes: Arc<Vec<Fix>>,
    speedup: f64,
    last_emitted: Arc<Mutex<Option<Fix>>>,
    finished: watch::Sender<bool>,
}

impl ReplayLocationProvider {
    /// Load a fix log from disk.
    pub fn load_from_file<P: AsRef<Path>>(path: P, speedup: f64) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref()).map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "Failed to read fix log {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json_lines(&data, speedup)
    }

    /// Parse a fix log. Blank lines are skipped.
    pub fn from_json_lines(data: &str, speedup: f64) -> Result<Self> {
        let fixes = data
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str::<Fix>(line).map_err(|e| {
                    AppError::Validation(format!("Invalid fix on line {}: {}", i + 1, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(count = fixes.len(), "Loaded fix log");
        Ok(Self::new(fixes, speedup))
    }

    pub fn new(fixes: Vec<Fix>, speedup: f64) -> Self {
        let (finished, _) = watch::channel(false);
        Self {
            fixes: Arc::new(fixes),
            speedup: if speedup.is_finite() && speedup > 0.0 {
                speedup.max(MIN_REPLAY_SPEEDUP)
            } else {
                1.0
            },
            last_emitted: Arc::new(Mutex::new(None)),
            finished,
        }
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    /// Resolve once a watch has delivered the whole log.
    pub async fn wait_finished(&self) {
        let mut rx = self.finished.subscribe();
        // The sender lives in self, so this only ends on completion.
        let _ = rx.wait_for(|done| *done).await;
    }
}

/// Whether `fix` passes the watch throttle relative to the last delivered fix.
fn passes_filter(last: Option<&Fix>, fix: &Fix, options: &WatchOptions) -> bool {
    let Some(last) = last else {
        return true;
    };
    let elapsed = (fix.timestamp - last.timestamp)
        .to_std()
        .unwrap_or(Duration::ZERO);
    let moved_m = haversine_km(last.point, fix.point) * 1000.0;
    elapsed >= options.min_interval && moved_m >= options.min_distance_m
}

struct ReplayCursor {
    fixes: Arc<Vec<Fix>>,
    next: usize,
    delivered: Option<Fix>,
    options: WatchOptions,
    speedup: f64,
    origin: DateTime<Utc>,
    first_logged: Option<DateTime<Utc>>,
    last_emitted: Arc<Mutex<Option<Fix>>>,
    finished: watch::Sender<bool>,
}

impl ReplayCursor {
    /// Map a logged timestamp onto the replay timeline.
    fn restamp(&mut self, mut fix: Fix) -> Fix {
        let first = *self.first_logged.get_or_insert(fix.timestamp);
        let offset_ms = (fix.timestamp - first).num_milliseconds() as f64 / self.speedup;
        fix.timestamp = self
            .origin
            .checked_add_signed(chrono::Duration::milliseconds(offset_ms as i64))
            .unwrap_or(fix.timestamp);
        fix
    }
}

impl LocationProvider for ReplayLocationProvider {
    async fn permission_status(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn request_permission(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn current_position(&self) -> Result<Fix> {
        let last = *self.last_emitted.lock().unwrap_or_else(|e| e.into_inner());
        last.or_else(|| self.fixes.first().copied())
            .ok_or_else(|| AppError::NotFound("Fix log is empty".to_string()))
    }

    fn watch_position(&self, options: WatchOptions) -> Result<BoxStream<'static, Fix>> {
        let cursor = ReplayCursor {
            fixes: self.fixes.clone(),
            next: 0,
            delivered: None,
            options,
            speedup: self.speedup,
            origin: Utc::now(),
            first_logged: None,
            last_emitted: self.last_emitted.clone(),
            finished: self.finished.clone(),
        };

        Ok(futures_util::stream::unfold(cursor, |mut cursor| async move {
            while let Some(fix) = cursor.fixes.get(cursor.next).copied() {
                cursor.next += 1;
                if !passes_filter(cursor.delivered.as_ref(), &fix, &cursor.options) {
                    continue;
                }
                if let Some(prev) = cursor.delivered {
                    let gap = (fix.timestamp - prev.timestamp)
                        .to_std()
                        .unwrap_or(Duration::ZERO);
                    tokio::time::sleep(gap.div_f64(cursor.speedup)).await;
                }
                cursor.delivered = Some(fix);
                let live = cursor.restamp(fix);
                *cursor.last_emitted.lock().unwrap_or_else(|e| e.into_inner()) = Some(live);
                return Some((live, cursor));
            }
            cursor.finished.send_replace(true);
            None
        })
        .boxed())
    }
}
