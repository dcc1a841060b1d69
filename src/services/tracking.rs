// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Incremental path and distance accumulation for a recording session.

use crate::models::{Fix, GeoPoint, RideStats};
use crate::services::distance::haversine_km;
use chrono::{DateTime, Utc};

/// Running path and statistics fed one fix at a time.
#[derive(Debug, Clone, Default)]
pub struct TrackAccumulator {
    path: Vec<GeoPoint>,
    stats: RideStats,
    current_speed_mps: f64,
}

impl TrackAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fix and return the distance it added (km).
    ///
    /// The first fix only seeds the path. Later fixes add the leg from the
    /// previous point and replace the current speed (last sample wins).
    pub fn push(&mut self, fix: &Fix, started_at: DateTime<Utc>) -> f64 {
        let added = match self.path.last() {
            Some(last) => {
                let leg = haversine_km(*last, fix.point);
                self.stats.distance_km += leg;
                self.current_speed_mps = fix.speed_or_zero();
                leg
            }
            None => 0.0,
        };
        self.path.push(fix.point);
        self.set_elapsed(started_at, fix.timestamp);
        added
    }

    /// Update duration (and average speed) to `now - started_at`.
    pub fn set_elapsed(&mut self, started_at: DateTime<Utc>, now: DateTime<Utc>) {
        let elapsed_ms = (now - started_at).num_milliseconds().max(0);
        self.stats.duration_s = elapsed_ms as f64 / 1000.0;
        self.stats.refresh_average();
    }

    pub fn path(&self) -> &[GeoPoint] {
        &self.path
    }

    pub fn stats(&self) -> RideStats {
        self.stats
    }

    pub fn current_speed_mps(&self) -> f64 {
        self.current_speed_mps
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Drop the path and zero the stats.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fix(lat: f64, lon: f64, speed: Option<f64>, secs: i64) -> Fix {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        Fix::new(
            GeoPoint {
                latitude: lat,
                longitude: lon,
            },
            speed,
            t0 + chrono::Duration::seconds(secs),
        )
    }

    #[test]
    fn test_first_fix_seeds_path_only() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let mut track = TrackAccumulator::new();

        let added = track.push(&fix(19.0760, 72.8777, Some(4.0), 0), t0);

        assert_eq!(added, 0.0);
        assert_eq!(track.len(), 1);
        assert_eq!(track.stats().distance_km, 0.0);
        assert_eq!(track.current_speed_mps(), 0.0);
    }

    #[test]
    fn test_speed_is_last_sample() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let mut track = TrackAccumulator::new();

        track.push(&fix(19.0760, 72.8777, Some(4.0), 0), t0);
        track.push(&fix(19.0761, 72.8778, Some(12.5), 1), t0);
        assert_eq!(track.current_speed_mps(), 12.5);

        track.push(&fix(19.0762, 72.8779, None, 2), t0);
        assert_eq!(track.current_speed_mps(), 0.0);
        assert_eq!(track.stats().duration_s, 2.0);
    }

    #[test]
    fn test_elapsed_never_negative() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let mut track = TrackAccumulator::new();
        track.push(&fix(19.0760, 72.8777, None, -5), t0);
        assert_eq!(track.stats().duration_s, 0.0);
    }
}
