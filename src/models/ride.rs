// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Recorded ride model for storage and the feed.

use crate::models::GeoPoint;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Sport type stamped on rides recorded by this app.
pub const DEFAULT_SPORT_TYPE: &str = "motorcycle";

/// Aggregate statistics for a ride.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "bindings/")
)]
pub struct RideStats {
    /// Accumulated great-circle distance (km)
    pub distance_km: f64,
    /// Elapsed session time (seconds)
    pub duration_s: f64,
    /// Average speed over the session (km/h)
    pub avg_speed_kmh: f64,
}

impl RideStats {
    /// Recompute the average speed from distance and duration.
    pub fn refresh_average(&mut self) {
        self.avg_speed_kmh = if self.duration_s > 0.0 {
            self.distance_km / (self.duration_s / 3600.0)
        } else {
            0.0
        };
    }
}

/// Comment attached to a ride in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "bindings/")
)]
pub struct Comment {
    pub user: String,
    pub text: String,
    /// ISO 8601
    pub created_at: String,
}

/// Ride about to be persisted. The store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRide {
    pub owner_id: String,
    pub name: String,
    pub sport_type: String,
    pub path: Vec<GeoPoint>,
    pub summary_polyline: Option<String>,
    pub stats: RideStats,
    pub created_at: String,
}

/// Stored ride record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "bindings/")
)]
pub struct Ride {
    /// Document ID
    pub id: String,
    /// Rider who recorded it
    pub owner_id: String,
    pub name: String,
    pub sport_type: String,
    /// Chronological fixes
    pub path: Vec<GeoPoint>,
    /// Path encoded as a Google polyline (precision 5)
    #[serde(default)]
    pub summary_polyline: Option<String>,
    pub stats: RideStats,
    /// When the ride was saved (ISO 8601)
    pub created_at: String,
    #[serde(default)]
    pub kudos: u32,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Ride {
    /// Materialize a new ride under the given document id.
    pub fn from_new(id: String, new: NewRide) -> Self {
        Self {
            id,
            owner_id: new.owner_id,
            name: new.name,
            sport_type: new.sport_type,
            path: new.path,
            summary_polyline: new.summary_polyline,
            stats: new.stats,
            created_at: new.created_at,
            kudos: 0,
            comments: Vec::new(),
        }
    }
}
