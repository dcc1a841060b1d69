// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Coordinates and location fixes.

use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A WGS84 coordinate. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "bindings/")
)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Build a point, rejecting non-finite or out-of-range coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let point = Self {
            latitude,
            longitude,
        };
        if point.is_valid() {
            Ok(point)
        } else {
            Err(AppError::Validation(format!(
                "Coordinate out of range: {}, {}",
                latitude, longitude
            )))
        }
    }

    /// Whether the point lies on the globe.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl From<GeoPoint> for geo::Coord<f64> {
    fn from(point: GeoPoint) -> Self {
        geo::Coord {
            x: point.longitude,
            y: point.latitude,
        }
    }
}

impl From<geo::Coord<f64>> for GeoPoint {
    fn from(coord: geo::Coord<f64>) -> Self {
        Self {
            latitude: coord.y,
            longitude: coord.x,
        }
    }
}

/// One location sample from the platform's positioning service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    #[serde(flatten)]
    pub point: GeoPoint,
    /// Instantaneous speed reported by the device (m/s), if any
    #[serde(default)]
    pub speed_mps: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Fix {
    pub fn new(point: GeoPoint, speed_mps: Option<f64>, timestamp: DateTime<Utc>) -> Self {
        Self {
            point,
            speed_mps,
            timestamp,
        }
    }

    /// Reported speed, with a missing reading counted as standing still.
    pub fn speed_or_zero(&self) -> f64 {
        self.speed_mps.filter(|s| s.is_finite()).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(GeoPoint::new(19.0760, 72.8777).is_ok());
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(90.5, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.1).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_fix_parses_flat_json() {
        let fix: Fix = serde_json::from_str(
            r#"{"latitude":19.076,"longitude":72.8777,"timestamp":"2024-01-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(fix.point.latitude, 19.076);
        assert_eq!(fix.speed_mps, None);
        assert_eq!(fix.speed_or_zero(), 0.0);
    }
}
