// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Great-circle distance and path encoding.

use crate::error::{AppError, Result};
use crate::models::GeoPoint;
use geo::LineString;

/// Mean Earth radius used for all ride and route distances (km).
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points in kilometers.
///
/// Inputs are not range checked; see [`GeoPoint::new`].
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Sum of consecutive pairwise distances along a path (km).
pub fn path_distance_km(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_km(pair[0], pair[1]))
        .sum()
}

/// Convert a path to a line string (x = longitude, y = latitude).
pub fn to_line_string(points: &[GeoPoint]) -> LineString<f64> {
    points
        .iter()
        .map(|p| geo::Coord::from(*p))
        .collect::<Vec<_>>()
        .into()
}

/// Encode a path as a Google polyline (precision 5).
pub fn encode_path(points: &[GeoPoint]) -> Result<String> {
    polyline::encode_coordinates(to_line_string(points), 5)
        .map_err(|e| AppError::Validation(format!("Failed to encode polyline: {}", e)))
}

/// Decode a Google polyline (precision 5) into a path.
pub fn decode_path(encoded: &str) -> Result<Vec<GeoPoint>> {
    let line = polyline::decode_polyline(encoded, 5)
        .map_err(|e| AppError::Validation(format!("Failed to decode polyline: {}", e)))?;
    Ok(line.0.into_iter().map(GeoPoint::from).collect())
}
