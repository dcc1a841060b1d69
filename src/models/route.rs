// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Planned route model.

use crate::models::GeoPoint;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Route about to be persisted. The store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRoute {
    pub name: String,
    pub owner_id: String,
    pub points: Vec<GeoPoint>,
    pub distance_km: f64,
    pub created_at: String,
}

/// Stored route record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "bindings/")
)]
pub struct Route {
    /// Document ID
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub points: Vec<GeoPoint>,
    /// Sum of the legs between consecutive points (km)
    pub distance_km: f64,
    /// ISO 8601
    pub created_at: String,
}

impl Route {
    pub fn from_new(id: String, new: NewRoute) -> Self {
        Self {
            id,
            name: new.name,
            owner_id: new.owner_id,
            points: new.points,
            distance_km: new.distance_km,
            created_at: new.created_at,
        }
    }
}
