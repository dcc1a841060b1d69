// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Group and live member location models.

use crate::models::GeoPoint;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Named start or end point of a group ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "bindings/")
)]
pub struct RouteEndpoint {
    #[serde(default)]
    pub label: Option<String>,
    pub point: GeoPoint,
}

/// Group document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "bindings/")
)]
pub struct Group {
    /// Document ID
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub start_point: Option<RouteEndpoint>,
    #[serde(default)]
    pub end_point: Option<RouteEndpoint>,
    /// Last route edit (ISO 8601)
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Live position of one member within a group.
///
/// One row per (group, user), overwritten on every broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "bindings/")
)]
pub struct GroupLocation {
    pub group_id: String,
    pub user_id: String,
    pub display_name: String,
    pub point: GeoPoint,
    /// Reported speed (m/s)
    pub speed_mps: f64,
    /// ISO 8601
    pub updated_at: String,
}
