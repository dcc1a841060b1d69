// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route drawing and persistence.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{GeoPoint, Group, NewRoute, Route, RouteEndpoint};
use crate::services::distance::path_distance_km;
use crate::time_utils::{format_utc_rfc3339, Clock, SystemClock};
use std::sync::Arc;

/// Number of routes shown on the home screen.
pub const RECENT_ROUTES: u32 = 3;

/// Route being drawn point by point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteDraft {
    pub name: String,
    points: Vec<GeoPoint>,
}

impl RouteDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Append a tapped point.
    pub fn add_point(&mut self, point: GeoPoint) -> Result<()> {
        if !point.is_valid() {
            return Err(AppError::Validation("Point is off the map.".to_string()));
        }
        self.points.push(point);
        Ok(())
    }

    /// Remove the last point, if any.
    pub fn undo(&mut self) -> Option<GeoPoint> {
        self.points.pop()
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn distance_km(&self) -> f64 {
        path_distance_km(&self.points)
    }
}

pub struct RouteService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: Store> RouteService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate and persist a drawn route.
    pub async fn save(&self, owner_id: &str, draft: &RouteDraft) -> Result<Route> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Please name your route.".to_string()));
        }
        if draft.points.len() < 2 {
            return Err(AppError::Validation(
                "Tap on the map to add at least 2 points.".to_string(),
            ));
        }

        let route = self
            .store
            .create_route(NewRoute {
                name: name.to_string(),
                owner_id: owner_id.to_string(),
                points: draft.points.clone(),
                distance_km: draft.distance_km(),
                created_at: format_utc_rfc3339(self.clock.now()),
            })
            .await?;

        tracing::info!(
            route_id = %route.id,
            points = route.points.len(),
            distance_km = route.distance_km,
            "Route saved"
        );
        Ok(route)
    }

    /// Most recent routes first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<Route>> {
        self.store.list_routes(limit).await
    }

    pub async fn get(&self, route_id: &str) -> Result<Route> {
        self.store
            .get_route(route_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Route {} not found", route_id)))
    }

    /// Set where a group ride starts and ends.
    pub async fn set_group_endpoints(
        &self,
        group_id: &str,
        start: RouteEndpoint,
        end: RouteEndpoint,
    ) -> Result<Group> {
        if !start.point.is_valid() || !end.point.is_valid() {
            return Err(AppError::Validation(
                "Start and end points must be on the map.".to_string(),
            ));
        }
        let group = self
            .store
            .set_group_route(group_id, start, end, format_utc_rfc3339(self.clock.now()))
            .await?;
        tracing::info!(group_id, "Group route updated");
        Ok(group)
    }
}
