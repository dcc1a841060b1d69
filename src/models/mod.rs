// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod geo_point;
pub mod group;
pub mod ride;
pub mod route;

pub use geo_point::{Fix, GeoPoint};
pub use group::{Group, GroupLocation, RouteEndpoint};
pub use ride::{Comment, NewRide, Ride, RideStats};
pub use route::{NewRoute, Route};
