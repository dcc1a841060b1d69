// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod crash;
pub mod distance;
pub mod feed;
pub mod group;
pub mod recorder;
pub mod route_planner;
pub mod tracking;

pub use crash::{CrashDetector, SosOutcome};
pub use feed::FeedService;
pub use group::{GroupTracker, MemberLocations};
pub use recorder::{RideRecorder, RideSnapshot, SessionState};
pub use route_planner::{RouteDraft, RouteService};
pub use tracking::TrackAccumulator;
