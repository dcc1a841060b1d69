// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Convoy: ride recording and live group tracking.
//!
//! This crate provides the core behind the Convoy riding app: GPS ride
//! recording with Haversine distance accumulation, live location sharing
//! within groups, plus the feed and route operations, all against a
//! realtime document store.

pub mod config;
pub mod db;
pub mod error;
pub mod location;
pub mod models;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Store;
use location::LocationProvider;
use services::{FeedService, GroupTracker, RideRecorder, RouteService};
use std::sync::Arc;

/// Shared application state for one signed-in rider.
pub struct AppState<L, S> {
    pub config: Config,
    pub recorder: RideRecorder<L, S>,
    pub group_tracker: GroupTracker<L, S>,
    pub feed: FeedService<S>,
    pub routes: RouteService<S>,
}

impl<L: LocationProvider, S: Store> AppState<L, S> {
    /// Wire every service to the same location provider and store.
    pub fn new(config: Config, location: Arc<L>, store: Arc<S>) -> Self {
        let recorder = RideRecorder::new(config.user_id.clone(), location.clone(), store.clone())
            .with_watch_options(config.watch_options());
        let group_tracker = GroupTracker::new(
            config.user_id.clone(),
            config.display_name.clone(),
            location,
            store.clone(),
        )
        .with_broadcast_interval(config.group_broadcast_interval);

        Self {
            recorder,
            group_tracker,
            feed: FeedService::new(store.clone()),
            routes: RouteService::new(store),
            config,
        }
    }
}
