// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Device location providers.
//!
//! The recorder and group tracker only see [`LocationProvider`]; the
//! implementation is picked per execution environment at startup:
//! - [`ManualLocationProvider`]: fixes pushed by code (simulators, tests)
//! - [`ReplayLocationProvider`]: replays a recorded fix log

pub mod manual;
pub mod replay;

pub use manual::ManualLocationProvider;
pub use replay::ReplayLocationProvider;

use crate::error::Result;
use crate::models::Fix;
use futures_util::stream::BoxStream;
use std::future::Future;
use std::time::Duration;

/// Foreground location permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

/// Requested positioning accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accuracy {
    Balanced,
    #[default]
    High,
}

/// Parameters for a position watch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    pub accuracy: Accuracy,
    /// Minimum time between delivered fixes
    pub min_interval: Duration,
    /// Minimum displacement between delivered fixes (meters)
    pub min_distance_m: f64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::High,
            min_interval: Duration::from_secs(1),
            min_distance_m: 5.0,
        }
    }
}

/// Platform positioning service.
///
/// A watch is a stream of fixes; dropping the stream unregisters it.
pub trait LocationProvider: Send + Sync + 'static {
    fn permission_status(&self) -> impl Future<Output = PermissionStatus> + Send;

    fn request_permission(&self) -> impl Future<Output = PermissionStatus> + Send;

    /// One-shot position fetch.
    fn current_position(&self) -> impl Future<Output = Result<Fix>> + Send;

    /// Subscribe to position changes.
    fn watch_position(&self, options: WatchOptions) -> Result<BoxStream<'static, Fix>>;
}
