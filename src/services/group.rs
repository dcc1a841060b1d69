// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live location sharing within a group.
//!
//! While a group is active two tasks run:
//! - broadcast: every interval, upsert this rider's position (if
//!   permission is granted)
//! - subscription: mirror the other members' rows into a watch channel
//!
//! Both are torn down on `leave`, on joining another group, and when the
//! tracker is dropped.

use crate::db::{Store, Subscription};
use crate::error::{AppError, Result};
use crate::location::{LocationProvider, PermissionStatus};
use crate::models::GroupLocation;
use crate::time_utils::{format_utc_rfc3339, Clock, SystemClock};
use futures_util::StreamExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

/// Default broadcast period.
pub const DEFAULT_BROADCAST_INTERVAL: Duration = Duration::from_secs(5);

/// Other members' latest rows, keyed by user id.
pub type MemberLocations = BTreeMap<String, GroupLocation>;

struct ActiveGroup {
    group_id: String,
    broadcast: JoinHandle<()>,
    subscription: JoinHandle<()>,
}

impl ActiveGroup {
    fn abort(&self) {
        self.broadcast.abort();
        self.subscription.abort();
    }

    /// Abort both tasks and wait until they are gone.
    async fn shutdown(self) {
        self.abort();
        let _ = self.broadcast.await;
        let _ = self.subscription.await;
    }
}

/// Shares this rider's position with one group at a time.
pub struct GroupTracker<L, S> {
    user_id: String,
    display_name: String,
    location: Arc<L>,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    broadcast_interval: Duration,
    active: Mutex<Option<ActiveGroup>>,
    members: Arc<watch::Sender<MemberLocations>>,
}

impl<L: LocationProvider, S: Store> GroupTracker<L, S> {
    pub fn new(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        location: Arc<L>,
        store: Arc<S>,
    ) -> Self {
        let (members, _) = watch::channel(MemberLocations::new());
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            location,
            store,
            clock: Arc::new(SystemClock),
            broadcast_interval: DEFAULT_BROADCAST_INTERVAL,
            active: Mutex::new(None),
            members: Arc::new(members),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_broadcast_interval(mut self, interval: Duration) -> Self {
        self.broadcast_interval = interval;
        self
    }

    /// Live view of the other members' locations.
    pub fn subscribe(&self) -> watch::Receiver<MemberLocations> {
        self.members.subscribe()
    }

    /// Current other members' locations.
    pub fn members(&self) -> MemberLocations {
        self.members.borrow().clone()
    }

    pub async fn active_group(&self) -> Option<String> {
        self.active.lock().await.as_ref().map(|g| g.group_id.clone())
    }

    /// Start sharing with `group_id`, leaving any other active group.
    pub async fn join(&self, group_id: &str) -> Result<()> {
        if group_id.trim().is_empty() {
            return Err(AppError::Validation("Group id is required".to_string()));
        }

        let mut active = self.active.lock().await;
        if active.as_ref().is_some_and(|g| g.group_id == group_id) {
            return Ok(());
        }
        if let Some(previous) = active.take() {
            tracing::info!(group_id = %previous.group_id, "Leaving group to join another");
            previous.shutdown().await;
            self.members.send_replace(MemberLocations::new());
        }

        let broadcaster = Broadcaster {
            group_id: group_id.to_string(),
            user_id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            location: self.location.clone(),
            store: self.store.clone(),
            clock: self.clock.clone(),
        };
        let broadcast = tokio::spawn(broadcaster.run(self.broadcast_interval));

        let rows = self.store.subscribe_group_locations(group_id);
        let subscription = tokio::spawn(mirror_members(
            rows,
            group_id.to_string(),
            self.user_id.clone(),
            self.members.clone(),
        ));

        *active = Some(ActiveGroup {
            group_id: group_id.to_string(),
            broadcast,
            subscription,
        });

        tracing::info!(
            group_id,
            user_id = %self.user_id,
            interval_ms = self.broadcast_interval.as_millis() as u64,
            "Joined group"
        );
        Ok(())
    }

    /// Stop sharing. No broadcast or member update happens after this returns.
    pub async fn leave(&self) {
        let Some(active) = self.active.lock().await.take() else {
            return;
        };
        let group_id = active.group_id.clone();
        active.shutdown().await;
        self.members.send_replace(MemberLocations::new());
        tracing::info!(group_id = %group_id, user_id = %self.user_id, "Left group");
    }
}

impl<L, S> Drop for GroupTracker<L, S> {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().as_ref() {
            active.abort();
        }
    }
}

/// Write side of an active group.
struct Broadcaster<L, S> {
    group_id: String,
    user_id: String,
    display_name: String,
    location: Arc<L>,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<L: LocationProvider, S: Store> Broadcaster<L, S> {
    async fn run(self, period: Duration) {
        // First write one full period after joining.
        let mut ticker = interval_at(Instant::now() + period, period);
        loop {
            ticker.tick().await;
            match self.broadcast_once().await {
                Ok(true) => {}
                Ok(false) => tracing::debug!(
                    group_id = %self.group_id,
                    "Location permission not granted, skipping broadcast"
                ),
                Err(e) => tracing::warn!(
                    group_id = %self.group_id,
                    error = %e,
                    "Failed to broadcast group location"
                ),
            }
        }
    }

    /// Upsert the current position. Returns `false` when permission is missing.
    async fn broadcast_once(&self) -> Result<bool> {
        if self.location.permission_status().await != PermissionStatus::Granted {
            return Ok(false);
        }
        let fix = self.location.current_position().await?;
        let row = GroupLocation {
            group_id: self.group_id.clone(),
            user_id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            point: fix.point,
            speed_mps: fix.speed_or_zero(),
            updated_at: format_utc_rfc3339(self.clock.now()),
        };
        self.store.upsert_group_location(&row).await?;
        tracing::trace!(group_id = %self.group_id, "Group location broadcast");
        Ok(true)
    }
}

/// Read side of an active group: replace the member map on every snapshot.
async fn mirror_members(
    mut rows: Subscription<GroupLocation>,
    group_id: String,
    user_id: String,
    members: Arc<watch::Sender<MemberLocations>>,
) {
    while let Some(result) = rows.next().await {
        match result {
            Ok(rows) => {
                let others: MemberLocations = rows
                    .into_iter()
                    .filter(|row| row.user_id != user_id)
                    .map(|row| (row.user_id.clone(), row))
                    .collect();
                tracing::debug!(group_id = %group_id, members = others.len(), "Group locations updated");
                members.send_replace(others);
            }
            Err(e) => {
                tracing::warn!(group_id = %group_id, error = %e, "Group location subscription error");
            }
        }
    }
}
