// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Every write bumps a change counter; subscriptions re-read their query
//! whenever it moves, giving the same push semantics as a realtime
//! backend without a network.

use super::{group_location_doc_id, Store, Subscription};
use crate::error::{AppError, Result};
use crate::models::{Comment, Group, GroupLocation, NewRide, NewRoute, Ride, Route, RouteEndpoint};
use dashmap::DashMap;
use futures_util::{stream, StreamExt};
use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// In-memory store. Clones share the same data.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    rides: DashMap<String, Ride>,
    routes: DashMap<String, Route>,
    groups: DashMap<String, Group>,
    group_locations: DashMap<String, GroupLocation>,
    /// Upsert count per group location document
    location_writes: DashMap<String, usize>,
    changes: watch::Sender<u64>,
    fail_writes: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                rides: DashMap::new(),
                routes: DashMap::new(),
                groups: DashMap::new(),
                group_locations: DashMap::new(),
                location_writes: DashMap::new(),
                changes,
                fail_writes: AtomicBool::new(false),
            }),
        }
    }

    /// Make every subsequent write fail with a database error.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of upserts to one member's location row.
    pub fn location_writes(&self, group_id: &str, user_id: &str) -> usize {
        self.inner
            .location_writes
            .get(&group_location_doc_id(group_id, user_id))
            .map(|count| *count)
            .unwrap_or(0)
    }

    /// Total rides stored.
    pub fn ride_count(&self) -> usize {
        self.inner.rides.len()
    }

    /// Number of open subscriptions.
    pub fn live_subscriptions(&self) -> usize {
        self.inner.changes.receiver_count()
    }

    fn check_writable(&self) -> Result<()> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("Write rejected (simulated outage)".to_string()));
        }
        Ok(())
    }

    fn notify(&self) {
        self.inner.changes.send_modify(|version| *version += 1);
    }

    fn recent_rides(&self, limit: u32) -> Vec<Ride> {
        let mut rides: Vec<Ride> = self.inner.rides.iter().map(|r| r.value().clone()).collect();
        rides.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rides.truncate(limit as usize);
        rides
    }

    fn group_rows(&self, group_id: &str) -> Vec<GroupLocation> {
        let mut rows: Vec<GroupLocation> = self
            .inner
            .group_locations
            .iter()
            .filter(|row| row.group_id == group_id)
            .map(|row| row.value().clone())
            .collect();
        rows.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        rows
    }

    /// Stream `query` now and again after every change.
    fn subscribe<T, F>(&self, query: F) -> Subscription<T>
    where
        T: Send + 'static,
        F: Fn(&MemoryStore) -> Vec<T> + Send + Sync + 'static,
    {
        let rx = self.inner.changes.subscribe();
        // Hold only a weak handle so an open subscription does not keep the store alive.
        let store = Arc::downgrade(&self.inner);
        stream::unfold((store, rx, query, true), |(store, mut rx, query, first)| async move {
            if !first {
                rx.changed().await.ok()?;
            }
            let inner = store.upgrade()?;
            let rows = query(&MemoryStore { inner });
            Some((Ok(rows), (store, rx, query, false)))
        })
        .boxed()
    }
}

impl Store for MemoryStore {
    async fn create_ride(&self, ride: NewRide) -> Result<Ride> {
        self.check_writable()?;
        let ride = Ride::from_new(uuid::Uuid::new_v4().to_string(), ride);
        self.inner.rides.insert(ride.id.clone(), ride.clone());
        self.notify();
        Ok(ride)
    }

    async fn get_ride(&self, ride_id: &str) -> Result<Option<Ride>> {
        Ok(self.inner.rides.get(ride_id).map(|r| r.value().clone()))
    }

    async fn list_rides(&self, limit: u32) -> Result<Vec<Ride>> {
        Ok(self.recent_rides(limit))
    }

    async fn add_kudos(&self, ride_id: &str) -> Result<u32> {
        self.check_writable()?;
        let kudos = {
            let mut ride = self
                .inner
                .rides
                .get_mut(ride_id)
                .ok_or_else(|| AppError::NotFound(format!("Ride {} not found", ride_id)))?;
            ride.kudos += 1;
            ride.kudos
        };
        self.notify();
        Ok(kudos)
    }

    async fn add_comment(&self, ride_id: &str, comment: Comment) -> Result<Ride> {
        self.check_writable()?;
        let ride = {
            let mut ride = self
                .inner
                .rides
                .get_mut(ride_id)
                .ok_or_else(|| AppError::NotFound(format!("Ride {} not found", ride_id)))?;
            ride.comments.push(comment);
            ride.clone()
        };
        self.notify();
        Ok(ride)
    }

    fn subscribe_rides(&self, limit: u32) -> Subscription<Ride> {
        self.subscribe(move |store| store.recent_rides(limit))
    }

    async fn create_route(&self, route: NewRoute) -> Result<Route> {
        self.check_writable()?;
        let route = Route::from_new(uuid::Uuid::new_v4().to_string(), route);
        self.inner.routes.insert(route.id.clone(), route.clone());
        self.notify();
        Ok(route)
    }

    async fn get_route(&self, route_id: &str) -> Result<Option<Route>> {
        Ok(self.inner.routes.get(route_id).map(|r| r.value().clone()))
    }

    async fn list_routes(&self, limit: u32) -> Result<Vec<Route>> {
        let mut routes: Vec<Route> = self.inner.routes.iter().map(|r| r.value().clone()).collect();
        routes.sort_by_key(|r| Reverse(r.created_at.clone()));
        routes.truncate(limit as usize);
        Ok(routes)
    }

    async fn create_group(&self, name: &str) -> Result<Group> {
        self.check_writable()?;
        let group = Group {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            start_point: None,
            end_point: None,
            updated_at: None,
        };
        self.inner.groups.insert(group.id.clone(), group.clone());
        self.notify();
        Ok(group)
    }

    async fn get_group(&self, group_id: &str) -> Result<Option<Group>> {
        Ok(self.inner.groups.get(group_id).map(|g| g.value().clone()))
    }

    async fn set_group_route(
        &self,
        group_id: &str,
        start: RouteEndpoint,
        end: RouteEndpoint,
        updated_at: String,
    ) -> Result<Group> {
        self.check_writable()?;
        let group = {
            let mut group = self
                .inner
                .groups
                .get_mut(group_id)
                .ok_or_else(|| AppError::NotFound(format!("Group {} not found", group_id)))?;
            group.start_point = Some(start);
            group.end_point = Some(end);
            group.updated_at = Some(updated_at);
            group.clone()
        };
        self.notify();
        Ok(group)
    }

    async fn upsert_group_location(&self, location: &GroupLocation) -> Result<()> {
        self.check_writable()?;
        let doc_id = group_location_doc_id(&location.group_id, &location.user_id);
        self.inner
            .group_locations
            .insert(doc_id.clone(), location.clone());
        *self.inner.location_writes.entry(doc_id).or_insert(0) += 1;
        self.notify();
        Ok(())
    }

    async fn list_group_locations(&self, group_id: &str) -> Result<Vec<GroupLocation>> {
        Ok(self.group_rows(group_id))
    }

    fn subscribe_group_locations(&self, group_id: &str) -> Subscription<GroupLocation> {
        let group_id = group_id.to_string();
        self.subscribe(move |store| store.group_rows(&group_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoPoint, RideStats};

    fn new_ride(name: &str, created_at: &str) -> NewRide {
        NewRide {
            owner_id: "u1".to_string(),
            name: name.to_string(),
            sport_type: "motorcycle".to_string(),
            path: vec![],
            summary_polyline: None,
            stats: RideStats::default(),
            created_at: created_at.to_string(),
        }
    }

    #[tokio::test]
    async fn test_rides_listed_newest_first() {
        let store = MemoryStore::new();
        store
            .create_ride(new_ride("old", "2024-01-01T10:00:00.000Z"))
            .await
            .unwrap();
        store
            .create_ride(new_ride("new", "2024-01-02T10:00:00.000Z"))
            .await
            .unwrap();

        let rides = store.list_rides(10).await.unwrap();
        assert_eq!(rides[0].name, "new");
        assert_eq!(rides[1].name, "old");
        assert_eq!(store.list_rides(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_subscription_pushes_changes() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe_group_locations("g1");

        let initial = sub.next().await.unwrap().unwrap();
        assert!(initial.is_empty());

        let location = GroupLocation {
            group_id: "g1".to_string(),
            user_id: "u2".to_string(),
            display_name: "Rider 2".to_string(),
            point: GeoPoint {
                latitude: 19.0,
                longitude: 72.0,
            },
            speed_mps: 3.0,
            updated_at: "2024-01-01T10:00:00.000Z".to_string(),
        };
        store.upsert_group_location(&location).await.unwrap();
        store.upsert_group_location(&location).await.unwrap();

        let rows = sub.next().await.unwrap().unwrap();
        assert_eq!(rows, vec![location]);
        assert_eq!(store.location_writes("g1", "u2"), 2);

        assert_eq!(store.live_subscriptions(), 1);
        drop(sub);
        assert_eq!(store.live_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_underscored_ids_keep_separate_rows() {
        let store = MemoryStore::new();
        let row = |group_id: &str, user_id: &str| GroupLocation {
            group_id: group_id.to_string(),
            user_id: user_id.to_string(),
            display_name: user_id.to_string(),
            point: GeoPoint {
                latitude: 19.0,
                longitude: 72.0,
            },
            speed_mps: 0.0,
            updated_at: "2024-01-01T10:00:00.000Z".to_string(),
        };

        store.upsert_group_location(&row("a_b", "c")).await.unwrap();
        store.upsert_group_location(&row("a", "b_c")).await.unwrap();

        assert_eq!(store.list_group_locations("a_b").await.unwrap().len(), 1);
        assert_eq!(store.list_group_locations("a").await.unwrap().len(), 1);
        assert_eq!(store.location_writes("a_b", "c"), 1);
        assert_eq!(store.location_writes("a", "b_c"), 1);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_store_untouched() {
        let store = MemoryStore::new();
        store.fail_writes(true);
        let err = store
            .create_ride(new_ride("r", "2024-01-01T10:00:00.000Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(store.ride_count(), 0);
    }
}
