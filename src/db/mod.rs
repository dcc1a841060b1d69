//! Database layer.
//!
//! [`Store`] is the opaque realtime document store the app talks to.
//! [`FirestoreDb`] is the production backend; [`MemoryStore`] keeps
//! everything in process and pushes changes to subscribers immediately.

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::models::{Comment, Group, GroupLocation, NewRide, NewRoute, Ride, Route, RouteEndpoint};
use futures_util::stream::BoxStream;
use std::future::Future;

/// Collection names as constants.
pub mod collections {
    pub const RIDES: &str = "rides";
    pub const ROUTES: &str = "routes";
    pub const GROUPS: &str = "groups";
    /// Live member positions, keyed by `{group_id}:{user_id}`
    pub const GROUP_LOCATIONS: &str = "group_locations";
}

/// Document id of a member's live location row.
///
/// Both parts are url-encoded, which always escapes `:`, so distinct
/// (group, user) pairs never share an id.
pub fn group_location_doc_id(group_id: &str, user_id: &str) -> String {
    format!(
        "{}:{}",
        urlencoding::encode(group_id),
        urlencoding::encode(user_id)
    )
}

/// Live query results. Each item is the full current result set.
pub type Subscription<T> = BoxStream<'static, Result<Vec<T>>>;

/// Remote document store.
pub trait Store: Send + Sync + 'static {
    // ─── Rides ───────────────────────────────────────────────────

    /// Persist a ride under a freshly assigned id.
    fn create_ride(&self, ride: NewRide) -> impl Future<Output = Result<Ride>> + Send;

    fn get_ride(&self, ride_id: &str) -> impl Future<Output = Result<Option<Ride>>> + Send;

    /// Most recent rides first.
    fn list_rides(&self, limit: u32) -> impl Future<Output = Result<Vec<Ride>>> + Send;

    /// Increment a ride's kudos counter, returning the new count.
    fn add_kudos(&self, ride_id: &str) -> impl Future<Output = Result<u32>> + Send;

    /// Append a comment to a ride.
    fn add_comment(
        &self,
        ride_id: &str,
        comment: Comment,
    ) -> impl Future<Output = Result<Ride>> + Send;

    /// Live view of the `limit` most recent rides.
    fn subscribe_rides(&self, limit: u32) -> Subscription<Ride>;

    // ─── Routes ──────────────────────────────────────────────────

    fn create_route(&self, route: NewRoute) -> impl Future<Output = Result<Route>> + Send;

    fn get_route(&self, route_id: &str) -> impl Future<Output = Result<Option<Route>>> + Send;

    /// Most recent routes first.
    fn list_routes(&self, limit: u32) -> impl Future<Output = Result<Vec<Route>>> + Send;

    // ─── Groups ──────────────────────────────────────────────────

    fn create_group(&self, name: &str) -> impl Future<Output = Result<Group>> + Send;

    fn get_group(&self, group_id: &str) -> impl Future<Output = Result<Option<Group>>> + Send;

    /// Merge start/end points into a group document.
    fn set_group_route(
        &self,
        group_id: &str,
        start: RouteEndpoint,
        end: RouteEndpoint,
        updated_at: String,
    ) -> impl Future<Output = Result<Group>> + Send;

    // ─── Group Locations ─────────────────────────────────────────

    /// Overwrite the member's live row.
    fn upsert_group_location(
        &self,
        location: &GroupLocation,
    ) -> impl Future<Output = Result<()>> + Send;

    /// All live rows of a group, ordered by user id.
    fn list_group_locations(
        &self,
        group_id: &str,
    ) -> impl Future<Output = Result<Vec<GroupLocation>>> + Send;

    /// Live view of a group's member rows.
    fn subscribe_group_locations(&self, group_id: &str) -> Subscription<GroupLocation>;
}
