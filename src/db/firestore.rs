// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Rides (recorded sessions, kudos and comments)
//! - Routes (planned paths)
//! - Groups (route endpoints)
//! - Group locations (one live row per member)
//!
//! Subscriptions re-run their query on a fixed interval and emit only
//! when the result set changes.

use super::{collections, group_location_doc_id, Store, Subscription};
use crate::error::AppError;
use crate::models::{Comment, Group, GroupLocation, NewRide, NewRoute, Ride, Route, RouteEndpoint};
use firestore::errors::FirestoreError;
use firestore::{FirestoreConsistencySelector, FirestoreQueryDirection};
use futures_util::{stream, StreamExt};
use std::future::Future;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Attempts for a contended read-modify-write before giving up.
const MAX_TRANSACTION_ATTEMPTS: u32 = 8;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
    poll_interval: Duration,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            client: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set how often subscriptions re-query.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Read-Modify-Write ───────────────────────────────────────

    /// Apply `modify` to a stored ride inside a transaction.
    ///
    /// The ride is read through the transaction, so a concurrent writer
    /// aborts one side and that side is retried against fresh data.
    async fn modify_ride<F>(&self, ride_id: &str, modify: F) -> Result<Ride, AppError>
    where
        F: Fn(&mut Ride) + Send + Sync,
    {
        let client = self.get_client()?;

        let mut attempt = 1;
        loop {
            match try_modify_ride(client, ride_id, &modify).await {
                Ok(Some(ride)) => return Ok(ride),
                Ok(None) => return Err(AppError::NotFound(format!("Ride {} not found", ride_id))),
                Err(e) if is_retryable(&e) && attempt < MAX_TRANSACTION_ATTEMPTS => {
                    tracing::warn!(ride_id, attempt, error = %e, "Ride transaction contended, retrying");
                    tokio::time::sleep(transaction_backoff(attempt)).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(AppError::Database(format!("Ride transaction failed: {}", e)))
                }
            }
        }
    }
}

/// One read-modify-write attempt. `Ok(None)` when the ride does not exist.
async fn try_modify_ride<F>(
    client: &firestore::FirestoreDb,
    ride_id: &str,
    modify: &F,
) -> Result<Option<Ride>, FirestoreError>
where
    F: Fn(&mut Ride) + Send + Sync,
{
    let mut transaction = client.begin_transaction().await?;

    // Reads through this handle register the document for conflict detection.
    let reader = client.clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
        transaction.transaction_id().clone(),
    ));

    let current = match reader
        .fluent()
        .select()
        .by_id_in(collections::RIDES)
        .obj::<Ride>()
        .one(ride_id)
        .await
    {
        Ok(current) => current,
        Err(e) => {
            let _ = transaction.rollback().await;
            return Err(e);
        }
    };

    let Some(mut ride) = current else {
        let _ = transaction.rollback().await;
        return Ok(None);
    };

    modify(&mut ride);

    let staged = client
        .fluent()
        .update()
        .in_col(collections::RIDES)
        .document_id(ride_id)
        .object(&ride)
        .add_to_transaction(&mut transaction)
        .map(|_| ());
    if let Err(e) = staged {
        let _ = transaction.rollback().await;
        return Err(e);
    }

    transaction.commit().await?;
    Ok(Some(ride))
}

/// Whether Firestore marked the failure as safe to retry (aborted on contention, unavailable).
fn is_retryable(err: &FirestoreError) -> bool {
    matches!(err, FirestoreError::DatabaseError(db_err) if db_err.retry_possible)
}

/// Exponential backoff between transaction attempts, capped at one second.
fn transaction_backoff(attempt: u32) -> Duration {
    Duration::from_millis(25u64.saturating_mul(1 << attempt.min(6))).min(Duration::from_secs(1))
}

/// Re-run `fetch` every `period`, yielding only results that differ from the last one.
fn poll_changes<T, F, Fut>(period: Duration, fetch: F) -> Subscription<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<T>, AppError>> + Send + 'static,
{
    let ticker = tokio::time::interval(period);
    stream::unfold(
        (ticker, fetch, None::<Vec<T>>),
        |(mut ticker, fetch, mut last)| async move {
            loop {
                ticker.tick().await;
                match fetch().await {
                    Ok(rows) if last.as_ref() == Some(&rows) => continue,
                    Ok(rows) => {
                        last = Some(rows.clone());
                        return Some((Ok(rows), (ticker, fetch, last)));
                    }
                    Err(e) => return Some((Err(e), (ticker, fetch, last))),
                }
            }
        },
    )
    .boxed()
}

impl Store for FirestoreDb {
    // ─── Ride Operations ─────────────────────────────────────────

    async fn create_ride(&self, ride: NewRide) -> Result<Ride, AppError> {
        let ride = Ride::from_new(uuid::Uuid::new_v4().to_string(), ride);
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::RIDES)
            .document_id(&ride.id)
            .object(&ride)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(ride)
    }

    async fn get_ride(&self, ride_id: &str) -> Result<Option<Ride>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::RIDES)
            .obj()
            .one(ride_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_rides(&self, limit: u32) -> Result<Vec<Ride>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::RIDES)
            .order_by([("created_at", FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn add_kudos(&self, ride_id: &str) -> Result<u32, AppError> {
        let ride = self.modify_ride(ride_id, |ride| ride.kudos += 1).await?;
        Ok(ride.kudos)
    }

    async fn add_comment(&self, ride_id: &str, comment: Comment) -> Result<Ride, AppError> {
        self.modify_ride(ride_id, |ride| ride.comments.push(comment.clone()))
            .await
    }

    fn subscribe_rides(&self, limit: u32) -> Subscription<Ride> {
        let db = self.clone();
        poll_changes(self.poll_interval, move || {
            let db = db.clone();
            async move { db.list_rides(limit).await }
        })
    }

    // ─── Route Operations ────────────────────────────────────────

    async fn create_route(&self, route: NewRoute) -> Result<Route, AppError> {
        let route = Route::from_new(uuid::Uuid::new_v4().to_string(), route);
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ROUTES)
            .document_id(&route.id)
            .object(&route)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(route)
    }

    async fn get_route(&self, route_id: &str) -> Result<Option<Route>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ROUTES)
            .obj()
            .one(route_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_routes(&self, limit: u32) -> Result<Vec<Route>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ROUTES)
            .order_by([("created_at", FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Group Operations ────────────────────────────────────────

    async fn create_group(&self, name: &str) -> Result<Group, AppError> {
        let group = Group {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            start_point: None,
            end_point: None,
            updated_at: None,
        };
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::GROUPS)
            .document_id(&group.id)
            .object(&group)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(group)
    }

    async fn get_group(&self, group_id: &str) -> Result<Option<Group>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::GROUPS)
            .obj()
            .one(group_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_group_route(
        &self,
        group_id: &str,
        start: RouteEndpoint,
        end: RouteEndpoint,
        updated_at: String,
    ) -> Result<Group, AppError> {
        // We fetch-modify-write to preserve other fields
        let mut group = self
            .get_group(group_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group {} not found", group_id)))?;

        group.start_point = Some(start);
        group.end_point = Some(end);
        group.updated_at = Some(updated_at);

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::GROUPS)
            .document_id(group_id)
            .object(&group)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(group)
    }

    // ─── Group Location Operations ───────────────────────────────

    async fn upsert_group_location(&self, location: &GroupLocation) -> Result<(), AppError> {
        let doc_id = group_location_doc_id(&location.group_id, &location.user_id);
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::GROUP_LOCATIONS)
            .document_id(&doc_id)
            .object(location)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_group_locations(&self, group_id: &str) -> Result<Vec<GroupLocation>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::GROUP_LOCATIONS)
            .filter(|q| q.for_all([q.field("group_id").eq(group_id)]))
            .order_by([("user_id", FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn subscribe_group_locations(&self, group_id: &str) -> Subscription<GroupLocation> {
        let db = self.clone();
        let group_id = group_id.to_string();
        poll_changes(self.poll_interval, move || {
            let db = db.clone();
            let group_id = group_id.clone();
            async move { db.list_group_locations(&group_id).await }
        })
    }
}
