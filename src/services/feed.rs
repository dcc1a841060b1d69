// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity feed: recent rides, kudos and comments.

use crate::db::{Store, Subscription};
use crate::error::{AppError, Result};
use crate::models::{Comment, Ride};
use crate::time_utils::{format_utc_rfc3339, Clock, SystemClock};
use std::sync::Arc;

/// Longest comment accepted (characters).
pub const MAX_COMMENT_CHARS: usize = 500;

pub struct FeedService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: Store> FeedService<S> {
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

    /// Most recent rides first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<Ride>> {
        self.store.list_rides(limit).await
    }

    /// Live feed of the `limit` most recent rides.
    pub fn subscribe(&self, limit: u32) -> Subscription<Ride> {
        self.store.subscribe_rides(limit)
    }

    /// Give kudos to a ride; returns the new total.
    pub async fn give_kudos(&self, ride_id: &str) -> Result<u32> {
        let kudos = self.store.add_kudos(ride_id).await?;
        tracing::debug!(ride_id, kudos, "Kudos given");
        Ok(kudos)
    }

    /// Attach a comment to a ride.
    pub async fn add_comment(&self, ride_id: &str, user: &str, text: &str) -> Result<Ride> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("Comment cannot be empty.".to_string()));
        }
        if text.chars().count() > MAX_COMMENT_CHARS {
            return Err(AppError::Validation(format!(
                "Comment must be at most {} characters.",
                MAX_COMMENT_CHARS
            )));
        }

        let comment = Comment {
            user: user.to_string(),
            text: text.to_string(),
            created_at: format_utc_rfc3339(self.clock.now()),
        };
        let ride = self.store.add_comment(ride_id, comment).await?;
        tracing::debug!(ride_id, comments = ride.comments.len(), "Comment added");
        Ok(ride)
    }
}
