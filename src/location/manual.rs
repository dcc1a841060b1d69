// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location provider driven by explicit calls.

use super::{LocationProvider, PermissionStatus, WatchOptions};
use crate::error::{AppError, Result};
use crate::models::Fix;
use futures_util::stream::{BoxStream, StreamExt};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Provider whose fixes are pushed in by the caller.
///
/// Every fix goes to every live watch unfiltered.
pub struct ManualLocationProvider {
    state: Mutex<ManualState>,
}

struct ManualState {
    status: PermissionStatus,
    /// Status reported after a permission request
    grant_on_request: bool,
    last_fix: Option<Fix>,
    watchers: Vec<mpsc::UnboundedSender<Fix>>,
}

impl ManualLocationProvider {
    pub fn new(status: PermissionStatus) -> Self {
        Self {
            state: Mutex::new(ManualState {
                status,
                grant_on_request: false,
                last_fix: None,
                watchers: Vec::new(),
            }),
        }
    }

    /// Provider with permission already granted.
    pub fn granted() -> Self {
        Self::new(PermissionStatus::Granted)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_permission(&self, status: PermissionStatus) {
        self.lock().status = status;
    }

    /// Whether a pending request resolves to granted.
    pub fn grant_on_request(&self, grant: bool) {
        self.lock().grant_on_request = grant;
    }

    /// Deliver a fix to all live watches and remember it as the current position.
    pub fn push_fix(&self, fix: Fix) {
        let mut state = self.lock();
        state.last_fix = Some(fix);
        state.watchers.retain(|tx| tx.send(fix).is_ok());
    }

    /// Set the current position without notifying watches.
    pub fn set_position(&self, fix: Fix) {
        self.lock().last_fix = Some(fix);
    }

    /// Number of watches whose stream is still alive.
    pub fn active_watchers(&self) -> usize {
        let mut state = self.lock();
        state.watchers.retain(|tx| !tx.is_closed());
        state.watchers.len()
    }
}

impl LocationProvider for ManualLocationProvider {
    async fn permission_status(&self) -> PermissionStatus {
        self.lock().status
    }

    async fn request_permission(&self) -> PermissionStatus {
        let mut state = self.lock();
        if state.status == PermissionStatus::Undetermined {
            state.status = if state.grant_on_request {
                PermissionStatus::Granted
            } else {
                PermissionStatus::Denied
            };
        }
        state.status
    }

    async fn current_position(&self) -> Result<Fix> {
        let state = self.lock();
        if state.status != PermissionStatus::Granted {
            return Err(AppError::PermissionDenied);
        }
        state
            .last_fix
            .ok_or_else(|| AppError::NotFound("No position available yet".to_string()))
    }

    fn watch_position(&self, options: WatchOptions) -> Result<BoxStream<'static, Fix>> {
        let mut state = self.lock();
        if state.status != PermissionStatus::Granted {
            return Err(AppError::PermissionDenied);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.watchers.push(tx);
        tracing::debug!(?options, "Manual location watch registered");

        Ok(futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|fix| (fix, rx))
        })
        .boxed())
    }
}
