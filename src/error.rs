// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent user-facing alerts.

use serde::Serialize;

/// Application error type.
///
/// Every variant is recoverable: the caller shows the matching [`Alert`]
/// and the triggering operation is abandoned.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Location permission not granted")]
    PermissionDenied,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Blocking alert shown to the user when an operation fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl AppError {
    /// Message shown when a ride fails to persist.
    pub const SAVE_FAILED: &'static str = "Could not save ride.";

    /// Build the alert for this error.
    pub fn alert(&self) -> Alert {
        let (title, message) = match self {
            AppError::PermissionDenied => (
                "Permission Denied",
                "Enable location services to record rides.".to_string(),
            ),
            AppError::Validation(msg) => ("Cannot Save", msg.clone()),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ("Error", Self::SAVE_FAILED.to_string())
            }
            AppError::NotFound(msg) => ("Not Found", msg.clone()),
            AppError::InvalidState(msg) => ("Error", msg.clone()),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                ("Error", "Something went wrong.".to_string())
            }
        };

        Alert {
            title: title.to_string(),
            message,
        }
    }
}

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, AppError>;
