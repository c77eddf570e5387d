//! Error types for the fitcoach engine
//!
//! All errors use thiserror for structured error handling.
//! Serialization writes the user-facing message only, so storage
//! details never reach the presentation layer.

use thiserror::Error;

/// Message shown for any failure the user cannot fix by changing input.
const GENERIC_FAILURE: &str = "Action failed, please try again";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// Rejected input. Raised before any state is touched.
    #[error("{0}")]
    Validation(String),

    #[error("No trainer selected for user: {0}")]
    TrainerNotSelected(String),

    #[error("Unknown shop item: {0}")]
    UnknownItem(String),

    #[error("Insufficient points: {required} required, {available} available")]
    InsufficientPoints { required: i64, available: i64 },

    #[error("Cannot own more than {max_own} of {item_id}")]
    OwnershipLimit { item_id: String, max_own: i64 },

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Whether the caller caused this error through bad input or state.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::TrainerNotSelected(_)
                | AppError::UnknownItem(_)
                | AppError::InsufficientPoints { .. }
                | AppError::OwnershipLimit { .. }
                | AppError::NotFound(_)
        )
    }

    /// Message safe to display to the end user.
    pub fn user_message(&self) -> String {
        if self.is_user_error() {
            self.to_string()
        } else {
            GENERIC_FAILURE.to_string()
        }
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.user_message())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
