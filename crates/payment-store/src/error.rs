use common::PaymentId;
use thiserror::Error;

use crate::payment::PaymentStatus;

/// Errors that can occur when interacting with the payment store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The payment request was malformed or missing required fields.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The payment does not exist (or is not visible to the requester).
    #[error("Payment not found: {0}")]
    NotFound(PaymentId),

    /// The requested status change is not a legal transition.
    ///
    /// The only legal transition is pending to a terminal status; a
    /// terminal status is never overwritten.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// The store backend is unavailable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for payment store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
