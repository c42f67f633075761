//! Saga error types.

use payment_store::StoreError;
use thiserror::Error;

/// Errors that can occur while coordinating a settlement.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Payment store error.
    #[error("Payment store error: {0}")]
    Store(#[from] StoreError),

    /// The settlement outcome could not be recorded; the payment was
    /// forced to rejected as a conservative default.
    #[error("Settlement outcome for payment {payment_id} could not be recorded: {reason}")]
    OutcomeNotRecorded {
        payment_id: common::PaymentId,
        reason: String,
    },
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
