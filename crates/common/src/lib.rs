//! Shared types for the payments system.

pub mod types;

pub use types::{Money, OrderId, PaymentId, TransactionId, UserId};
