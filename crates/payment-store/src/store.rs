use std::collections::HashMap;

use async_trait::async_trait;
use common::{PaymentId, UserId};

use crate::error::{Result, StoreError};
use crate::payment::{NewPayment, Payment, PaymentStatus};

/// A page request with 1-based page number.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// Creates a page request, clamping page to at least 1 and limit into
    /// `1..=MAX_LIMIT`.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Returns the number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_LIMIT)
    }
}

/// One page of results plus pagination metadata.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    /// Returns the total number of pages for this result set.
    pub fn pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.limit))
    }
}

/// Aggregated figures for one payment status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTotals {
    pub count: u64,
    pub total: common::Money,
}

/// Core trait for payment store implementations.
///
/// All implementations must be thread-safe (Send + Sync) and guarantee
/// that a status update is an atomic per-row read-modify-write: two racing
/// updates can never both succeed against the same pending payment.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Creates a payment record in `Pending` status.
    ///
    /// Generates the transaction ID and stamps both timestamps. Fails with
    /// `StoreError::Validation` if the amount is not positive or the order
    /// reference is empty.
    async fn create(&self, new: NewPayment) -> Result<Payment>;

    /// Retrieves a payment by ID, scoped to the requesting owner.
    ///
    /// Returns `None` both when the ID does not exist and when the record
    /// belongs to another owner, so existence is never leaked.
    async fn get(&self, id: PaymentId, user_id: UserId) -> Result<Option<Payment>>;

    /// Moves a payment to a new status and stamps `updated_at`.
    ///
    /// Fails with `NotFound` if the record is absent and with
    /// `InvalidTransition` for anything other than pending-to-terminal.
    async fn update_status(&self, id: PaymentId, status: PaymentStatus) -> Result<Payment>;

    /// Lists an owner's payments, newest first, optionally filtered by status.
    async fn list(
        &self,
        user_id: UserId,
        page: PageRequest,
        status: Option<PaymentStatus>,
    ) -> Result<Page<Payment>>;

    /// Returns per-status count and amount totals for an owner.
    async fn stats(&self, user_id: UserId) -> Result<HashMap<PaymentStatus, StatusTotals>>;
}

/// Validates a payment request before it is written.
///
/// Shared by all store implementations.
pub fn validate_new_payment(new: &NewPayment) -> Result<()> {
    if new.order_id.is_empty() {
        return Err(StoreError::Validation("order_id is required".to_string()));
    }
    if !new.amount.is_positive() {
        return Err(StoreError::Validation(
            "amount must be a positive number".to_string(),
        ));
    }
    Ok(())
}
