//! The payment entity and its status machine.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, PaymentId, TransactionId, UserId};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a payment.
///
/// Status transitions:
/// ```text
/// Pending ──┬──► Approved
///           └──► Rejected
/// ```
///
/// Both `Approved` and `Rejected` are terminal; a payment never returns
/// to `Pending` and never flips between the two terminal values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Settlement has not completed yet.
    #[default]
    Pending,

    /// The settlement draw approved the payment (terminal state).
    Approved,

    /// The settlement draw rejected the payment (terminal state).
    Rejected,
}

impl PaymentStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Approved | PaymentStatus::Rejected)
    }

    /// Returns true if moving from `self` to `to` is a legal transition.
    pub fn can_transition_to(&self, to: PaymentStatus) -> bool {
        matches!(self, PaymentStatus::Pending) && to.is_terminal()
    }

    /// Returns the upper-case wire form of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Approved => "APPROVED",
            PaymentStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PaymentStatus::Pending),
            "APPROVED" => Ok(PaymentStatus::Approved),
            "REJECTED" => Ok(PaymentStatus::Rejected),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

/// A durable payment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Store-assigned surrogate identifier, immutable.
    pub id: PaymentId,
    /// Reference to the externally-owned order.
    pub order_id: OrderId,
    /// Owner reference, used for access scoping.
    pub user_id: UserId,
    /// Positive amount, fixed at creation time.
    pub amount: Money,
    /// Current lifecycle status.
    pub status: PaymentStatus,
    /// Unique correlation identifier, immutable.
    pub transaction_id: TransactionId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Changes exactly once, at the pending-to-terminal transition.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a payment record.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub amount: Money,
}

impl NewPayment {
    /// Creates a new payment request.
    pub fn new(order_id: impl Into<OrderId>, user_id: UserId, amount: Money) -> Self {
        Self {
            order_id: order_id.into(),
            user_id,
            amount,
        }
    }
}
