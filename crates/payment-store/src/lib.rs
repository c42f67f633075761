//! Payment record store.
//!
//! A payment is created in `PENDING` status, settled exactly once to a
//! terminal status (`APPROVED` or `REJECTED`), and never deleted by the
//! settlement flow. The store enforces that per-row status transition:
//! `update_status` rejects anything other than pending-to-terminal.

pub mod error;
pub mod memory;
pub mod payment;
pub mod postgres;
pub mod store;

pub use common::{Money, OrderId, PaymentId, TransactionId, UserId};
pub use error::{Result, StoreError};
pub use memory::InMemoryPaymentStore;
pub use payment::{NewPayment, Payment, PaymentStatus};
pub use postgres::PostgresPaymentStore;
pub use store::{Page, PageRequest, PaymentStore, StatusTotals};
