//! Client for the payments API.
//!
//! Every operation goes through the resilience layer: it is tracked under
//! a per-operation key and transient failures are retried with
//! exponential backoff. Errors come back classified so callers can decide
//! what to surface.

pub mod error;
pub mod payments;

pub use error::{classify_reqwest_error, classify_status};
pub use payments::{PaymentPage, PaymentView, PaymentsClient, StatusTotalsView};
