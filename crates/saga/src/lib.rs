//! Payment settlement saga.
//!
//! A payment is created synchronously as `PENDING` and settled
//! asynchronously out-of-band. The saga drives three steps:
//! 1. Obtain a terminal outcome from the settlement gateway
//! 2. Persist the terminal status to the payment store
//! 3. Propagate the outcome to the external Orders service
//!
//! Step 2 always happens before step 3. A failed propagation leaves the
//! payment terminal but unsynced; it is logged as an operational error for
//! out-of-band reconciliation rather than retried automatically.

pub mod coordinator;
pub mod error;
pub mod services;
pub mod state;

pub use coordinator::SettlementCoordinator;
pub use error::SagaError;
pub use services::{
    Acknowledged, FixedGateway, HttpOrderNotifier, NotifyFailure, OrderNotifier, OrderSyncStatus,
    RecordingNotifier, SettlementGateway, SettlementOutcome, SimulatedGateway,
};
pub use state::SettlementPhase;
