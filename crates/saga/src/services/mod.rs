//! External service traits and test doubles for the settlement saga.

pub mod orders;
pub mod settlement;

pub use orders::{
    Acknowledged, HttpOrderNotifier, NotifyFailure, OrderNotifier, OrderSyncStatus,
    RecordingNotifier,
};
pub use settlement::{FixedGateway, SettlementGateway, SettlementOutcome, SimulatedGateway};
