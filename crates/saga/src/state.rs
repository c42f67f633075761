//! Settlement phase machine.

use serde::{Deserialize, Serialize};

/// The phase of a payment's settlement saga.
///
/// Phase transitions:
/// ```text
/// Created ──► Settling ──► AwaitingOrderSync ──┬──► Settled
///                                              └──► SettledUnsynced
/// ```
///
/// `SettledUnsynced` is terminal for the payment itself but marks a
/// whole-system inconsistency: the payment carries a terminal status that
/// the Orders service never acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SettlementPhase {
    /// The pending record exists; settlement has been scheduled.
    #[default]
    Created,

    /// The settlement task is in flight.
    Settling,

    /// A terminal status is persisted; Orders has not acknowledged it yet.
    AwaitingOrderSync,

    /// Orders acknowledged the outcome (terminal state).
    Settled,

    /// Orders never acknowledged the outcome (terminal state, flagged for
    /// reconciliation).
    SettledUnsynced,
}

impl SettlementPhase {
    /// Returns true if this is a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SettlementPhase::Settled | SettlementPhase::SettledUnsynced
        )
    }

    /// Returns true if the outcome reached the Orders service.
    pub fn is_synced(&self) -> bool {
        matches!(self, SettlementPhase::Settled)
    }

    /// Returns the phase name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementPhase::Created => "Created",
            SettlementPhase::Settling => "Settling",
            SettlementPhase::AwaitingOrderSync => "AwaitingOrderSync",
            SettlementPhase::Settled => "Settled",
            SettlementPhase::SettledUnsynced => "SettledUnsynced",
        }
    }
}

impl std::fmt::Display for SettlementPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
