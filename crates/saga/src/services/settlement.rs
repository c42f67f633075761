//! Settlement gateway trait and simulated implementation.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::PaymentId;
use payment_store::PaymentStatus;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Terminal outcome of a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementOutcome {
    Approved,
    Rejected,
}

impl SettlementOutcome {
    /// Returns the payment status this outcome settles to.
    pub fn status(&self) -> PaymentStatus {
        match self {
            SettlementOutcome::Approved => PaymentStatus::Approved,
            SettlementOutcome::Rejected => PaymentStatus::Rejected,
        }
    }

    /// Returns the outcome name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementOutcome::Approved => "approved",
            SettlementOutcome::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for SettlementOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for the settlement step of the saga.
///
/// This is the sole source of non-determinism in the saga; it has no
/// failure mode of its own and always produces a terminal outcome.
/// Production code uses [`SimulatedGateway`]; a real integration would
/// replace the delay with an actual settlement call behind this trait.
#[async_trait]
pub trait SettlementGateway: Send + Sync {
    /// Settles a pending payment, producing a terminal outcome.
    async fn settle(&self, payment_id: PaymentId) -> SettlementOutcome;
}

/// Simulated settlement: a fixed processing delay followed by a biased
/// random draw.
#[derive(Clone)]
pub struct SimulatedGateway {
    delay: Duration,
    approval_rate: f64,
    rng: Arc<Mutex<StdRng>>,
}

impl SimulatedGateway {
    /// Default bank processing delay.
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);
    /// Default approval probability.
    pub const DEFAULT_APPROVAL_RATE: f64 = 0.90;

    /// Creates a gateway with the given delay and approval probability.
    pub fn new(delay: Duration, approval_rate: f64) -> Self {
        Self {
            delay,
            approval_rate: approval_rate.clamp(0.0, 1.0),
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
        }
    }

    /// Creates a gateway with a seeded generator for deterministic draws.
    pub fn with_seed(delay: Duration, approval_rate: f64, seed: u64) -> Self {
        Self {
            delay,
            approval_rate: approval_rate.clamp(0.0, 1.0),
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    fn draw(&self) -> SettlementOutcome {
        let approved = self.rng.lock().unwrap().gen_bool(self.approval_rate);
        if approved {
            SettlementOutcome::Approved
        } else {
            SettlementOutcome::Rejected
        }
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY, Self::DEFAULT_APPROVAL_RATE)
    }
}

#[async_trait]
impl SettlementGateway for SimulatedGateway {
    async fn settle(&self, _payment_id: PaymentId) -> SettlementOutcome {
        tokio::time::sleep(self.delay).await;
        self.draw()
    }
}

#[derive(Debug, Default)]
struct FixedGatewayState {
    outcome: Option<SettlementOutcome>,
    delay: Option<Duration>,
    settle_count: u32,
}

/// Fixed-outcome gateway for testing: preset result, optional delay.
#[derive(Debug, Clone, Default)]
pub struct FixedGateway {
    state: Arc<Mutex<FixedGatewayState>>,
}

impl FixedGateway {
    /// Creates a gateway that approves everything.
    pub fn approving() -> Self {
        let gateway = Self::default();
        gateway.set_outcome(SettlementOutcome::Approved);
        gateway
    }

    /// Creates a gateway that rejects everything.
    pub fn rejecting() -> Self {
        let gateway = Self::default();
        gateway.set_outcome(SettlementOutcome::Rejected);
        gateway
    }

    /// Sets the outcome for all subsequent settle calls.
    pub fn set_outcome(&self, outcome: SettlementOutcome) {
        self.state.lock().unwrap().outcome = Some(outcome);
    }

    /// Adds an artificial settlement delay to subsequent settle calls.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    /// Returns the number of settle calls seen so far.
    pub fn settle_count(&self) -> u32 {
        self.state.lock().unwrap().settle_count
    }
}

#[async_trait]
impl SettlementGateway for FixedGateway {
    async fn settle(&self, _payment_id: PaymentId) -> SettlementOutcome {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.settle_count += 1;
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state.lock().unwrap().outcome.unwrap_or(SettlementOutcome::Approved)
    }
}
