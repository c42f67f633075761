//! Settlement coordinator: drives a payment from creation to a settled,
//! propagated outcome.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use common::PaymentId;
use payment_store::{NewPayment, Payment, PaymentStatus, PaymentStore};

use crate::error::{Result, SagaError};
use crate::services::orders::{OrderNotifier, OrderSyncStatus};
use crate::services::settlement::SettlementGateway;
use crate::state::SettlementPhase;

/// Orchestrates the payment settlement saga.
///
/// The synchronous half creates the `PENDING` record and returns it; the
/// asynchronous half runs as a detached task that obtains the settlement
/// outcome, persists the terminal status, and then notifies the Orders
/// service. The store write always happens before the notification
/// attempt, so a reader never observes a terminal status that has not yet
/// been asserted against Orders.
#[derive(Clone)]
pub struct SettlementCoordinator<S, G, N>
where
    S: PaymentStore,
    G: SettlementGateway,
    N: OrderNotifier,
{
    store: S,
    gateway: G,
    notifier: N,
    phases: Arc<RwLock<HashMap<PaymentId, SettlementPhase>>>,
}

impl<S, G, N> SettlementCoordinator<S, G, N>
where
    S: PaymentStore + Clone + 'static,
    G: SettlementGateway + Clone + 'static,
    N: OrderNotifier + Clone + 'static,
{
    /// Creates a new settlement coordinator.
    pub fn new(store: S, gateway: G, notifier: N) -> Self {
        Self {
            store,
            gateway,
            notifier,
            phases: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a pending payment and schedules its settlement.
    ///
    /// Returns the pending record immediately; the settlement task is
    /// detached and cannot be cancelled. Errors inside the task never
    /// reach the caller; they are logged and reflected in the phase map.
    #[tracing::instrument(skip(self, new), fields(order_id = %new.order_id))]
    pub async fn submit_payment(&self, new: NewPayment) -> Result<Payment> {
        let payment = self.store.create(new).await?;
        self.set_phase(payment.id, SettlementPhase::Created);

        metrics::counter!("settlements_started_total").increment(1);
        tracing::info!(
            payment_id = %payment.id,
            order_id = %payment.order_id,
            transaction_id = %payment.transaction_id,
            "payment created, settlement scheduled"
        );

        let coordinator = self.clone();
        let payment_id = payment.id;
        tokio::spawn(async move {
            if let Err(e) = coordinator.run_settlement(payment_id).await {
                tracing::error!(%payment_id, error = %e, "settlement task failed");
            }
        });

        Ok(payment)
    }

    /// Runs one settlement to its terminal outcome.
    #[tracing::instrument(skip(self))]
    async fn run_settlement(&self, payment_id: PaymentId) -> Result<()> {
        let settle_start = std::time::Instant::now();
        self.set_phase(payment_id, SettlementPhase::Settling);

        let outcome = self.gateway.settle(payment_id).await;
        let status = outcome.status();

        let payment = match self.store.update_status(payment_id, status).await {
            Ok(payment) => payment,
            Err(e) => {
                // Fail closed: force the conservative terminal status and
                // skip notification entirely.
                tracing::error!(%payment_id, error = %e, "failed to record settlement outcome");
                if status != PaymentStatus::Rejected
                    && let Err(force_err) = self
                        .store
                        .update_status(payment_id, PaymentStatus::Rejected)
                        .await
                {
                    tracing::error!(
                        %payment_id,
                        error = %force_err,
                        "failed to force payment to rejected"
                    );
                }
                self.set_phase(payment_id, SettlementPhase::SettledUnsynced);
                metrics::counter!("settlement_record_failures_total").increment(1);
                return Err(SagaError::OutcomeNotRecorded {
                    payment_id,
                    reason: e.to_string(),
                });
            }
        };

        metrics::histogram!("settlement_duration_seconds")
            .record(settle_start.elapsed().as_secs_f64());
        metrics::counter!("settlements_total", "outcome" => outcome.as_str()).increment(1);
        tracing::info!(
            %payment_id,
            order_id = %payment.order_id,
            outcome = %outcome,
            "payment settled"
        );

        // The terminal status is durable before any notification attempt.
        self.set_phase(payment_id, SettlementPhase::AwaitingOrderSync);

        let sync_status = OrderSyncStatus::from(outcome);
        match self
            .notifier
            .notify(&payment.order_id, sync_status, payment_id)
            .await
        {
            Ok(ack) => {
                self.set_phase(payment_id, SettlementPhase::Settled);
                tracing::info!(
                    %payment_id,
                    order_id = %payment.order_id,
                    status = %sync_status,
                    ack_status = ack.status,
                    "order status propagated"
                );
            }
            Err(failure) => {
                // The payment keeps its terminal status; the mismatch with
                // the Orders service is an operational error handled by
                // out-of-band reconciliation, not an automatic retry.
                self.set_phase(payment_id, SettlementPhase::SettledUnsynced);
                metrics::counter!("order_sync_failures_total").increment(1);
                tracing::error!(
                    %payment_id,
                    order_id = %payment.order_id,
                    status = %sync_status,
                    error = %failure,
                    "payment settled but order status not propagated"
                );
            }
        }

        Ok(())
    }

    /// Returns the settlement phase of a payment, if known to this process.
    pub fn phase(&self, payment_id: PaymentId) -> Option<SettlementPhase> {
        self.phases.read().unwrap().get(&payment_id).copied()
    }

    /// Returns a handle to the underlying store for read paths.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn set_phase(&self, payment_id: PaymentId, phase: SettlementPhase) {
        self.phases.write().unwrap().insert(payment_id, phase);
    }
}
