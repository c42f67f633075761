//! Order status notifier: propagates settlement outcomes to the external
//! Orders service.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, PaymentId};
use serde::Serialize;
use thiserror::Error;

use crate::services::settlement::SettlementOutcome;

/// Order-side status corresponding to a settlement outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSyncStatus {
    Paid,
    PaymentFailed,
}

impl OrderSyncStatus {
    /// Returns the wire form expected by the Orders service.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSyncStatus::Paid => "PAID",
            OrderSyncStatus::PaymentFailed => "PAYMENT_FAILED",
        }
    }
}

impl From<SettlementOutcome> for OrderSyncStatus {
    fn from(outcome: SettlementOutcome) -> Self {
        match outcome {
            SettlementOutcome::Approved => OrderSyncStatus::Paid,
            SettlementOutcome::Rejected => OrderSyncStatus::PaymentFailed,
        }
    }
}

impl std::fmt::Display for OrderSyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Successful acknowledgement from the Orders service.
#[derive(Debug, Clone, Copy)]
pub struct Acknowledged {
    /// HTTP status the Orders service answered with.
    pub status: u16,
}

/// Classified notification failure.
///
/// The notifier never lets any other error shape escape its boundary;
/// the caller decides what to do based on the classification alone.
#[derive(Debug, Clone, Error)]
pub enum NotifyFailure {
    /// No response was received (connection failure or timeout).
    #[error("Orders service is unreachable: {0}")]
    Unreachable(String),

    /// The Orders service answered with an error response.
    #[error("Orders service rejected the update (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request could not be constructed or sent at all.
    #[error("Internal error when calling orders service: {0}")]
    Internal(String),
}

/// Trait for propagating a payment outcome to the Orders service.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    /// Issues a single status-update call for the given order.
    ///
    /// Delivery is at-least-once from the saga's perspective; the Orders
    /// service is expected to treat repeated identical status assertions
    /// as harmless.
    async fn notify(
        &self,
        order_id: &OrderId,
        status: OrderSyncStatus,
        payment_id: PaymentId,
    ) -> Result<Acknowledged, NotifyFailure>;
}

#[derive(Serialize)]
struct OrderStatusUpdate<'a> {
    status: &'a str,
    #[serde(rename = "paymentId")]
    payment_id: PaymentId,
    #[serde(rename = "updatedAt")]
    updated_at: String,
}

/// HTTP notifier hitting the Orders service's status-update endpoint.
#[derive(Clone)]
pub struct HttpOrderNotifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOrderNotifier {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a notifier for the given base URL with a bounded timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("payments-service/0.1")
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl OrderNotifier for HttpOrderNotifier {
    async fn notify(
        &self,
        order_id: &OrderId,
        status: OrderSyncStatus,
        payment_id: PaymentId,
    ) -> Result<Acknowledged, NotifyFailure> {
        let url = format!("{}/api/v1/orders/{}/status", self.base_url, order_id);
        let body = OrderStatusUpdate {
            status: status.as_str(),
            payment_id,
            updated_at: Utc::now().to_rfc3339(),
        };

        match self.client.patch(&url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => Ok(Acknowledged {
                status: resp.status().as_u16(),
            }),
            Ok(resp) => {
                let status = resp.status().as_u16();
                let message = resp.text().await.unwrap_or_default();
                Err(NotifyFailure::Rejected { status, message })
            }
            Err(e) if e.is_builder() => Err(NotifyFailure::Internal(e.to_string())),
            Err(e) => Err(NotifyFailure::Unreachable(e.to_string())),
        }
    }
}

/// A notification recorded by [`RecordingNotifier`].
#[derive(Debug, Clone)]
pub struct RecordedNotification {
    pub order_id: OrderId,
    pub status: OrderSyncStatus,
    pub payment_id: PaymentId,
}

#[derive(Debug, Default)]
struct RecordingNotifierState {
    notifications: Vec<RecordedNotification>,
    fail_on_notify: bool,
}

/// In-memory notifier for testing: records every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    state: Arc<RwLock<RecordingNotifierState>>,
}

impl RecordingNotifier {
    /// Creates a new recording notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the notifier to fail as unreachable.
    pub fn set_fail_on_notify(&self, fail: bool) {
        self.state.write().unwrap().fail_on_notify = fail;
    }

    /// Returns all recorded notifications.
    pub fn notifications(&self) -> Vec<RecordedNotification> {
        self.state.read().unwrap().notifications.clone()
    }

    /// Returns the number of notify calls seen so far.
    pub fn notification_count(&self) -> usize {
        self.state.read().unwrap().notifications.len()
    }
}

#[async_trait]
impl OrderNotifier for RecordingNotifier {
    async fn notify(
        &self,
        order_id: &OrderId,
        status: OrderSyncStatus,
        payment_id: PaymentId,
    ) -> Result<Acknowledged, NotifyFailure> {
        let mut state = self.state.write().unwrap();
        state.notifications.push(RecordedNotification {
            order_id: order_id.clone(),
            status,
            payment_id,
        });

        if state.fail_on_notify {
            return Err(NotifyFailure::Unreachable(
                "orders service is unreachable".to_string(),
            ));
        }
        Ok(Acknowledged { status: 200 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::patch;

    #[test]
    fn test_status_mapping() {
        assert_eq!(OrderSyncStatus::from(SettlementOutcome::Approved).as_str(), "PAID");
        assert_eq!(
            OrderSyncStatus::from(SettlementOutcome::Rejected).as_str(),
            "PAYMENT_FAILED"
        );
    }

    #[tokio::test]
    async fn test_recording_notifier_records_calls() {
        let notifier = RecordingNotifier::new();
        let order_id = OrderId::new("ord_1");
        let payment_id = PaymentId::new();

        let ack = notifier
            .notify(&order_id, OrderSyncStatus::Paid, payment_id)
            .await
            .unwrap();
        assert_eq!(ack.status, 200);

        let recorded = notifier.notifications();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].order_id, order_id);
        assert_eq!(recorded[0].status, OrderSyncStatus::Paid);
        assert_eq!(recorded[0].payment_id, payment_id);
    }

    #[tokio::test]
    async fn test_recording_notifier_failure_switch() {
        let notifier = RecordingNotifier::new();
        notifier.set_fail_on_notify(true);

        let result = notifier
            .notify(&OrderId::new("ord_1"), OrderSyncStatus::Paid, PaymentId::new())
            .await;
        assert!(matches!(result, Err(NotifyFailure::Unreachable(_))));
        // The call is still recorded.
        assert_eq!(notifier.notification_count(), 1);
    }

    async fn serve_fixed_status(status: StatusCode) -> String {
        let app = Router::new().route(
            "/api/v1/orders/{id}/status",
            patch(move || async move { (status, "nope") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_connection_refused_classifies_as_unreachable() {
        // Bind then drop to find a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let notifier =
            HttpOrderNotifier::new(format!("http://{addr}"), Duration::from_millis(500));
        let result = notifier
            .notify(&OrderId::new("ord_1"), OrderSyncStatus::Paid, PaymentId::new())
            .await;

        assert!(matches!(result, Err(NotifyFailure::Unreachable(_))));
    }

    #[tokio::test]
    async fn test_404_classifies_as_rejected() {
        let base = serve_fixed_status(StatusCode::NOT_FOUND).await;
        let notifier = HttpOrderNotifier::new(base, Duration::from_secs(2));

        let result = notifier
            .notify(&OrderId::new("ord_missing"), OrderSyncStatus::Paid, PaymentId::new())
            .await;

        match result {
            Err(NotifyFailure::Rejected { status, .. }) => assert_eq!(status, 404),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_500_classifies_as_rejected() {
        let base = serve_fixed_status(StatusCode::INTERNAL_SERVER_ERROR).await;
        let notifier = HttpOrderNotifier::new(base, Duration::from_secs(2));

        let result = notifier
            .notify(&OrderId::new("ord_1"), OrderSyncStatus::PaymentFailed, PaymentId::new())
            .await;

        match result {
            Err(NotifyFailure::Rejected { status, .. }) => assert_eq!(status, 500),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_acknowledged() {
        let base = serve_fixed_status(StatusCode::OK).await;
        let notifier = HttpOrderNotifier::new(base, Duration::from_secs(2));

        let ack = notifier
            .notify(&OrderId::new("ord_1"), OrderSyncStatus::Paid, PaymentId::new())
            .await
            .unwrap();
        assert_eq!(ack.status, 200);
    }
}
