//! Payments API client.

use chrono::{DateTime, Utc};
use resilience::{CallError, CallTracker, ErrorKind, RetryPolicy, with_retry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{error_from_response, error_from_transport};

/// A payment as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentView {
    pub id: Uuid,
    pub order_id: String,
    pub amount: f64,
    pub status: String,
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PaymentView {
    /// Returns true if the payment reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "APPROVED" | "REJECTED")
    }
}

/// One page of payments plus pagination metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentPage {
    pub payments: Vec<PaymentView>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u64,
}

/// Per-status aggregate as returned by the stats endpoint.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct StatusTotalsView {
    pub count: u64,
    pub total: f64,
}

#[derive(Serialize)]
struct CreatePaymentBody<'a> {
    order_id: &'a str,
    amount: f64,
}

/// Client for the payments API.
///
/// Holds its own [`CallTracker`] and [`RetryPolicy`]; every operation is
/// keyed by its logical name so retries and loading state are visible per
/// operation class.
#[derive(Clone)]
pub struct PaymentsClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    tracker: CallTracker,
    policy: RetryPolicy,
}

impl PaymentsClient {
    /// Creates a client for the given API base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: None,
            tracker: CallTracker::new(),
            policy: RetryPolicy::default(),
        }
    }

    /// Returns the same client authenticating with a bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Returns the same client using a custom retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the call tracker, for loading-state inspection.
    pub fn tracker(&self) -> &CallTracker {
        &self.tracker
    }

    /// Submits a payment for settlement.
    ///
    /// Concurrent duplicate submissions are refused up front: if a
    /// `create_payment` call is already in flight on this client, the
    /// call fails with a client-kind error instead of double-charging.
    pub async fn create_payment(
        &self,
        order_id: &str,
        amount: f64,
    ) -> Result<PaymentView, CallError> {
        const KEY: &str = "create_payment";

        if self.tracker.is_loading(KEY) {
            return Err(
                CallError::new(ErrorKind::Client, "a payment submission is already in flight")
                    .with_context(KEY),
            );
        }

        with_retry(
            &self.tracker,
            &self.policy,
            KEY,
            || self.send_create(order_id, amount),
            true,
        )
        .await
    }

    /// Fetches one payment by ID.
    pub async fn get_payment(&self, id: Uuid) -> Result<PaymentView, CallError> {
        with_retry(
            &self.tracker,
            &self.policy,
            "get_payment",
            || self.send_get(id),
            true,
        )
        .await
    }

    /// Lists payments, newest first, optionally filtered by status.
    pub async fn list_payments(
        &self,
        page: u32,
        limit: u32,
        status: Option<&str>,
    ) -> Result<PaymentPage, CallError> {
        with_retry(
            &self.tracker,
            &self.policy,
            "list_payments",
            || self.send_list(page, limit, status),
            true,
        )
        .await
    }

    /// Fetches per-status payment statistics.
    pub async fn payment_stats(&self) -> Result<HashMap<String, StatusTotalsView>, CallError> {
        with_retry(
            &self.tracker,
            &self.policy,
            "payment_stats",
            || self.send_stats(),
            true,
        )
        .await
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send_create(&self, order_id: &str, amount: f64) -> Result<PaymentView, CallError> {
        let body = CreatePaymentBody { order_id, amount };
        let resp = self
            .request(reqwest::Method::POST, "/payments")
            .json(&body)
            .send()
            .await
            .map_err(error_from_transport)?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        resp.json().await.map_err(error_from_transport)
    }

    async fn send_get(&self, id: Uuid) -> Result<PaymentView, CallError> {
        let resp = self
            .request(reqwest::Method::GET, &format!("/payments/{id}"))
            .send()
            .await
            .map_err(error_from_transport)?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        resp.json().await.map_err(error_from_transport)
    }

    async fn send_list(
        &self,
        page: u32,
        limit: u32,
        status: Option<&str>,
    ) -> Result<PaymentPage, CallError> {
        let mut builder = self
            .request(reqwest::Method::GET, "/payments")
            .query(&[("page", page), ("limit", limit)]);
        if let Some(status) = status {
            builder = builder.query(&[("status", status)]);
        }

        let resp = builder.send().await.map_err(error_from_transport)?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        resp.json().await.map_err(error_from_transport)
    }

    async fn send_stats(&self) -> Result<HashMap<String, StatusTotalsView>, CallError> {
        let resp = self
            .request(reqwest::Method::GET, "/payments/stats")
            .send()
            .await
            .map_err(error_from_transport)?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        resp.json().await.map_err(error_from_transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = PaymentsClient::new("http://localhost:8003/");
        assert_eq!(client.base_url, "http://localhost:8003");
    }

    #[test]
    fn test_payment_view_terminal_statuses() {
        let mut view = PaymentView {
            id: Uuid::new_v4(),
            order_id: "ord_1".to_string(),
            amount: 49.99,
            status: "PENDING".to_string(),
            transaction_id: "txn_x".to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };
        assert!(!view.is_terminal());
        view.status = "APPROVED".to_string();
        assert!(view.is_terminal());
        view.status = "REJECTED".to_string();
        assert!(view.is_terminal());
    }

    #[tokio::test]
    async fn test_duplicate_create_is_refused_while_in_flight() {
        let client = PaymentsClient::new("http://localhost:9");
        client.tracker.set_loading("create_payment", true);

        let result = client.create_payment("ord_1", 49.99).await;
        let error = result.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Client);
        assert_eq!(error.context(), Some("create_payment"));
    }

    #[tokio::test]
    async fn test_unreachable_host_classifies_as_network() {
        // Nothing listens on this port; disable retries to keep it fast.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = PaymentsClient::new(format!("http://{addr}"))
            .with_retry_policy(RetryPolicy::new(0, std::time::Duration::ZERO));

        let error = client.get_payment(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Network);
        assert_eq!(error.context(), Some("get_payment"));
    }
}
