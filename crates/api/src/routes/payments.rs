//! Payment endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use common::{Money, PaymentId, UserId};
use payment_store::{NewPayment, Page, PageRequest, Payment, PaymentStatus, PaymentStore};
use saga::{OrderNotifier, SettlementCoordinator, SettlementGateway};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{TokenValidator, authenticate};
use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S, G, N>
where
    S: PaymentStore + Clone + 'static,
    G: SettlementGateway + Clone + 'static,
    N: OrderNotifier + Clone + 'static,
{
    pub coordinator: SettlementCoordinator<S, G, N>,
    pub store: S,
    pub token_validator: Arc<dyn TokenValidator>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreatePaymentRequest {
    pub order_id: Option<String>,
    pub amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct PaymentResponse {
    pub id: PaymentId,
    pub order_id: String,
    pub amount: f64,
    pub status: String,
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PaymentResponse {
    /// Response shape for a freshly created payment.
    fn created(payment: Payment) -> Self {
        Self {
            updated_at: None,
            ..Self::from(payment)
        }
    }
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            order_id: payment.order_id.as_str().to_string(),
            amount: payment.amount.as_decimal(),
            status: payment.status.as_str().to_string(),
            transaction_id: payment.transaction_id.as_str().to_string(),
            created_at: payment.created_at,
            updated_at: Some(payment.updated_at),
        }
    }
}

#[derive(Serialize)]
pub struct PaymentListResponse {
    pub payments: Vec<PaymentResponse>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u64,
}

impl From<Page<Payment>> for PaymentListResponse {
    fn from(page: Page<Payment>) -> Self {
        Self {
            total: page.total,
            page: page.page,
            limit: page.limit,
            pages: page.pages(),
            payments: page.items.into_iter().map(PaymentResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
pub struct StatusTotalsResponse {
    pub count: u64,
    pub total: f64,
}

// -- Handlers --

/// POST /payments — create a payment and schedule its settlement.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S, G, N>(
    State(state): State<Arc<AppState<S, G, N>>>,
    headers: HeaderMap,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError>
where
    S: PaymentStore + Clone + 'static,
    G: SettlementGateway + Clone + 'static,
    N: OrderNotifier + Clone + 'static,
{
    let user = authenticate(state.token_validator.as_ref(), &headers).await?;

    let order_id = req
        .order_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("order_id and amount are required".to_string()))?;
    let amount = req
        .amount
        .ok_or_else(|| ApiError::BadRequest("order_id and amount are required".to_string()))?;
    let amount = Money::from_amount(amount)
        .filter(Money::is_positive)
        .ok_or_else(|| ApiError::BadRequest("Amount must be a positive number".to_string()))?;

    let payment = state
        .coordinator
        .submit_payment(NewPayment::new(order_id, user.user_id, amount))
        .await?;

    Ok((StatusCode::CREATED, Json(PaymentResponse::created(payment))))
}

/// GET /payments — list the caller's payments with pagination.
#[tracing::instrument(skip(state, headers))]
pub async fn list<S, G, N>(
    State(state): State<Arc<AppState<S, G, N>>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaymentListResponse>, ApiError>
where
    S: PaymentStore + Clone + 'static,
    G: SettlementGateway + Clone + 'static,
    N: OrderNotifier + Clone + 'static,
{
    let user = authenticate(state.token_validator.as_ref(), &headers).await?;

    let status = query
        .status
        .map(|s| {
            s.parse::<PaymentStatus>()
                .map_err(|e| ApiError::BadRequest(e.to_string()))
        })
        .transpose()?;

    let page = PageRequest::new(
        query.page.unwrap_or(1),
        query.limit.unwrap_or(PageRequest::DEFAULT_LIMIT),
    );

    let result = state.store.list(user.user_id, page, status).await?;
    Ok(Json(PaymentListResponse::from(result)))
}

/// GET /payments/stats — per-status totals for the caller.
#[tracing::instrument(skip(state, headers))]
pub async fn stats<S, G, N>(
    State(state): State<Arc<AppState<S, G, N>>>,
    headers: HeaderMap,
) -> Result<Json<HashMap<String, StatusTotalsResponse>>, ApiError>
where
    S: PaymentStore + Clone + 'static,
    G: SettlementGateway + Clone + 'static,
    N: OrderNotifier + Clone + 'static,
{
    let user = authenticate(state.token_validator.as_ref(), &headers).await?;

    let stats = state.store.stats(user.user_id).await?;
    let response = stats
        .into_iter()
        .map(|(status, totals)| {
            (
                status.as_str().to_lowercase(),
                StatusTotalsResponse {
                    count: totals.count,
                    total: totals.total.as_decimal(),
                },
            )
        })
        .collect();

    Ok(Json(response))
}

/// GET /payments/:id — payment detail, owner-scoped.
#[tracing::instrument(skip(state, headers))]
pub async fn get<S, G, N>(
    State(state): State<Arc<AppState<S, G, N>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentResponse>, ApiError>
where
    S: PaymentStore + Clone + 'static,
    G: SettlementGateway + Clone + 'static,
    N: OrderNotifier + Clone + 'static,
{
    let user = authenticate(state.token_validator.as_ref(), &headers).await?;

    let payment = state
        .store
        .get(PaymentId::from_uuid(id), user.user_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("Payment does not exist or does not belong to you".to_string())
        })?;

    Ok(Json(PaymentResponse::from(payment)))
}
