//! HTTP API server for the payments service.
//!
//! Exposes the payment endpoints over the settlement coordinator, with
//! bearer authentication, structured logging (tracing) and Prometheus
//! metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use payment_store::PaymentStore;
use saga::{HttpOrderNotifier, OrderNotifier, SettlementCoordinator, SettlementGateway, SimulatedGateway};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::{StaticTokenValidator, TokenValidator};
use config::Config;
use routes::payments::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, G, N>(state: Arc<AppState<S, G, N>>, metrics_handle: PrometheusHandle) -> Router
where
    S: PaymentStore + Clone + 'static,
    G: SettlementGateway + Clone + 'static,
    N: OrderNotifier + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/payments", post(routes::payments::create::<S, G, N>))
        .route("/payments", get(routes::payments::list::<S, G, N>))
        .route("/payments/stats", get(routes::payments::stats::<S, G, N>))
        .route("/payments/{id}", get(routes::payments::get::<S, G, N>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state: simulated settlement, HTTP
/// notifier towards the configured Orders service, env-provisioned tokens.
pub fn create_default_state<S: PaymentStore + Clone + 'static>(
    store: S,
    config: &Config,
) -> Arc<AppState<S, SimulatedGateway, HttpOrderNotifier>> {
    let gateway = SimulatedGateway::new(config.settlement_delay, config.approval_rate);
    let notifier = HttpOrderNotifier::new(config.orders_base_url.clone(), config.orders_timeout);
    let token_validator: Arc<dyn TokenValidator> = Arc::new(StaticTokenValidator::from_env());

    let coordinator = SettlementCoordinator::new(store.clone(), gateway, notifier);

    Arc::new(AppState {
        coordinator,
        store,
        token_validator,
    })
}
