//! HTTP API for the marketplace order pipeline.
//!
//! Exposes cart, checkout, buyer order and seller fulfillment endpoints over
//! [`orders::MarketService`], with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod identity;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use metrics_exporter_prometheus::PrometheusHandle;
use orders::MarketService;
use store::MarketStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: MarketStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/cart",
            get(routes::cart::get::<S>).delete(routes::cart::clear::<S>),
        )
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route(
            "/cart/items/{id}",
            patch(routes::cart::update_item::<S>).delete(routes::cart::remove_item::<S>),
        )
        .route("/checkout", post(routes::checkout::create::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/cancel", patch(routes::orders::cancel::<S>))
        .route(
            "/order-items/{id}/complete",
            patch(routes::orders::complete_item::<S>),
        )
        .route(
            "/purchases/{id}/completed",
            get(routes::orders::completed_purchase::<S>),
        )
        .route("/seller/order-items", get(routes::seller::list_items::<S>))
        .route(
            "/seller/order-items/{id}/status",
            patch(routes::seller::update_status::<S>),
        )
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

/// Creates the application state over a store, using the configured retry
/// budget.
pub fn create_state<S: MarketStore>(store: S, config: &Config) -> Arc<AppState<S>> {
    Arc::new(AppState {
        service: MarketService::with_max_attempts(store, config.tx_max_attempts),
    })
}
