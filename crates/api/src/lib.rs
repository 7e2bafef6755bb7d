//! HTTP API server for the cookie shop.
//!
//! Exposes signup, inventory, ordering and shipping as REST endpoints,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use fulfillment::FulfillmentService;
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/users", post(routes::users::create::<S>))
        .route("/users/{id}/contact", put(routes::users::update_contact::<S>))
        .route("/users/{id}/orders", get(routes::users::orders::<S>))
        .route("/cookies", post(routes::cookies::create::<S>))
        .route("/cookies", get(routes::cookies::list::<S>))
        .route("/cookies/value", get(routes::cookies::value::<S>))
        .route("/cookies/{id}/restock", post(routes::cookies::restock::<S>))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/ship", post(routes::orders::ship::<S>))
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

/// Wraps a backend in the shared handler state.
pub fn create_state<S: Store + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        service: FulfillmentService::new(store),
    })
}

/// Registers help text for the shipping metrics with the installed recorder.
pub fn describe_metrics() {
    metrics::describe_counter!("orders_shipped_total", "Orders shipped with inventory deducted");
    metrics::describe_counter!(
        "orders_ship_failed_total",
        "Ship requests that failed and were rolled back"
    );
    metrics::describe_counter!(
        "orders_already_shipped_total",
        "Ship requests for orders that had already shipped"
    );
    metrics::describe_counter!(
        "inventory_units_deducted_total",
        "Cookie units removed from inventory by shipping"
    );
    metrics::describe_histogram!(
        "ship_order_duration_seconds",
        metrics::Unit::Seconds,
        "Time to ship an order, including failed attempts"
    );
}
