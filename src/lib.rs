//! # Kisan Market
//!
//! Backend for a farmers' marketplace. Farmers list produce, customers order
//! it for pickup or home delivery, farmers accept orders by issuing a
//! short-lived payment QR, and confirmed payments credit the farmer's revenue
//! ledger. The crate also serves the mock crop-analysis endpoints used by the
//! disease-detection and sensor dashboards.
//!
//! Exposes the router and modules so integration tests can run the server
//! in-process.

pub mod analysis;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod lifecycle;
pub mod models;
pub mod qr;
pub mod routes;
pub mod state;
pub mod store;

use axum::{Extension, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the Axum router with all route modules and middleware.
///
/// The caller supplies the state (store, clock, config); this function does
/// not bind a listener.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::orders::router())
        .merge(routes::products::router())
        .merge(routes::revenue::router())
        .merge(routes::insights::router())
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
