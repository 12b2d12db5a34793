//! JSON HTTP transport over the services.

pub mod dto;
mod error;
pub mod handlers;

use crate::models::evidence::MAX_EVIDENCE_BYTES;
use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// One base64-encoded image at the upload limit plus the rest of the JSON body
pub const MAX_REQUEST_BYTES: usize = (MAX_EVIDENCE_BYTES + 2) / 3 * 4 + 64 * 1024;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/courts/{court_id}/availability", get(handlers::list_availability))
        .route("/courts/{court_id}/bookings", post(handlers::reserve))
        .route("/customers/{customer_id}/bookings", get(handlers::customer_bookings))
        .route("/bookings/{booking_id}/cancellation", post(handlers::request_cancellation))
        .route("/bookings/{booking_id}/refund", post(handlers::approve_refund))
        .route("/settlements/run", post(handlers::run_settlement))
        .route("/owners/{owner_id}/payouts", get(handlers::owner_payouts))
        .route("/owners/{owner_id}/payouts/complete", post(handlers::complete_payout))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
