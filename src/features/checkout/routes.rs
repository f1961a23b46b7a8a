use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::checkout::handlers::{
    create_checkout_session, payment_history, stripe_webhook,
};
use crate::features::checkout::services::CheckoutService;

/// Session and history routes (auth middleware applied by caller)
pub fn routes(service: Arc<CheckoutService>) -> Router {
    Router::new()
        .route("/api/checkout/session", post(create_checkout_session))
        .route("/api/checkout/history", get(payment_history))
        .with_state(service)
}

/// Public webhook route; verified by signature instead of session
pub fn webhook_routes(service: Arc<CheckoutService>) -> Router {
    Router::new()
        .route("/api/checkout/webhook", post(stripe_webhook))
        .with_state(service)
}
