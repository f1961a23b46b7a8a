use crate::features::auth::handlers;
use crate::features::auth::services::AuthService;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Public auth routes (no authentication required)
pub fn public_routes(service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/api/auth/magic-link", post(handlers::request_magic_link))
        .route("/api/auth/callback", get(handlers::callback))
        .route("/auth/signin/email", post(handlers::signin_email))
        .with_state(service)
}

/// Protected auth routes (require a session token)
pub fn protected_routes() -> Router {
    Router::new().route("/api/auth/me", get(handlers::get_me))
}
