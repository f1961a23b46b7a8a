use crate::features::users::handlers::user_handler;
use crate::features::users::services::UserService;
use axum::{routing::get, Router};
use std::sync::Arc;

pub fn routes(service: Arc<UserService>) -> Router {
    Router::new()
        .route(
            "/api/users/me",
            get(user_handler::get_profile)
                .patch(user_handler::update_profile)
                .delete(user_handler::delete_account),
        )
        .route("/api/users/me/stats", get(user_handler::get_stats))
        .with_state(service)
}
