use axum::{
    routing::{delete, get, patch, put},
    Router,
};

use crate::features::admin::handlers::{self, AdminState};

pub fn routes(state: AdminState) -> Router {
    Router::new()
        .route("/users", get(handlers::list_users))
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/documents", get(handlers::list_documents))
        .route("/documents/{id}", delete(handlers::delete_document))
        .route(
            "/topics",
            get(handlers::list_topics).post(handlers::create_topic),
        )
        .route(
            "/topics/{slug}",
            patch(handlers::update_topic).delete(handlers::delete_topic),
        )
        .route("/reports", get(handlers::list_reports))
        .route("/reports/{id}", patch(handlers::update_report))
        .route("/metadata/{key}", put(handlers::upsert_metadata))
        .route("/stats", get(handlers::get_stats))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::admin::AdminService;
    use crate::features::documents::DocumentService;
    use crate::features::meta::MetaService;
    use crate::features::reports::ReportService;
    use crate::features::topics::TopicService;
    use crate::features::users::UserService;
    use crate::modules::storage::testing::MemoryObjectStore;
    use crate::shared::test_helpers::{lazy_pool, with_admin_auth, with_user_auth};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;
    use std::sync::Arc;

    fn router() -> Router {
        let pool = lazy_pool();
        let store = Arc::new(MemoryObjectStore::default());
        let topics = Arc::new(TopicService::new(pool.clone()));
        let users = Arc::new(UserService::new(pool.clone(), store.clone()));
        let state = AdminState {
            admin_service: Arc::new(AdminService::new(pool.clone(), users)),
            document_service: Arc::new(DocumentService::new(pool.clone(), store)),
            topic_service: topics.clone(),
            report_service: Arc::new(ReportService::new(pool.clone())),
            meta_service: Arc::new(MetaService::new(pool, topics)),
        };
        Router::new().nest("/api/admin", routes(state))
    }

    #[tokio::test]
    async fn test_admin_routes_require_auth() {
        let server = TestServer::new(router()).unwrap();

        let response = server.get("/api/admin/stats").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_routes_reject_regular_users() {
        let server = TestServer::new(with_user_auth(router())).unwrap();

        server
            .get("/api/admin/users")
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .put("/api/admin/metadata/banner.message")
            .json(&json!({ "value": "hello", "is_public": true }))
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .delete("/api/admin/topics/algebra")
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_update_user_rejects_negative_credits() {
        let server = TestServer::new(with_admin_auth(router())).unwrap();

        let response = server
            .patch(&format!("/api/admin/users/{}", uuid::Uuid::new_v4()))
            .json(&json!({ "credits": -5 }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_topic_rejects_bad_slug() {
        let server = TestServer::new(with_admin_auth(router())).unwrap();

        let response = server
            .post("/api/admin/topics")
            .json(&json!({ "slug": "Not A Slug", "name": "Algebra" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_metadata_key_is_validated() {
        let server = TestServer::new(with_admin_auth(router())).unwrap();

        let response = server
            .put("/api/admin/metadata/Bad..Key")
            .json(&json!({ "value": 1 }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_counter_metadata_rejects_non_integer_value() {
        let server = TestServer::new(with_admin_auth(router())).unwrap();

        let response = server
            .put("/api/admin/metadata/quizzes_generated")
            .json(&json!({ "value": "lots", "is_public": true }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
