use axum::{routing::get, Router};
use std::sync::Arc;

use crate::features::meta::handlers::{
    get_metadata, get_public_stats, list_difficulties, list_topics,
};
use crate::features::meta::services::MetaService;

/// Public routes; no session required
pub fn routes(service: Arc<MetaService>) -> Router {
    Router::new()
        .route("/api/meta/topics", get(list_topics))
        .route("/api/meta/difficulties", get(list_difficulties))
        .route("/api/meta/stats", get(get_public_stats))
        .route("/api/meta/{key}", get(get_metadata))
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::topics::TopicService;
    use crate::shared::test_helpers::lazy_pool;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::Value;

    #[tokio::test]
    async fn test_difficulties_are_public_and_static() {
        let pool = lazy_pool();
        let service = Arc::new(MetaService::new(
            pool.clone(),
            Arc::new(TopicService::new(pool)),
        ));
        let server = TestServer::new(routes(service)).unwrap();

        let response = server.get("/api/meta/difficulties").await;
        response.assert_status(StatusCode::OK);

        let body: Value = response.json();
        let values: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["value"].as_str().unwrap())
            .collect();
        assert_eq!(values, vec!["easy", "medium", "hard"]);
    }
}
