use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::features::quizzes::handlers::{
    delete_quiz, generate_quiz, get_quiz, list_quizzes, save_progress, submit_quiz, QuizState,
};
use crate::features::quizzes::services::{QuizGenerationService, QuizService};

/// Create routes for the quizzes feature (auth middleware applied by caller)
pub fn routes(
    quiz_service: Arc<QuizService>,
    generation_service: Arc<QuizGenerationService>,
) -> Router {
    let state = QuizState {
        quiz_service,
        generation_service,
    };

    Router::new()
        .route("/api/quizzes", post(generate_quiz).get(list_quizzes))
        .route("/api/quizzes/{id}", get(get_quiz).delete(delete_quiz))
        .route("/api/quizzes/{id}/progress", put(save_progress))
        .route("/api/quizzes/{id}/submit", post(submit_quiz))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::documents::DocumentService;
    use crate::features::topics::TopicService;
    use crate::modules::storage::testing::MemoryObjectStore;
    use crate::shared::llm::structured::testing::ScriptedLlm;
    use crate::shared::llm::StructuredGenerator;
    use crate::shared::test_helpers::{lazy_pool, with_user_auth};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;

    fn router(llm: Arc<ScriptedLlm>) -> Router {
        let pool = lazy_pool();
        let generator = StructuredGenerator::new(llm);
        let topics = Arc::new(TopicService::new(pool.clone()));
        let documents = Arc::new(DocumentService::new(
            pool.clone(),
            Arc::new(MemoryObjectStore::default()),
        ));
        routes(
            Arc::new(QuizService::new(pool.clone(), generator.clone())),
            Arc::new(QuizGenerationService::new(pool, generator, topics, documents)),
        )
    }

    #[tokio::test]
    async fn test_quiz_routes_require_sign_in() {
        let server = TestServer::new(router(Arc::new(ScriptedLlm::ok(&[])))).unwrap();

        server.get("/api/quizzes").await.assert_status(StatusCode::UNAUTHORIZED);
        server
            .post("/api/quizzes")
            .json(&json!({"topic": "physics", "difficulty": "easy"}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_generate_validates_before_calling_ai() {
        let llm = Arc::new(ScriptedLlm::ok(&[]));
        let server = TestServer::new(with_user_auth(router(llm.clone()))).unwrap();

        let response = server
            .post("/api/quizzes")
            .json(&json!({"topic": "physics", "difficulty": "easy", "question_count": 0}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .post("/api/quizzes")
            .json(&json!({"topic": "physics", "difficulty": "impossible"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_progress_rejects_negative_step() {
        let server =
            TestServer::new(with_user_auth(router(Arc::new(ScriptedLlm::ok(&[]))))).unwrap();

        let response = server
            .put(&format!("/api/quizzes/{}/progress", uuid::Uuid::new_v4()))
            .json(&json!({"current_step": -1, "answers": []}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
