use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::Result;
use crate::core::extractor::ValidatedJson;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::quizzes::dtos::{
    GenerateQuizDto, QuizDetailDto, QuizResultDto, QuizSummaryDto, SaveProgressDto,
    SubmitQuizDto,
};
use crate::features::quizzes::services::{QuizGenerationService, QuizService};
use crate::shared::types::{ApiResponse, Meta, PaginationQuery};

/// Shared state for quiz handlers
#[derive(Clone)]
pub struct QuizState {
    pub quiz_service: Arc<QuizService>,
    pub generation_service: Arc<QuizGenerationService>,
}

/// Generate a new quiz with AI
///
/// Costs one credit (admins are exempt). The credit is refunded when
/// generation fails.
#[utoipa::path(
    post,
    path = "/api/quizzes",
    tag = "quizzes",
    request_body = GenerateQuizDto,
    responses(
        (status = 201, description = "Quiz generated", body = ApiResponse<QuizDetailDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required"),
        (status = 402, description = "No credits left"),
        (status = 404, description = "Topic or document not found"),
        (status = 502, description = "AI provider failed")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn generate_quiz(
    user: AuthenticatedUser,
    State(state): State<QuizState>,
    ValidatedJson(dto): ValidatedJson<GenerateQuizDto>,
) -> Result<(StatusCode, Json<ApiResponse<QuizDetailDto>>)> {
    let quiz = state.generation_service.generate(&user, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(quiz),
            Some("Quiz generated successfully".to_string()),
            None,
        )),
    ))
}

/// List the caller's quizzes, newest first
#[utoipa::path(
    get,
    path = "/api/quizzes",
    tag = "quizzes",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Caller's quizzes", body = ApiResponse<Vec<QuizSummaryDto>>),
        (status = 401, description = "Authentication required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_quizzes(
    user: AuthenticatedUser,
    State(state): State<QuizState>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<QuizSummaryDto>>>> {
    let (quizzes, total) = state.quiz_service.list(user.user_id, &pagination).await?;
    Ok(Json(ApiResponse::success(
        Some(quizzes),
        None,
        Some(Meta { total }),
    )))
}

/// Get a quiz with its questions
///
/// Correct answers and explanations are withheld until the quiz is completed.
#[utoipa::path(
    get,
    path = "/api/quizzes/{id}",
    tag = "quizzes",
    params(("id" = Uuid, Path, description = "Quiz ID")),
    responses(
        (status = 200, description = "Quiz details", body = ApiResponse<QuizDetailDto>),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Quiz not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_quiz(
    user: AuthenticatedUser,
    State(state): State<QuizState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<QuizDetailDto>>> {
    let quiz = state.quiz_service.get(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(Some(quiz), None, None)))
}

/// Save in-progress state (current step and answers so far)
#[utoipa::path(
    put,
    path = "/api/quizzes/{id}/progress",
    tag = "quizzes",
    params(("id" = Uuid, Path, description = "Quiz ID")),
    request_body = SaveProgressDto,
    responses(
        (status = 200, description = "Progress saved", body = ApiResponse<QuizDetailDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Quiz not found"),
        (status = 409, description = "Quiz already completed")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn save_progress(
    user: AuthenticatedUser,
    State(state): State<QuizState>,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<SaveProgressDto>,
) -> Result<Json<ApiResponse<QuizDetailDto>>> {
    let quiz = state.quiz_service.save_progress(user.user_id, id, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(quiz),
        Some("Progress saved".to_string()),
        None,
    )))
}

/// Submit answers and grade the quiz
#[utoipa::path(
    post,
    path = "/api/quizzes/{id}/submit",
    tag = "quizzes",
    params(("id" = Uuid, Path, description = "Quiz ID")),
    request_body = SubmitQuizDto,
    responses(
        (status = 200, description = "Quiz graded", body = ApiResponse<QuizResultDto>),
        (status = 400, description = "Answer for a question outside this quiz"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Quiz not found"),
        (status = 409, description = "Quiz already submitted"),
        (status = 502, description = "AI grading failed")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn submit_quiz(
    user: AuthenticatedUser,
    State(state): State<QuizState>,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<SubmitQuizDto>,
) -> Result<Json<ApiResponse<QuizResultDto>>> {
    let result = state.quiz_service.submit(user.user_id, id, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(result),
        Some("Quiz submitted".to_string()),
        None,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/quizzes/{id}",
    tag = "quizzes",
    params(("id" = Uuid, Path, description = "Quiz ID")),
    responses(
        (status = 200, description = "Quiz deleted"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Quiz not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_quiz(
    user: AuthenticatedUser,
    State(state): State<QuizState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    state.quiz_service.delete(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Quiz deleted".to_string()),
        None,
    )))
}
