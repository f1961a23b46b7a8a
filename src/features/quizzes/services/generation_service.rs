use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::documents::DocumentService;
use crate::features::meta::increment_counter;
use crate::features::quizzes::dtos::{GenerateQuizDto, QuizDetailDto};
use crate::features::quizzes::models::{Question, Quiz};
use crate::features::quizzes::services::prompt_builder::{
    QuizPromptBuilder, GENERATE_SYSTEM_PROMPT,
};
use crate::features::quizzes::services::quiz_output::GeneratedQuiz;
use crate::features::topics::TopicService;
use crate::shared::constants::{METADATA_QUIZZES_GENERATED, QUIZ_GENERATION_COST};
use crate::shared::llm::{LlmOutput, StructuredGenerator};

/// Turns a generation request into a stored quiz, charging one credit
pub struct QuizGenerationService {
    pool: PgPool,
    generator: StructuredGenerator,
    topics: Arc<TopicService>,
    documents: Arc<DocumentService>,
}

impl QuizGenerationService {
    pub fn new(
        pool: PgPool,
        generator: StructuredGenerator,
        topics: Arc<TopicService>,
        documents: Arc<DocumentService>,
    ) -> Self {
        Self {
            pool,
            generator,
            topics,
            documents,
        }
    }

    pub async fn generate(
        &self,
        user: &AuthenticatedUser,
        dto: GenerateQuizDto,
    ) -> Result<QuizDetailDto> {
        let topic = self.topics.get_active(&dto.topic).await?;

        let query = match dto.instructions.as_deref() {
            Some(instructions) => format!("{} {}", topic.name, instructions),
            None => topic.name.clone(),
        };
        let context = self
            .documents
            .context_chunks(user.user_id, &dto.document_ids, &query)
            .await?;

        let charged = !user.is_admin();
        if charged {
            self.take_credit(user.user_id).await?;
        }

        let result = self
            .generate_and_store(user.user_id, &topic.name, &topic.slug, &dto, context)
            .await;

        if result.is_err() && charged {
            if let Err(e) = self.refund_credit(user.user_id).await {
                warn!("Failed to refund credit for user {}: {}", user.user_id, e);
            }
        }

        result
    }

    async fn generate_and_store(
        &self,
        user_id: Uuid,
        topic_name: &str,
        topic_slug: &str,
        dto: &GenerateQuizDto,
        context: Vec<String>,
    ) -> Result<QuizDetailDto> {
        let generated = request_quiz(&self.generator, topic_name, dto, context).await?;

        let mut tx = self.pool.begin().await?;

        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            INSERT INTO quizzes (user_id, topic_slug, difficulty, title, question_count)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(topic_slug)
        .bind(dto.difficulty)
        .bind(&generated.title)
        .bind(dto.question_count)
        .fetch_one(&mut *tx)
        .await?;

        let mut questions = Vec::with_capacity(generated.questions.len());
        for (position, q) in generated.questions.into_iter().enumerate() {
            let question = sqlx::query_as::<_, Question>(
                r#"
                INSERT INTO questions (quiz_id, position, kind, prompt, options, correct_answer, explanation)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
            )
            .bind(quiz.id)
            .bind(position as i32)
            .bind(q.kind)
            .bind(&q.prompt)
            .bind(sqlx::types::Json(&q.options))
            .bind(&q.correct_answer)
            .bind(&q.explanation)
            .fetch_one(&mut *tx)
            .await?;
            questions.push(question);
        }

        increment_counter(&mut *tx, METADATA_QUIZZES_GENERATED).await?;

        tx.commit().await?;

        info!(
            "Quiz generated: id={}, user={}, topic={}, questions={}",
            quiz.id,
            user_id,
            topic_slug,
            questions.len()
        );

        Ok(QuizDetailDto::new(quiz, questions))
    }

    /// Atomically take one credit; 402 when the balance is empty
    async fn take_credit(&self, user_id: Uuid) -> Result<()> {
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET credits = credits - $2, updated_at = NOW()
            WHERE id = $1 AND credits >= $2
            RETURNING credits
            "#,
        )
        .bind(user_id)
        .bind(QUIZ_GENERATION_COST)
        .fetch_optional(&self.pool)
        .await?;

        match remaining {
            Some(_) => Ok(()),
            None => Err(AppError::PaymentRequired(
                "No credits left. Buy a credit pack to generate more quizzes".to_string(),
            )),
        }
    }

    async fn refund_credit(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET credits = credits + $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(QUIZ_GENERATION_COST)
            .execute(&self.pool)
            .await?;
        info!("Refunded {} credit(s) to user {}", QUIZ_GENERATION_COST, user_id);
        Ok(())
    }
}

/// Build the prompt and ask the model for a quiz matching the request exactly
async fn request_quiz(
    generator: &StructuredGenerator,
    topic_name: &str,
    dto: &GenerateQuizDto,
    context: Vec<String>,
) -> Result<GeneratedQuiz> {
    let kinds = dto.kinds();
    let count = dto.question_count as usize;

    let prompt = QuizPromptBuilder::new()
        .topic(topic_name)
        .difficulty(dto.difficulty)
        .question_count(dto.question_count)
        .question_kinds(&kinds)
        .context(context)
        .instructions(dto.instructions.as_deref())
        .output_schema(GeneratedQuiz::json_schema_string())
        .build()?;

    let generated: GeneratedQuiz = generator
        .generate_checked(GENERATE_SYSTEM_PROMPT, &prompt, |quiz: &GeneratedQuiz| {
            quiz.check_request(count, &kinds)
        })
        .await?;

    Ok(generated.normalized())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::quizzes::models::{QuestionKind, QuizDifficulty};
    use crate::features::users::models::UserRole;
    use crate::modules::storage::testing::MemoryObjectStore;
    use crate::shared::llm::client::LlmError;
    use crate::shared::llm::structured::testing::ScriptedLlm;
    use crate::shared::test_helpers::{credits_of, database_pool, insert_user};

    fn request(count: i32, kinds: Option<Vec<QuestionKind>>) -> GenerateQuizDto {
        GenerateQuizDto {
            topic: "physics".to_string(),
            difficulty: QuizDifficulty::Easy,
            question_count: count,
            question_kinds: kinds,
            document_ids: vec![],
            instructions: Some("Newton's laws only".to_string()),
        }
    }

    const TWO_TRUE_FALSE: &str = r#"{
        "title": "Newton's Laws",
        "questions": [
            {"kind": "true_false", "prompt": "An object at rest stays at rest unless acted on by a net force.",
             "options": ["True", "False"], "correct_answer": "true", "explanation": "First law."},
            {"kind": "true_false", "prompt": "Force equals mass divided by acceleration.",
             "options": ["True", "False"], "correct_answer": "False", "explanation": "F = ma."}
        ]
    }"#;

    #[tokio::test]
    async fn test_request_quiz_accepts_matching_output() {
        let llm = Arc::new(ScriptedLlm::ok(&[TWO_TRUE_FALSE]));
        let generator = StructuredGenerator::new(llm.clone());

        let quiz = request_quiz(
            &generator,
            "Physics",
            &request(2, Some(vec![QuestionKind::TrueFalse])),
            vec!["Inertia is resistance to change in motion.".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(quiz.questions.len(), 2);
        assert_eq!(quiz.questions[0].correct_answer, "True");
        assert_eq!(llm.calls(), 1);

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Exactly 2 questions"));
        assert!(prompts[0].contains("Newton's laws only"));
        assert!(prompts[0].contains("Inertia is resistance"));
    }

    #[tokio::test]
    async fn test_request_quiz_wrong_count_goes_through_fixer() {
        let llm = Arc::new(ScriptedLlm::ok(&[TWO_TRUE_FALSE, TWO_TRUE_FALSE]));
        let generator = StructuredGenerator::new(llm.clone());

        let result = request_quiz(&generator, "Physics", &request(3, None), vec![]).await;

        assert!(matches!(result, Err(AppError::ExternalServiceError(_))));
        assert_eq!(llm.calls(), 2);
        assert!(llm.prompts.lock().unwrap()[1].contains("expected exactly 3 questions, got 2"));
    }

    #[tokio::test]
    async fn test_request_quiz_rejects_unrequested_kind() {
        let llm = Arc::new(ScriptedLlm::ok(&[TWO_TRUE_FALSE, TWO_TRUE_FALSE]));
        let generator = StructuredGenerator::new(llm.clone());

        let result = request_quiz(
            &generator,
            "Physics",
            &request(2, Some(vec![QuestionKind::MultipleChoice])),
            vec![],
        )
        .await;

        assert!(result.is_err());
        assert_eq!(llm.calls(), 2);
    }

    fn service_with(pool: PgPool, llm: Arc<ScriptedLlm>) -> QuizGenerationService {
        QuizGenerationService::new(
            pool.clone(),
            StructuredGenerator::new(llm),
            Arc::new(TopicService::new(pool.clone())),
            Arc::new(DocumentService::new(
                pool,
                Arc::new(MemoryObjectStore::default()),
            )),
        )
    }

    async fn quiz_count(pool: &PgPool, user_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM quizzes WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn quizzes_generated(pool: &PgPool) -> i64 {
        sqlx::query_scalar::<_, Option<i64>>(
            "SELECT (value #>> '{}')::bigint FROM metadata WHERE key = $1",
        )
        .bind(METADATA_QUIZZES_GENERATED)
        .fetch_optional(pool)
        .await
        .unwrap()
        .flatten()
        .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_generation_charges_one_credit_and_stores_quiz() {
        let Some(pool) = database_pool().await else {
            return;
        };
        let user = insert_user(&pool, UserRole::User, 1).await;
        let counter_before = quizzes_generated(&pool).await;
        let llm = Arc::new(ScriptedLlm::ok(&[TWO_TRUE_FALSE]));

        let quiz = service_with(pool.clone(), llm)
            .generate(&user, request(2, Some(vec![QuestionKind::TrueFalse])))
            .await
            .unwrap();

        assert_eq!(quiz.questions.len(), 2);
        assert_eq!(credits_of(&pool, user.user_id).await, 0);

        let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE quiz_id = $1")
            .bind(quiz.quiz.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stored, 2);
        assert!(quizzes_generated(&pool).await > counter_before);
    }

    #[tokio::test]
    async fn test_failed_generation_refunds_the_credit() {
        let Some(pool) = database_pool().await else {
            return;
        };
        let user = insert_user(&pool, UserRole::User, 2).await;
        let llm = Arc::new(ScriptedLlm::new(vec![Err(LlmError::Request(
            "upstream timeout".to_string(),
        ))]));

        let result = service_with(pool.clone(), llm.clone())
            .generate(&user, request(2, None))
            .await;

        assert!(matches!(result, Err(AppError::ExternalServiceError(_))));
        assert_eq!(llm.calls(), 1);
        assert_eq!(credits_of(&pool, user.user_id).await, 2);
        assert_eq!(quiz_count(&pool, user.user_id).await, 0);
    }

    #[tokio::test]
    async fn test_empty_balance_is_payment_required() {
        let Some(pool) = database_pool().await else {
            return;
        };
        let user = insert_user(&pool, UserRole::User, 0).await;
        let llm = Arc::new(ScriptedLlm::ok(&[TWO_TRUE_FALSE]));

        let result = service_with(pool.clone(), llm.clone())
            .generate(&user, request(2, Some(vec![QuestionKind::TrueFalse])))
            .await;

        assert!(matches!(result, Err(AppError::PaymentRequired(_))));
        assert_eq!(llm.calls(), 0);
        assert_eq!(credits_of(&pool, user.user_id).await, 0);
        assert_eq!(quiz_count(&pool, user.user_id).await, 0);
    }

    #[tokio::test]
    async fn test_admins_generate_without_credits() {
        let Some(pool) = database_pool().await else {
            return;
        };
        let admin = insert_user(&pool, UserRole::Admin, 0).await;
        let llm = Arc::new(ScriptedLlm::ok(&[TWO_TRUE_FALSE]));

        service_with(pool.clone(), llm)
            .generate(&admin, request(2, Some(vec![QuestionKind::TrueFalse])))
            .await
            .unwrap();

        assert_eq!(credits_of(&pool, admin.user_id).await, 0);
        assert_eq!(quiz_count(&pool, admin.user_id).await, 1);
    }
}
