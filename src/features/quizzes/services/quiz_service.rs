use rust_decimal::prelude::ToPrimitive;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::quizzes::dtos::{
    AnswerDto, QuizDetailDto, QuizResultDto, QuizSummaryDto, SaveProgressDto, SubmitQuizDto,
};
use crate::features::quizzes::models::{Question, Quiz};
use crate::features::quizzes::services::grading::{compute_score, grade_locally};
use crate::features::quizzes::services::prompt_builder::{
    build_grading_prompt, GradingItem, GRADE_SYSTEM_PROMPT,
};
use crate::features::quizzes::services::quiz_output::ShortAnswerGrades;
use crate::shared::llm::{LlmOutput, StructuredGenerator};
use crate::shared::types::PaginationQuery;

/// Verdict for one question at submission time
#[derive(Debug, Clone, PartialEq)]
struct GradedAnswer {
    question_id: Uuid,
    user_answer: Option<String>,
    /// `None` while waiting for AI grading
    is_correct: Option<bool>,
    feedback: Option<String>,
}

/// Map answers by question id, rejecting ids that are not part of the quiz
fn index_answers(questions: &[Question], answers: Vec<AnswerDto>) -> Result<HashMap<Uuid, String>> {
    let known: HashSet<Uuid> = questions.iter().map(|q| q.id).collect();
    let mut indexed = HashMap::with_capacity(answers.len());
    for answer in answers {
        if !known.contains(&answer.question_id) {
            return Err(AppError::BadRequest(format!(
                "Question {} is not part of this quiz",
                answer.question_id
            )));
        }
        indexed.insert(answer.question_id, answer.answer);
    }
    Ok(indexed)
}

/// Grade every question locally; short answers that need judgement are returned for the model.
///
/// A submitted answer wins over one saved with progress.
fn grade_locally_all(
    questions: &[Question],
    answers: &HashMap<Uuid, String>,
) -> (Vec<GradedAnswer>, Vec<GradingItem>) {
    let mut graded = Vec::with_capacity(questions.len());
    let mut pending = Vec::new();

    for question in questions {
        let user_answer = answers
            .get(&question.id)
            .cloned()
            .or_else(|| question.user_answer.clone())
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        let is_correct = grade_locally(
            question.kind,
            &question.options.0,
            &question.correct_answer,
            user_answer.as_deref(),
        );

        if is_correct.is_none() {
            pending.push(GradingItem {
                question_id: question.id,
                prompt: question.prompt.clone(),
                correct_answer: question.correct_answer.clone(),
                user_answer: user_answer.clone().unwrap_or_default(),
            });
        }

        graded.push(GradedAnswer {
            question_id: question.id,
            user_answer,
            is_correct,
            feedback: None,
        });
    }

    (graded, pending)
}

/// Fill pending verdicts from the model; anything still missing counts as wrong
fn apply_ai_grades(graded: &mut [GradedAnswer], grades: ShortAnswerGrades) {
    let by_id: HashMap<Uuid, _> = grades
        .grades
        .into_iter()
        .map(|g| (g.question_id, g))
        .collect();

    for answer in graded.iter_mut().filter(|a| a.is_correct.is_none()) {
        match by_id.get(&answer.question_id) {
            Some(grade) => {
                answer.is_correct = Some(grade.is_correct);
                let feedback = grade.feedback.trim();
                answer.feedback = (!feedback.is_empty()).then(|| feedback.to_string());
            }
            None => answer.is_correct = Some(false),
        }
    }
}

/// Service for a student's own quizzes
pub struct QuizService {
    pool: PgPool,
    generator: StructuredGenerator,
}

impl QuizService {
    pub fn new(pool: PgPool, generator: StructuredGenerator) -> Self {
        Self { pool, generator }
    }

    /// Quiz owned by `user_id`; other users' quizzes are reported as missing
    async fn find_owned(&self, user_id: Uuid, quiz_id: Uuid) -> Result<Quiz> {
        sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE id = $1 AND user_id = $2")
            .bind(quiz_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))
    }

    async fn questions(&self, quiz_id: Uuid) -> Result<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            "SELECT * FROM questions WHERE quiz_id = $1 ORDER BY position",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<QuizSummaryDto>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quizzes WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let quizzes = sqlx::query_as::<_, Quiz>(
            r#"
            SELECT * FROM quizzes
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((quizzes.into_iter().map(Into::into).collect(), total))
    }

    pub async fn get(&self, user_id: Uuid, quiz_id: Uuid) -> Result<QuizDetailDto> {
        let quiz = self.find_owned(user_id, quiz_id).await?;
        let questions = self.questions(quiz.id).await?;
        Ok(QuizDetailDto::new(quiz, questions))
    }

    /// Persist the current step and any answers given so far
    pub async fn save_progress(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
        dto: SaveProgressDto,
    ) -> Result<QuizDetailDto> {
        let quiz = self.find_owned(user_id, quiz_id).await?;
        if quiz.is_completed() {
            return Err(AppError::Conflict("Quiz is already completed".to_string()));
        }
        if dto.current_step >= quiz.question_count {
            return Err(AppError::Validation(format!(
                "Current step must be less than {}",
                quiz.question_count
            )));
        }

        let questions = self.questions(quiz.id).await?;
        let answers = index_answers(&questions, dto.answers)?;

        let mut tx = self.pool.begin().await?;

        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            UPDATE quizzes
            SET current_step = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'in_progress'
            RETURNING *
            "#,
        )
        .bind(quiz.id)
        .bind(dto.current_step)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Conflict("Quiz is already completed".to_string()))?;

        for (question_id, answer) in &answers {
            let answer = answer.trim();
            sqlx::query("UPDATE questions SET user_answer = $3 WHERE id = $1 AND quiz_id = $2")
                .bind(question_id)
                .bind(quiz.id)
                .bind((!answer.is_empty()).then_some(answer))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!(
            "Progress saved: quiz={}, step={}, answers={}",
            quiz.id,
            quiz.current_step,
            answers.len()
        );

        let questions = self.questions(quiz.id).await?;
        Ok(QuizDetailDto::new(quiz, questions))
    }

    /// Grade the quiz and mark it completed. A second submission is a conflict.
    pub async fn submit(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
        dto: SubmitQuizDto,
    ) -> Result<QuizResultDto> {
        let quiz = self.find_owned(user_id, quiz_id).await?;
        if quiz.is_completed() {
            return Err(AppError::Conflict("Quiz has already been submitted".to_string()));
        }

        let questions = self.questions(quiz.id).await?;
        let answers = index_answers(&questions, dto.answers)?;
        let (mut graded, pending) = grade_locally_all(&questions, &answers);

        if !pending.is_empty() {
            let grades = self.grade_short_answers(&quiz.topic_slug, &pending).await?;
            apply_ai_grades(&mut graded, grades);
        }

        let total = graded.len();
        let correct = graded.iter().filter(|a| a.is_correct == Some(true)).count();
        let score = compute_score(correct, total);

        let mut tx = self.pool.begin().await?;

        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            UPDATE quizzes
            SET status = 'completed', score = $2, completed_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'in_progress'
            RETURNING *
            "#,
        )
        .bind(quiz.id)
        .bind(score)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Conflict("Quiz has already been submitted".to_string()))?;

        for answer in &graded {
            sqlx::query(
                r#"
                UPDATE questions
                SET user_answer = $2, is_correct = $3, feedback = $4
                WHERE id = $1
                "#,
            )
            .bind(answer.question_id)
            .bind(&answer.user_answer)
            .bind(answer.is_correct.unwrap_or(false))
            .bind(&answer.feedback)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            "Quiz submitted: id={}, user={}, score={}, correct={}/{}",
            quiz.id, user_id, score, correct, total
        );

        let questions = self.questions(quiz.id).await?;
        Ok(QuizResultDto {
            score: score.to_f64().unwrap_or(0.0),
            correct_count: correct as i32,
            total: total as i32,
            quiz: QuizDetailDto::new(quiz, questions),
        })
    }

    /// One model call for every short answer that was not an exact match
    async fn grade_short_answers(
        &self,
        topic_slug: &str,
        pending: &[GradingItem],
    ) -> Result<ShortAnswerGrades> {
        let topic_name: Option<String> =
            sqlx::query_scalar("SELECT name FROM topics WHERE slug = $1")
                .bind(topic_slug)
                .fetch_optional(&self.pool)
                .await?;

        let prompt = build_grading_prompt(
            topic_name.as_deref().unwrap_or(topic_slug),
            pending,
            ShortAnswerGrades::json_schema_string(),
        )?;

        let ids: Vec<Uuid> = pending.iter().map(|p| p.question_id).collect();
        self.generator
            .generate_checked(GRADE_SYSTEM_PROMPT, &prompt, |grades: &ShortAnswerGrades| {
                grades.check_covers(&ids)
            })
            .await
    }

    pub async fn delete(&self, user_id: Uuid, quiz_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1 AND user_id = $2")
            .bind(quiz_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }

        info!("Quiz deleted: id={}, user={}", quiz_id, user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::quizzes::models::QuestionKind;
    use crate::features::quizzes::services::quiz_output::ShortAnswerGrade;
    use crate::features::users::models::UserRole;
    use crate::shared::llm::structured::testing::ScriptedLlm;
    use crate::shared::test_helpers::{database_pool, insert_user};
    use rust_decimal::Decimal;
    use sqlx::types::Json;
    use std::sync::Arc;

    fn question(position: i32, kind: QuestionKind, options: &[&str], correct: &str) -> Question {
        Question {
            id: Uuid::from_u128(position as u128 + 1),
            quiz_id: Uuid::from_u128(0xF00),
            position,
            kind,
            prompt: format!("Question {}", position + 1),
            options: Json(options.iter().map(|s| s.to_string()).collect()),
            correct_answer: correct.to_string(),
            explanation: "Because.".to_string(),
            user_answer: None,
            is_correct: None,
            feedback: None,
        }
    }

    fn sample_questions() -> Vec<Question> {
        vec![
            question(0, QuestionKind::MultipleChoice, &["Au", "Ag", "Fe"], "Au"),
            question(1, QuestionKind::TrueFalse, &["True", "False"], "False"),
            question(2, QuestionKind::ShortAnswer, &[], "Avogadro's number"),
            question(3, QuestionKind::ShortAnswer, &[], "Covalent"),
        ]
    }

    fn answer(question: &Question, text: &str) -> AnswerDto {
        AnswerDto {
            question_id: question.id,
            answer: text.to_string(),
        }
    }

    #[test]
    fn test_index_answers_rejects_foreign_questions() {
        let questions = sample_questions();
        let stray = AnswerDto {
            question_id: Uuid::new_v4(),
            answer: "x".to_string(),
        };
        assert!(matches!(
            index_answers(&questions, vec![answer(&questions[0], "Au"), stray]),
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(
            index_answers(&questions, vec![answer(&questions[0], "Au")])
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_local_grading_defers_only_inexact_short_answers() {
        let questions = sample_questions();
        let answers = index_answers(
            &questions,
            vec![
                answer(&questions[0], "a"),
                answer(&questions[1], "no"),
                answer(&questions[2], "6.022 × 10^23"),
                answer(&questions[3], "covalent"),
            ],
        )
        .unwrap();

        let (graded, pending) = grade_locally_all(&questions, &answers);

        assert_eq!(graded[0].is_correct, Some(true));
        assert_eq!(graded[1].is_correct, Some(true));
        assert_eq!(graded[2].is_correct, None);
        assert_eq!(graded[3].is_correct, Some(true));
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].question_id, questions[2].id);
        assert_eq!(pending[0].user_answer, "6.022 × 10^23");
    }

    #[test]
    fn test_unanswered_questions_are_wrong_without_ai() {
        let questions = sample_questions();
        let (graded, pending) = grade_locally_all(&questions, &HashMap::new());
        assert!(pending.is_empty());
        assert!(graded.iter().all(|a| a.is_correct == Some(false)));
        assert!(graded.iter().all(|a| a.user_answer.is_none()));
    }

    #[test]
    fn test_saved_progress_answer_is_used_when_not_resubmitted() {
        let mut questions = sample_questions();
        questions[1].user_answer = Some("False".to_string());
        let (graded, _) = grade_locally_all(&questions, &HashMap::new());
        assert_eq!(graded[1].is_correct, Some(true));
        assert_eq!(graded[1].user_answer.as_deref(), Some("False"));
    }

    #[test]
    fn test_apply_ai_grades_fills_pending_only() {
        let questions = sample_questions();
        let answers = index_answers(
            &questions,
            vec![
                answer(&questions[2], "the mole constant"),
                answer(&questions[3], "ionic"),
            ],
        )
        .unwrap();
        let (mut graded, pending) = grade_locally_all(&questions, &answers);
        assert_eq!(pending.len(), 2);

        apply_ai_grades(
            &mut graded,
            ShortAnswerGrades {
                grades: vec![ShortAnswerGrade {
                    question_id: questions[2].id,
                    is_correct: true,
                    feedback: " Close enough: that is Avogadro's constant. ".to_string(),
                }],
            },
        );

        assert_eq!(graded[0].is_correct, Some(false));
        assert_eq!(graded[2].is_correct, Some(true));
        assert_eq!(
            graded[2].feedback.as_deref(),
            Some("Close enough: that is Avogadro's constant.")
        );
        assert_eq!(graded[3].is_correct, Some(false));

        let correct = graded.iter().filter(|a| a.is_correct == Some(true)).count();
        assert_eq!(compute_score(correct, graded.len()), Decimal::new(2500, 2));
    }

    /// One-question true/false quiz owned by `user_id`; returns (quiz id, question id)
    async fn insert_quiz(pool: &PgPool, user_id: Uuid) -> (Uuid, Uuid) {
        let quiz_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO quizzes (user_id, topic_slug, difficulty, title, question_count)
            VALUES ($1, 'physics', 'easy', 'Inertia', 1)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap();

        let question_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO questions (quiz_id, position, kind, prompt, options, correct_answer, explanation)
            VALUES ($1, 0, 'true_false', 'Mass measures inertia.', '["True", "False"]'::jsonb, 'True', 'It does.')
            RETURNING id
            "#,
        )
        .bind(quiz_id)
        .fetch_one(pool)
        .await
        .unwrap();

        (quiz_id, question_id)
    }

    #[tokio::test]
    async fn test_second_submission_is_a_conflict() {
        let Some(pool) = database_pool().await else {
            return;
        };
        let user = insert_user(&pool, UserRole::User, 0).await;
        let (quiz_id, question_id) = insert_quiz(&pool, user.user_id).await;
        let llm = Arc::new(ScriptedLlm::ok(&[]));
        let service = QuizService::new(pool.clone(), StructuredGenerator::new(llm.clone()));

        let submission = || SubmitQuizDto {
            answers: vec![AnswerDto {
                question_id,
                answer: "true".to_string(),
            }],
        };

        let result = service
            .submit(user.user_id, quiz_id, submission())
            .await
            .unwrap();
        assert_eq!(result.correct_count, 1);
        assert_eq!(result.total, 1);
        assert_eq!(result.score, 100.0);
        assert_eq!(llm.calls(), 0);

        let again = service.submit(user.user_id, quiz_id, submission()).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));

        let progress = service
            .save_progress(
                user.user_id,
                quiz_id,
                SaveProgressDto {
                    current_step: 0,
                    answers: vec![],
                },
            )
            .await;
        assert!(matches!(progress, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_other_users_quiz_is_not_found() {
        let Some(pool) = database_pool().await else {
            return;
        };
        let owner = insert_user(&pool, UserRole::User, 0).await;
        let stranger = insert_user(&pool, UserRole::User, 0).await;
        let (quiz_id, _) = insert_quiz(&pool, owner.user_id).await;
        let service = QuizService::new(
            pool.clone(),
            StructuredGenerator::new(Arc::new(ScriptedLlm::ok(&[]))),
        );

        let result = service.get(stranger.user_id, quiz_id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(service.get(owner.user_id, quiz_id).await.is_ok());
    }
}
