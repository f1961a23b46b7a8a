use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::quizzes::models::{Question, QuestionKind, Quiz, QuizDifficulty, QuizStatus};
use crate::shared::constants::{DEFAULT_QUESTION_COUNT, MAX_QUESTION_COUNT};

// =============================================================================
// Request DTOs
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct GenerateQuizDto {
    /// Topic slug; the topic must exist and be active
    #[validate(length(min = 1, max = 64, message = "Topic is required"))]
    pub topic: String,

    pub difficulty: QuizDifficulty,

    #[serde(default = "default_question_count")]
    #[validate(range(min = 1, max = MAX_QUESTION_COUNT, message = "Question count must be between 1 and 20"))]
    pub question_count: i32,

    /// Allowed question kinds; all kinds when omitted
    #[validate(length(min = 1, message = "At least one question kind is required"))]
    pub question_kinds: Option<Vec<QuestionKind>>,

    /// Caller-owned documents to draw questions from
    #[serde(default)]
    #[validate(length(max = 5, message = "At most 5 documents can be used per quiz"))]
    pub document_ids: Vec<Uuid>,

    #[validate(length(max = 500, message = "Instructions must not exceed 500 characters"))]
    pub instructions: Option<String>,
}

fn default_question_count() -> i32 {
    DEFAULT_QUESTION_COUNT
}

impl GenerateQuizDto {
    /// Requested kinds, deduplicated, defaulting to every kind
    pub fn kinds(&self) -> Vec<QuestionKind> {
        match &self.question_kinds {
            Some(kinds) => {
                let mut unique = Vec::with_capacity(kinds.len());
                for kind in kinds {
                    if !unique.contains(kind) {
                        unique.push(*kind);
                    }
                }
                unique
            }
            None => QuestionKind::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct AnswerDto {
    pub question_id: Uuid,

    #[validate(length(max = 2000, message = "Answer must not exceed 2000 characters"))]
    pub answer: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SaveProgressDto {
    #[validate(range(min = 0, message = "Current step must not be negative"))]
    pub current_step: i32,

    #[serde(default)]
    #[validate(nested)]
    pub answers: Vec<AnswerDto>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SubmitQuizDto {
    #[serde(default)]
    #[validate(nested)]
    pub answers: Vec<AnswerDto>,
}

// =============================================================================
// Response DTOs
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuizSummaryDto {
    pub id: Uuid,
    pub topic_slug: String,
    pub difficulty: QuizDifficulty,
    pub title: String,
    pub status: QuizStatus,
    pub question_count: i32,
    pub current_step: i32,
    pub score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Quiz> for QuizSummaryDto {
    fn from(q: Quiz) -> Self {
        Self {
            id: q.id,
            topic_slug: q.topic_slug,
            difficulty: q.difficulty,
            title: q.title,
            status: q.status,
            question_count: q.question_count,
            current_step: q.current_step,
            score: q.score.and_then(|s| s.to_f64()),
            created_at: q.created_at,
            completed_at: q.completed_at,
        }
    }
}

/// A question as shown to its owner.
///
/// `correct_answer`, `explanation`, `is_correct` and `feedback` stay `None`
/// until the quiz is completed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuestionDto {
    pub id: Uuid,
    pub position: i32,
    pub kind: QuestionKind,
    pub prompt: String,
    pub options: Vec<String>,
    pub user_answer: Option<String>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub is_correct: Option<bool>,
    pub feedback: Option<String>,
}

impl QuestionDto {
    pub fn from_question(q: Question, reveal: bool) -> Self {
        Self {
            id: q.id,
            position: q.position,
            kind: q.kind,
            prompt: q.prompt,
            options: q.options.0,
            user_answer: q.user_answer,
            correct_answer: reveal.then_some(q.correct_answer),
            explanation: reveal.then_some(q.explanation),
            is_correct: if reveal { q.is_correct } else { None },
            feedback: if reveal { q.feedback } else { None },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuizDetailDto {
    #[serde(flatten)]
    pub quiz: QuizSummaryDto,
    pub questions: Vec<QuestionDto>,
}

impl QuizDetailDto {
    pub fn new(quiz: Quiz, questions: Vec<Question>) -> Self {
        let reveal = quiz.is_completed();
        Self {
            quiz: quiz.into(),
            questions: questions
                .into_iter()
                .map(|q| QuestionDto::from_question(q, reveal))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuizResultDto {
    pub score: f64,
    pub correct_count: i32,
    pub total: i32,
    pub quiz: QuizDetailDto,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use sqlx::types::Json;

    fn quiz(status: QuizStatus) -> Quiz {
        Quiz {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            topic_slug: "chemistry".to_string(),
            difficulty: QuizDifficulty::Medium,
            title: "Acids and Bases".to_string(),
            status,
            question_count: 1,
            current_step: 0,
            score: (status == QuizStatus::Completed).then(|| Decimal::new(10000, 2)),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            completed_at: None,
        }
    }

    fn question(quiz_id: Uuid) -> Question {
        Question {
            id: Uuid::new_v4(),
            quiz_id,
            position: 0,
            kind: QuestionKind::TrueFalse,
            prompt: "Pure water has a pH of 7 at 25°C.".to_string(),
            options: Json(vec!["True".to_string(), "False".to_string()]),
            correct_answer: "True".to_string(),
            explanation: "Neutral water has equal H+ and OH- concentrations.".to_string(),
            user_answer: Some("true".to_string()),
            is_correct: Some(true),
            feedback: None,
        }
    }

    #[test]
    fn test_answers_withheld_until_completed() {
        let q = quiz(QuizStatus::InProgress);
        let detail = QuizDetailDto::new(q.clone(), vec![question(q.id)]);
        let dto = &detail.questions[0];
        assert_eq!(dto.correct_answer, None);
        assert_eq!(dto.explanation, None);
        assert_eq!(dto.is_correct, None);
        assert_eq!(dto.user_answer.as_deref(), Some("true"));

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["questions"][0]["correct_answer"], serde_json::Value::Null);
        assert_eq!(json["status"], "in_progress");
    }

    #[test]
    fn test_answers_revealed_after_completion() {
        let q = quiz(QuizStatus::Completed);
        let detail = QuizDetailDto::new(q.clone(), vec![question(q.id)]);
        assert_eq!(detail.quiz.score, Some(100.0));
        assert_eq!(detail.questions[0].correct_answer.as_deref(), Some("True"));
        assert!(detail.questions[0].explanation.is_some());
        assert_eq!(detail.questions[0].is_correct, Some(true));
    }

    #[test]
    fn test_generate_dto_defaults_and_limits() {
        let dto: GenerateQuizDto =
            serde_json::from_str(r#"{"topic": "physics", "difficulty": "hard"}"#).unwrap();
        assert_eq!(dto.question_count, 10);
        assert_eq!(dto.kinds(), QuestionKind::ALL.to_vec());
        assert!(dto.validate().is_ok());

        let dto: GenerateQuizDto = serde_json::from_str(
            r#"{"topic": "physics", "difficulty": "hard", "question_count": 21}"#,
        )
        .unwrap();
        assert!(dto.validate().is_err());

        let dto: GenerateQuizDto = serde_json::from_str(
            r#"{"topic": "physics", "difficulty": "easy", "question_kinds": []}"#,
        )
        .unwrap();
        assert!(dto.validate().is_err());

        let dto: GenerateQuizDto = serde_json::from_str(
            r#"{"topic": "physics", "difficulty": "easy",
                "question_kinds": ["true_false", "true_false", "short_answer"]}"#,
        )
        .unwrap();
        assert_eq!(
            dto.kinds(),
            vec![QuestionKind::TrueFalse, QuestionKind::ShortAnswer]
        );
    }

    #[test]
    fn test_generate_dto_rejects_too_many_documents() {
        let ids: Vec<String> = (0..6).map(|_| format!("\"{}\"", Uuid::new_v4())).collect();
        let body = format!(
            r#"{{"topic": "biology", "difficulty": "easy", "document_ids": [{}]}}"#,
            ids.join(",")
        );
        let dto: GenerateQuizDto = serde_json::from_str(&body).unwrap();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_generate_dto_rejects_unknown_difficulty() {
        let result =
            serde_json::from_str::<GenerateQuizDto>(r#"{"topic": "physics", "difficulty": "expert"}"#);
        assert!(result.is_err());
    }
}
