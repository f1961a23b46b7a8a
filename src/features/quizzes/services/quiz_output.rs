use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::features::quizzes::models::QuestionKind;
use crate::features::quizzes::services::grading::{normalize_answer, parse_bool_answer};
use crate::shared::llm::LlmOutput;

const TRUE_FALSE_OPTIONS: [&str; 2] = ["True", "False"];

/// Quiz as produced by the model
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "GeneratedQuiz")]
pub struct GeneratedQuiz {
    #[schemars(description = "Short descriptive title for the quiz (max 150 characters)")]
    pub title: String,

    #[schemars(description = "The questions, in the order they should be asked")]
    pub questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedQuestion {
    #[schemars(description = "One of: multiple_choice, true_false, short_answer")]
    pub kind: QuestionKind,

    #[schemars(description = "The question text shown to the student")]
    pub prompt: String,

    #[serde(default)]
    #[schemars(
        description = "Answer options: 4 for multiple_choice, [\"True\", \"False\"] for true_false, empty for short_answer"
    )]
    pub options: Vec<String>,

    #[schemars(description = "The correct answer; for multiple_choice copy the option text verbatim")]
    pub correct_answer: String,

    #[schemars(description = "One or two sentences explaining the correct answer")]
    pub explanation: String,
}

impl GeneratedQuestion {
    fn check(&self) -> Result<(), String> {
        if self.prompt.trim().is_empty() {
            return Err("prompt is empty".to_string());
        }
        if self.correct_answer.trim().is_empty() {
            return Err("correct_answer is empty".to_string());
        }

        match self.kind {
            QuestionKind::MultipleChoice => {
                if !(2..=6).contains(&self.options.len()) {
                    return Err(format!(
                        "multiple_choice needs 2 to 6 options, got {}",
                        self.options.len()
                    ));
                }
                let mut seen = HashSet::new();
                for option in &self.options {
                    let key = normalize_answer(option);
                    if key.is_empty() {
                        return Err("options must not be empty strings".to_string());
                    }
                    if !seen.insert(key) {
                        return Err(format!("duplicate option '{}'", option.trim()));
                    }
                }
                if !seen.contains(&normalize_answer(&self.correct_answer)) {
                    return Err(format!(
                        "correct_answer '{}' is not one of the options",
                        self.correct_answer.trim()
                    ));
                }
            }
            QuestionKind::TrueFalse => {
                let options_ok = self.options.is_empty()
                    || (self.options.len() == 2
                        && self.options.iter().zip(TRUE_FALSE_OPTIONS).all(|(o, expected)| {
                            o.trim().eq_ignore_ascii_case(expected)
                        }));
                if !options_ok {
                    return Err("true_false options must be [\"True\", \"False\"]".to_string());
                }
                if parse_bool_answer(&self.correct_answer).is_none() {
                    return Err(format!(
                        "true_false correct_answer must be True or False, got '{}'",
                        self.correct_answer.trim()
                    ));
                }
            }
            QuestionKind::ShortAnswer => {
                if !self.options.is_empty() {
                    return Err("short_answer must not have options".to_string());
                }
            }
        }

        Ok(())
    }

    /// Canonical form for storage. Only call on a question that passed `check`.
    fn normalize(&mut self) {
        self.prompt = self.prompt.trim().to_string();
        self.explanation = self.explanation.trim().to_string();
        self.correct_answer = self.correct_answer.trim().to_string();
        for option in &mut self.options {
            *option = option.trim().to_string();
        }

        match self.kind {
            QuestionKind::MultipleChoice => {
                let key = normalize_answer(&self.correct_answer);
                if let Some(option) = self.options.iter().find(|o| normalize_answer(o) == key) {
                    self.correct_answer = option.clone();
                }
            }
            QuestionKind::TrueFalse => {
                self.options = TRUE_FALSE_OPTIONS.iter().map(|s| s.to_string()).collect();
                self.correct_answer = match parse_bool_answer(&self.correct_answer) {
                    Some(false) => "False".to_string(),
                    _ => "True".to_string(),
                };
            }
            QuestionKind::ShortAnswer => {}
        }
    }
}

impl LlmOutput for GeneratedQuiz {
    fn validate_output(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is empty".to_string());
        }
        if self.questions.is_empty() {
            return Err("questions is empty".to_string());
        }
        for (i, question) in self.questions.iter().enumerate() {
            question
                .check()
                .map_err(|e| format!("questions[{}]: {}", i, e))?;
        }
        Ok(())
    }
}

impl GeneratedQuiz {
    /// Rules that depend on the request rather than on the output alone
    pub fn check_request(&self, count: usize, kinds: &[QuestionKind]) -> Result<(), String> {
        if self.questions.len() != count {
            return Err(format!(
                "expected exactly {} questions, got {}",
                count,
                self.questions.len()
            ));
        }
        if let Some((i, q)) = self
            .questions
            .iter()
            .enumerate()
            .find(|(_, q)| !kinds.contains(&q.kind))
        {
            return Err(format!(
                "questions[{}]: kind '{}' was not requested",
                i, q.kind
            ));
        }
        Ok(())
    }

    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().chars().take(150).collect();
        for question in &mut self.questions {
            question.normalize();
        }
        self
    }
}

/// AI verdicts for short answers that were not exact matches
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "ShortAnswerGrades")]
pub struct ShortAnswerGrades {
    pub grades: Vec<ShortAnswerGrade>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShortAnswerGrade {
    #[schemars(description = "The question_id exactly as given")]
    pub question_id: Uuid,

    #[schemars(description = "Whether the student's answer is acceptable")]
    pub is_correct: bool,

    #[schemars(description = "One short sentence of feedback for the student")]
    pub feedback: String,
}

impl LlmOutput for ShortAnswerGrades {}

impl ShortAnswerGrades {
    /// Every pending question must have a verdict
    pub fn check_covers(&self, question_ids: &[Uuid]) -> Result<(), String> {
        let graded: HashSet<Uuid> = self.grades.iter().map(|g| g.question_id).collect();
        let missing: Vec<String> = question_ids
            .iter()
            .filter(|id| !graded.contains(id))
            .map(|id| id.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("missing grades for question_id: {}", missing.join(", ")))
        }
    }
}
