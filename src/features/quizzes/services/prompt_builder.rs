use minijinja::context;
use serde::Serialize;
use uuid::Uuid;

use crate::features::quizzes::models::{QuestionKind, QuizDifficulty};
use crate::shared::templates::{render_template, TemplateError};

const GENERATE_TEMPLATE: &str = "prompts/quiz/generate.jinja";
const GRADE_TEMPLATE: &str = "prompts/quiz/grade.jinja";

pub const GENERATE_SYSTEM_PROMPT: &str = "You are an experienced teacher who writes accurate, \
unambiguous practice exam questions. You always answer with a single JSON object.";

pub const GRADE_SYSTEM_PROMPT: &str = "You are a fair examiner grading short written answers. \
You always answer with a single JSON object.";

/// Fluent builder for the quiz generation prompt
#[derive(Debug, Default)]
pub struct QuizPromptBuilder {
    topic: String,
    difficulty: Option<QuizDifficulty>,
    question_count: i32,
    question_kinds: Vec<QuestionKind>,
    context: Vec<String>,
    instructions: Option<String>,
    output_schema: String,
}

impl QuizPromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn difficulty(mut self, difficulty: QuizDifficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn question_count(mut self, count: i32) -> Self {
        self.question_count = count;
        self
    }

    pub fn question_kinds(mut self, kinds: &[QuestionKind]) -> Self {
        self.question_kinds = kinds.to_vec();
        self
    }

    /// Excerpts from the student's documents
    pub fn context(mut self, chunks: Vec<String>) -> Self {
        self.context = chunks;
        self
    }

    pub fn instructions(mut self, instructions: Option<&str>) -> Self {
        self.instructions = instructions
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        self
    }

    pub fn output_schema(mut self, schema: String) -> Self {
        self.output_schema = schema;
        self
    }

    pub fn build(self) -> Result<String, TemplateError> {
        let kinds: Vec<String> = self.question_kinds.iter().map(|k| k.to_string()).collect();
        let difficulty = self.difficulty.unwrap_or(QuizDifficulty::Medium).to_string();

        render_template(
            GENERATE_TEMPLATE,
            context! {
                topic => self.topic,
                difficulty => difficulty,
                question_count => self.question_count,
                question_kinds => kinds,
                instructions => self.instructions,
                context => self.context,
                output_schema => self.output_schema,
            },
        )
    }
}

/// One short answer awaiting an AI verdict
#[derive(Debug, Clone, Serialize)]
pub struct GradingItem {
    pub question_id: Uuid,
    pub prompt: String,
    pub correct_answer: String,
    pub user_answer: String,
}

pub fn build_grading_prompt(
    topic: &str,
    items: &[GradingItem],
    output_schema: String,
) -> Result<String, TemplateError> {
    render_template(
        GRADE_TEMPLATE,
        context! {
            topic => topic,
            items => items,
            output_schema => output_schema,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_prompt_includes_request_details() {
        let prompt = QuizPromptBuilder::new()
            .topic("Chemistry")
            .difficulty(QuizDifficulty::Hard)
            .question_count(7)
            .question_kinds(&[QuestionKind::MultipleChoice, QuestionKind::TrueFalse])
            .instructions(Some("  Focus on redox reactions "))
            .context(vec!["Oxidation is loss of electrons.".to_string()])
            .output_schema("{\"type\": \"object\"}".to_string())
            .build()
            .unwrap();

        assert!(prompt.contains("**Chemistry**"));
        assert!(prompt.contains("**hard**"));
        assert!(prompt.contains("Exactly 7 questions"));
        assert!(prompt.contains("multiple_choice, true_false"));
        assert!(prompt.contains("Focus on redox reactions"));
        assert!(prompt.contains("Excerpt 1"));
        assert!(prompt.contains("Oxidation is loss of electrons."));
        assert!(prompt.contains("{\"type\": \"object\"}"));
    }

    #[test]
    fn test_generate_prompt_omits_empty_sections() {
        let prompt = QuizPromptBuilder::new()
            .topic("History")
            .difficulty(QuizDifficulty::Easy)
            .question_count(3)
            .question_kinds(&[QuestionKind::ShortAnswer])
            .instructions(Some("   "))
            .output_schema("{}".to_string())
            .build()
            .unwrap();

        assert!(!prompt.contains("Additional instructions"));
        assert!(!prompt.contains("Study material"));
    }

    #[test]
    fn test_grading_prompt_lists_items() {
        let id = Uuid::new_v4();
        let prompt = build_grading_prompt(
            "Biology",
            &[GradingItem {
                question_id: id,
                prompt: "What process makes glucose in plants?".to_string(),
                correct_answer: "Photosynthesis".to_string(),
                user_answer: "photo synthesis".to_string(),
            }],
            "{}".to_string(),
        )
        .unwrap();

        assert!(prompt.contains(&id.to_string()));
        assert!(prompt.contains("Reference answer: Photosynthesis"));
        assert!(prompt.contains("Student answer: photo synthesis"));
    }
}
