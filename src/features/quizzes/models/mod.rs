mod question;
mod quiz;

pub use question::{Question, QuestionKind};
pub use quiz::{Quiz, QuizDifficulty, QuizStatus};
