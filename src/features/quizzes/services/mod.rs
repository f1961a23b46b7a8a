pub mod grading;
pub mod prompt_builder;
pub mod quiz_output;

mod generation_service;
mod quiz_service;

pub use generation_service::QuizGenerationService;
pub use quiz_service::QuizService;
