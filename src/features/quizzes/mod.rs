//! AI-generated practice quizzes: generation, progress, submission and grading.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::{QuizGenerationService, QuizService};
