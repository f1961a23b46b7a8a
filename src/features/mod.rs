//! Features layer - one directory per API area
//!
//! Each feature follows the same layout: `models` (database rows), `dtos`
//! (request/response shapes), `services` (business logic over `PgPool`),
//! `handlers` (axum + utoipa) and `routes`.

pub mod admin;
pub mod auth;
pub mod checkout;
pub mod documents;
pub mod meta;
pub mod quizzes;
pub mod reports;
pub mod topics;
pub mod users;
