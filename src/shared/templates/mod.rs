//! Prompt and email template management.
//!
//! Templates are stored in `templates/` and use Jinja2 syntax. Prompt
//! templates are rendered by the quiz prompt builders; email templates by
//! the auth feature.

pub mod engine;

pub use engine::{render_template, TemplateError};
