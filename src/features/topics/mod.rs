//! Quiz topics: the subjects students can generate exams for.
//!
//! Public listing lives under `/api/meta/topics`; management under
//! `/api/admin/topics`.

pub mod dtos;
pub mod models;
pub mod services;

pub use services::TopicService;
