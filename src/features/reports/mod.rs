//! Support reports filed by students (bugs, bad questions, billing issues).

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::ReportService;
