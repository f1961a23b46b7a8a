//! Public reference data and counters, plus the metadata key/value store.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::{increment_counter, MetaService};
