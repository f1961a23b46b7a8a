//! Modules layer - Infrastructure components for external integrations
//!
//! Contains clients and adapters for external services: object storage,
//! transactional email and payments.

pub mod billing;
pub mod mail;
pub mod storage;
