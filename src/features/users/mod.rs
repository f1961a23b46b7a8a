//! User account feature.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/users/me` | Profile with role and credit balance |
//! | PATCH | `/api/users/me` | Update name / image |
//! | GET | `/api/users/me/stats` | Quiz statistics, overall and per topic |
//! | DELETE | `/api/users/me` | Delete the account and its data |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::UserService;
