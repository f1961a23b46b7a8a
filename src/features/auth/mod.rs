//! Magic-link authentication and HS256 sessions.

mod accounts;
mod jwt;

pub mod dtos;
pub mod guards;
pub mod handlers;
pub mod model;
pub mod routes;
pub mod services;

pub use accounts::AccountDirectory;
pub use jwt::JwtManager;

#[cfg(test)]
pub(crate) use accounts::testing::MemoryAccounts;
#[cfg(test)]
pub(crate) use jwt::test_auth_config;
