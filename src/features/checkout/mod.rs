//! Credit packs sold through Stripe Checkout.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::CheckoutService;
