//! Stripe Checkout integration
//!
//! Session creation goes through Stripe's form-encoded REST API; webhook
//! payloads are authenticated with the `Stripe-Signature` header.

mod signature;
mod stripe_client;

pub use signature::{verify_webhook_signature, SignatureError, SIGNATURE_TOLERANCE_SECS};
pub use stripe_client::{
    CheckoutSession, CheckoutSessionObject, CheckoutSessionRequest, StripeClient, StripeEvent,
};

#[cfg(test)]
pub(crate) use signature::sign_for_test;
