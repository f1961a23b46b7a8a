//! Transactional email delivery
//!
//! `HttpMailer` talks to a JSON email API; `LogMailer` is the development
//! fallback used when no API key is configured.

mod mailer;

pub use mailer::{EmailMessage, HttpMailer, LogMailer, MailError, Mailer};

#[cfg(test)]
pub use mailer::testing;
