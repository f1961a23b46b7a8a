use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::config::MailConfig;
use crate::core::error::AppError;

#[derive(Debug, Clone, Error)]
pub enum MailError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("http {status}: {body}")]
    Http { status: u16, body: String },

    #[error("mail client error: {0}")]
    Client(String),
}

impl MailError {
    /// Transport failures and 5xx responses are transient
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            Self::Client(_) => false,
        }
    }
}

impl From<MailError> for AppError {
    fn from(e: MailError) -> Self {
        AppError::ExternalServiceError(format!("Failed to send email: {}", e))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// Email API client (Resend-compatible `POST {api_url}` with bearer auth)
pub struct HttpMailer {
    http: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    const MAX_RETRIES: usize = 2;

    pub fn new(config: &MailConfig, api_key: String) -> Result<Self, MailError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MailError::Client(e.to_string()))?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key,
            from: config.from.clone(),
        })
    }

    async fn send_once(&self, message: &EmailMessage) -> Result<(), MailError> {
        let body = SendEmailRequest {
            from: &self.from,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
        };

        let res = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = res.status();
        if status.is_success() {
            return Ok(());
        }

        let body = res.text().await.unwrap_or_default();
        Err(MailError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        (|| async { self.send_once(message).await })
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(500))
                    .with_max_delay(Duration::from_secs(5))
                    .with_max_times(Self::MAX_RETRIES),
            )
            .when(|e: &MailError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "Email delivery failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await?;

        info!("Email sent to {} ({})", message.to, message.subject);
        Ok(())
    }
}

/// Writes emails to the log instead of sending them
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "Email delivery disabled, message body:\n{}",
            message.text
        );
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Captures sent messages for assertions
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(MailError::Transport("reset".into()).should_retry());
        assert!(MailError::Http {
            status: 503,
            body: String::new()
        }
        .should_retry());
        assert!(!MailError::Http {
            status: 422,
            body: "invalid from".into()
        }
        .should_retry());
        assert!(!MailError::Client("tls".into()).should_retry());
    }

    #[test]
    fn test_request_body_shape() {
        let body = SendEmailRequest {
            from: "Brainwave <noreply@brainwave.app>",
            to: ["student@example.com"],
            subject: "Sign in",
            html: "<p>hi</p>",
            text: "hi",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["to"][0], "student@example.com");
        assert_eq!(json["from"], "Brainwave <noreply@brainwave.app>");
    }

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let message = EmailMessage {
            to: "student@example.com".to_string(),
            subject: "Sign in".to_string(),
            html: "<p>link</p>".to_string(),
            text: "link".to_string(),
        };
        assert!(LogMailer.send(&message).await.is_ok());
    }
}
