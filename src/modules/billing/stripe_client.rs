use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::config::StripeConfig;
use crate::core::error::AppError;

/// Parameters for a one-off Checkout payment
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub user_id: Uuid,
    pub customer_email: String,
    pub pack: String,
    pub product_name: String,
    pub amount_cents: i64,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// Envelope of a webhook event; only the fields we act on
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// `checkout.session` object as delivered in `data.object`
#[derive(Debug, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    pub client_reference_id: Option<String>,
    pub payment_status: Option<String>,
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

pub struct StripeClient {
    http: Client,
    secret_key: String,
    api_base_url: String,
    currency: String,
    webhook_secret: String,
}

impl StripeClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(config: &StripeConfig) -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            secret_key: config.secret_key.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            currency: config.currency.clone(),
            webhook_secret: config.webhook_secret.clone(),
        })
    }

    pub fn webhook_secret(&self) -> &str {
        &self.webhook_secret
    }

    /// Form fields for `POST /v1/checkout/sessions`
    fn session_form(&self, req: &CheckoutSessionRequest) -> Vec<(&'static str, String)> {
        vec![
            ("mode", "payment".to_string()),
            ("success_url", req.success_url.clone()),
            ("cancel_url", req.cancel_url.clone()),
            ("client_reference_id", req.user_id.to_string()),
            ("customer_email", req.customer_email.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", self.currency.clone()),
            (
                "line_items[0][price_data][unit_amount]",
                req.amount_cents.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                req.product_name.clone(),
            ),
            ("metadata[pack]", req.pack.clone()),
            ("metadata[user_id]", req.user_id.to_string()),
        ]
    }

    pub async fn create_checkout_session(
        &self,
        req: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, AppError> {
        let url = format!("{}/v1/checkout/sessions", self.api_base_url);

        let res = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&self.session_form(req))
            .send()
            .await
            .map_err(|e| {
                warn!("Stripe request failed: {}", e);
                AppError::ExternalServiceError(format!("Payment provider unreachable: {}", e))
            })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or(body);
            warn!("Stripe rejected checkout session: {} - {}", status, message);
            return Err(AppError::ExternalServiceError(format!(
                "Payment provider error: {}",
                message
            )));
        }

        let session = res.json::<CheckoutSession>().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Invalid payment provider response: {}", e))
        })?;

        debug!("Created Stripe checkout session {}", session.id);
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> StripeClient {
        StripeClient::new(&StripeConfig {
            secret_key: "sk_test_123".to_string(),
            webhook_secret: "whsec_123".to_string(),
            api_base_url: "https://api.stripe.com/".to_string(),
            currency: "usd".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_session_form_fields() {
        let user_id = Uuid::new_v4();
        let req = CheckoutSessionRequest {
            user_id,
            customer_email: "student@example.com".to_string(),
            pack: "standard".to_string(),
            product_name: "Brainwave Standard (30 credits)".to_string(),
            amount_cents: 999,
            success_url: "http://localhost:3000/billing?status=success".to_string(),
            cancel_url: "http://localhost:3000/billing?status=cancelled".to_string(),
        };

        let form: HashMap<_, _> = client().session_form(&req).into_iter().collect();
        assert_eq!(form["mode"], "payment");
        assert_eq!(form["client_reference_id"], user_id.to_string());
        assert_eq!(form["line_items[0][price_data][unit_amount]"], "999");
        assert_eq!(form["line_items[0][price_data][currency]"], "usd");
        assert_eq!(form["metadata[pack]"], "standard");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        assert_eq!(client().api_base_url, "https://api.stripe.com");
    }

    #[test]
    fn test_parse_checkout_completed_event() {
        let payload = r#"{
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_test_1",
                "client_reference_id": "0190c2a4-7e5b-7b8e-9a53-3c1d2f0e4a11",
                "payment_status": "paid",
                "amount_total": 999,
                "metadata": {"pack": "standard"}
            }}
        }"#;
        let event: StripeEvent = serde_json::from_str(payload).unwrap();
        assert_eq!(event.event_type, "checkout.session.completed");

        let session: CheckoutSessionObject = serde_json::from_value(event.data.object).unwrap();
        assert_eq!(session.id, "cs_test_1");
        assert_eq!(session.metadata.get("pack").map(String::as_str), Some("standard"));
    }
}
