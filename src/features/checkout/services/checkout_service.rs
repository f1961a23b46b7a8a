use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::checkout::dtos::{CheckoutSessionDto, CreditPack, PaymentDto};
use crate::features::checkout::models::{Payment, PaymentStatus};
use crate::modules::billing::{
    verify_webhook_signature, CheckoutSessionObject, CheckoutSessionRequest, StripeClient,
    StripeEvent,
};

const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
/// Delayed payment methods settle after the session completes
const CHECKOUT_ASYNC_PAYMENT_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";

/// What a verified webhook led to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Credited { user_id: Uuid, credits: i32 },
    AlreadyProcessed,
    Ignored,
}

pub struct CheckoutService {
    pool: PgPool,
    stripe: Arc<StripeClient>,
    frontend_url: String,
}

impl CheckoutService {
    pub fn new(pool: PgPool, stripe: Arc<StripeClient>, frontend_url: String) -> Self {
        Self {
            pool,
            stripe,
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }
    }

    /// Start a Stripe Checkout for `pack` and record the pending payment
    pub async fn create_session(
        &self,
        user: &AuthenticatedUser,
        pack: CreditPack,
    ) -> Result<CheckoutSessionDto> {
        let request = CheckoutSessionRequest {
            user_id: user.user_id,
            customer_email: user.email.clone(),
            pack: pack.to_string(),
            product_name: pack.product_name(),
            amount_cents: pack.amount_cents(),
            success_url: format!("{}/billing?status=success", self.frontend_url),
            cancel_url: format!("{}/billing?status=cancelled", self.frontend_url),
        };

        let session = self.stripe.create_checkout_session(&request).await?;
        let url = session.url.ok_or_else(|| {
            AppError::ExternalServiceError("Payment provider returned no checkout URL".to_string())
        })?;

        sqlx::query(
            r#"
            INSERT INTO payments (user_id, stripe_session_id, credit_pack, credits, amount_cents)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.user_id)
        .bind(&session.id)
        .bind(pack.to_string())
        .bind(pack.credits())
        .bind(pack.amount_cents())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_db(e, "Checkout session already recorded"))?;

        info!(
            "Checkout session created: user={}, pack={}, session={}",
            user.user_id, pack, session.id
        );

        Ok(CheckoutSessionDto {
            url,
            session_id: session.id,
        })
    }

    /// Verify and apply a Stripe webhook delivery
    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookOutcome> {
        verify_webhook_signature(
            payload,
            signature,
            self.stripe.webhook_secret(),
            Utc::now().timestamp(),
        )
        .map_err(|e| {
            warn!("Rejected Stripe webhook: {}", e);
            AppError::BadRequest(format!("Invalid webhook signature: {}", e))
        })?;

        let event: StripeEvent = serde_json::from_slice(payload)
            .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

        if event.event_type != CHECKOUT_COMPLETED
            && event.event_type != CHECKOUT_ASYNC_PAYMENT_SUCCEEDED
        {
            info!("Ignoring Stripe event {} ({})", event.id, event.event_type);
            return Ok(WebhookOutcome::Ignored);
        }

        let session: CheckoutSessionObject = serde_json::from_value(event.data.object)
            .map_err(|e| AppError::BadRequest(format!("Invalid checkout session: {}", e)))?;

        // Delayed methods complete as `unpaid` and are credited on async_payment_succeeded
        if session.payment_status.as_deref() != Some("paid") {
            info!(
                "Checkout session {} not paid yet (event={}, status={:?})",
                session.id, event.event_type, session.payment_status
            );
            return Ok(WebhookOutcome::Ignored);
        }

        self.complete_payment(&session).await
    }

    /// Mark the payment completed and grant its credits, at most once per session
    async fn complete_payment(&self, session: &CheckoutSessionObject) -> Result<WebhookOutcome> {
        let mut tx = self.pool.begin().await?;

        let payment = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE stripe_session_id = $1 FOR UPDATE",
        )
        .bind(&session.id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(payment) = payment else {
            tx.rollback().await?;
            warn!("Webhook for unknown checkout session {}", session.id);
            return Ok(WebhookOutcome::Ignored);
        };

        if payment.status == PaymentStatus::Completed {
            tx.rollback().await?;
            info!("Checkout session {} already processed", session.id);
            return Ok(WebhookOutcome::AlreadyProcessed);
        }

        if let Some(reason) = session_mismatch(session, &payment) {
            tx.rollback().await?;
            warn!(
                "Checkout session {} does not match payment {}: {}",
                session.id, payment.id, reason
            );
            return Ok(WebhookOutcome::Ignored);
        }

        sqlx::query("UPDATE payments SET status = 'completed', completed_at = NOW() WHERE id = $1")
            .bind(payment.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET credits = credits + $2, updated_at = NOW() WHERE id = $1")
            .bind(payment.user_id)
            .bind(payment.credits)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            "Payment completed: session={}, user={}, credits=+{}",
            session.id, payment.user_id, payment.credits
        );

        Ok(WebhookOutcome::Credited {
            user_id: payment.user_id,
            credits: payment.credits,
        })
    }

    pub async fn history(&self, user_id: Uuid) -> Result<Vec<PaymentDto>> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments.into_iter().map(Into::into).collect())
    }
}

/// Why a paid session disagrees with the payment we recorded, if it does
fn session_mismatch(session: &CheckoutSessionObject, payment: &Payment) -> Option<String> {
    if let Some(reference) = session.client_reference_id.as_deref() {
        if Uuid::parse_str(reference).ok() != Some(payment.user_id) {
            return Some(format!("client_reference_id {} is not the payer", reference));
        }
    }
    if let Some(amount) = session.amount_total {
        if amount != payment.amount_cents {
            return Some(format!(
                "amount_total {} != {} recorded",
                amount, payment.amount_cents
            ));
        }
    }
    if let Some(pack) = session.metadata.get("pack") {
        if *pack != payment.credit_pack {
            return Some(format!("pack {} != {} recorded", pack, payment.credit_pack));
        }
    }
    None
}
