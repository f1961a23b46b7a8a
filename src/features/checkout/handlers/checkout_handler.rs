use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::core::extractor::ValidatedJson;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::checkout::dtos::{
    CheckoutSessionDto, CreateCheckoutDto, PaymentDto, WebhookAckDto,
};
use crate::features::checkout::services::CheckoutService;
use crate::shared::types::ApiResponse;

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// Start a Stripe Checkout for a credit pack
#[utoipa::path(
    post,
    path = "/api/checkout/session",
    tag = "checkout",
    request_body = CreateCheckoutDto,
    responses(
        (status = 200, description = "Checkout session created", body = ApiResponse<CheckoutSessionDto>),
        (status = 400, description = "Unknown credit pack"),
        (status = 401, description = "Authentication required"),
        (status = 502, description = "Payment provider error")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_checkout_session(
    user: AuthenticatedUser,
    State(service): State<Arc<CheckoutService>>,
    ValidatedJson(dto): ValidatedJson<CreateCheckoutDto>,
) -> Result<Json<ApiResponse<CheckoutSessionDto>>> {
    let session = service.create_session(&user, dto.pack).await?;
    Ok(Json(ApiResponse::success(Some(session), None, None)))
}

/// Stripe webhook receiver
///
/// Authenticated by the `Stripe-Signature` header, not by a session.
#[utoipa::path(
    post,
    path = "/api/checkout/webhook",
    tag = "checkout",
    request_body(content = String, content_type = "application/json", description = "Raw Stripe event"),
    responses(
        (status = 200, description = "Event accepted", body = ApiResponse<WebhookAckDto>),
        (status = 400, description = "Missing or invalid signature")
    )
)]
pub async fn stripe_webhook(
    State(service): State<Arc<CheckoutService>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<WebhookAckDto>>> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".to_string()))?;

    service.handle_webhook(&body, signature).await?;

    Ok(Json(ApiResponse::success(
        Some(WebhookAckDto { received: true }),
        None,
        None,
    )))
}

/// The caller's payments, newest first
#[utoipa::path(
    get,
    path = "/api/checkout/history",
    tag = "checkout",
    responses(
        (status = 200, description = "Payment history", body = ApiResponse<Vec<PaymentDto>>),
        (status = 401, description = "Authentication required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn payment_history(
    user: AuthenticatedUser,
    State(service): State<Arc<CheckoutService>>,
) -> Result<Json<ApiResponse<Vec<PaymentDto>>>> {
    let payments = service.history(user.user_id).await?;
    Ok(Json(ApiResponse::success(Some(payments), None, None)))
}
