use crate::core::error::Result;
use crate::core::extractor::ValidatedJson;
use crate::features::auth::dtos::{
    validate_callback_path, CallbackQuery, MagicLinkRequestDto, MagicLinkResponseDto,
    MeResponseDto, SessionResponseDto, SignInFormDto, SIGNIN_PATH, VERIFY_REQUEST_PATH,
};
use crate::features::auth::guards::RequireUser;
use crate::features::auth::services::auth_service::normalize_email;
use crate::features::auth::services::AuthService;
use crate::shared::types::ApiResponse;
use axum::{
    extract::{Query, State},
    response::Redirect,
    Form, Json,
};
use std::sync::Arc;
use tracing::warn;
use validator::ValidateEmail;

/// Request a magic sign-in link by email
#[utoipa::path(
    post,
    path = "/api/auth/magic-link",
    request_body = MagicLinkRequestDto,
    responses(
        (status = 200, description = "Sign-in link sent", body = ApiResponse<MagicLinkResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 502, description = "Email delivery failed")
    ),
    tag = "auth"
)]
pub async fn request_magic_link(
    State(service): State<Arc<AuthService>>,
    ValidatedJson(dto): ValidatedJson<MagicLinkRequestDto>,
) -> Result<Json<ApiResponse<MagicLinkResponseDto>>> {
    service
        .send_magic_link(&dto.email, dto.callback_url.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(
        Some(MagicLinkResponseDto {
            verify_request_url: VERIFY_REQUEST_PATH.to_string(),
        }),
        Some("Check your email for a sign-in link".to_string()),
        None,
    )))
}

/// Form-based sign-in used by the web client
///
/// Always answers with a 303 redirect: to the verify-request page on success,
/// or back to the sign-in page with `error=EmailSignin`.
#[utoipa::path(
    post,
    path = "/auth/signin/email",
    request_body(content = SignInFormDto, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to /auth/verify-request or /auth/signin?error=EmailSignin")
    ),
    tag = "auth"
)]
pub async fn signin_email(
    State(service): State<Arc<AuthService>>,
    Form(form): Form<SignInFormDto>,
) -> Redirect {
    let error_redirect = || Redirect::to(&format!("{}?error=EmailSignin", SIGNIN_PATH));

    let email = normalize_email(&form.email);
    if email.len() > 254 || !email.validate_email() {
        return error_redirect();
    }

    let callback = form
        .callback_url
        .filter(|path| validate_callback_path(path).is_ok());

    match service.send_magic_link(&email, callback.as_deref()).await {
        Ok(()) => Redirect::to(VERIFY_REQUEST_PATH),
        Err(e) => {
            warn!("Email sign-in failed for {}: {}", email, e);
            error_redirect()
        }
    }
}

/// Redeem a magic link and start a session
#[utoipa::path(
    get,
    path = "/api/auth/callback",
    params(CallbackQuery),
    responses(
        (status = 200, description = "Signed in", body = ApiResponse<SessionResponseDto>),
        (status = 401, description = "Unknown, used or expired link")
    ),
    tag = "auth"
)]
pub async fn callback(
    State(service): State<Arc<AuthService>>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<ApiResponse<SessionResponseDto>>> {
    let callback_url = query
        .callback_url
        .filter(|path| validate_callback_path(path).is_ok());

    let session = service
        .complete_sign_in(&query.email, &query.token, callback_url)
        .await?;

    Ok(Json(ApiResponse::success(Some(session), None, None)))
}

/// Current session claims
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user retrieved successfully", body = ApiResponse<MeResponseDto>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(RequireUser(user): RequireUser) -> Result<Json<ApiResponse<MeResponseDto>>> {
    Ok(Json(ApiResponse::success(Some(user.into()), None, None)))
}
