use crate::core::error::AppError;
use crate::features::auth::{AccountDirectory, JwtManager};
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use base64::prelude::*;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::Span;
use uuid::Uuid;

/// Request ID generator using UUID v7 (time-ordered)
#[derive(Clone, Copy)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::now_v7().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Custom MakeSpan that includes request_id in the tracing span
#[derive(Clone, Debug)]
pub struct MakeSpanWithRequestId;

impl<B> tower_http::trace::MakeSpan<B> for MakeSpanWithRequestId {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

pub fn cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    // If origins list contains "*", allow any origin
    if allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        // Parse origins into HeaderValue
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn basic_auth_middleware(
    valid_credentials: Arc<String>,
) -> impl Fn(
    Request,
    Next,
)
    -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, Response>> + Send>>
       + Clone {
    move |req: Request, next: Next| {
        let credentials = valid_credentials.clone();
        Box::pin(async move {
            let auth_header = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|header| header.to_str().ok());

            if let Some(auth_header) = auth_header {
                if let Some(encoded) = auth_header.strip_prefix("Basic ") {
                    if let Ok(decoded) = BASE64_STANDARD.decode(encoded) {
                        if let Ok(creds) = String::from_utf8(decoded) {
                            if creds == *credentials {
                                return Ok(next.run(req).await);
                            }
                        }
                    }
                }
            }

            let mut response = Response::new(Body::from("Unauthorized"));
            *response.status_mut() = StatusCode::UNAUTHORIZED;
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"Swagger UI\""),
            );

            Err(response)
        })
    }
}

/// State for `auth_middleware`
#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<JwtManager>,
    pub accounts: Arc<dyn AccountDirectory>,
}

/// Resolve the bearer session token into an `AuthenticatedUser` request extension.
///
/// The role is re-read from the account on every request; deleted accounts are rejected.
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthorized("Invalid authorization header format".to_string())
    })?;

    let mut user = auth.jwt.validate_token(token.trim())?;

    user.role = auth
        .accounts
        .current_role(user.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::guards::RequireAdmin;
    use crate::features::auth::model::AuthenticatedUser;
    use crate::features::auth::{test_auth_config, MemoryAccounts};
    use crate::features::users::models::{User, UserRole};
    use axum::{routing::get, Router};
    use axum_test::TestServer;
    use chrono::Utc;

    async fn whoami(user: AuthenticatedUser) -> String {
        user.email
    }

    async fn admin_only(RequireAdmin(admin): RequireAdmin) -> String {
        admin.email
    }

    fn user_with(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            email: format!("{}@brainwave.test", role),
            name: None,
            image: None,
            role,
            credits: 3,
            email_verified_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    struct Harness {
        server: TestServer,
        jwt: Arc<JwtManager>,
        accounts: Arc<MemoryAccounts>,
    }

    impl Harness {
        /// Session token for a new account that exists with `role`
        fn token_for(&self, role: UserRole) -> (Uuid, String) {
            let user = user_with(role);
            self.accounts.roles.lock().unwrap().insert(user.id, role);
            (user.id, self.jwt.issue(&user).unwrap())
        }
    }

    fn server() -> Harness {
        let jwt = Arc::new(JwtManager::new(&test_auth_config()));
        let accounts = Arc::new(MemoryAccounts::default());
        let state = AuthState {
            jwt: jwt.clone(),
            accounts: accounts.clone(),
        };
        let app = Router::new()
            .route("/whoami", get(whoami))
            .route("/admin", get(admin_only))
            .route_layer(axum::middleware::from_fn_with_state(state, auth_middleware));
        Harness {
            server: TestServer::new(app).unwrap(),
            jwt,
            accounts,
        }
    }

    #[tokio::test]
    async fn test_anonymous_request_is_rejected() {
        let h = server();
        h.server
            .get("/whoami")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_header_is_rejected() {
        let h = server();
        let (_, token) = h.token_for(UserRole::User);
        h.server
            .get("/whoami")
            .add_header(header::AUTHORIZATION, format!("Token {}", token))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_session_reaches_handler() {
        let h = server();
        let (_, token) = h.token_for(UserRole::User);
        let response = h.server.get("/whoami").authorization_bearer(token).await;
        response.assert_status_ok();
        response.assert_text("user@brainwave.test");
    }

    #[tokio::test]
    async fn test_admin_route_rejects_regular_user() {
        let h = server();
        let (_, user_token) = h.token_for(UserRole::User);
        h.server
            .get("/admin")
            .authorization_bearer(user_token)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let (_, admin_token) = h.token_for(UserRole::Admin);
        h.server
            .get("/admin")
            .authorization_bearer(admin_token)
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_demoted_admin_loses_access_before_token_expiry() {
        let h = server();
        let (admin_id, token) = h.token_for(UserRole::Admin);
        h.server
            .get("/admin")
            .authorization_bearer(token.clone())
            .await
            .assert_status_ok();

        h.accounts
            .roles
            .lock()
            .unwrap()
            .insert(admin_id, UserRole::User);

        h.server
            .get("/admin")
            .authorization_bearer(token)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_deleted_account_token_is_rejected() {
        let h = server();
        let (user_id, token) = h.token_for(UserRole::Admin);
        h.accounts.roles.lock().unwrap().remove(&user_id);

        h.server
            .get("/whoami")
            .authorization_bearer(token.clone())
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        h.server
            .get("/admin")
            .authorization_bearer(token)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_promoted_user_gains_access_without_new_token() {
        let h = server();
        let user = user_with(UserRole::User);
        let token = h.jwt.issue(&user).unwrap();
        h.accounts
            .roles
            .lock()
            .unwrap()
            .insert(user.id, UserRole::Admin);

        h.server
            .get("/admin")
            .authorization_bearer(token)
            .await
            .assert_status_ok();
    }

    #[test]
    fn test_request_ids_are_uuid_v7() {
        let request = axum::http::Request::new(());
        let id = MakeRequestUuid.make_request_id(&request).unwrap();
        let parsed = Uuid::parse_str(id.header_value().to_str().unwrap()).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[tokio::test]
    async fn test_request_id_is_propagated_to_response() {
        use tower::ServiceExt;
        use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};

        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        let request = axum::http::Request::get("/ping")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert!(response.headers().contains_key("x-request-id"));

        let request = axum::http::Request::get("/ping")
            .header("x-request-id", "client-supplied")
            .body(Body::empty())
            .unwrap();
        let response = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "client-supplied");
    }
}
