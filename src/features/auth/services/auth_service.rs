use minijinja::context;
use std::sync::Arc;
use tracing::info;

use crate::core::error::Result;
use crate::features::auth::dtos::SessionResponseDto;
use crate::features::auth::jwt::JwtManager;
use crate::features::auth::services::token_service::MagicLinkTokenService;
use crate::features::users::UserService;
use crate::modules::mail::{EmailMessage, Mailer};
use crate::shared::templates::render_template;

const MAGIC_LINK_TEMPLATE: &str = "emails/magic_link.jinja";

/// Passwordless sign-in: emails a single-use link and exchanges it for a session
pub struct AuthService {
    tokens: Arc<MagicLinkTokenService>,
    users: Arc<UserService>,
    jwt: Arc<JwtManager>,
    mailer: Arc<dyn Mailer>,
    app_url: String,
}

impl AuthService {
    pub fn new(
        tokens: Arc<MagicLinkTokenService>,
        users: Arc<UserService>,
        jwt: Arc<JwtManager>,
        mailer: Arc<dyn Mailer>,
        app_url: String,
    ) -> Self {
        Self {
            tokens,
            users,
            jwt,
            mailer,
            app_url,
        }
    }

    /// Issue a token and email the sign-in link
    pub async fn send_magic_link(&self, email: &str, callback_url: Option<&str>) -> Result<()> {
        let email = normalize_email(email);
        let token = self.tokens.issue(&email).await?;
        let url = build_magic_link_url(&self.app_url, &token, &email, callback_url);

        let hours = self.tokens.ttl_hours();
        let html = render_template(
            MAGIC_LINK_TEMPLATE,
            context! { url => &url, expires_in_hours => hours },
        )?;
        let text = format!(
            "Sign in to Brainwave:\n\n{}\n\nThe link expires in {} hours and can only be used once.",
            url, hours
        );

        self.mailer
            .send(&EmailMessage {
                to: email.clone(),
                subject: "Sign in to Brainwave".to_string(),
                html,
                text,
            })
            .await?;

        info!("Magic link sent to {}", email);
        Ok(())
    }

    /// Redeem a magic link, creating the account on first sign-in
    pub async fn complete_sign_in(
        &self,
        email: &str,
        token: &str,
        callback_url: Option<String>,
    ) -> Result<SessionResponseDto> {
        let email = normalize_email(email);
        self.tokens.redeem(&email, token).await?;

        let user = self.users.upsert_verified(&email).await?;
        let access_token = self.jwt.issue(&user)?;

        info!("User signed in: id={}, role={}", user.id, user.role);

        Ok(SessionResponseDto {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.ttl_secs(),
            user: user.into(),
            redirect_to: callback_url,
        })
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn build_magic_link_url(
    app_url: &str,
    token: &str,
    email: &str,
    callback_url: Option<&str>,
) -> String {
    let mut url = format!(
        "{}/api/auth/callback?token={}&email={}",
        app_url.trim_end_matches('/'),
        token,
        urlencoding::encode(email)
    );
    if let Some(callback) = callback_url {
        url.push_str("&callback_url=");
        url.push_str(&urlencoding::encode(callback));
    }
    url
}
