use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::Duration;

use super::model::{AuthenticatedUser, SessionClaims};
use crate::core::config::AuthConfig;
use crate::core::error::AppError;
use crate::features::users::models::User;

/// Issues and validates HS256 session tokens
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl: Duration,
    leeway: u64,
}

impl JwtManager {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            ttl: config.session_ttl,
            leeway: config.jwt_leeway.as_secs(),
        }
    }

    /// Session lifetime in seconds
    pub fn ttl_secs(&self) -> i64 {
        self.ttl.as_secs() as i64
    }

    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now,
            exp: now + self.ttl_secs(),
            iss: self.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign session token: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = self.leeway;

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid session token: {}", e)))?;

        Ok(data.claims.into())
    }
}

#[cfg(test)]
pub(crate) fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "test-secret-that-is-at-least-32-characters".to_string(),
        jwt_issuer: "brainwave-test".to_string(),
        session_ttl: Duration::from_secs(3600),
        magic_link_ttl: Duration::from_secs(24 * 3600),
        jwt_leeway: Duration::from_secs(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::users::models::UserRole;
    use uuid::Uuid;

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            email: "student@example.com".to_string(),
            name: None,
            image: None,
            role,
            credits: 3,
            email_verified_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_then_validate() {
        let jwt = JwtManager::new(&test_auth_config());
        let admin = user(UserRole::Admin);
        let token = jwt.issue(&admin).unwrap();

        let authed = jwt.validate_token(&token).unwrap();
        assert_eq!(authed.user_id, admin.id);
        assert_eq!(authed.email, "student@example.com");
        assert!(authed.is_admin());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = JwtManager::new(&test_auth_config())
            .issue(&user(UserRole::User))
            .unwrap();

        let mut other = test_auth_config();
        other.jwt_secret = "another-secret-that-is-at-least-32-chars".to_string();
        let result = JwtManager::new(&other).validate_token(&token);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_wrong_issuer_is_rejected() {
        let token = JwtManager::new(&test_auth_config())
            .issue(&user(UserRole::User))
            .unwrap();

        let mut other = test_auth_config();
        other.jwt_issuer = "someone-else".to_string();
        assert!(JwtManager::new(&other).validate_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let config = test_auth_config();
        let jwt = JwtManager::new(&config);
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: Uuid::new_v4(),
            email: "old@example.com".to_string(),
            role: UserRole::User,
            iat: now - 7200,
            exp: now - 3600,
            iss: config.jwt_issuer.clone(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(jwt.validate_token(&token).is_err());
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let jwt = JwtManager::new(&test_auth_config());
        assert!(jwt.validate_token("not.a.jwt").is_err());
    }
}
