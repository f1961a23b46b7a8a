use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::features::auth::model::AuthenticatedUser;
use crate::features::users::dtos::UserProfileDto;
use crate::features::users::models::UserRole;

/// Where the client is sent after the "check your email" step
pub const VERIFY_REQUEST_PATH: &str = "/auth/verify-request";

/// Sign-in page; errors are reported through its `error` query parameter
pub const SIGNIN_PATH: &str = "/auth/signin";

/// Only same-origin relative paths are accepted as post-login destinations
pub fn validate_callback_path(path: &str) -> Result<(), ValidationError> {
    if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') {
        Ok(())
    } else {
        Err(ValidationError::new("callback_url")
            .with_message("callback_url must be a relative path".into()))
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct MagicLinkRequestDto {
    #[validate(
        email(message = "Invalid email format"),
        length(max = 254, message = "Email must not exceed 254 characters")
    )]
    pub email: String,

    /// Relative path to return to after sign-in
    #[validate(custom(function = "validate_callback_path"))]
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MagicLinkResponseDto {
    pub verify_request_url: String,
}

/// Form body posted by the sign-in page
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignInFormDto {
    #[serde(default)]
    pub email: String,
    #[serde(rename = "callbackUrl", default)]
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct CallbackQuery {
    pub token: String,
    pub email: String,
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponseDto {
    pub access_token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Seconds until the session expires
    pub expires_in: i64,
    pub user: UserProfileDto,
    /// Relative path the client asked to return to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeResponseDto {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl From<AuthenticatedUser> for MeResponseDto {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email,
            role: user.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::internet::en::SafeEmail;
    use fake::Fake;

    #[test]
    fn test_magic_link_request_accepts_generated_emails() {
        for _ in 0..20 {
            let email: String = SafeEmail().fake();
            let dto = MagicLinkRequestDto {
                email,
                callback_url: None,
            };
            assert!(dto.validate().is_ok(), "{:?}", dto);
        }
    }

    #[test]
    fn test_magic_link_request_rejects_bad_email() {
        let dto = MagicLinkRequestDto {
            email: "not-an-email".to_string(),
            callback_url: None,
        };
        assert!(dto.validate().is_err());

        let long = MagicLinkRequestDto {
            email: format!("{}@example.com", "a".repeat(250)),
            callback_url: None,
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_callback_url_must_be_relative() {
        let with = |url: &str| MagicLinkRequestDto {
            email: "student@example.com".to_string(),
            callback_url: Some(url.to_string()),
        };
        assert!(with("/dashboard").validate().is_ok());
        assert!(with("/quiz/123?step=2").validate().is_ok());
        assert!(with("https://evil.example.com").validate().is_err());
        assert!(with("//evil.example.com").validate().is_err());
        assert!(with("/\\evil.example.com").validate().is_err());
    }
}
