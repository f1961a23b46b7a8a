use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core::error::{AppError, Result};

/// Persistence for hashed magic-link tokens
#[async_trait]
pub trait VerificationTokenStore: Send + Sync {
    /// Store a token hash, dropping any earlier tokens for the same identifier
    async fn replace(
        &self,
        identifier: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Atomically remove a token and return its expiry, if it existed
    async fn take(&self, identifier: &str, token_hash: &str) -> Result<Option<DateTime<Utc>>>;
}

pub struct PgVerificationTokenStore {
    pool: PgPool,
}

impl PgVerificationTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerificationTokenStore for PgVerificationTokenStore {
    async fn replace(
        &self,
        identifier: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM verification_tokens WHERE identifier = $1 OR expires_at < NOW()")
            .bind(identifier)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO verification_tokens (identifier, token_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(identifier)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn take(&self, identifier: &str, token_hash: &str) -> Result<Option<DateTime<Utc>>> {
        let expires_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            DELETE FROM verification_tokens
            WHERE identifier = $1 AND token_hash = $2
            RETURNING expires_at
            "#,
        )
        .bind(identifier)
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(expires_at)
    }
}

/// 32 random bytes, hex encoded
pub fn generate_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

/// SHA-256 of the raw token; only this value is stored
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Issues and redeems single-use magic-link tokens
pub struct MagicLinkTokenService {
    store: Arc<dyn VerificationTokenStore>,
    ttl: Duration,
}

impl MagicLinkTokenService {
    pub fn new(store: Arc<dyn VerificationTokenStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl_hours(&self) -> u64 {
        self.ttl.as_secs() / 3600
    }

    /// Create a token for `email`; the raw value is returned and never stored
    pub async fn issue(&self, email: &str) -> Result<String> {
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| AppError::Internal(format!("Invalid magic link TTL: {}", e)))?;

        let token = generate_token();
        self.store
            .replace(email, &hash_token(&token), Utc::now() + ttl)
            .await?;

        debug!("Magic link token issued for {}", email);
        Ok(token)
    }

    /// Consume a token. Unknown, reused and expired tokens all fail.
    pub async fn redeem(&self, email: &str, token: &str) -> Result<()> {
        let expires_at = self
            .store
            .take(email, &hash_token(token))
            .await?
            .ok_or_else(|| AppError::Unauthorized("Verification".to_string()))?;

        if expires_at <= Utc::now() {
            return Err(AppError::Unauthorized(
                "Verification link has expired".to_string(),
            ));
        }

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryTokenStore;
    use super::*;
    use crate::shared::test_helpers::database_pool;

    fn service(ttl: Duration) -> (Arc<MemoryTokenStore>, MagicLinkTokenService) {
        let store = Arc::new(MemoryTokenStore::default());
        (store.clone(), MagicLinkTokenService::new(store, ttl))
    }

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_hash_is_stable_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_token_is_single_use() {
        let (store, tokens) = service(Duration::from_secs(3600));
        let token = tokens.issue("student@example.com").await.unwrap();

        // only the hash is persisted
        assert!(!store.tokens.lock().unwrap().contains_key(&token));

        assert!(tokens.redeem("student@example.com", &token).await.is_ok());
        let second = tokens.redeem("student@example.com", &token).await;
        assert!(matches!(second, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_token_is_bound_to_email() {
        let (_, tokens) = service(Duration::from_secs(3600));
        let token = tokens.issue("student@example.com").await.unwrap();
        assert!(tokens.redeem("attacker@example.com", &token).await.is_err());
        assert!(tokens.redeem("student@example.com", &token).await.is_ok());
    }

    #[tokio::test]
    async fn test_new_token_replaces_old_one() {
        let (_, tokens) = service(Duration::from_secs(3600));
        let first = tokens.issue("student@example.com").await.unwrap();
        let second = tokens.issue("student@example.com").await.unwrap();
        assert!(tokens.redeem("student@example.com", &first).await.is_err());
        assert!(tokens.redeem("student@example.com", &second).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected_and_removed() {
        let (store, tokens) = service(Duration::from_secs(0));
        let token = tokens.issue("student@example.com").await.unwrap();
        let result = tokens.redeem("student@example.com", &token).await;
        assert!(matches!(result, Err(AppError::Unauthorized(msg)) if msg.contains("expired")));
        assert!(store.tokens.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_postgres_store_replaces_and_consumes_tokens() {
        let Some(pool) = database_pool().await else {
            return;
        };
        let email = format!("{}@brainwave.test", uuid::Uuid::new_v4().simple());
        let tokens = MagicLinkTokenService::new(
            Arc::new(PgVerificationTokenStore::new(pool.clone())),
            Duration::from_secs(3600),
        );

        let first = tokens.issue(&email).await.unwrap();
        let second = tokens.issue(&email).await.unwrap();

        let stored: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM verification_tokens WHERE identifier = $1")
                .bind(&email)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(stored, 1);

        assert!(tokens.redeem(&email, &first).await.is_err());
        assert!(tokens.redeem(&email, &second).await.is_ok());
        assert!(tokens.redeem(&email, &second).await.is_err());
    }
}
