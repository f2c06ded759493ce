//! Server-side admin sessions.
//!
//! A session row is keyed by the SHA-256 digest of its bearer token; the
//! token itself only ever exists in the login response and the client's
//! cookie or `Authorization` header.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// A freshly issued session. `token` is not recoverable after this point.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionStore {
    pool: SqlitePool,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(pool: SqlitePool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn issue(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<IssuedSession> {
        let token = generate_token();
        let expires_at = now + self.ttl;

        sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)"
        )
        .bind(token_digest(&token))
        .bind(user_id.to_string())
        .bind(now.naive_utc())
        .bind(expires_at.naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(IssuedSession { token, user_id, expires_at })
    }

    /// The user behind `token`, if the session exists and has not expired at `now`.
    pub async fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<Option<Uuid>> {
        let user_id = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM sessions WHERE token_hash = ? AND expires_at > ?"
        )
        .bind(token_digest(token))
        .bind(now.naive_utc())
        .fetch_optional(&self.pool)
        .await?;

        user_id
            .map(|id| Uuid::parse_str(&id).map_err(|e| AppError::Database(e.to_string())))
            .transpose()
    }

    pub async fn revoke(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_digest(token))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn revoke_user(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now.naive_utc())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// 32 random bytes, hex encoded.
fn generate_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
