use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use argon2::password_hash::{SaltString, rand_core::OsRng};
use chrono::{Duration, Utc};
use cookie::{Cookie, SameSite};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, Result};

pub mod session;

pub use session::IssuedSession;
use session::SessionStore;

pub const SESSION_COOKIE: &str = "session";

/// Outcome of checking a password against a stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    Valid,
    /// Matched a plaintext value from before passwords were hashed.
    /// The caller should replace the stored value with a hash.
    ValidLegacy,
    Invalid,
}

impl PasswordCheck {
    pub fn is_valid(&self) -> bool {
        !matches!(self, PasswordCheck::Invalid)
    }
}

pub struct AuthService {
    session_store: SessionStore,
}

impl AuthService {
    pub fn new(pool: SqlitePool, session_duration_hours: i64) -> Self {
        Self {
            session_store: SessionStore::new(pool, Duration::hours(session_duration_hours)),
        }
    }

    pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

        let argon2 = Argon2::default();

        Ok(argon2.verify_password(password.as_bytes(), &parsed_hash).is_ok())
    }

    /// Like `verify_password`, but also accepts legacy plaintext credentials.
    pub async fn check_password(password: &str, stored: &str) -> Result<PasswordCheck> {
        if PasswordHash::new(stored).is_ok() {
            return Ok(if Self::verify_password(password, stored).await? {
                PasswordCheck::Valid
            } else {
                PasswordCheck::Invalid
            });
        }

        Ok(if !stored.is_empty() && stored == password {
            PasswordCheck::ValidLegacy
        } else {
            PasswordCheck::Invalid
        })
    }

    pub async fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    pub async fn create_session(&self, user_id: Uuid) -> Result<IssuedSession> {
        self.session_store.issue(user_id, Utc::now()).await
    }

    /// The user id behind a live session token.
    pub async fn validate_session(&self, token: &str) -> Result<Option<Uuid>> {
        self.session_store.resolve(token, Utc::now()).await
    }

    pub async fn invalidate_session(&self, token: &str) -> Result<()> {
        self.session_store.revoke(token).await?;
        Ok(())
    }

    pub async fn invalidate_user_sessions(&self, user_id: Uuid) -> Result<u64> {
        self.session_store.revoke_user(user_id).await
    }

    pub async fn cleanup_expired_sessions(&self) -> Result<u64> {
        self.session_store.purge_expired(Utc::now()).await
    }

    pub fn create_session_cookie(&self, token: &str, secure: bool) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token.to_string()))
            .path("/")
            .same_site(SameSite::Lax)
            .http_only(true)
            .secure(secure)
            .max_age(cookie::time::Duration::seconds(self.session_store.ttl().num_seconds()))
            .build()
    }

    pub fn create_logout_cookie() -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .same_site(SameSite::Lax)
            .http_only(true)
            .max_age(cookie::time::Duration::seconds(0))
            .build()
    }
}
