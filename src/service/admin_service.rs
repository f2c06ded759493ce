use std::sync::Arc;
use rand::{distributions::Alphanumeric, Rng};
use uuid::Uuid;

use crate::{
    auth::{AuthService, PasswordCheck},
    domain::{CreateAdminRequest, CreateUserRequest, User, UserRole},
    error::{AppError, Result},
    repository::UserRepository,
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Result of a successful login.
pub struct LoginOutcome {
    pub user: User,
    pub token: String,
}

pub struct AdminService {
    users: Arc<dyn UserRepository>,
    auth: Arc<AuthService>,
}

impl AdminService {
    pub fn new(users: Arc<dyn UserRepository>, auth: Arc<AuthService>) -> Self {
        Self { users, auth }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        let user = self.users.find_by_username(username.trim()).await?
            .ok_or(AppError::Unauthorized)?;

        match AuthService::check_password(password, &user.password_hash).await? {
            PasswordCheck::Valid => {}
            PasswordCheck::ValidLegacy => {
                let hash = AuthService::hash_password(password).await?;
                self.users.update_password_hash(user.id, &hash).await?;
                tracing::info!("Upgraded legacy password storage for {}", user.username);
            }
            PasswordCheck::Invalid => {
                tracing::debug!("Failed login for {}", user.username);
                return Err(AppError::Unauthorized);
            }
        }

        let session = self.auth.create_session(user.id).await?;
        tracing::info!("User {} logged in, session valid until {}", user.username, session.expires_at);

        Ok(LoginOutcome { user, token: session.token })
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        self.auth.invalidate_session(token).await
    }

    pub async fn change_password(&self, user: &User, old_password: &str, new_password: &str) -> Result<()> {
        // Re-read so a concurrent reset is not silently overwritten
        let stored = self.users.find_by_id(user.id).await?
            .ok_or(AppError::Unauthorized)?;

        if !AuthService::check_password(old_password, &stored.password_hash).await?.is_valid() {
            return Err(AppError::Unauthorized);
        }

        validate_password(new_password)?;
        let hash = AuthService::hash_password(new_password).await?;
        self.users.update_password_hash(user.id, &hash).await?;

        tracing::info!("User {} changed their password", user.username);
        Ok(())
    }

    pub async fn list_admins(&self) -> Result<Vec<User>> {
        self.users.list().await
    }

    pub async fn create_admin(&self, actor: &User, request: CreateAdminRequest) -> Result<User> {
        require_super_admin(actor)?;

        let username = request.username.trim();
        if username.is_empty() {
            return Err(AppError::BadRequest("Missing required fields: username".to_string()));
        }
        validate_password(&request.password)?;

        let user = self.users
            .create(CreateUserRequest {
                username: username.to_string(),
                password: request.password,
                role: UserRole::Admin,
            })
            .await?;

        tracing::info!("{} created admin {}", actor.username, user.username);
        Ok(user)
    }

    pub async fn reset_password(&self, actor: &User, target_id: Uuid, new_password: &str) -> Result<()> {
        require_super_admin(actor)?;
        validate_password(new_password)?;

        let target = self.users.find_by_id(target_id).await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let hash = AuthService::hash_password(new_password).await?;
        self.users.update_password_hash(target.id, &hash).await?;

        if target.id != actor.id {
            self.auth.invalidate_user_sessions(target.id).await?;
        }

        tracing::info!("{} reset the password of {}", actor.username, target.username);
        Ok(())
    }

    pub async fn delete_admin(&self, actor: &User, target_id: Uuid) -> Result<()> {
        require_super_admin(actor)?;

        let target = self.users.find_by_id(target_id).await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if target.is_super_admin() {
            return Err(AppError::Forbidden(
                "The super administrator account cannot be deleted".to_string(),
            ));
        }

        let revoked = self.auth.invalidate_user_sessions(target.id).await?;
        if !self.users.delete(target.id).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        tracing::info!(
            "{} deleted admin {} ({} sessions revoked)",
            actor.username, target.username, revoked
        );
        Ok(())
    }

    /// Makes sure a super administrator exists. An existing account with the
    /// bootstrap username is promoted; otherwise one is created. Returns the
    /// generated password when none was configured.
    pub async fn ensure_super_admin(
        &self,
        username: &str,
        password: Option<&str>,
    ) -> Result<Option<String>> {
        if self.users.count_by_role(UserRole::SuperAdmin).await? > 0 {
            return Ok(None);
        }

        if let Some(existing) = self.users.find_by_username(username).await? {
            self.users.update_role(existing.id, UserRole::SuperAdmin).await?;
            tracing::info!("Promoted {} to super administrator", existing.username);
            return Ok(None);
        }

        let (password, generated) = match password.filter(|p| !p.is_empty()) {
            Some(p) => (p.to_string(), None),
            None => {
                let p = generate_password();
                (p.clone(), Some(p))
            }
        };

        self.users
            .create(CreateUserRequest {
                username: username.to_string(),
                password,
                role: UserRole::SuperAdmin,
            })
            .await?;

        tracing::info!("Created super administrator {}", username);
        Ok(generated)
    }
}

pub fn require_super_admin(user: &User) -> Result<()> {
    if !user.is_super_admin() {
        return Err(AppError::Forbidden(
            "Only the super administrator can manage admin accounts".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
    }

    #[test]
    fn test_generated_password() {
        let password = generate_password();
        assert_eq!(password.len(), 20);
        assert!(validate_password(&password).is_ok());
    }
}
