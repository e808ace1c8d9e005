//! Staff account management and password handling

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::UserRole,
        user::{ChangePassword, CreateUser, UpdateUser, User, UserQuery},
    },
    repository::Repository,
};

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against a stored Argon2 hash
pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Current account, refused when it was deactivated after the token was issued
    pub async fn me(&self, id: Uuid) -> AppResult<User> {
        let user = self.repository.users.get_by_id(id).await.map_err(|e| match e {
            AppError::NotFound(_) => AppError::Authentication("Account no longer exists".to_string()),
            other => other,
        })?;
        if !user.active {
            return Err(AppError::Authentication("Account is disabled".to_string()));
        }
        Ok(user)
    }

    /// Search users
    pub async fn search(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        self.repository.users.search(query).await
    }

    /// Create a new user
    pub async fn create(&self, user: CreateUser) -> AppResult<User> {
        user.validate()?;

        if self.repository.users.username_exists(&user.username, None).await? {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }
        if let Some(ref email) = user.email {
            if self.repository.users.email_exists(email, None).await? {
                return Err(AppError::Conflict("Email already exists".to_string()));
            }
        }

        let password_hash = hash_password(&user.password)?;
        let created = self.repository.users.create(&user, &password_hash).await?;

        tracing::info!(user_id = %created.id, username = %created.username, role = %created.role, "User created");
        Ok(created)
    }

    /// Update a user. `acting_id` is the admin doing the change.
    pub async fn update(&self, id: Uuid, update: UpdateUser, acting_id: Uuid) -> AppResult<User> {
        update.validate()?;

        let current = self.repository.users.get_by_id(id).await?;

        if id == acting_id && update.active == Some(false) {
            return Err(AppError::BusinessRule("You cannot deactivate your own account".to_string()));
        }

        let loses_admin = current.role == UserRole::Admin
            && current.active
            && (update.role.is_some_and(|r| r != UserRole::Admin) || update.active == Some(false));
        if loses_admin && self.repository.users.count_active_admins().await? <= 1 {
            return Err(AppError::BusinessRule(
                "At least one active administrator is required".to_string(),
            ));
        }

        if let Some(ref username) = update.username {
            if self.repository.users.username_exists(username, Some(id)).await? {
                return Err(AppError::Conflict("Username already exists".to_string()));
            }
        }
        if let Some(ref email) = update.email {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict("Email already exists".to_string()));
            }
        }

        let password_hash = match update.password {
            Some(ref password) => Some(hash_password(password)?),
            None => None,
        };

        let updated = self.repository.users.update(id, &update, password_hash).await?;
        tracing::info!(user_id = %id, "User updated");
        Ok(updated)
    }

    /// Delete a user
    pub async fn delete(&self, id: Uuid, acting_id: Uuid) -> AppResult<()> {
        if id == acting_id {
            return Err(AppError::BusinessRule("You cannot delete your own account".to_string()));
        }

        let user = self.repository.users.get_by_id(id).await?;
        if user.role == UserRole::Admin
            && user.active
            && self.repository.users.count_active_admins().await? <= 1
        {
            return Err(AppError::BusinessRule(
                "At least one active administrator is required".to_string(),
            ));
        }

        if !self.repository.users.delete(id).await? {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        tracing::info!(user_id = %id, username = %user.username, "User deleted");
        Ok(())
    }

    /// Change own password after checking the current one
    pub async fn change_password(&self, id: Uuid, request: ChangePassword) -> AppResult<()> {
        request.validate()?;

        let user = self.me(id).await?;
        if !verify_password(&user.password_hash, &request.current_password)? {
            return Err(AppError::Authentication("Current password is incorrect".to_string()));
        }

        let password_hash = hash_password(&request.new_password)?;
        self.repository.users.set_password(id, &password_hash).await?;

        tracing::info!(user_id = %id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "correct horse").unwrap());
        assert!(!verify_password(&hash, "wrong horse").unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(matches!(
            verify_password("not-a-hash", "whatever"),
            Err(AppError::Internal(_))
        ));
    }
}
