//! Staff user model, JWT claims and role checks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::enums::UserRole;
use crate::error::AppError;

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub full_name: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: UserRole,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User query parameters
#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    /// Matches username, full name or email
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub active: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create user request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 120, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role: UserRole,
}

/// Update user request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUser {
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters"))]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 120, message = "Full name cannot be empty"))]
    pub full_name: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub active: Option<bool>,
}

/// Change own password request
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePassword {
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Sign the claims (HS256)
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and verify a JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn has_role(&self, roles: &[UserRole]) -> bool {
        roles.contains(&self.role)
    }

    /// Require one of the given roles
    pub fn require_roles(&self, roles: &[UserRole]) -> Result<(), AppError> {
        if self.has_role(roles) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "Role '{}' is not allowed to perform this action",
                self.role
            )))
        }
    }

    /// Staff access: admins and librarians
    pub fn require_staff(&self) -> Result<(), AppError> {
        self.require_roles(&[UserRole::Admin, UserRole::Librarian])
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: UserRole, exp_offset: i64) -> UserClaims {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: "maria".to_string(),
            user_id: Uuid::new_v4(),
            username: "maria".to_string(),
            role,
            exp: now + exp_offset,
            iat: now,
        }
    }

    #[test]
    fn test_token_roundtrip_and_wrong_secret() {
        let original = claims(UserRole::Librarian, 3600);
        let token = original.create_token("secret").unwrap();

        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, original.user_id);
        assert_eq!(parsed.role, UserRole::Librarian);

        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = claims(UserRole::Admin, -3600).create_token("secret").unwrap();
        assert!(UserClaims::from_token(&token, "secret").is_err());
    }

    #[test]
    fn test_role_guards() {
        let librarian = claims(UserRole::Librarian, 60);
        assert!(librarian.require_staff().is_ok());
        assert!(matches!(librarian.require_admin(), Err(AppError::Authorization(_))));
        assert!(claims(UserRole::Admin, 60).require_admin().is_ok());
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            username: "admin".into(),
            email: None,
            full_name: "Admin".into(),
            password_hash: "$argon2id$...".into(),
            role: UserRole::Admin,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "admin");
    }

    #[test]
    fn test_create_user_validation() {
        let request = CreateUser {
            username: "al".into(),
            email: Some("not-an-email".into()),
            full_name: "Al".into(),
            password: "short".into(),
            role: UserRole::Librarian,
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}
