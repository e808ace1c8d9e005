//! Users repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        user::{CreateUser, UpdateUser, User, UserQuery},
        Pagination,
    },
};

const USER_COLUMNS: &str =
    "id, username, email, full_name, password_hash, role, active, created_at, updated_at";

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Check if username already exists (case-insensitive)
    pub async fn username_exists(&self, username: &str, exclude_id: Option<Uuid>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = LOWER($1) AND ($2::uuid IS NULL OR id != $2))",
        )
        .bind(username)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Check if email already exists (case-insensitive)
    pub async fn email_exists(&self, email: &str, exclude_id: Option<Uuid>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND ($2::uuid IS NULL OR id != $2))",
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Search users with pagination
    pub async fn search(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        let pagination = Pagination::new(query.page, query.per_page);

        let mut conditions = Vec::new();
        let mut idx = 0;

        if query.search.is_some() {
            idx += 1;
            conditions.push(format!(
                "(LOWER(username) LIKE ${i} OR LOWER(full_name) LIKE ${i} OR LOWER(COALESCE(email, '')) LIKE ${i})",
                i = idx
            ));
        }
        if query.role.is_some() {
            idx += 1;
            conditions.push(format!("role = ${}", idx));
        }
        if query.active.is_some() {
            idx += 1;
            conditions.push(format!("active = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let pattern = query.search.as_deref().map(|s| format!("%{}%", s.to_lowercase()));

        macro_rules! bind_filters {
            ($builder:expr) => {{
                let mut builder = $builder;
                if let Some(ref p) = pattern {
                    builder = builder.bind(p);
                }
                if let Some(role) = query.role {
                    builder = builder.bind(role);
                }
                if let Some(active) = query.active {
                    builder = builder.bind(active);
                }
                builder
            }};
        }

        let count_query = format!("SELECT COUNT(*) FROM users {}", where_clause);
        let total = bind_filters!(sqlx::query_scalar::<_, i64>(&count_query))
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            "SELECT {} FROM users {} ORDER BY username LIMIT {} OFFSET {}",
            USER_COLUMNS,
            where_clause,
            pagination.per_page,
            pagination.offset()
        );
        let users = bind_filters!(sqlx::query_as::<_, User>(&select_query))
            .fetch_all(&self.pool)
            .await?;

        Ok((users, total))
    }

    /// Create a new user
    pub async fn create(&self, user: &CreateUser, password_hash: &str) -> AppResult<User> {
        let now = Utc::now();

        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, email, full_name, password_hash, role, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $7)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(password_hash)
        .bind(user.role)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Username or email already exists"))
    }

    /// Update an existing user
    pub async fn update(&self, id: Uuid, user: &UpdateUser, password_hash: Option<String>) -> AppResult<User> {
        let now = Utc::now();

        let mut sets = vec!["updated_at = $1".to_string()];
        let mut param_idx = 2;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, param_idx));
                    param_idx += 1;
                }
            };
        }

        add_field!(user.username, "username");
        add_field!(user.email, "email");
        add_field!(user.full_name, "full_name");
        add_field!(user.role, "role");
        add_field!(user.active, "active");
        add_field!(password_hash, "password_hash");

        let query = format!(
            "UPDATE users SET {} WHERE id = ${} RETURNING {}",
            sets.join(", "),
            param_idx,
            USER_COLUMNS
        );

        let mut builder = sqlx::query_as::<_, User>(&query).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(user.username);
        bind_field!(user.email);
        bind_field!(user.full_name);
        bind_field!(user.role);
        bind_field!(user.active);
        bind_field!(password_hash);

        builder
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::from_unique_violation(e, "Username or email already exists"))?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Update the password hash only
    pub async fn set_password(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete a user, returns whether a row was removed
    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count active admins, used to keep at least one
    pub async fn count_active_admins(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin' AND active = TRUE")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
