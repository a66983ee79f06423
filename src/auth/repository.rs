// Database repository for users

use crate::auth::{error::AuthError, models::{Role, User}};
use crate::query::{QueryOptions, SqlQueryBuilder};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

const USER_COLUMNS: &str = "id, name, email, password_hash, photo, role, password_changed_at, \
     password_reset_token, password_reset_expires, active, created_at";

/// User repository for database operations.
/// Soft-deleted users (active = FALSE) are invisible to every read here.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash, role) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AuthError::EmailAlreadyExists;
                }
            }
            AuthError::DatabaseError(e.to_string())
        })?;

        Ok(user)
    }

    /// Find an active user by email (case-insensitive)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1) AND active = TRUE"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        Ok(user)
    }

    /// Find an active user by ID
    pub async fn find_active_by_id(&self, id: i32) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND active = TRUE"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        Ok(user)
    }

    /// List active users with query-string filters/sort/pagination applied
    pub async fn list(&self, options: &QueryOptions) -> Result<Vec<User>, sqlx::Error> {
        let mut builder = SqlQueryBuilder::new(USER_COLUMNS, "users");
        builder.add_base_clause("active = TRUE");
        builder.apply(options);
        let (query, params) = builder.build();

        let mut query = sqlx::query_as::<_, User>(&query);
        for param in params {
            query = query.bind(param);
        }
        query.fetch_all(&self.pool).await
    }

    /// Update a user's own profile (name/email only)
    pub async fn update_profile(
        &self,
        id: i32,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET name = COALESCE($1, name), email = COALESCE($2, email) \
             WHERE id = $3 AND active = TRUE RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Admin update: name, email and role
    pub async fn admin_update(
        &self,
        id: i32,
        name: Option<&str>,
        email: Option<&str>,
        role: Option<Role>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET name = COALESCE($1, name), email = COALESCE($2, email), \
             role = COALESCE($3, role) WHERE id = $4 AND active = TRUE RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(role)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Soft delete: the account disappears from every read path
    pub async fn soft_delete(&self, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET active = FALSE WHERE id = $1 AND active = TRUE")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Hard delete (admin only)
    pub async fn hard_delete(&self, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the password hash. `password_changed_at` is set one second in
    /// the past so a token minted in the same second still fails the
    /// issued-before-change check. Any pending reset token is cleared.
    pub async fn update_password(&self, id: i32, password_hash: &str) -> Result<User, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET password_hash = $1, \
             password_changed_at = NOW() - INTERVAL '1 second', \
             password_reset_token = NULL, password_reset_expires = NULL \
             WHERE id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(password_hash)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        Ok(user)
    }

    /// Store the SHA-256 digest of a reset token with its expiry
    pub async fn set_reset_token(
        &self,
        id: i32,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        sqlx::query(
            "UPDATE users SET password_reset_token = $1, password_reset_expires = $2 WHERE id = $3",
        )
        .bind(token_hash)
        .bind(expires_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// Find the user holding a non-expired reset token digest
    pub async fn find_by_reset_token(&self, token_hash: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE password_reset_token = $1 AND password_reset_expires > NOW() AND active = TRUE"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        Ok(user)
    }
}
