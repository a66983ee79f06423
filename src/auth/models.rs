// Authentication data models and DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use validator::Validate;

/// User roles, stored as the Postgres enum `user_role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "user_role", rename_all = "kebab-case")]
pub enum Role {
    User,
    Guide,
    LeadGuide,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::User => "user",
            Role::Guide => "guide",
            Role::LeadGuide => "lead-guide",
            Role::Admin => "admin",
        };
        write!(f, "{}", name)
    }
}

/// User database model
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub photo: String,
    pub role: Role,
    pub password_changed_at: DateTime<Utc>,
    pub password_reset_token: Option<String>,
    pub password_reset_expires: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// True when the JWT was issued before the user's last password change.
    /// The change timestamp is compared at whole-second resolution, the
    /// same granularity the token's `iat` carries.
    pub fn changed_password_after(&self, token_issued_at: i64) -> bool {
        token_issued_at < self.password_changed_at.timestamp()
    }
}

/// User response model; never carries the password hash or reset fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub photo: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            photo: user.photo,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Signup request DTO
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 5, max = 15, message = "Name must be between 5 and 15 characters"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub password_confirm: String,
    /// Requested role; privileged roles are never granted through signup
    pub role: Option<Role>,
}

/// Login request DTO
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

/// Forgot-password request DTO
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

/// Reset-password request DTO (the token travels in the path)
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub password_confirm: String,
}

/// Password update request DTO for logged-in users
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    pub password_current: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub password_confirm: String,
}

/// Authentication response DTO
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_user(password_changed_at: DateTime<Utc>) -> User {
        User {
            id: 1,
            name: "Forest Guide".to_string(),
            email: "guide@example.com".to_string(),
            password_hash: "hash".to_string(),
            photo: "default.jpg".to_string(),
            role: Role::Guide,
            password_changed_at,
            password_reset_token: None,
            password_reset_expires: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&Role::LeadGuide).unwrap(), "\"lead-guide\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        let parsed: Role = serde_json::from_str("\"lead-guide\"").unwrap();
        assert_eq!(parsed, Role::LeadGuide);
    }

    #[test]
    fn test_changed_password_after() {
        let changed_at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let user = test_user(changed_at);

        // Token issued before the change is stale
        assert!(user.changed_password_after(changed_at.timestamp() - 60));
        // Token issued after the change is fine
        assert!(!user.changed_password_after(changed_at.timestamp() + 60));
        // Same second counts as issued-after
        assert!(!user.changed_password_after(changed_at.timestamp()));
    }

    #[test]
    fn test_user_response_excludes_secrets() {
        let response = UserResponse::from(test_user(Utc::now()));
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("hash"));
        assert!(json.contains("\"email\":\"guide@example.com\""));
    }

    #[test]
    fn test_signup_request_validation() {
        use validator::Validate;

        let valid = SignupRequest {
            name: "Bahi Habash".to_string(),
            email: "bahi@example.com".to_string(),
            password: "supersecret".to_string(),
            password_confirm: "supersecret".to_string(),
            role: None,
        };
        assert!(valid.validate().is_ok());

        let mismatched = SignupRequest {
            password_confirm: "different".to_string(),
            ..valid
        };
        assert!(mismatched.validate().is_err());

        let short_name = SignupRequest {
            name: "Bo".to_string(),
            email: "bo@example.com".to_string(),
            password: "supersecret".to_string(),
            password_confirm: "supersecret".to_string(),
            role: None,
        };
        assert!(short_name.validate().is_err());
    }
}
