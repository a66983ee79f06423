// Authentication and authorization error types

use crate::auth::models::Role;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use tracing::{error, warn};

/// Authentication and authorization error types
#[derive(Debug)]
pub enum AuthError {
    // Authentication errors
    ValidationError(String),
    InvalidCredentials,
    InvalidToken,
    ExpiredToken,
    MissingToken,
    /// Token is valid but its user no longer exists (or was deactivated)
    UserGone,
    /// Token was issued before the user's last password change
    PasswordChanged,
    EmailAlreadyExists,
    /// No account for the given email (forgot-password flow)
    EmailNotFound,
    /// Reset-password token unknown or expired
    InvalidResetToken,
    /// Current password supplied on password update was wrong
    IncorrectPassword,
    DatabaseError(String),
    PasswordHashError,
    TokenGenerationError(String),

    // Authorization errors
    /// User's role is not in the allowed set for the route
    InsufficientPermissions { actual: Role },
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::ExpiredToken => write!(f, "Token has expired"),
            AuthError::MissingToken => write!(f, "Missing authentication token"),
            AuthError::UserGone => write!(f, "The user belonging to this token no longer exists"),
            AuthError::PasswordChanged => {
                write!(f, "Password was changed after this token was issued")
            }
            AuthError::EmailAlreadyExists => write!(f, "Email already exists"),
            AuthError::EmailNotFound => write!(f, "There is no user with that email address"),
            AuthError::InvalidResetToken => write!(f, "Invalid or expired password reset token"),
            AuthError::IncorrectPassword => write!(f, "Current password is not correct"),
            AuthError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AuthError::PasswordHashError => write!(f, "Password hashing error"),
            AuthError::TokenGenerationError(msg) => write!(f, "Token generation error: {}", msg),
            AuthError::InsufficientPermissions { actual } => write!(
                f,
                "Insufficient permissions: role '{}' may not perform this action",
                actual
            ),
        }
    }
}

impl std::error::Error for AuthError {}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::MissingToken
            | AuthError::UserGone
            | AuthError::PasswordChanged
            | AuthError::InvalidResetToken
            | AuthError::IncorrectPassword => StatusCode::UNAUTHORIZED,
            AuthError::EmailAlreadyExists => StatusCode::CONFLICT,
            AuthError::EmailNotFound => StatusCode::NOT_FOUND,
            AuthError::DatabaseError(_)
            | AuthError::PasswordHashError
            | AuthError::TokenGenerationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
        }
    }

    /// Message that is safe to send to clients (no sensitive data)
    pub fn error_message(&self) -> String {
        match self {
            AuthError::ValidationError(msg) => msg.clone(),
            AuthError::InvalidCredentials => "Invalid email or password".to_string(),
            AuthError::InvalidToken => "Invalid token".to_string(),
            AuthError::ExpiredToken => "Token has expired".to_string(),
            AuthError::MissingToken => {
                "You are not logged in, please log in to get access".to_string()
            }
            AuthError::UserGone => {
                "The user belonging to this token no longer exists".to_string()
            }
            AuthError::PasswordChanged => {
                "Password was recently changed, please log in again".to_string()
            }
            AuthError::EmailAlreadyExists => "Email already exists".to_string(),
            AuthError::EmailNotFound => "There is no user with that email address".to_string(),
            AuthError::InvalidResetToken => {
                "Invalid or expired password reset token".to_string()
            }
            AuthError::IncorrectPassword => "Current password is not correct".to_string(),
            AuthError::DatabaseError(_)
            | AuthError::PasswordHashError
            | AuthError::TokenGenerationError(_) => "Internal server error".to_string(),
            AuthError::InsufficientPermissions { .. } => {
                "You do not have permission to perform this action".to_string()
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::InvalidToken => warn!("Invalid token attempt"),
            AuthError::ExpiredToken => warn!("Expired token attempt"),
            AuthError::MissingToken => warn!("Missing token in request"),
            AuthError::UserGone => warn!("Token presented for a deleted user"),
            AuthError::PasswordChanged => warn!("Token predates a password change"),
            AuthError::InsufficientPermissions { actual } => {
                warn!("Authorization failed for role '{}'", actual)
            }
            AuthError::DatabaseError(msg) => error!("Database error in auth: {}", msg),
            AuthError::PasswordHashError => error!("Password hashing error"),
            AuthError::TokenGenerationError(msg) => error!("Token generation error: {}", msg),
            _ => {}
        }

        let body = Json(json!({
            "error": self.error_message(),
        }));

        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::MissingToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::UserGone.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::PasswordChanged.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::EmailAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(AuthError::EmailNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AuthError::InsufficientPermissions { actual: Role::User }.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::DatabaseError("x".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_errors_do_not_leak() {
        let err = AuthError::DatabaseError("connection refused at 10.0.0.1".to_string());
        assert_eq!(err.error_message(), "Internal server error");
    }
}
