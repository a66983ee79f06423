use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// Service-level errors for the reviews system
#[derive(Debug)]
pub enum ServiceError {
    /// Review not found
    NotFound,

    /// User has already reviewed this tour
    DuplicateReview,

    /// User neither owns this review nor is an admin
    Forbidden,

    /// Validation error with details
    ValidationError(String),

    /// Tour not found
    TourNotFound,

    /// Database error
    DatabaseError(sqlx::Error),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::NotFound => write!(f, "Review not found"),
            ServiceError::DuplicateReview => {
                write!(f, "Duplicate review: user has already reviewed this tour")
            }
            ServiceError::Forbidden => {
                write!(f, "Forbidden: user does not own this review")
            }
            ServiceError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ServiceError::TourNotFound => write!(f, "Tour not found"),
            ServiceError::DatabaseError(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::DatabaseError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::DatabaseError(err)
    }
}

/// Error response structure for review API responses
#[derive(Serialize)]
pub struct ReviewErrorBody {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ServiceError::NotFound => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Review not found".to_string(),
            ),
            ServiceError::DuplicateReview => (
                StatusCode::CONFLICT,
                "DUPLICATE_REVIEW",
                "User has already reviewed this tour".to_string(),
            ),
            ServiceError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "User does not own this review".to_string(),
            ),
            ServiceError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            ServiceError::TourNotFound => (
                StatusCode::NOT_FOUND,
                "TOUR_NOT_FOUND",
                "Tour not found".to_string(),
            ),
            ServiceError::DatabaseError(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ReviewErrorBody {
            error: error_type.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(ServiceError::NotFound.to_string(), "Review not found");
        assert_eq!(ServiceError::TourNotFound.to_string(), "Tour not found");
        assert!(ServiceError::DuplicateReview
            .to_string()
            .contains("already reviewed"));
    }

    #[test]
    fn test_database_error_keeps_source() {
        let err = ServiceError::from(sqlx::Error::RowNotFound);
        assert!(std::error::Error::source(&err).is_some());
    }
}
