use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Domain model representing a review in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Review {
    pub id: i32,
    pub user_id: i32,
    pub tour_id: i32,
    #[schema(example = 5, minimum = 1, maximum = 5)]
    pub rating: i16,
    #[schema(example = "Loved every minute of it")]
    pub review: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for creating a new review.
/// The tour id may come from the body or from the nested tour route.
#[derive(Debug, Deserialize, Validate, Clone, ToSchema)]
pub struct CreateReviewRequest {
    pub tour_id: Option<i32>,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,
    #[validate(length(min = 1, max = 1000, message = "Review must be 1-1000 characters"))]
    pub review: String,
}

/// Request DTO for updating an existing review
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i16>,
    #[validate(length(min = 1, max = 1000, message = "Review must be 1-1000 characters"))]
    pub review: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_review_rating_bounds() {
        let request = CreateReviewRequest {
            tour_id: Some(1),
            rating: 5,
            review: "Great trip".to_string(),
        };
        assert!(request.validate().is_ok());

        let request = CreateReviewRequest {
            rating: 6,
            ..request
        };
        assert!(request.validate().is_err());

        let request = CreateReviewRequest {
            tour_id: Some(1),
            rating: 0,
            review: "Great trip".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_create_review_requires_text() {
        let request = CreateReviewRequest {
            tour_id: Some(1),
            rating: 4,
            review: String::new(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_update_review_allows_partial() {
        let request = UpdateReviewRequest {
            rating: None,
            review: Some("Updated thoughts".to_string()),
        };
        assert!(request.validate().is_ok());
    }
}
