use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::validation::validate_positive_price;

/// A paid (or admin-recorded) booking of a tour by a user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Booking {
    pub id: i32,
    pub tour_id: i32,
    pub user_id: i32,
    #[schema(example = 497.0)]
    pub price: f64,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

/// Admin booking creation
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_booking_price"))]
pub struct CreateBookingRequest {
    pub tour_id: i32,
    pub user_id: i32,
    pub price: f64,
    pub paid: Option<bool>,
}

fn validate_booking_price(request: &CreateBookingRequest) -> Result<(), ValidationError> {
    validate_positive_price(request.price)
}

/// Admin booking update
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBookingRequest {
    pub price: Option<f64>,
    pub paid: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_booking_price_must_be_positive() {
        let request = CreateBookingRequest {
            tour_id: 1,
            user_id: 2,
            price: 0.0,
            paid: None,
        };
        assert!(request.validate().is_err());

        let request = CreateBookingRequest {
            price: 497.0,
            ..request
        };
        assert!(request.validate().is_ok());
    }
}
