// HTTP handlers for booking endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::auth::middleware::AuthenticatedUser;
use crate::bookings::{
    models::{Booking, CreateBookingRequest, UpdateBookingRequest},
    BookingError,
};
use crate::AppState;

/// POST /api/v1/bookings/checkout/:tour_id
///
/// Books the tour for the current user at its current price. The payment
/// session itself happens outside this API; the booking is recorded paid.
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(tour_id): Path<i32>,
) -> Result<(StatusCode, Json<Booking>), BookingError> {
    let price = state
        .booking_repository
        .tour_price(tour_id)
        .await?
        .ok_or(BookingError::TourNotFound(tour_id))?;

    let booking = state
        .booking_repository
        .create(tour_id, user.user_id, price, true)
        .await?;

    tracing::info!(
        "User {} booked tour {} for {}",
        user.user_id,
        tour_id,
        price
    );
    Ok((StatusCode::CREATED, Json(booking)))
}

/// GET /api/v1/bookings/me
pub async fn my_bookings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Booking>>, BookingError> {
    let bookings = state.booking_repository.list_for_user(user.user_id).await?;
    Ok(Json(bookings))
}

/// GET /api/v1/bookings (admin / lead-guide)
pub async fn list_bookings(
    State(state): State<AppState>,
) -> Result<Json<Vec<Booking>>, BookingError> {
    let bookings = state.booking_repository.list_all().await?;
    Ok(Json(bookings))
}

/// GET /api/v1/bookings/:id (admin / lead-guide)
pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Booking>, BookingError> {
    let booking = state
        .booking_repository
        .find_by_id(id)
        .await?
        .ok_or(BookingError::NotFound)?;
    Ok(Json(booking))
}

/// POST /api/v1/bookings (admin / lead-guide)
pub async fn create_booking(
    State(state): State<AppState>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), BookingError> {
    request
        .validate()
        .map_err(|e| BookingError::ValidationError(e.to_string()))?;

    if state
        .booking_repository
        .tour_price(request.tour_id)
        .await?
        .is_none()
    {
        return Err(BookingError::TourNotFound(request.tour_id));
    }

    let booking = state
        .booking_repository
        .create(
            request.tour_id,
            request.user_id,
            request.price,
            request.paid.unwrap_or(true),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// PATCH /api/v1/bookings/:id (admin / lead-guide)
pub async fn update_booking(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateBookingRequest>,
) -> Result<Json<Booking>, BookingError> {
    request
        .validate()
        .map_err(|e| BookingError::ValidationError(e.to_string()))?;

    if let Some(price) = request.price {
        if price <= 0.0 || !price.is_finite() {
            return Err(BookingError::ValidationError(
                "Price must be a positive number".to_string(),
            ));
        }
    }

    let booking = state
        .booking_repository
        .update(id, request.price, request.paid)
        .await?
        .ok_or(BookingError::NotFound)?;
    Ok(Json(booking))
}

/// DELETE /api/v1/bookings/:id (admin / lead-guide)
pub async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, BookingError> {
    if !state.booking_repository.delete(id).await? {
        return Err(BookingError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}
