// HTTP handlers for review endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::middleware::AuthenticatedUser;
use crate::reviews::{
    models::{CreateReviewRequest, Review, UpdateReviewRequest},
    ServiceError,
};
use crate::AppState;

/// POST /api/v1/reviews
pub async fn create_review(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ServiceError> {
    let review = state
        .review_service
        .create_review(user.user_id, None, request)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// POST /api/v1/tours/:tour_id/reviews
pub async fn create_review_for_tour(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(tour_id): Path<i32>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ServiceError> {
    let review = state
        .review_service
        .create_review(user.user_id, Some(tour_id), request)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// GET /api/v1/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<Review>>, ServiceError> {
    let reviews = state.review_service.get_reviews(None).await?;
    Ok(Json(reviews))
}

/// GET /api/v1/tours/:tour_id/reviews
pub async fn list_reviews_for_tour(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(tour_id): Path<i32>,
) -> Result<Json<Vec<Review>>, ServiceError> {
    let reviews = state.review_service.get_reviews(Some(tour_id)).await?;
    Ok(Json(reviews))
}

/// GET /api/v1/reviews/:id
pub async fn get_review(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(review_id): Path<i32>,
) -> Result<Json<Review>, ServiceError> {
    let review = state.review_service.get_review(review_id).await?;
    Ok(Json(review))
}

/// PATCH /api/v1/reviews/:id
pub async fn update_review(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(review_id): Path<i32>,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<Review>, ServiceError> {
    let review = state
        .review_service
        .update_review(review_id, user.user_id, user.role, request)
        .await?;
    Ok(Json(review))
}

/// DELETE /api/v1/reviews/:id
pub async fn delete_review(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(review_id): Path<i32>,
) -> Result<StatusCode, ServiceError> {
    state
        .review_service
        .delete_review(review_id, user.user_id, user.role)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
