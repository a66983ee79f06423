// HTTP handlers for authentication endpoints

use crate::auth::{
    error::AuthError,
    middleware::AuthenticatedUser,
    models::{
        AuthResponse, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest, SignupRequest,
        UpdatePasswordRequest,
    },
};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

/// POST /api/v1/users/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    let response = state.auth_service.signup(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/users/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let response = state.auth_service.login(request).await?;
    Ok(Json(response))
}

/// POST /api/v1/users/forgot-password
///
/// The reset token leaves the process through the delivery channel only,
/// never through this response.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>, AuthError> {
    state.auth_service.forgot_password(&request.email).await?;
    Ok(Json(json!({ "message": "Reset token sent" })))
}

/// PATCH /api/v1/users/reset-password/:token
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let response = state.auth_service.reset_password(&token, request).await?;
    Ok(Json(response))
}

/// PATCH /api/v1/users/update-my-password
pub async fn update_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<UpdatePasswordRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let response = state
        .auth_service
        .update_password(user.user_id, request)
        .await?;
    Ok(Json(response))
}
