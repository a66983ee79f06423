// HTTP handlers for user self-service and admin user management

use crate::auth::{
    error::AuthError,
    middleware::AuthenticatedUser,
    models::{Role, UserResponse},
    password::PasswordService,
};
use crate::error::ApiError;
use crate::query::project_fields;
use crate::users::models::{
    AdminCreateUserRequest, AdminUpdateUserRequest, UpdateMeRequest, USERS_QUERY_SCHEMA,
};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;
use validator::Validate;

fn map_db_error(error: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(ref db) = error {
        if db.code().as_deref() == Some("23505") {
            return ApiError::Conflict {
                message: "Email already in use".to_string(),
            };
        }
    }
    ApiError::DatabaseError(error)
}

/// GET /api/v1/users/me
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserResponse>, AuthError> {
    let user = state
        .user_repository
        .find_active_by_id(user.user_id)
        .await?
        .ok_or(AuthError::UserGone)?;
    Ok(Json(UserResponse::from(user)))
}

/// PATCH /api/v1/users/update-me
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<UpdateMeRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if request.contains_password_fields() {
        return Err(ApiError::BadRequest {
            message: "This route is not for password updates. Use /api/v1/users/update-my-password"
                .to_string(),
        });
    }
    request.validate()?;

    let updated = state
        .user_repository
        .update_profile(user.user_id, request.name.as_deref(), request.email.as_deref())
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| ApiError::NotFound {
            resource: "User".to_string(),
            id: user.user_id.to_string(),
        })?;

    Ok(Json(UserResponse::from(updated)))
}

/// DELETE /api/v1/users/delete-me
///
/// The account is deactivated, not removed; it vanishes from every read
/// path and can no longer authenticate.
pub async fn delete_me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<StatusCode, ApiError> {
    state.user_repository.soft_delete(user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/users (admin)
pub async fn list_users(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let options = USERS_QUERY_SCHEMA.parse(&raw)?;
    let users = state.user_repository.list(&options).await?;

    let users: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    let mut body = serde_json::to_value(users)
        .map_err(|e| ApiError::InternalError(format!("Serialization failed: {}", e)))?;
    if let Some(fields) = &options.fields {
        body = project_fields(body, fields);
    }
    Ok(Json(body))
}

/// GET /api/v1/users/:id (admin)
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .user_repository
        .find_active_by_id(id)
        .await
        .map_err(|_| ApiError::InternalError("User lookup failed".to_string()))?
        .ok_or_else(|| ApiError::NotFound {
            resource: "User".to_string(),
            id: id.to_string(),
        })?;
    Ok(Json(UserResponse::from(user)))
}

/// POST /api/v1/users (admin)
///
/// Unlike signup, an admin may assign any role directly.
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<AdminCreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    request.validate()?;

    let password_hash = PasswordService::hash_password(&request.password)
        .map_err(|_| ApiError::InternalError("Password hashing failed".to_string()))?;
    let user = state
        .user_repository
        .create_user(
            &request.name,
            &request.email,
            &password_hash,
            request.role.unwrap_or(Role::User),
        )
        .await
        .map_err(|e| match e {
            AuthError::EmailAlreadyExists => ApiError::Conflict {
                message: "Email already in use".to_string(),
            },
            other => ApiError::InternalError(other.to_string()),
        })?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// PATCH /api/v1/users/:id (admin)
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<AdminUpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    request.validate()?;

    let updated = state
        .user_repository
        .admin_update(id, request.name.as_deref(), request.email.as_deref(), request.role)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| ApiError::NotFound {
            resource: "User".to_string(),
            id: id.to_string(),
        })?;

    Ok(Json(UserResponse::from(updated)))
}

/// DELETE /api/v1/users/:id (admin) - permanent removal
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let deleted = state.user_repository.hard_delete(id).await?;
    if !deleted {
        return Err(ApiError::NotFound {
            resource: "User".to_string(),
            id: id.to_string(),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}
