// Authentication extractor and role guards for protected routes

use crate::auth::{error::AuthError, models::Role};
use crate::AppState;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

fn bearer_token(auth_header: Option<&header::HeaderValue>) -> Result<&str, AuthError> {
    let value = auth_header
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;
    value.strip_prefix("Bearer ").ok_or(AuthError::InvalidToken)
}

/// Authenticated user extractor for protected routes.
///
/// Validates the bearer token, then loads the fresh user so tokens for
/// deleted accounts or accounts that changed their password since the
/// token was issued are rejected.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts.headers.get(header::AUTHORIZATION))?;
        let claims = state.token_service.validate_token(token)?;

        // Fresh-user check: the account must still exist and be active
        let user = state
            .user_repository
            .find_active_by_id(claims.sub)
            .await?
            .ok_or(AuthError::UserGone)?;

        if user.changed_password_after(claims.iat) {
            return Err(AuthError::PasswordChanged);
        }

        Ok(AuthenticatedUser {
            user_id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        })
    }
}

/// Route-layer guard restricting access to a set of roles.
///
/// Checks the role claim carried by the token; the fresh-user check still
/// happens in the `AuthenticatedUser` extractor of the guarded handler.
#[derive(Debug, Clone)]
pub struct RequireRole {
    allowed: &'static [Role],
}

impl RequireRole {
    pub fn any_of(allowed: &'static [Role]) -> Self {
        Self { allowed }
    }

    pub fn admin() -> Self {
        Self::any_of(&[Role::Admin])
    }

    pub async fn handle(
        self,
        state: AppState,
        request: Request,
        next: Next,
    ) -> Result<Response, AuthError> {
        let endpoint = request.uri().path().to_string();

        let token = bearer_token(request.headers().get(header::AUTHORIZATION)).map_err(|e| {
            warn!("Rejected unauthenticated request to {}", endpoint);
            e
        })?;
        let claims = state.token_service.validate_token(token)?;

        if !self.allowed.contains(&claims.role) {
            warn!(
                "Authorization failed: user_id={}, role={}, endpoint={}",
                claims.sub, claims.role, endpoint
            );
            return Err(AuthError::InsufficientPermissions { actual: claims.role });
        }

        debug!(
            "Authorization successful: user_id={}, role={}, endpoint={}",
            claims.sub, claims.role, endpoint
        );
        Ok(next.run(request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let value = HeaderValue::from_static("Bearer abc.def.ghi");
        assert_eq!(bearer_token(Some(&value)).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_header_is_missing_token() {
        assert!(matches!(bearer_token(None), Err(AuthError::MissingToken)));
    }

    #[test]
    fn test_non_bearer_schemes_are_rejected() {
        for raw in ["Basic dXNlcjpwYXNz", "token_without_bearer", "bearer lowercase"] {
            let value = HeaderValue::from_str(raw).unwrap();
            assert!(matches!(
                bearer_token(Some(&value)),
                Err(AuthError::InvalidToken)
            ));
        }
    }

    #[test]
    fn test_role_sets() {
        let guard = RequireRole::any_of(&[Role::Admin, Role::LeadGuide]);
        assert!(guard.allowed.contains(&Role::Admin));
        assert!(guard.allowed.contains(&Role::LeadGuide));
        assert!(!guard.allowed.contains(&Role::User));

        assert_eq!(RequireRole::admin().allowed, &[Role::Admin]);
    }
}
