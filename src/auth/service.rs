// Authentication service - business logic layer

use crate::auth::{
    error::AuthError,
    models::{
        AuthResponse, LoginRequest, ResetPasswordRequest, Role, SignupRequest,
        UpdatePasswordRequest, User, UserResponse,
    },
    password::PasswordService,
    repository::UserRepository,
    token::TokenService,
};
use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use validator::Validate;

/// Reset tokens die after 10 minutes.
const RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// Generate a random password-reset token. The plain form would be mailed
/// to the user; only its digest is ever stored.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// SHA-256 hex digest of a reset token
pub fn hash_reset_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Authentication service coordinating all auth operations
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    token_service: TokenService,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, token_service: TokenService) -> Self {
        Self {
            user_repo,
            token_service,
        }
    }

    fn build_response(&self, user: User) -> Result<AuthResponse, AuthError> {
        let token = self
            .token_service
            .generate_token(user.id, &user.email, user.role)?;
        Ok(AuthResponse {
            token,
            user: UserResponse::from(user),
        })
    }

    /// Register a new user.
    ///
    /// Privileged roles are never granted through signup: a request asking
    /// for admin or lead-guide is downgraded to a plain user account.
    pub async fn signup(&self, request: SignupRequest) -> Result<AuthResponse, AuthError> {
        request
            .validate()
            .map_err(|e| AuthError::ValidationError(e.to_string()))?;

        let role = match request.role {
            Some(Role::User) | None => Role::User,
            Some(Role::Guide) => Role::Guide,
            Some(requested) => {
                tracing::warn!(
                    "Signup for {} requested privileged role '{}', granting 'user'",
                    request.email,
                    requested
                );
                Role::User
            }
        };

        let password_hash = PasswordService::hash_password(&request.password)?;
        let user = self
            .user_repo
            .create_user(&request.name, &request.email, &password_hash, role)
            .await?;

        tracing::info!("New user signed up: id={}", user.id);
        self.build_response(user)
    }

    /// Login with email and password.
    /// Unknown email and wrong password are indistinguishable to the client.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        request
            .validate()
            .map_err(|e| AuthError::ValidationError(e.to_string()))?;

        let user = self
            .user_repo
            .find_by_email(&request.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !PasswordService::verify_password(&request.password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        self.build_response(user)
    }

    /// Start the password-reset flow. Returns the plain token; the caller
    /// decides how it leaves the system (delivery is out of scope here).
    pub async fn forgot_password(&self, email: &str) -> Result<String, AuthError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AuthError::EmailNotFound)?;

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.user_repo
            .set_reset_token(user.id, &hash_reset_token(&token), expires_at)
            .await?;

        tracing::info!("Password reset token issued for user id={}", user.id);
        // Stand-in delivery channel; the token never enters a response body
        tracing::debug!("Reset token for user id={}: {}", user.id, token);
        Ok(token)
    }

    /// Complete the password-reset flow with the plain token from the link.
    /// Logs the user in on success.
    pub async fn reset_password(
        &self,
        token: &str,
        request: ResetPasswordRequest,
    ) -> Result<AuthResponse, AuthError> {
        request
            .validate()
            .map_err(|e| AuthError::ValidationError(e.to_string()))?;

        let user = self
            .user_repo
            .find_by_reset_token(&hash_reset_token(token))
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        let password_hash = PasswordService::hash_password(&request.password)?;
        let user = self.user_repo.update_password(user.id, &password_hash).await?;

        tracing::info!("Password reset completed for user id={}", user.id);
        self.build_response(user)
    }

    /// Change the password of a logged-in user, verifying the current one.
    /// Issues a fresh token since the old ones die with the change.
    pub async fn update_password(
        &self,
        user_id: i32,
        request: UpdatePasswordRequest,
    ) -> Result<AuthResponse, AuthError> {
        request
            .validate()
            .map_err(|e| AuthError::ValidationError(e.to_string()))?;

        let user = self
            .user_repo
            .find_active_by_id(user_id)
            .await?
            .ok_or(AuthError::UserGone)?;

        if !PasswordService::verify_password(&request.password_current, &user.password_hash)? {
            return Err(AuthError::IncorrectPassword);
        }

        let password_hash = PasswordService::hash_password(&request.password)?;
        let user = self.user_repo.update_password(user.id, &password_hash).await?;

        self.build_response(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_token_is_64_hex_chars() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_reset_tokens_are_unique() {
        assert_ne!(generate_reset_token(), generate_reset_token());
    }

    #[test]
    fn test_hash_reset_token_is_deterministic_sha256() {
        let digest = hash_reset_token("abc");
        // SHA-256("abc")
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(digest, hash_reset_token("abc"));
        assert_ne!(digest, hash_reset_token("abd"));
    }
}
