//! Bearer authentication backed by a delegated token validator.
//!
//! Token issuance and cryptographic validation belong to the external
//! auth collaborator; this module only consumes the decoded owner
//! identity behind the [`TokenValidator`] interface.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use common::UserId;
use thiserror::Error;
use uuid::Uuid;

/// Decoded identity of an authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub role: String,
}

/// Authentication failures, all answered with 401.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token is required")]
    MissingToken,

    #[error("Token is invalid or expired")]
    InvalidToken,
}

/// Validates bearer credentials and returns the decoded identity.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<AuthUser, AuthError>;
}

/// Extracts and validates the bearer token from the request headers.
pub async fn authenticate(
    validator: &dyn TokenValidator,
    headers: &HeaderMap,
) -> Result<AuthUser, AuthError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingToken)?;

    validator.validate(token).await
}

/// Token validator backed by a static token table.
///
/// Stands in for the external token-validation capability in tests and
/// local development; a production deployment would put a real validator
/// behind the same trait.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenValidator {
    tokens: HashMap<String, AuthUser>,
}

impl StaticTokenValidator {
    /// Creates an empty validator (every request is rejected).
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token for a user.
    pub fn insert(&mut self, token: impl Into<String>, user_id: UserId, role: impl Into<String>) {
        self.tokens.insert(
            token.into(),
            AuthUser {
                user_id,
                role: role.into(),
            },
        );
    }

    /// Loads tokens from the `API_AUTH_TOKENS` environment variable.
    ///
    /// Format: `token:user-uuid:role` entries separated by `;`.
    /// Malformed entries are skipped with a warning.
    pub fn from_env() -> Self {
        let mut validator = Self::new();
        let Ok(raw) = std::env::var("API_AUTH_TOKENS") else {
            return validator;
        };

        for entry in raw.split(';').filter(|e| !e.is_empty()) {
            let mut parts = entry.splitn(3, ':');
            let (Some(token), Some(user), role) = (parts.next(), parts.next(), parts.next()) else {
                tracing::warn!(entry, "skipping malformed auth token entry");
                continue;
            };
            match Uuid::parse_str(user) {
                Ok(uuid) => {
                    validator.insert(token, UserId::from_uuid(uuid), role.unwrap_or("customer"));
                }
                Err(_) => tracing::warn!(entry, "skipping auth token entry with invalid user id"),
            }
        }
        validator
    }
}

#[async_trait]
impl TokenValidator for StaticTokenValidator {
    async fn validate(&self, token: &str) -> Result<AuthUser, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[tokio::test]
    async fn test_valid_token_decodes_identity() {
        let user_id = UserId::new();
        let mut validator = StaticTokenValidator::new();
        validator.insert("secret", user_id, "customer");

        let user = authenticate(&validator, &headers_with("Bearer secret"))
            .await
            .unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.role, "customer");
    }

    #[tokio::test]
    async fn test_missing_header_is_rejected() {
        let validator = StaticTokenValidator::new();
        let result = authenticate(&validator, &HeaderMap::new()).await;
        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_is_rejected() {
        let mut validator = StaticTokenValidator::new();
        validator.insert("secret", UserId::new(), "customer");

        let result = authenticate(&validator, &headers_with("Basic secret")).await;
        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn test_unknown_token_is_rejected() {
        let validator = StaticTokenValidator::new();
        let result = authenticate(&validator, &headers_with("Bearer nope")).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }
}
