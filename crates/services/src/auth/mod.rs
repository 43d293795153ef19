//! Session authentication.
//!
//! The realtime services never mint or refresh credentials; they consume a
//! [`TokenVerifier`] capability that turns a bearer token into a
//! [`UserDescriptor`]. The production verifier validates the identity
//! service's HS256 JWTs locally; tests substitute a static verifier.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential was supplied, or it was not in a recognizable shape.
    #[error("Authentication required")]
    MissingCredential,
    /// A credential was supplied but the verifier rejected it.
    #[error("Authentication failed: {0}")]
    InvalidToken(String),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "AUTH_REQUIRED",
            AuthError::InvalidToken(_) => "AUTH_FAILED",
        }
    }
}

/// The identity attached to a session for its lifetime. Never persisted.
#[derive(Debug, Clone)]
pub struct UserDescriptor {
    pub user_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl UserDescriptor {
    /// Synthetic descriptor for unauthenticated video sessions.
    pub fn anonymous(session_id: &str) -> Self {
        let prefix: String = session_id.chars().take(6).collect();
        Self {
            user_id: format!("anonymous_{session_id}"),
            display_name: Some(format!("Guest {prefix}")),
            email: None,
            avatar_url: None,
        }
    }
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<UserDescriptor, AuthError>;
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    name: Option<String>,
    email: Option<String>,
    avatar: Option<String>,
    #[allow(dead_code)]
    exp: usize,
}

/// Verifies the identity service's HS256 access tokens.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<UserDescriptor, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let claims = data.claims;
        Ok(UserDescriptor {
            user_id: claims.sub,
            display_name: claims.name,
            email: claims.email,
            avatar_url: claims.avatar,
        })
    }
}

/// Pull a bearer token out of an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ").or_else(|| header.strip_prefix("bearer "))?;
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
