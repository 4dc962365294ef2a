//! Token service
//!
//! Issues and validates HS256-signed JWTs. Access and refresh tokens share
//! one claim set and differ only in lifetime. Validation accepts HS256 only.

use crate::config::AuthConfig;
use crate::models::{User, UserRole};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error types for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Bad signature, wrong algorithm or malformed token
    #[error("invalid token")]
    InvalidToken,

    /// Signature is valid but `exp` has passed
    #[error("token has expired")]
    ExpiredToken,

    /// Signing failed or the service is misconfigured
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Claims carried by every issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub role: UserRole,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expires at, seconds since the epoch
    pub exp: i64,
    /// Random token id
    pub jti: String,
}

/// The caller identity established from a valid access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
    pub role: UserRole,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// An access token and a refresh token issued together
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl_hours: i64,
    refresh_ttl_hours: i64,
}

impl TokenService {
    /// Build the service from the auth configuration.
    ///
    /// An empty secret is rejected.
    pub fn new(config: &AuthConfig) -> Result<Self, TokenError> {
        if config.jwt_secret.is_empty() {
            return Err(TokenError::InternalError(anyhow::anyhow!(
                "JWT secret must not be empty"
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            access_ttl_hours: config.access_token_ttl_hours,
            refresh_ttl_hours: config.refresh_token_ttl_hours,
        })
    }

    /// Lifetime of refresh tokens, used when persisting them
    pub fn refresh_ttl_hours(&self) -> i64 {
        self.refresh_ttl_hours
    }

    /// Sign a token for a user valid for `ttl_hours` from now
    pub fn issue(
        &self,
        user_id: i64,
        email: &str,
        role: UserRole,
        ttl_hours: i64,
    ) -> Result<String, TokenError> {
        self.issue_at(Utc::now(), user_id, email, role, ttl_hours)
    }

    fn issue_at(
        &self,
        issued_at: DateTime<Utc>,
        user_id: i64,
        email: &str,
        role: UserRole,
        ttl_hours: i64,
    ) -> Result<String, TokenError> {
        let expires_at = Duration::try_hours(ttl_hours)
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .ok_or_else(|| {
                TokenError::InternalError(anyhow::anyhow!(
                    "Token lifetime out of range: {} hours",
                    ttl_hours
                ))
            })?;

        let claims = Claims {
            user_id,
            email: email.to_string(),
            role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::InternalError(anyhow::anyhow!("Failed to sign token: {}", e)))
    }

    /// Issue the access and refresh tokens for a user
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue(user.id, &user.email, user.role, self.access_ttl_hours)?,
            refresh_token: self.issue(user.id, &user.email, user.role, self.refresh_ttl_hours)?,
        })
    }

    /// Verify signature, algorithm and expiry and return the claims
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::ExpiredToken,
                _ => TokenError::InvalidToken,
            })
    }
}
