//! User service
//!
//! Registration, login, logout and profile lookup. Every successful register
//! or login issues a token pair and stores the refresh token.

use crate::db::is_unique_violation;
use crate::db::repositories::{RefreshTokenRepository, UserRepository};
use crate::models::{RefreshToken, User, UserRole};
use crate::services::password::{hash_password, verify_password};
use crate::services::token::{Principal, TokenPair, TokenService};
use anyhow::Context;
use std::sync::Arc;

const USERNAME_MIN_LEN: usize = 3;
const USERNAME_MAX_LEN: usize = 50;
const PASSWORD_MIN_LEN: usize = 6;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Validation error (invalid input)
    #[error("{0}")]
    ValidationError(String),

    /// Email or username is already taken
    #[error("user with this email or username already exists")]
    UserExists,

    /// Unknown email or wrong password
    #[error("invalid email or password")]
    InvalidCredentials,

    /// User not found
    #[error("user not found")]
    UserNotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for user registration
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl RegisterInput {
    /// Create a new registration input without profile names
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            password: password.into(),
            first_name: None,
            last_name: None,
        }
    }
}

/// Input for user login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// A user together with freshly issued tokens
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub tokens: TokenPair,
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    refresh_token_repo: Arc<dyn RefreshTokenRepository>,
    tokens: Arc<TokenService>,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        refresh_token_repo: Arc<dyn RefreshTokenRepository>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            user_repo,
            refresh_token_repo,
            tokens,
        }
    }

    /// Register a new user with the `user` role.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if the email, username or password is malformed
    /// - `UserExists` if the email or username is already taken
    /// - `InternalError` for hashing, signing or database errors
    pub async fn register(&self, input: RegisterInput) -> Result<AuthSession, UserServiceError> {
        validate_register_input(&input)?;

        if self
            .user_repo
            .exists_by_email_or_username(&input.email, &input.username)
            .await
            .context("Failed to check for existing user")?
        {
            return Err(UserServiceError::UserExists);
        }

        let password_hash = hash_password(&input.password)?;

        let mut user = User::new(input.email, input.username, password_hash, UserRole::User);
        user.first_name = non_empty(input.first_name);
        user.last_name = non_empty(input.last_name);

        // Another request may have taken the email or username since the check
        let user = self.user_repo.create(&user).await.map_err(|e| {
            if is_unique_violation(&e) {
                UserServiceError::UserExists
            } else {
                UserServiceError::InternalError(e)
            }
        })?;

        tracing::info!("Registered user {} ({})", user.id, user.username);
        self.start_session(user).await
    }

    /// Authenticate by email and password.
    ///
    /// Unknown emails and wrong passwords fail the same way.
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, UserServiceError> {
        validate_login_input(&input)?;

        let user = self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to get user by email")?
            .ok_or(UserServiceError::InvalidCredentials)?;

        if !verify_password(&input.password, &user.password_hash) {
            return Err(UserServiceError::InvalidCredentials);
        }

        self.start_session(user).await
    }

    /// Forget a stored refresh token.
    ///
    /// Succeeds whether or not the token was stored. Access tokens already
    /// issued stay valid until they expire.
    pub async fn logout(
        &self,
        principal: &Principal,
        refresh_token: &str,
    ) -> Result<(), UserServiceError> {
        if refresh_token.trim().is_empty() {
            return Err(UserServiceError::ValidationError(
                "refreshToken is required".to_string(),
            ));
        }

        let removed = self
            .refresh_token_repo
            .delete_by_token(refresh_token)
            .await
            .context("Failed to delete refresh token")?;

        tracing::debug!(
            "User {} logged out, {} refresh token(s) removed",
            principal.user_id,
            removed
        );
        Ok(())
    }

    /// Current user of a request
    pub async fn me(&self, principal: &Principal) -> Result<User, UserServiceError> {
        self.get_by_id(principal.user_id)
            .await?
            .ok_or(UserServiceError::UserNotFound)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;

        Ok(user)
    }

    /// Total number of registered users
    pub async fn count(&self) -> Result<i64, UserServiceError> {
        Ok(self.user_repo.count().await.context("Failed to count users")?)
    }

    async fn start_session(&self, user: User) -> Result<AuthSession, UserServiceError> {
        let tokens = self
            .tokens
            .issue_pair(&user)
            .context("Failed to issue tokens")?;

        self.refresh_token_repo
            .create(&RefreshToken::new(
                tokens.refresh_token.clone(),
                user.id,
                self.tokens.refresh_ttl_hours(),
            )?)
            .await
            .context("Failed to store refresh token")?;

        Ok(AuthSession { user, tokens })
    }
}

fn validate_register_input(input: &RegisterInput) -> Result<(), UserServiceError> {
    validate_email(&input.email)?;

    let username_len = input.username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&username_len) {
        return Err(UserServiceError::ValidationError(format!(
            "username must be between {} and {} characters",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        )));
    }

    if input.password.chars().count() < PASSWORD_MIN_LEN {
        return Err(UserServiceError::ValidationError(format!(
            "password must be at least {} characters",
            PASSWORD_MIN_LEN
        )));
    }

    Ok(())
}

fn validate_login_input(input: &LoginInput) -> Result<(), UserServiceError> {
    validate_email(&input.email)?;

    if input.password.is_empty() {
        return Err(UserServiceError::ValidationError(
            "password is required".to_string(),
        ));
    }

    Ok(())
}

fn validate_email(email: &str) -> Result<(), UserServiceError> {
    if email.trim().is_empty() {
        return Err(UserServiceError::ValidationError(
            "email is required".to_string(),
        ));
    }

    if !is_valid_email(email) {
        return Err(UserServiceError::ValidationError(
            "email must be a valid email address".to_string(),
        ));
    }

    Ok(())
}

/// `local@domain.tld` with no whitespace and a dotted domain
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
