//! Refresh token model

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};

/// Server-side record of an issued refresh token.
///
/// Rows exist so logout can delete them; expired rows are not swept.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub id: i64,
    /// The signed token string (unique)
    pub token: String,
    /// Owning user
    pub user_id: i64,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Record a token expiring `ttl_hours` from now
    pub fn new(token: String, user_id: i64, ttl_hours: i64) -> Result<Self> {
        let now = Utc::now();
        let expires_at = Duration::try_hours(ttl_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .with_context(|| format!("Refresh token lifetime out of range: {} hours", ttl_hours))?;

        Ok(Self {
            id: 0,
            token,
            user_id,
            expires_at,
            created_at: now,
        })
    }
}
