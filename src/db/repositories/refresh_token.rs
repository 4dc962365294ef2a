//! Refresh token repository
//!
//! Stored refresh tokens back logout. Expired rows are kept until deleted.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::RefreshToken;
use anyhow::{Context, Result};
use async_trait::async_trait;
#[cfg(test)]
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, SqlitePool};
use std::sync::Arc;

/// Refresh token repository trait
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Store an issued refresh token
    async fn create(&self, token: &RefreshToken) -> Result<RefreshToken>;

    /// Delete a stored token. Returns how many rows were removed (0 or 1).
    async fn delete_by_token(&self, token: &str) -> Result<u64>;

    /// Look up a stored token by its string
    #[cfg(test)]
    async fn get_by_token(&self, token: &str) -> Result<Option<RefreshToken>>;
}

/// SQLx-based refresh token repository implementation
pub struct SqlxRefreshTokenRepository {
    pool: DynDatabasePool,
}

impl SqlxRefreshTokenRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RefreshTokenRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_TOKEN: &str =
    "INSERT INTO refresh_tokens (token, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)";

#[cfg(test)]
const SELECT_BY_TOKEN: &str =
    "SELECT id, token, user_id, expires_at, created_at FROM refresh_tokens WHERE token = ?";

const DELETE_BY_TOKEN: &str = "DELETE FROM refresh_tokens WHERE token = ?";

#[async_trait]
impl RefreshTokenRepository for SqlxRefreshTokenRepository {
    async fn create(&self, token: &RefreshToken) -> Result<RefreshToken> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => insert_token_sqlite(self.pool.sqlite()?, token).await?,
            DatabaseDriver::Mysql => insert_token_mysql(self.pool.mysql()?, token).await?,
        };

        Ok(RefreshToken {
            id,
            ..token.clone()
        })
    }

    async fn delete_by_token(&self, token: &str) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(DELETE_BY_TOKEN)
                .bind(token)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query(DELETE_BY_TOKEN)
                .bind(token)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete refresh token")
    }

    #[cfg(test)]
    async fn get_by_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let row = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_as::<_, RefreshTokenRow>(SELECT_BY_TOKEN)
                    .bind(token)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_as::<_, RefreshTokenRow>(SELECT_BY_TOKEN)
                    .bind(token)
                    .fetch_optional(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to get refresh token")?;

        Ok(row.map(RefreshToken::from))
    }
}

async fn insert_token_sqlite(pool: &SqlitePool, token: &RefreshToken) -> Result<i64> {
    let result = sqlx::query(INSERT_TOKEN)
        .bind(&token.token)
        .bind(token.user_id)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(pool)
        .await
        .context("Failed to store refresh token")?;

    Ok(result.last_insert_rowid())
}

async fn insert_token_mysql(pool: &MySqlPool, token: &RefreshToken) -> Result<i64> {
    let result = sqlx::query(INSERT_TOKEN)
        .bind(&token.token)
        .bind(token.user_id)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(pool)
        .await
        .context("Failed to store refresh token")?;

    Ok(result.last_insert_id() as i64)
}

#[cfg(test)]
#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: i64,
    token: String,
    user_id: i64,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[cfg(test)]
impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshToken {
            id: row.id,
            token: row.token,
            user_id: row.user_id,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{User, UserRole};

    async fn setup_test_repo() -> (SqlxRefreshTokenRepository, i64) {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool, None)
            .await
            .expect("Failed to run migrations");
        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new(
                "alice@example.com".to_string(),
                "alice".to_string(),
                "hashed_password".to_string(),
                UserRole::User,
            ))
            .await
            .expect("Failed to create user");
        (SqlxRefreshTokenRepository::new(pool), user.id)
    }

    #[tokio::test]
    async fn test_create_and_get_token() {
        let (repo, user_id) = setup_test_repo().await;

        let stored = repo
            .create(&RefreshToken::new("token-a".to_string(), user_id, 168).unwrap())
            .await
            .expect("Failed to store token");
        assert!(stored.id > 0);

        let found = repo
            .get_by_token("token-a")
            .await
            .unwrap()
            .expect("Token not found");
        assert_eq!(found.user_id, user_id);
        assert!(found.expires_at > Utc::now());
        assert_eq!((found.expires_at - found.created_at).num_hours(), 168);
    }

    #[tokio::test]
    async fn test_duplicate_token_rejected() {
        let (repo, user_id) = setup_test_repo().await;
        repo.create(&RefreshToken::new("same".to_string(), user_id, 168).unwrap())
            .await
            .unwrap();

        let err = repo
            .create(&RefreshToken::new("same".to_string(), user_id, 168).unwrap())
            .await
            .unwrap_err();
        assert!(crate::db::is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_delete_by_token_is_idempotent() {
        let (repo, user_id) = setup_test_repo().await;
        repo.create(&RefreshToken::new("token-a".to_string(), user_id, 168).unwrap())
            .await
            .unwrap();

        assert_eq!(repo.delete_by_token("token-a").await.unwrap(), 1);
        assert_eq!(repo.delete_by_token("token-a").await.unwrap(), 0);
        assert_eq!(repo.delete_by_token("never-issued").await.unwrap(), 0);
        assert!(repo.get_by_token("token-a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_rows_are_kept() {
        let (repo, user_id) = setup_test_repo().await;
        repo.create(&RefreshToken::new("old".to_string(), user_id, -1).unwrap())
            .await
            .unwrap();

        let found = repo.get_by_token("old").await.unwrap().expect("expired rows persist");
        assert!(found.expires_at < Utc::now());
    }
}
