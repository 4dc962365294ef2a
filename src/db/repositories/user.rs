//! User repository
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Whether any user already has this email or this username
    async fn exists_by_email_or_username(&self, email: &str, username: &str) -> Result<bool>;

    /// Count total users
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_USER: &str = r#"
    INSERT INTO users (email, username, password_hash, first_name, last_name, avatar, bio, role, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const SELECT_USER_BY_ID: &str = r#"
    SELECT id, email, username, password_hash, first_name, last_name, avatar, bio, role, created_at, updated_at
    FROM users
    WHERE id = ?
"#;

const SELECT_USER_BY_EMAIL: &str = r#"
    SELECT id, email, username, password_hash, first_name, last_name, avatar, bio, role, created_at, updated_at
    FROM users
    WHERE email = ?
"#;

const COUNT_BY_EMAIL_OR_USERNAME: &str =
    "SELECT COUNT(*) FROM users WHERE email = ? OR username = ?";

const COUNT_USERS: &str = "SELECT COUNT(*) FROM users";

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => insert_user_sqlite(self.pool.sqlite()?, user).await?,
            DatabaseDriver::Mysql => insert_user_mysql(self.pool.mysql()?, user).await?,
        };

        Ok(User { id, ..user.clone() })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_as::<_, UserRow>(SELECT_USER_BY_ID)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_as::<_, UserRow>(SELECT_USER_BY_ID)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to get user by ID")?;

        row.map(User::try_from).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_as::<_, UserRow>(SELECT_USER_BY_EMAIL)
                    .bind(email)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_as::<_, UserRow>(SELECT_USER_BY_EMAIL)
                    .bind(email)
                    .fetch_optional(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to get user by email")?;

        row.map(User::try_from).transpose()
    }

    async fn exists_by_email_or_username(&self, email: &str, username: &str) -> Result<bool> {
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_scalar::<_, i64>(COUNT_BY_EMAIL_OR_USERNAME)
                    .bind(email)
                    .bind(username)
                    .fetch_one(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_scalar::<_, i64>(COUNT_BY_EMAIL_OR_USERNAME)
                    .bind(email)
                    .bind(username)
                    .fetch_one(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to check for existing user")?;

        Ok(count > 0)
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_scalar::<_, i64>(COUNT_USERS)
                    .fetch_one(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_scalar::<_, i64>(COUNT_USERS)
                    .fetch_one(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to count users")
    }
}

// ============================================================================
// Driver-specific writes
// ============================================================================

async fn insert_user_sqlite(pool: &SqlitePool, user: &User) -> Result<i64> {
    let result = sqlx::query(INSERT_USER)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.avatar)
        .bind(&user.bio)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(pool)
        .await
        .context("Failed to create user")?;

    Ok(result.last_insert_rowid())
}

async fn insert_user_mysql(pool: &MySqlPool, user: &User) -> Result<i64> {
    let result = sqlx::query(INSERT_USER)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.avatar)
        .bind(&user.bio)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(pool)
        .await
        .context("Failed to create user")?;

    Ok(result.last_insert_id() as i64)
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    username: String,
    password_hash: String,
    first_name: Option<String>,
    last_name: Option<String>,
    avatar: Option<String>,
    bio: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        let role = UserRole::from_str(&row.role)
            .with_context(|| format!("Invalid role in database: {}", row.role))?;

        Ok(User {
            id: row.id,
            email: row.email,
            username: row.username,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            avatar: row.avatar,
            bio: row.bio,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Owner columns of a joined `users u` table.
///
/// Select them with [`AUTHOR_COLUMNS`]; every field is optional because the
/// join is a LEFT JOIN.
pub(crate) const AUTHOR_COLUMNS: &str = "u.email AS author_email, \
    u.username AS author_username, \
    u.password_hash AS author_password_hash, \
    u.first_name AS author_first_name, \
    u.last_name AS author_last_name, \
    u.avatar AS author_avatar, \
    u.bio AS author_bio, \
    u.role AS author_role, \
    u.created_at AS author_created_at, \
    u.updated_at AS author_updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct AuthorColumns {
    author_email: Option<String>,
    author_username: Option<String>,
    author_password_hash: Option<String>,
    author_first_name: Option<String>,
    author_last_name: Option<String>,
    author_avatar: Option<String>,
    author_bio: Option<String>,
    author_role: Option<String>,
    author_created_at: Option<DateTime<Utc>>,
    author_updated_at: Option<DateTime<Utc>>,
}

impl AuthorColumns {
    /// Rebuild the joined user, `None` when the join found no row
    pub(crate) fn into_user(self, id: i64) -> Result<Option<User>> {
        let (
            Some(email),
            Some(username),
            Some(password_hash),
            Some(role),
            Some(created_at),
            Some(updated_at),
        ) = (
            self.author_email,
            self.author_username,
            self.author_password_hash,
            self.author_role,
            self.author_created_at,
            self.author_updated_at,
        )
        else {
            return Ok(None);
        };

        User::try_from(UserRow {
            id,
            email,
            username,
            password_hash,
            first_name: self.author_first_name,
            last_name: self.author_last_name,
            avatar: self.author_avatar,
            bio: self.author_bio,
            role,
            created_at,
            updated_at,
        })
        .map(Some)
    }
}
