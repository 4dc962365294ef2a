//! Post repository
//!
//! Reads join `users` so every returned post carries its author, and always
//! skip soft-deleted rows.

use crate::config::DatabaseDriver;
use crate::db::repositories::user::{AuthorColumns, AUTHOR_COLUMNS};
use crate::db::DynDatabasePool;
use crate::models::{ListParams, PagedResult, Post, PostStatus, PostWithAuthor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post
    async fn create(&self, post: &Post) -> Result<Post>;

    /// Get a non-deleted post by ID, any status
    async fn get_by_id(&self, id: i64) -> Result<Option<PostWithAuthor>>;

    /// Persist the editable fields and `updated_at` of an existing post.
    ///
    /// Returns false when no live row matched.
    async fn update(&self, post: &Post) -> Result<bool>;

    /// Mark a post deleted. Returns false when no live row matched.
    async fn soft_delete(&self, id: i64) -> Result<bool>;

    /// Published posts, newest first, optionally restricted to one owner
    async fn list_published(
        &self,
        user_id: Option<i64>,
        params: &ListParams,
    ) -> Result<PagedResult<PostWithAuthor>>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_POST: &str = r#"
    INSERT INTO posts (title, content, excerpt, image_url, user_id, status, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_POST: &str = r#"
    UPDATE posts
    SET title = ?, content = ?, excerpt = ?, image_url = ?, status = ?, updated_at = ?
    WHERE id = ? AND deleted_at IS NULL
"#;

const SOFT_DELETE_POST: &str =
    "UPDATE posts SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL";

const POST_COLUMNS: &str = "p.id, p.title, p.content, p.excerpt, p.image_url, p.user_id, \
    p.status, p.created_at, p.updated_at, p.deleted_at";

fn select_posts(filter: &str, suffix: &str) -> String {
    format!(
        "SELECT {POST_COLUMNS}, {AUTHOR_COLUMNS} \
         FROM posts p LEFT JOIN users u ON u.id = p.user_id \
         WHERE p.deleted_at IS NULL{filter}{suffix}"
    )
}

fn published_filter(user_id: Option<i64>) -> &'static str {
    if user_id.is_some() {
        " AND p.status = 'published' AND p.user_id = ?"
    } else {
        " AND p.status = 'published'"
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => insert_post_sqlite(self.pool.sqlite()?, post).await?,
            DatabaseDriver::Mysql => insert_post_mysql(self.pool.mysql()?, post).await?,
        };

        Ok(Post { id, ..post.clone() })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<PostWithAuthor>> {
        let sql = select_posts(" AND p.id = ?", "");
        let row = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_as::<_, PostRow>(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_as::<_, PostRow>(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to get post by ID")?;

        row.map(PostWithAuthor::try_from).transpose()
    }

    async fn update(&self, post: &Post) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(UPDATE_POST)
                .bind(&post.title)
                .bind(&post.content)
                .bind(&post.excerpt)
                .bind(&post.image_url)
                .bind(post.status.as_str())
                .bind(post.updated_at)
                .bind(post.id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query(UPDATE_POST)
                .bind(&post.title)
                .bind(&post.content)
                .bind(&post.excerpt)
                .bind(&post.image_url)
                .bind(post.status.as_str())
                .bind(post.updated_at)
                .bind(post.id)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to update post")?;

        Ok(affected > 0)
    }

    async fn soft_delete(&self, id: i64) -> Result<bool> {
        let now = Utc::now();
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(SOFT_DELETE_POST)
                .bind(now)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query(SOFT_DELETE_POST)
                .bind(now)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete post")?;

        Ok(affected > 0)
    }

    async fn list_published(
        &self,
        user_id: Option<i64>,
        params: &ListParams,
    ) -> Result<PagedResult<PostWithAuthor>> {
        let filter = published_filter(user_id);
        let list_sql = select_posts(filter, " ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?");
        let count_sql = format!("SELECT COUNT(*) FROM posts p WHERE p.deleted_at IS NULL{filter}");

        let (rows, total) = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_published_sqlite(self.pool.sqlite()?, &list_sql, &count_sql, user_id, params)
                    .await?
            }
            DatabaseDriver::Mysql => {
                list_published_mysql(self.pool.mysql()?, &list_sql, &count_sql, user_id, params)
                    .await?
            }
        };

        let items = rows
            .into_iter()
            .map(PostWithAuthor::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(PagedResult::new(items, total, params))
    }
}

// ============================================================================
// Driver-specific queries
// ============================================================================

async fn insert_post_sqlite(pool: &SqlitePool, post: &Post) -> Result<i64> {
    let result = sqlx::query(INSERT_POST)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.excerpt)
        .bind(&post.image_url)
        .bind(post.user_id)
        .bind(post.status.as_str())
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(pool)
        .await
        .context("Failed to create post")?;

    Ok(result.last_insert_rowid())
}

async fn insert_post_mysql(pool: &MySqlPool, post: &Post) -> Result<i64> {
    let result = sqlx::query(INSERT_POST)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.excerpt)
        .bind(&post.image_url)
        .bind(post.user_id)
        .bind(post.status.as_str())
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(pool)
        .await
        .context("Failed to create post")?;

    Ok(result.last_insert_id() as i64)
}

async fn list_published_sqlite(
    pool: &SqlitePool,
    list_sql: &str,
    count_sql: &str,
    user_id: Option<i64>,
    params: &ListParams,
) -> Result<(Vec<PostRow>, i64)> {
    let mut list = sqlx::query_as::<_, PostRow>(list_sql);
    let mut count = sqlx::query_scalar::<_, i64>(count_sql);
    if let Some(user_id) = user_id {
        list = list.bind(user_id);
        count = count.bind(user_id);
    }

    let rows = list
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list published posts")?;
    let total = count
        .fetch_one(pool)
        .await
        .context("Failed to count published posts")?;

    Ok((rows, total))
}

async fn list_published_mysql(
    pool: &MySqlPool,
    list_sql: &str,
    count_sql: &str,
    user_id: Option<i64>,
    params: &ListParams,
) -> Result<(Vec<PostRow>, i64)> {
    let mut list = sqlx::query_as::<_, PostRow>(list_sql);
    let mut count = sqlx::query_scalar::<_, i64>(count_sql);
    if let Some(user_id) = user_id {
        list = list.bind(user_id);
        count = count.bind(user_id);
    }

    let rows = list
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list published posts")?;
    let total = count
        .fetch_one(pool)
        .await
        .context("Failed to count published posts")?;

    Ok((rows, total))
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    content: String,
    excerpt: Option<String>,
    image_url: Option<String>,
    user_id: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    #[sqlx(flatten)]
    author: AuthorColumns,
}

impl TryFrom<PostRow> for PostWithAuthor {
    type Error = anyhow::Error;

    fn try_from(row: PostRow) -> Result<Self> {
        let status = PostStatus::from_str(&row.status)
            .with_context(|| format!("Invalid post status in database: {}", row.status))?;
        let author = row.author.into_user(row.user_id)?;

        Ok(PostWithAuthor {
            post: Post {
                id: row.id,
                title: row.title,
                content: row.content,
                excerpt: row.excerpt,
                image_url: row.image_url,
                user_id: row.user_id,
                status,
                created_at: row.created_at,
                updated_at: row.updated_at,
                deleted_at: row.deleted_at,
            },
            author,
        })
    }
}
