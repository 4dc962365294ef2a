//! Post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::User;

/// A blog post owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Owning user
    pub user_id: i64,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker; set rows are invisible to normal reads
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn new(user_id: i64, title: String, content: String, status: PostStatus) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title,
            content,
            excerpt: None,
            image_url: None,
            user_id,
            status,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Post publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    #[default]
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }

    /// Map a client-supplied status: exactly `"draft"` is a draft, anything
    /// else (including no value) publishes.
    pub fn from_request(raw: Option<&str>) -> Self {
        match raw {
            Some("draft") => PostStatus::Draft,
            _ => PostStatus::Published,
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            _ => Err(anyhow::anyhow!("Invalid post status: {}", s)),
        }
    }
}

/// Partial update of a post. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub status: Option<PostStatus>,
}

impl PostPatch {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.content.is_some()
            || self.excerpt.is_some()
            || self.image_url.is_some()
            || self.status.is_some()
    }

    /// Merge the present fields into `post`, bumping `updated_at` when anything changed
    pub fn apply(self, post: &mut Post) {
        if !self.has_changes() {
            return;
        }
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(content) = self.content {
            post.content = content;
        }
        if let Some(excerpt) = self.excerpt {
            post.excerpt = Some(excerpt);
        }
        if let Some(image_url) = self.image_url {
            post.image_url = Some(image_url);
        }
        if let Some(status) = self.status {
            post.status = status;
        }
        post.updated_at = Utc::now();
    }
}

/// A post together with its owner, as returned by reads
#[derive(Debug, Clone)]
pub struct PostWithAuthor {
    pub post: Post,
    pub author: Option<User>,
}
