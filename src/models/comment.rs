//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;

/// A comment on a post, optionally replying to another comment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub post_id: i64,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn new(post_id: i64, user_id: i64, content: String, parent_id: Option<i64>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            content,
            post_id,
            user_id,
            parent_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Comment with its author and, for top-level comments, the direct replies
#[derive(Debug, Clone)]
pub struct CommentWithMeta {
    pub comment: Comment,
    pub author: Option<User>,
    pub replies: Vec<CommentWithMeta>,
}

impl CommentWithMeta {
    pub fn new(comment: Comment, author: Option<User>) -> Self {
        Self {
            comment,
            author,
            replies: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_comment() {
        let top = Comment::new(1, 2, "Nice trip!".to_string(), None);
        let reply = Comment::new(1, 3, "Agreed".to_string(), Some(10));

        assert!(top.parent_id.is_none());
        assert_eq!(top.content, "Nice trip!");
        assert_eq!(reply.parent_id, Some(10));
    }

    #[test]
    fn test_serialization_omits_missing_parent() {
        let json = serde_json::to_value(Comment::new(1, 2, "hi".to_string(), None)).unwrap();

        assert_eq!(json["postId"], 1);
        assert_eq!(json["userId"], 2);
        assert!(json.get("parentId").is_none());
        assert!(json.get("deletedAt").is_none());
    }
}
