//! Data models
//!
//! Database entities (User, Post, Comment, RefreshToken) and the pagination
//! types shared by list operations.

mod comment;
mod pagination;
mod post;
mod refresh_token;
mod user;

pub use comment::{Comment, CommentWithMeta};
pub use pagination::{
    total_pages, ListParams, PagedResult, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use post::{Post, PostPatch, PostStatus, PostWithAuthor};
pub use refresh_token::RefreshToken;
pub use user::{User, UserRole};
