//! Services layer - Business logic
//!
//! Services validate input, apply the ownership policy and translate
//! repository outcomes into typed errors for the API layer.

pub mod comment;
pub mod password;
pub mod permission;
pub mod post;
pub mod token;
pub mod user;

pub use comment::{CommentService, CommentServiceError, CreateCommentInput, CreatedComment};
pub use password::{hash_password, verify_password};
pub use permission::can_modify;
pub use post::{CreatePostInput, PostService, PostServiceError};
pub use token::{Claims, Principal, TokenError, TokenPair, TokenService};
pub use user::{AuthSession, LoginInput, RegisterInput, UserService, UserServiceError};
