//! API layer - HTTP handlers and routing
//!
//! Every endpoint lives under `/api`:
//! - Auth endpoints (register, login, logout, me)
//! - Post endpoints
//! - Comment endpoints
//! - User count endpoint

pub mod auth;
pub mod comments;
pub mod common;
pub mod middleware;
pub mod posts;
pub mod responses;
pub mod users;

use axum::{
    http::{header, HeaderName, Method},
    middleware as axum_middleware,
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, ApiErrorKind, AppState};

/// Build the API router (mounted under `/api` by [`build_router`])
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Protected routes (need a valid access token)
    let protected_routes = Router::new()
        .merge(auth::protected_router())
        .merge(posts::protected_router())
        .merge(comments::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .merge(auth::public_router())
        .merge(posts::public_router())
        .merge(comments::public_router())
        .merge(users::public_router())
        .merge(protected_routes)
}

/// Any origin is mirrored back so credentials can be allowed
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::CONTENT_LENGTH,
            header::ACCEPT_ENCODING,
            HeaderName::from_static("x-csrf-token"),
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            header::CACHE_CONTROL,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .fallback(route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer()),
        )
        .with_state(state)
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("route not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::db::{create_test_pool, migrations::run_migrations};
    use axum::http::{HeaderValue, StatusCode};
    use axum_test::TestServer;
    use serde_json::{json, Value};

    async fn server() -> TestServer {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool, None).await.unwrap();

        let auth = AuthConfig {
            jwt_secret: "integration-test-secret".to_string(),
            access_token_ttl_hours: 1,
            refresh_token_ttl_hours: 24,
        };
        let state = AppState::new(pool, &auth).unwrap();
        TestServer::new(build_router(state)).unwrap()
    }

    /// Register a user and return (access token, refresh token, user id)
    async fn register(server: &TestServer, username: &str) -> (String, String, i64) {
        let response = server
            .post("/api/auth/register")
            .json(&json!({
                "email": format!("{}@example.com", username),
                "username": username,
                "password": "secret123",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body: Value = response.json();
        (
            body["data"]["accessToken"].as_str().unwrap().to_string(),
            body["data"]["refreshToken"].as_str().unwrap().to_string(),
            body["data"]["user"]["id"].as_i64().unwrap(),
        )
    }

    async fn create_post(server: &TestServer, token: &str, body: Value) -> Value {
        let response = server
            .post("/api/posts")
            .authorization_bearer(token)
            .json(&body)
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["data"].clone()
    }

    #[tokio::test]
    async fn test_register_login_and_me() {
        let server = server().await;

        let response = server
            .post("/api/auth/register")
            .json(&json!({
                "email": "alice@example.com",
                "username": "alice",
                "password": "secret123",
                "firstName": "Alice",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["user"]["username"], "alice");
        assert_eq!(body["data"]["user"]["firstName"], "Alice");
        assert_eq!(body["data"]["user"]["role"], "user");
        assert!(body["data"]["user"].get("passwordHash").is_none());
        assert!(body["data"]["user"].get("lastName").is_none());

        let response = server
            .post("/api/auth/login")
            .json(&json!({"email": "alice@example.com", "password": "secret123"}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        let token = body["data"]["accessToken"].as_str().unwrap().to_string();
        assert!(body["data"]["refreshToken"].is_string());

        let response = server.get("/api/auth/me").authorization_bearer(&token).await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["data"]["email"], "alice@example.com");
    }

    #[tokio::test]
    async fn test_register_duplicate_and_invalid() {
        let server = server().await;
        register(&server, "alice").await;

        let response = server
            .post("/api/auth/register")
            .json(&json!({
                "email": "alice@example.com",
                "username": "other",
                "password": "secret123",
            }))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        response.assert_json(&json!({
            "success": false,
            "error": "user with this email or username already exists"
        }));

        let response = server
            .post("/api/auth/register")
            .json(&json!({"email": "bob@example.com", "username": "bob", "password": "123"}))
            .await;
        response.assert_status_bad_request();
        let error = response.json::<Value>()["error"].as_str().unwrap().to_string();
        assert!(error.starts_with("Invalid request data"), "{}", error);
    }

    #[tokio::test]
    async fn test_login_failures_share_message() {
        let server = server().await;
        register(&server, "alice").await;

        for body in [
            json!({"email": "alice@example.com", "password": "wrong-password"}),
            json!({"email": "nobody@example.com", "password": "secret123"}),
        ] {
            let response = server.post("/api/auth/login").json(&body).await;
            response.assert_status_unauthorized();
            response.assert_json(&json!({"success": false, "error": "invalid email or password"}));
        }
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let server = server().await;

        let response = server
            .post("/api/auth/login")
            .bytes("{not json".into())
            .content_type("application/json")
            .await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request data: "));
    }

    #[tokio::test]
    async fn test_logout() {
        let server = server().await;
        let (access, refresh, _) = register(&server, "alice").await;

        let response = server
            .post("/api/auth/logout")
            .authorization_bearer(&access)
            .json(&json!({"refreshToken": refresh}))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({"success": true, "message": "Logged out successfully"}));

        let response = server
            .post("/api/auth/logout")
            .authorization_bearer(&access)
            .json(&json!({}))
            .await;
        response.assert_status_bad_request();
        response.assert_json(&json!({"success": false, "error": "Invalid request data"}));

        for (body, content_type) in [
            ("{not json", "application/json"),
            (r#"{"refreshToken": 42}"#, "application/json"),
            (r#"{"refreshToken": "x"}"#, "text/plain"),
        ] {
            let response = server
                .post("/api/auth/logout")
                .authorization_bearer(&access)
                .bytes(body.into())
                .content_type(content_type)
                .await;
            response.assert_status_bad_request();
            response.assert_json(&json!({"success": false, "error": "Invalid request data"}));
        }
    }

    #[tokio::test]
    async fn test_auth_gate_messages() {
        let server = server().await;

        let response = server.get("/api/auth/me").await;
        response.assert_status_unauthorized();
        response.assert_json(&json!({"success": false, "error": "Authorization header required"}));

        let response = server
            .get("/api/auth/me")
            .add_header(header::AUTHORIZATION, HeaderValue::from_static("Token abc"))
            .await;
        response.assert_status_unauthorized();
        response.assert_json(&json!({
            "success": false,
            "error": "Invalid authorization header format"
        }));

        let response = server
            .post("/api/posts")
            .authorization_bearer("not-a-jwt")
            .json(&json!({"title": "t", "content": "c"}))
            .await;
        response.assert_status_unauthorized();
        response.assert_json(&json!({"success": false, "error": "Invalid or expired token"}));
    }

    #[tokio::test]
    async fn test_create_and_read_post() {
        let server = server().await;
        let (token, _, user_id) = register(&server, "alice").await;

        let post = create_post(
            &server,
            &token,
            json!({"title": "Kyoto", "content": "Temples", "imageUrl": "http://img/1.jpg"}),
        )
        .await;
        assert_eq!(post["status"], "published");
        assert_eq!(post["userId"], user_id);
        assert_eq!(post["imageUrl"], "http://img/1.jpg");
        assert_eq!(post["user"]["username"], "alice");
        assert!(post["user"].get("passwordHash").is_none());
        assert!(post.get("excerpt").is_none());

        let id = post["id"].as_i64().unwrap();
        let response = server.get(&format!("/api/posts/{}", id)).await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["data"]["title"], "Kyoto");

        let response = server.get("/api/posts/abc").await;
        response.assert_status_bad_request();
        response.assert_json(&json!({"success": false, "error": "Invalid post ID"}));

        let response = server.get("/api/posts/9999").await;
        response.assert_status_not_found();
        response.assert_json(&json!({"success": false, "error": "post not found"}));
    }

    #[tokio::test]
    async fn test_post_validation() {
        let server = server().await;
        let (token, _, _) = register(&server, "alice").await;

        let response = server
            .post("/api/posts")
            .authorization_bearer(&token)
            .json(&json!({"content": "no title"}))
            .await;
        response.assert_status_bad_request();
        let error = response.json::<Value>()["error"].as_str().unwrap().to_string();
        assert!(error.starts_with("Invalid request data"), "{}", error);
    }

    #[tokio::test]
    async fn test_drafts_hidden_from_listing() {
        let server = server().await;
        let (token, _, user_id) = register(&server, "alice").await;

        create_post(&server, &token, json!({"title": "Public", "content": "c"})).await;
        let draft = create_post(
            &server,
            &token,
            json!({"title": "Secret", "content": "c", "status": "draft"}),
        )
        .await;
        assert_eq!(draft["status"], "draft");

        let body: Value = server.get("/api/posts").await.json();
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["posts"][0]["title"], "Public");

        let body: Value = server
            .get(&format!("/api/posts/user/{}", user_id))
            .await
            .json();
        assert_eq!(body["data"]["total"], 1);

        let response = server.get("/api/posts/user/nope").await;
        response.assert_status_bad_request();
        response.assert_json(&json!({"success": false, "error": "Invalid user ID"}));
    }

    #[tokio::test]
    async fn test_pagination() {
        let server = server().await;
        let (token, _, _) = register(&server, "alice").await;

        for i in 0..3 {
            create_post(
                &server,
                &token,
                json!({"title": format!("Post {}", i), "content": "c"}),
            )
            .await;
        }

        let body: Value = server
            .get("/api/posts")
            .add_query_param("page", 2)
            .add_query_param("pageSize", 2)
            .await
            .json();
        assert_eq!(body["data"]["total"], 3);
        assert_eq!(body["data"]["page"], 2);
        assert_eq!(body["data"]["pageSize"], 2);
        assert_eq!(body["data"]["totalPages"], 2);
        assert_eq!(body["data"]["posts"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["posts"][0]["title"], "Post 0");

        let body: Value = server
            .get("/api/posts")
            .add_query_param("page", "x")
            .add_query_param("pageSize", 1000)
            .await
            .json();
        assert_eq!(body["data"]["page"], 1);
        assert_eq!(body["data"]["pageSize"], 10);

        let body: Value = server
            .get("/api/posts")
            .add_query_param("page", 5_000_000_000i64)
            .await
            .json();
        assert_eq!(body["data"]["page"], u32::MAX);
        assert_eq!(body["data"]["total"], 3);
        assert!(body["data"]["posts"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_permissions() {
        let server = server().await;
        let (owner, _, _) = register(&server, "alice").await;
        let (stranger, _, _) = register(&server, "mallory").await;

        let post = create_post(
            &server,
            &owner,
            json!({"title": "Lisbon", "content": "Trams", "excerpt": "Hills"}),
        )
        .await;
        let path = format!("/api/posts/{}", post["id"]);

        let response = server
            .put(&path)
            .authorization_bearer(&stranger)
            .json(&json!({"title": "Hijacked"}))
            .await;
        response.assert_status_forbidden();
        response.assert_json(&json!({"success": false, "error": "permission denied"}));

        let response = server
            .put(&path)
            .authorization_bearer(&owner)
            .json(&json!({"title": "Porto", "status": "draft"}))
            .await;
        response.assert_status_ok();
        let updated: Value = response.json();
        assert_eq!(updated["data"]["title"], "Porto");
        assert_eq!(updated["data"]["content"], "Trams");
        assert_eq!(updated["data"]["excerpt"], "Hills");
        assert_eq!(updated["data"]["status"], "draft");

        let response = server.delete(&path).authorization_bearer(&stranger).await;
        response.assert_status_forbidden();

        let response = server.delete(&path).authorization_bearer(&owner).await;
        response.assert_status_ok();
        response.assert_json(&json!({"success": true, "message": "Post deleted successfully"}));

        server.get(&path).await.assert_status_not_found();
        server
            .delete(&path)
            .authorization_bearer(&owner)
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn test_comment_threading() {
        let server = server().await;
        let (token, _, _) = register(&server, "alice").await;

        let post = create_post(&server, &token, json!({"title": "Oslo", "content": "Fjords"})).await;
        let path = format!("/api/comments/post/{}", post["id"]);

        let response = server
            .post(&path)
            .authorization_bearer(&token)
            .json(&json!({"content": "First!"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let top: Value = response.json();
        assert_eq!(top["data"]["user"]["username"], "alice");
        assert_eq!(top["data"]["post"]["title"], "Oslo");
        let top_id = top["data"]["id"].as_i64().unwrap();

        let response = server
            .post(&path)
            .authorization_bearer(&token)
            .json(&json!({"content": "Reply", "parentId": top_id}))
            .await;
        response.assert_status(StatusCode::CREATED);
        assert_eq!(response.json::<Value>()["data"]["parentId"], top_id);

        let response = server
            .post(&path)
            .authorization_bearer(&token)
            .json(&json!({"content": "Orphan", "parentId": 9999}))
            .await;
        response.assert_status_not_found();
        response.assert_json(&json!({"success": false, "error": "parent comment not found"}));

        let body: Value = server.get(&path).await.json();
        assert_eq!(body["data"]["total"], 1);
        let comments = body["data"]["comments"].as_array().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0]["content"], "First!");
        assert_eq!(comments[0]["replies"][0]["content"], "Reply");

        let body: Value = server.get("/api/comments/count").await.json();
        assert_eq!(body, json!({"success": true, "data": {"total": 2}}));
    }

    #[tokio::test]
    async fn test_comment_on_missing_post() {
        let server = server().await;
        let (token, _, _) = register(&server, "alice").await;

        let response = server
            .post("/api/comments/post/9999")
            .authorization_bearer(&token)
            .json(&json!({"content": "Hello"}))
            .await;
        response.assert_status_not_found();
        response.assert_json(&json!({"success": false, "error": "post not found"}));

        let response = server
            .post("/api/comments/post/1")
            .json(&json!({"content": "Hello"}))
            .await;
        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn test_user_count() {
        let server = server().await;
        register(&server, "alice").await;
        register(&server, "bob").await;

        let response = server.get("/api/users/count").await;
        response.assert_status_ok();
        response.assert_json(&json!({"success": true, "data": {"total": 2}}));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let server = server().await;

        let response = server.get("/api/nowhere").await;
        response.assert_status_not_found();
        response.assert_json(&json!({"success": false, "error": "route not found"}));
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let server = server().await;

        let response = server
            .method(Method::OPTIONS, "/api/posts")
            .add_header(header::ORIGIN, HeaderValue::from_static("http://travel.example"))
            .add_header(
                header::ACCESS_CONTROL_REQUEST_METHOD,
                HeaderValue::from_static("POST"),
            )
            .await;
        response.assert_status_ok();
        assert_eq!(
            response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            "http://travel.example"
        );
        assert_eq!(
            response.header(header::ACCESS_CONTROL_ALLOW_CREDENTIALS),
            "true"
        );
    }
}
