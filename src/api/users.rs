//! User API endpoints
//!
//! - GET /api/users/count - Number of registered users

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{ApiResponse, TotalResponse};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/users/count", get(count_users))
}

/// GET /api/users/count
async fn count_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let total = state.user_service.count().await?;
    Ok(Json(ApiResponse::ok(TotalResponse { total })))
}
