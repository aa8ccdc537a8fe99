//! Category endpoints.
//!
//! - POST `/` - Create a category (admin)
//! - GET `/` - List categories (any authenticated user)

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde_json::Value;

use super::ApiState;
use super::error::{ApiError, ResultExt, require_fields, str_field};
use crate::auth::{AuthPolicy, SessionTokens};
use crate::db::Category;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .with_state(state)
}

async fn create_category(
    State(state): State<ApiState>,
    session: SessionTokens,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let grant = session.authorize(&state.jwt, &AuthPolicy::Admin)?;

    require_fields(&body, &[("type", "string"), ("color", "string")])?;
    let category = Category {
        kind: str_field(&body, "type").to_string(),
        color: str_field(&body, "color").to_string(),
    };

    let created = state
        .db
        .categories()
        .create(&category.kind, &category.color)
        .await
        .db_err("Failed to create category")?;
    if !created {
        return Err(ApiError::bad_request("category type already exists"));
    }

    Ok(grant.respond(category))
}

async fn list_categories(
    State(state): State<ApiState>,
    session: SessionTokens,
) -> Result<impl IntoResponse, ApiError> {
    let grant = session.authorize(&state.jwt, &AuthPolicy::Simple)?;

    let categories = state
        .db
        .categories()
        .list()
        .await
        .db_err("Failed to list categories")?;

    Ok(grant.respond(categories))
}
