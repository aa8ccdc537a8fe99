//! User lookup endpoints.
//!
//! - GET `/users` - All users (admin)
//! - GET `/users/{username}` - One user (that user or an admin)

use axum::{
    Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};

use super::ApiState;
use super::error::{ApiError, ResultExt};
use crate::auth::{AuthPolicy, SessionTokens};
use crate::db::UserSummary;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{username}", get(get_user))
        .with_state(state)
}

async fn list_users(
    State(state): State<ApiState>,
    session: SessionTokens,
) -> Result<impl IntoResponse, ApiError> {
    let grant = session.authorize(&state.jwt, &AuthPolicy::Admin)?;

    let users = state.db.users().list().await.db_err("Failed to list users")?;

    Ok(grant.respond(users))
}

async fn get_user(
    State(state): State<ApiState>,
    Path(username): Path<String>,
    session: SessionTokens,
) -> Result<impl IntoResponse, ApiError> {
    let grant = session
        .authorize(&state.jwt, &AuthPolicy::User(username.clone()))
        .or_else(|_| session.authorize(&state.jwt, &AuthPolicy::Admin))?;

    let user = state
        .db
        .users()
        .get_by_username(&username)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(grant.respond(UserSummary::from(user)))
}
