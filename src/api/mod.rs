mod categories;
mod error;
mod groups;
mod sessions;
mod transactions;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtConfig;

pub use error::{ApiError, ResultExt};

/// State shared by every API handler.
#[derive(Clone)]
pub struct ApiState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

/// Create the API router.
pub fn create_api_router(db: Database, jwt: Arc<JwtConfig>) -> Router {
    let state = ApiState { db, jwt };

    Router::new()
        .merge(sessions::router(state.clone()))
        .merge(users::router(state.clone()))
        .merge(transactions::router(state.clone()))
        .nest("/categories", categories::router(state.clone()))
        .nest("/groups", groups::router(state))
}
