//! Account and session endpoints.
//!
//! - POST `/register` - Create a regular user
//! - POST `/admin` - Create an admin user
//! - POST `/login` - Check credentials and issue both session cookies
//! - GET `/logout` - Forget the refresh token and clear both cookies

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use super::ApiState;
use super::error::{ApiError, ResultExt, require_fields, str_field};
use crate::auth::{
    ACCESS_COOKIE_NAME, DataResponse, REFRESH_COOKIE_NAME, cleared_cookie, get_cookie,
    session_cookie,
};
use crate::db::{NewUser, Role};
use crate::jwt::Identity;
use crate::password::{hash_password, verify_password};

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/admin", post(register_admin))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .with_state(state)
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

fn data<T: Serialize>(data: T) -> Json<DataResponse<T>> {
    Json(DataResponse {
        data,
        refreshed_token_message: None,
    })
}

async fn register(
    State(state): State<ApiState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    create_account(&state, &body, Role::Regular).await
}

async fn register_admin(
    State(state): State<ApiState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    create_account(&state, &body, Role::Admin).await
}

async fn create_account(
    state: &ApiState,
    body: &Value,
    role: Role,
) -> Result<Json<DataResponse<MessageResponse>>, ApiError> {
    require_fields(
        body,
        &[
            ("username", "string"),
            ("email", "email"),
            ("password", "string"),
        ],
    )?;
    let username = str_field(body, "username");
    let email = str_field(body, "email");
    let password = str_field(body, "password");

    if state
        .db
        .users()
        .is_taken(username, email)
        .await
        .db_err("Failed to check existing users")?
    {
        return Err(ApiError::bad_request("username or email already in use"));
    }

    let password_hash = hash_password(password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ApiError::internal("Failed to create user")
    })?;

    state
        .db
        .users()
        .create(&NewUser {
            username,
            email,
            password_hash: &password_hash,
            role,
        })
        .await
        .db_err("Failed to create user")?;

    info!(username = %username, role = role.as_str(), "User registered");
    Ok(data(MessageResponse {
        message: "User added successfully",
    }))
}

async fn login(
    State(state): State<ApiState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    require_fields(&body, &[("email", "email"), ("password", "string")])?;
    let email = str_field(&body, "email");
    let password = str_field(&body, "password");

    let user = state
        .db
        .users()
        .get_by_email(email)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::bad_request("wrong credentials"))?;

    if !verify_password(&user.password_hash, password) {
        return Err(ApiError::bad_request("wrong credentials"));
    }

    let identity = Identity {
        email: user.email.clone(),
        username: user.username.clone(),
        role: user.role.as_str().to_string(),
    };
    let sign_err = |e: crate::jwt::JwtError| {
        error!(error = %e, "Failed to sign session token");
        ApiError::internal("Failed to generate token")
    };
    let access = state.jwt.sign_access(&identity).map_err(sign_err)?;
    let refresh = state.jwt.sign_refresh(&identity).map_err(sign_err)?;

    state
        .db
        .users()
        .set_refresh_token(user.id, Some(&refresh.token))
        .await
        .db_err("Failed to store refresh token")?;

    info!(username = %user.username, "User logged in");
    Ok((
        StatusCode::OK,
        AppendHeaders([
            (
                SET_COOKIE,
                session_cookie(ACCESS_COOKIE_NAME, &access.token, access.duration),
            ),
            (
                SET_COOKIE,
                session_cookie(REFRESH_COOKIE_NAME, &refresh.token, refresh.duration),
            ),
        ]),
        data(LoginResponse {
            access_token: access.token,
            refresh_token: refresh.token,
        }),
    ))
}

async fn logout(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let refresh_token = get_cookie(&headers, REFRESH_COOKIE_NAME)
        .ok_or_else(|| ApiError::bad_request("no refresh token"))?;

    let user = state
        .db
        .users()
        .get_by_refresh_token(refresh_token)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::bad_request("user not found"))?;

    state
        .db
        .users()
        .set_refresh_token(user.id, None)
        .await
        .db_err("Failed to clear refresh token")?;

    info!(username = %user.username, "User logged out");
    Ok((
        StatusCode::OK,
        AppendHeaders([
            (SET_COOKIE, cleared_cookie(ACCESS_COOKIE_NAME)),
            (SET_COOKIE, cleared_cookie(REFRESH_COOKIE_NAME)),
        ]),
        data(MessageResponse {
            message: "User logged out",
        }),
    ))
}
