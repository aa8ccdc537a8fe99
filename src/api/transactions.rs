//! Transaction endpoints.
//!
//! - POST `/users/{username}/transactions` - Record a transaction
//! - GET `/users/{username}/transactions` - Own transactions, filtered
//! - GET `/users/{username}/transactions/category/{category}` - Own transactions of one category
//! - DELETE `/users/{username}/transactions/{id}` - Delete one of the caller's transactions
//! - GET `/transactions` - Everyone's transactions, filtered (admin)

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get},
};
use chrono::Utc;
use serde_json::Value;
use tracing::info;

use super::ApiState;
use super::error::{ApiError, ResultExt, require_fields, str_field};
use crate::auth::{AuthPolicy, SessionTokens};
use crate::db::{NewTransaction, TransactionQuery};
use crate::filters::{FilterParams, handle_amount_filter_params, handle_date_filter_params};
use crate::validate::parse_number;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/users/{username}/transactions",
            get(list_own_transactions).post(create_transaction),
        )
        .route(
            "/users/{username}/transactions/category/{category}",
            get(list_own_transactions_by_category),
        )
        .route(
            "/users/{username}/transactions/{id}",
            delete(delete_transaction),
        )
        .route("/transactions", get(list_all_transactions))
        .with_state(state)
}

/// Build a listing query from the date and amount query parameters.
pub(super) fn filtered_query(
    usernames: Option<Vec<String>>,
    params: &FilterParams,
) -> Result<TransactionQuery, ApiError> {
    Ok(TransactionQuery {
        usernames,
        kind: None,
        date: handle_date_filter_params(params)?,
        amount: handle_amount_filter_params(params)?,
    })
}

/// Numeric body field, accepting both JSON numbers and numeric strings.
fn amount_field(body: &Value) -> Result<f64, ApiError> {
    match body.get("amount") {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ApiError::bad_request("not a number")),
        Some(Value::String(raw)) => parse_number(raw).map_err(ApiError::bad_request),
        _ => Err(ApiError::bad_request("not a number")),
    }
}

async fn create_transaction(
    State(state): State<ApiState>,
    Path(username): Path<String>,
    session: SessionTokens,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let grant = session.authorize(&state.jwt, &AuthPolicy::User(username.clone()))?;

    require_fields(&body, &[("amount", "amount"), ("type", "string")])?;
    let amount = amount_field(&body)?;
    let kind = str_field(&body, "type");

    if state
        .db
        .categories()
        .get(kind)
        .await
        .db_err("Failed to get category")?
        .is_none()
    {
        return Err(ApiError::bad_request("category type does not exist"));
    }

    let transaction = state
        .db
        .transactions()
        .create(&NewTransaction {
            username: &username,
            amount,
            kind,
            date: Utc::now(),
        })
        .await
        .db_err("Failed to create transaction")?;

    info!(username = %username, id = %transaction.id, "Transaction recorded");
    Ok(grant.respond(transaction))
}

async fn list_own_transactions(
    State(state): State<ApiState>,
    Path(username): Path<String>,
    Query(params): Query<FilterParams>,
    session: SessionTokens,
) -> Result<impl IntoResponse, ApiError> {
    let grant = session.authorize(&state.jwt, &AuthPolicy::User(username.clone()))?;

    let query = filtered_query(Some(vec![username]), &params)?;
    let transactions = state
        .db
        .transactions()
        .list(&query)
        .await
        .db_err("Failed to list transactions")?;

    Ok(grant.respond(transactions))
}

async fn list_own_transactions_by_category(
    State(state): State<ApiState>,
    Path((username, category)): Path<(String, String)>,
    session: SessionTokens,
) -> Result<impl IntoResponse, ApiError> {
    let grant = session.authorize(&state.jwt, &AuthPolicy::User(username.clone()))?;

    let query = TransactionQuery {
        kind: Some(category),
        ..TransactionQuery::for_user(&username)
    };
    let transactions = state
        .db
        .transactions()
        .list(&query)
        .await
        .db_err("Failed to list transactions")?;

    Ok(grant.respond(transactions))
}

async fn delete_transaction(
    State(state): State<ApiState>,
    Path((username, id)): Path<(String, String)>,
    session: SessionTokens,
) -> Result<impl IntoResponse, ApiError> {
    let grant = session.authorize(&state.jwt, &AuthPolicy::User(username.clone()))?;

    let deleted = state
        .db
        .transactions()
        .delete(&username, &id)
        .await
        .db_err("Failed to delete transaction")?;
    if !deleted {
        return Err(ApiError::not_found("Transaction not found"));
    }

    info!(username = %username, id = %id, "Transaction deleted");
    Ok(grant.respond(serde_json::json!({ "message": "Transaction deleted" })))
}

async fn list_all_transactions(
    State(state): State<ApiState>,
    Query(params): Query<FilterParams>,
    session: SessionTokens,
) -> Result<impl IntoResponse, ApiError> {
    let grant = session.authorize(&state.jwt, &AuthPolicy::Admin)?;

    let query = filtered_query(None, &params)?;
    let transactions = state
        .db
        .transactions()
        .list(&query)
        .await
        .db_err("Failed to list transactions")?;

    Ok(grant.respond(transactions))
}
