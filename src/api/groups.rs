//! Group endpoints.
//!
//! - POST `/` - Create a group with initial members
//! - GET `/` - List groups (admin)
//! - GET `/{name}` - Group details (members only)
//! - GET `/{name}/transactions` - Members' transactions, filtered (members only)

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::ApiState;
use super::error::{ApiError, ResultExt, require_fields, str_field};
use super::transactions::filtered_query;
use crate::auth::{AuthPolicy, Grant, SessionTokens};
use crate::db::{Database, Group};
use crate::filters::FilterParams;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(list_groups).post(create_group))
        .route("/{name}", get(get_group))
        .route("/{name}/transactions", get(list_group_transactions))
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedGroup {
    group: Group,
    already_in_group: Vec<String>,
    members_not_found: Vec<String>,
}

async fn create_group(
    State(state): State<ApiState>,
    session: SessionTokens,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let grant = session.authorize(&state.jwt, &AuthPolicy::Simple)?;

    require_fields(&body, &[("name", "string"), ("memberEmails", "emailArray")])?;
    let name = str_field(&body, "name");

    if state
        .db
        .groups()
        .exists(name)
        .await
        .db_err("Failed to check group name")?
    {
        return Err(ApiError::bad_request("group name already in use"));
    }

    let mut requested: Vec<String> = body
        .get("memberEmails")
        .and_then(Value::as_array)
        .map(|emails| {
            emails
                .iter()
                .filter_map(Value::as_str)
                .map(|e| e.trim().to_string())
                .collect()
        })
        .unwrap_or_default();
    if !requested.contains(&grant.identity.email) {
        requested.push(grant.identity.email.clone());
    }

    let sorted = sort_members(&state.db, requested).await?;
    if sorted.members.is_empty() {
        return Err(ApiError::bad_request(
            "all member emails are unknown or already in a group",
        ));
    }

    state
        .db
        .groups()
        .create(name, &sorted.members)
        .await
        .db_err("Failed to create group")?;

    info!(name = %name, members = sorted.members.len(), "Group created");
    Ok(grant.respond(CreatedGroup {
        group: Group {
            name: name.to_string(),
            members: sorted.members,
        },
        already_in_group: sorted.already_in_group,
        members_not_found: sorted.not_found,
    }))
}

struct SortedMembers {
    members: Vec<String>,
    already_in_group: Vec<String>,
    not_found: Vec<String>,
}

/// Split requested emails into joinable members and those reported back.
async fn sort_members(db: &Database, emails: Vec<String>) -> Result<SortedMembers, ApiError> {
    let mut sorted = SortedMembers {
        members: Vec::new(),
        already_in_group: Vec::new(),
        not_found: Vec::new(),
    };
    for email in emails {
        if db
            .users()
            .get_by_email(&email)
            .await
            .db_err("Failed to get user")?
            .is_none()
        {
            sorted.not_found.push(email);
        } else if db
            .groups()
            .group_of(&email)
            .await
            .db_err("Failed to check group membership")?
            .is_some()
        {
            sorted.already_in_group.push(email);
        } else {
            sorted.members.push(email);
        }
    }
    Ok(sorted)
}

async fn list_groups(
    State(state): State<ApiState>,
    session: SessionTokens,
) -> Result<impl IntoResponse, ApiError> {
    let grant = session.authorize(&state.jwt, &AuthPolicy::Admin)?;

    let groups = state.db.groups().list().await.db_err("Failed to list groups")?;

    Ok(grant.respond(groups))
}

/// Run the gate once for a group route. An existing group is guarded by its
/// member list; a missing one still requires a session before the 404.
async fn authorize_member(
    state: &ApiState,
    session: &SessionTokens,
    name: &str,
) -> Result<(Grant, Group), ApiError> {
    let group = state
        .db
        .groups()
        .get_by_name(name)
        .await
        .db_err("Failed to get group")?;
    match group {
        Some(group) => {
            let grant = session.authorize(&state.jwt, &AuthPolicy::Group(group.members.clone()))?;
            Ok((grant, group))
        }
        None => {
            session.authorize(&state.jwt, &AuthPolicy::Simple)?;
            Err(ApiError::not_found("Group not found"))
        }
    }
}

async fn get_group(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    session: SessionTokens,
) -> Result<impl IntoResponse, ApiError> {
    let (grant, group) = authorize_member(&state, &session, &name).await?;

    Ok(grant.respond(group))
}

async fn list_group_transactions(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Query(params): Query<FilterParams>,
    session: SessionTokens,
) -> Result<impl IntoResponse, ApiError> {
    let (grant, group) = authorize_member(&state, &session, &name).await?;

    let usernames = state
        .db
        .users()
        .usernames_for_emails(&group.members)
        .await
        .db_err("Failed to resolve group members")?;
    let query = filtered_query(Some(usernames), &params)?;
    let transactions = state
        .db
        .transactions()
        .list(&query)
        .await
        .db_err("Failed to list transactions")?;

    Ok(grant.respond(transactions))
}
