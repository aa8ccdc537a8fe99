mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::{
    Session, TestApp, body_json, delete, extract_set_cookies, get, identity, post_json,
};
use expense_tracker::db::Role;
use serde_json::json;

// =============================================================================
// Accounts and sessions
// =============================================================================

async fn register(app: &TestApp, username: &str, email: &str) -> StatusCode {
    app.send(post_json(
        "/api/register",
        None,
        json!({ "username": username, "email": email, "password": "hunter22" }),
    ))
    .await
    .status()
}

#[tokio::test]
async fn test_register_and_login() {
    let app = TestApp::new().await;
    assert_eq!(register(&app, "alice", "alice@example.com").await, StatusCode::OK);

    let response = app
        .send(post_json(
            "/api/login",
            None,
            json!({ "email": "alice@example.com", "password": "hunter22" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = extract_set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(
        cookies
            .iter()
            .any(|c| c.starts_with("accessToken=") && c.contains("Max-Age=3600"))
    );
    assert!(
        cookies
            .iter()
            .any(|c| c.starts_with("refreshToken=") && c.contains("Max-Age=604800"))
    );

    let json = body_json(response).await;
    let session = Session {
        access: json["data"]["accessToken"].as_str().unwrap().to_string(),
        refresh: json["data"]["refreshToken"].as_str().unwrap().to_string(),
    };

    let response = app.send(get("/api/users/alice", Some(&session))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["role"], "Regular");
}

#[tokio::test]
async fn test_register_rejects_invalid_and_duplicate_fields() {
    let app = TestApp::new().await;

    let response = app
        .send(post_json(
            "/api/register",
            None,
            json!({ "username": "alice", "email": "not-an-email", "password": "pw" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid email");

    let response = app
        .send(post_json("/api/register", None, json!({ "username": "alice" })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "incomplete attributes");

    assert_eq!(register(&app, "alice", "alice@example.com").await, StatusCode::OK);
    assert_eq!(
        register(&app, "alice", "other@example.com").await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        register(&app, "other", "alice@example.com").await,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn test_admin_registration_sets_role() {
    let app = TestApp::new().await;
    let response = app
        .send(post_json(
            "/api/admin",
            None,
            json!({ "username": "root", "email": "root@example.com", "password": "pw" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let user = app.db.users().get_by_username("root").await.unwrap().unwrap();
    assert_eq!(user.role, Role::Admin);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::new().await;
    register(&app, "alice", "alice@example.com").await;

    let response = app
        .send(post_json(
            "/api/login",
            None,
            json!({ "email": "alice@example.com", "password": "wrong" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(extract_set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_logout_clears_refresh_token() {
    let app = TestApp::new().await;
    register(&app, "alice", "alice@example.com").await;
    let response = app
        .send(post_json(
            "/api/login",
            None,
            json!({ "email": "alice@example.com", "password": "hunter22" }),
        ))
        .await;
    let json = body_json(response).await;
    let session = Session {
        access: json["data"]["accessToken"].as_str().unwrap().to_string(),
        refresh: json["data"]["refreshToken"].as_str().unwrap().to_string(),
    };

    let response = app.send(get("/api/logout", Some(&session))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookies = extract_set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    assert_eq!(body_json(response).await["data"]["message"], "User logged out");

    let user = app.db.users().get_by_username("alice").await.unwrap().unwrap();
    assert!(user.refresh_token.is_none());

    let response = app.send(get("/api/logout", Some(&session))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "user not found");
}

#[tokio::test]
async fn test_logout_without_cookie() {
    let app = TestApp::new().await;
    let response = app.send(get("/api/logout", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "no refresh token");
}

#[tokio::test]
async fn test_get_missing_user_as_admin() {
    let app = TestApp::new().await;
    let admin = app.user("root", "root@example.com", Role::Admin).await;

    let response = app.send(get("/api/users/nobody", Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Categories
// =============================================================================

#[tokio::test]
async fn test_categories() {
    let app = TestApp::new().await;
    let admin = app.user("root", "root@example.com", Role::Admin).await;
    let alice = app.user("alice", "alice@example.com", Role::Regular).await;

    let body = json!({ "type": "food", "color": "#ff0000" });
    let response = app
        .send(post_json("/api/categories", Some(&alice), body.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(post_json("/api/categories", Some(&admin), body.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["type"], "food");

    let response = app
        .send(post_json("/api/categories", Some(&admin), body))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.send(get("/api/categories", Some(&alice))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"], json!([{ "type": "food", "color": "#ff0000" }]));
}

// =============================================================================
// Transactions
// =============================================================================

async fn add_transaction(
    app: &TestApp,
    session: &Session,
    username: &str,
    amount: serde_json::Value,
    kind: &str,
) -> serde_json::Value {
    let response = app
        .send(post_json(
            &format!("/api/users/{}/transactions", username),
            Some(session),
            json!({ "amount": amount, "type": kind }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"].clone()
}

#[tokio::test]
async fn test_create_transaction() {
    let app = TestApp::new().await;
    let alice = app.user("alice", "alice@example.com", Role::Regular).await;
    app.category("food", "#ff0000").await;

    let created = add_transaction(&app, &alice, "alice", json!("12.5"), "food").await;
    assert_eq!(created["amount"], 12.5);
    assert_eq!(created["type"], "food");
    assert_eq!(created["color"], "#ff0000");
    assert_eq!(created["username"], "alice");
    assert!(created["id"].as_str().is_some());

    let response = app
        .send(post_json(
            "/api/users/alice/transactions",
            Some(&alice),
            json!({ "amount": 3, "type": "travel" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(post_json(
            "/api/users/alice/transactions",
            Some(&alice),
            json!({ "amount": "lots", "type": "food" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_own_transactions_with_filters() {
    let app = TestApp::new().await;
    let alice = app.user("alice", "alice@example.com", Role::Regular).await;
    app.category("food", "#ff0000").await;
    add_transaction(&app, &alice, "alice", json!(5), "food").await;
    add_transaction(&app, &alice, "alice", json!(25.5), "food").await;

    let base = "/api/users/alice/transactions";
    assert_eq!(count(&app, &alice, base).await, 2);
    assert_eq!(count(&app, &alice, &format!("{}?min=10", base)).await, 1);
    assert_eq!(count(&app, &alice, &format!("{}?min=1&max=5", base)).await, 1);
    assert_eq!(count(&app, &alice, &format!("{}?max=25.5", base)).await, 2);

    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    assert_eq!(
        count(&app, &alice, &format!("{}?date={}", base, today)).await,
        2
    );
    assert_eq!(count(&app, &alice, &format!("{}?upTo=2000-01-01", base)).await, 0);
    assert_eq!(count(&app, &alice, &format!("{}?from=2000-01-01", base)).await, 2);
}

async fn count(app: &TestApp, session: &Session, uri: &str) -> usize {
    let response = app.send(get(uri, Some(session))).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"].as_array().unwrap().len()
}

#[tokio::test]
async fn test_invalid_filters_rejected() {
    let app = TestApp::new().await;
    let alice = app.user("alice", "alice@example.com", Role::Regular).await;

    let response = app
        .send(get(
            "/api/users/alice/transactions?date=2024-01-01&from=2023-01-01",
            Some(&alice),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "cannot combine date with from/upTo"
    );

    for query in ["min=abc", "max=ten", "date=01-02-2024", "from=2024-13-01"] {
        let response = app
            .send(get(
                &format!("/api/users/alice/transactions?{}", query),
                Some(&alice),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", query);
    }
}

#[tokio::test]
async fn test_transactions_by_category_and_delete() {
    let app = TestApp::new().await;
    let alice = app.user("alice", "alice@example.com", Role::Regular).await;
    let bob = app.user("bob", "bob@example.com", Role::Regular).await;
    app.category("food", "#ff0000").await;
    app.category("rent", "#00ff00").await;

    let food = add_transaction(&app, &alice, "alice", json!(5), "food").await;
    add_transaction(&app, &alice, "alice", json!(500), "rent").await;
    add_transaction(&app, &bob, "bob", json!(7), "food").await;

    let response = app
        .send(get("/api/users/alice/transactions/category/food", Some(&alice)))
        .await;
    let json = body_json(response).await;
    let listed = json["data"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], food["id"]);

    let id = food["id"].as_str().unwrap();
    let uri = format!("/api/users/alice/transactions/{}", id);

    // Another user's path is guarded by the owner policy.
    let response = app.send(delete(&uri, &bob)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.send(delete(&uri, &alice)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.send(delete(&uri, &alice)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_lists_all_transactions() {
    let app = TestApp::new().await;
    let admin = app.user("root", "root@example.com", Role::Admin).await;
    let alice = app.user("alice", "alice@example.com", Role::Regular).await;
    let bob = app.user("bob", "bob@example.com", Role::Regular).await;
    app.category("food", "#ff0000").await;
    add_transaction(&app, &alice, "alice", json!(5), "food").await;
    add_transaction(&app, &bob, "bob", json!(50), "food").await;

    let response = app.send(get("/api/transactions", Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 2);

    let response = app.send(get("/api/transactions?min=10", Some(&admin))).await;
    let json = body_json(response).await;
    let listed = json["data"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["username"], "bob");
}

// =============================================================================
// Groups
// =============================================================================

#[tokio::test]
async fn test_create_group_reports_skipped_members() {
    let app = TestApp::new().await;
    let alice = app.user("alice", "alice@example.com", Role::Regular).await;
    app.user("bob", "bob@example.com", Role::Regular).await;
    let carol = app.user("carol", "carol@example.com", Role::Regular).await;

    let response = app
        .send(post_json(
            "/api/groups",
            Some(&alice),
            json!({ "name": "family", "memberEmails": ["bob@example.com", "nobody@example.com"] }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["group"]["name"], "family");
    assert_eq!(
        json["data"]["group"]["members"],
        json!(["bob@example.com", "alice@example.com"])
    );
    assert_eq!(json["data"]["membersNotFound"], json!(["nobody@example.com"]));
    assert_eq!(json["data"]["alreadyInGroup"], json!([]));

    let response = app
        .send(post_json(
            "/api/groups",
            Some(&carol),
            json!({ "name": "friends", "memberEmails": ["alice@example.com"] }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["group"]["members"], json!(["carol@example.com"]));
    assert_eq!(json["data"]["alreadyInGroup"], json!(["alice@example.com"]));

    let response = app
        .send(post_json(
            "/api/groups",
            Some(&carol),
            json!({ "name": "family", "memberEmails": ["carol@example.com"] }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_group_rejects_duplicate_emails() {
    let app = TestApp::new().await;
    let alice = app.user("alice", "alice@example.com", Role::Regular).await;

    let response = app
        .send(post_json(
            "/api/groups",
            Some(&alice),
            json!({ "name": "family", "memberEmails": ["bob@example.com", "bob@example.com"] }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_group_details_and_transactions() {
    let app = TestApp::new().await;
    let admin = app.user("root", "root@example.com", Role::Admin).await;
    let alice = app.user("alice", "alice@example.com", Role::Regular).await;
    let bob = app.user("bob", "bob@example.com", Role::Regular).await;
    let carol = app.user("carol", "carol@example.com", Role::Regular).await;
    app.category("food", "#ff0000").await;

    app.send(post_json(
        "/api/groups",
        Some(&alice),
        json!({ "name": "family", "memberEmails": ["bob@example.com"] }),
    ))
    .await;

    add_transaction(&app, &alice, "alice", json!(5), "food").await;
    add_transaction(&app, &bob, "bob", json!(50), "food").await;
    add_transaction(&app, &carol, "carol", json!(500), "food").await;

    let response = app.send(get("/api/groups/family", Some(&bob))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["name"], "family");

    let response = app
        .send(get("/api/groups/family/transactions", Some(&bob)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let mut owners: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["username"].as_str().unwrap())
        .collect();
    owners.sort();
    assert_eq!(owners, ["alice", "bob"]);

    let response = app
        .send(get("/api/groups/family/transactions?min=10", Some(&alice)))
        .await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);

    let response = app
        .send(get("/api/groups/family/transactions?min=x", Some(&alice)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(get("/api/groups/family/transactions", Some(&carol)))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.send(get("/api/groups/unknown", Some(&alice))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.send(get("/api/groups", Some(&alice))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = app.send(get("/api/groups", Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_group_routes_require_session() {
    let app = TestApp::new().await;
    let session = Session::issue(&app.jwt, identity("alice", "alice@example.com", Role::Regular));
    let response = app.send(get("/api/groups/family", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.send(get("/api/groups/family", Some(&session))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
