#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
};
use expense_tracker::{
    ServerConfig, create_app,
    db::{Database, NewUser, Role},
    jwt::{Claims, Identity, JwtConfig},
};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

pub const TEST_SECRET: &[u8] = b"test-jwt-secret-that-is-long-enough";

pub struct TestApp {
    pub app: axum::Router,
    pub db: Database,
    pub jwt: JwtConfig,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let config = ServerConfig {
            db: db.clone(),
            jwt_secret: TEST_SECRET.to_vec(),
        };
        Self {
            app: create_app(&config),
            db,
            jwt: JwtConfig::new(TEST_SECRET),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Insert a user directly and return a valid session for it.
    /// The password hash is a placeholder, so the user cannot log in.
    pub async fn user(&self, username: &str, email: &str, role: Role) -> Session {
        self.db
            .users()
            .create(&NewUser {
                username,
                email,
                password_hash: "unused",
                role,
            })
            .await
            .unwrap();
        Session::issue(&self.jwt, identity(username, email, role))
    }

    pub async fn category(&self, kind: &str, color: &str) {
        assert!(self.db.categories().create(kind, color).await.unwrap());
    }
}

pub fn identity(username: &str, email: &str, role: Role) -> Identity {
    Identity {
        email: email.to_string(),
        username: username.to_string(),
        role: role.as_str().to_string(),
    }
}

/// A pair of session cookies as a client would hold them.
#[derive(Debug, Clone)]
pub struct Session {
    pub access: String,
    pub refresh: String,
}

impl Session {
    pub fn issue(jwt: &JwtConfig, identity: Identity) -> Self {
        Self {
            access: jwt.sign_access(&identity).unwrap().token,
            refresh: jwt.sign_refresh(&identity).unwrap().token,
        }
    }

    pub fn cookie(&self) -> String {
        format!("accessToken={}; refreshToken={}", self.access, self.refresh)
    }
}

/// Sign claims whose expiry is already in the past.
pub fn expired_token(jwt: &JwtConfig, identity: Identity) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    jwt.sign_claims(&Claims {
        identity,
        iat: now - 7200,
        exp: now - 3600,
    })
    .unwrap()
}

pub fn get(uri: &str, session: Option<&Session>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(session) = session {
        builder = builder.header("cookie", session.cookie());
    }
    builder.body(Body::empty()).unwrap()
}

pub fn delete(uri: &str, session: &Session) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("cookie", session.cookie())
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, session: Option<&Session>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(session) = session {
        builder = builder.header("cookie", session.cookie());
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}
