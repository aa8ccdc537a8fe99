//! Axum glue around the gate: reading the session cookies and applying
//! a reissued access token to the response.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, header::SET_COOKIE, request::Parts},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::cookie::{ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, get_cookie};
use super::errors::ApiAuthError;
use super::gate::{ReissuedCredential, SessionTokens, verify_auth};
use super::policy::AuthPolicy;
use crate::jwt::{Identity, JwtConfig};

impl<S> FromRequestParts<S> for SessionTokens
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SessionTokens {
            access: get_cookie(&parts.headers, ACCESS_COOKIE_NAME).map(str::to_string),
            refresh: get_cookie(&parts.headers, REFRESH_COOKIE_NAME).map(str::to_string),
        })
    }
}

impl SessionTokens {
    /// Run the gate and turn a denial into a 401 rejection.
    pub fn authorize(&self, jwt: &JwtConfig, policy: &AuthPolicy) -> Result<Grant, ApiAuthError> {
        let outcome = verify_auth(jwt, self, policy);
        match outcome.identity {
            Some(identity) if outcome.result.authorized => Ok(Grant {
                identity,
                reissued: outcome.reissued,
            }),
            _ => Err(ApiAuthError::from(outcome.result)),
        }
    }
}

/// Proof that the gate let a request through.
#[derive(Debug, Clone)]
pub struct Grant {
    /// Claims of the caller's access token.
    pub identity: Identity,
    pub reissued: Option<ReissuedCredential>,
}

/// Success body: `{ "data": ..., "refreshedTokenMessage"?: "..." }`.
#[derive(Serialize)]
pub struct DataResponse<T> {
    pub data: T,
    #[serde(
        rename = "refreshedTokenMessage",
        skip_serializing_if = "Option::is_none"
    )]
    pub refreshed_token_message: Option<&'static str>,
}

impl Grant {
    /// Wrap `data` in a 200 response, attaching the new access token cookie
    /// and refresh notice when the gate reissued one.
    pub fn respond<T: Serialize>(self, data: T) -> Response {
        let body = DataResponse {
            data,
            refreshed_token_message: self.reissued.as_ref().map(ReissuedCredential::message),
        };
        let mut response = Json(body).into_response();
        if let Some(reissued) = &self.reissued {
            match HeaderValue::from_str(&reissued.set_cookie()) {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(e) => tracing::error!(error = %e, "Invalid access token cookie"),
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::gate::REFRESHED_TOKEN_MESSAGE;

    fn alice() -> Identity {
        Identity {
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
            role: "Regular".to_string(),
        }
    }

    #[tokio::test]
    async fn test_respond_without_reissue() {
        let grant = Grant {
            identity: alice(),
            reissued: None,
        };
        let response = grant.respond(vec![1, 2, 3]);
        assert!(response.headers().get(SET_COOKIE).is_none());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "data": [1, 2, 3] }));
    }

    #[tokio::test]
    async fn test_respond_with_reissue() {
        let grant = Grant {
            identity: alice(),
            reissued: Some(ReissuedCredential {
                token: "new-token".to_string(),
                max_age_secs: 3600,
            }),
        };
        let response = grant.respond("ok");
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("accessToken=new-token;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=None"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["refreshedTokenMessage"], REFRESHED_TOKEN_MESSAGE);
    }
}
