//! The authorization gate every protected handler runs first.
//!
//! Both tokens are verified and cross-checked, the policy is evaluated against
//! the access claims, and only then is a stale access token replaced. The
//! replacement is returned to the caller instead of written to a response.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use super::cookie::{ACCESS_COOKIE_NAME, session_cookie};
use super::policy::{AuthPolicy, PolicyDescriptor};
use crate::jwt::{Expiry, Identity, JwtConfig};
use crate::validate::validate_value_types;

pub const INVALID_TOKENS: &str = "invalid tokens";
pub const REFRESH_EXPIRED: &str = "token expired, need to login again";
pub const MISSING_INFORMATION: &str = "Token is missing information";
pub const MISMATCHED_TOKENS: &str = "Mismatched tokens";
pub const UNKNOWN_AUTHORIZATION: &str = "Unknown authorization requested";
pub const AUTHORIZED: &str = "Authorized";

/// Message surfaced to clients when the access token was replaced.
pub const REFRESHED_TOKEN_MESSAGE: &str = "Access token has been refreshed. Remember to copy the new one in the headers of subsequent calls";

/// The two credentials presented with a request, as raw cookie values.
#[derive(Debug, Clone, Default)]
pub struct SessionTokens {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl SessionTokens {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: Some(access.into()),
            refresh: Some(refresh.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationResult {
    pub authorized: bool,
    pub cause: String,
}

/// A new access token the transport layer must hand back to the client.
#[derive(Debug, Clone)]
pub struct ReissuedCredential {
    pub token: String,
    pub max_age_secs: u64,
}

impl ReissuedCredential {
    /// `Set-Cookie` value carrying the new access token.
    pub fn set_cookie(&self) -> String {
        session_cookie(ACCESS_COOKIE_NAME, &self.token, self.max_age_secs)
    }

    pub fn message(&self) -> &'static str {
        REFRESHED_TOKEN_MESSAGE
    }
}

/// Everything a gate call produces.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub result: AuthorizationResult,
    /// Access claims of an authorized caller.
    pub identity: Option<Identity>,
    pub reissued: Option<ReissuedCredential>,
}

impl AuthOutcome {
    fn denied(cause: impl Into<String>) -> Self {
        Self {
            result: AuthorizationResult {
                authorized: false,
                cause: cause.into(),
            },
            identity: None,
            reissued: None,
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.result.authorized
    }
}

/// Authorize a request carrying `tokens` under `policy`.
pub fn verify_auth(jwt: &JwtConfig, tokens: &SessionTokens, policy: &AuthPolicy) -> AuthOutcome {
    authorize(jwt, tokens, Some(policy))
}

/// Same as [`verify_auth`] for a policy in wire form. Unknown policy types are
/// reported only once the tokens themselves have been accepted.
pub fn verify_auth_descriptor(
    jwt: &JwtConfig,
    tokens: &SessionTokens,
    descriptor: &PolicyDescriptor,
) -> AuthOutcome {
    authorize(jwt, tokens, descriptor.resolve().as_ref())
}

fn authorize(jwt: &JwtConfig, tokens: &SessionTokens, policy: Option<&AuthPolicy>) -> AuthOutcome {
    let (access_token, access, refresh) = match check_tokens(jwt, tokens) {
        Ok(checked) => checked,
        Err(cause) => {
            debug!(cause = %cause, "Rejected session tokens");
            return AuthOutcome::denied(cause);
        }
    };

    let Some(policy) = policy else {
        return AuthOutcome::denied(UNKNOWN_AUTHORIZATION);
    };
    if let Err(cause) = policy.evaluate(&access) {
        debug!(username = %access.username, cause, "Policy check failed");
        return AuthOutcome::denied(cause);
    }

    let reissued = reissue_if_expired(jwt, access_token, &refresh);

    AuthOutcome {
        result: AuthorizationResult {
            authorized: true,
            cause: AUTHORIZED.to_string(),
        },
        identity: Some(access),
        reissued,
    }
}

/// Token checks that precede policy evaluation.
/// Returns the raw access token with the access and refresh identities.
fn check_tokens<'a>(
    jwt: &JwtConfig,
    tokens: &'a SessionTokens,
) -> Result<(&'a str, Identity, Identity), String> {
    let (Some(access_token), Some(refresh_token)) =
        (tokens.access.as_deref(), tokens.refresh.as_deref())
    else {
        return Err(INVALID_TOKENS.to_string());
    };
    let (access_value, refresh_value) = (Value::from(access_token), Value::from(refresh_token));
    if !validate_value_types(&[(Some(&access_value), "token"), (Some(&refresh_value), "token")])
        .valid
    {
        return Err(INVALID_TOKENS.to_string());
    }

    let refresh = match jwt.verify(refresh_token, Expiry::Enforce) {
        Ok(decoded) if decoded.expired => return Err(REFRESH_EXPIRED.to_string()),
        Ok(decoded) => decoded.claims.identity,
        Err(e) => return Err(e.name().to_string()),
    };
    check_identity(&refresh)?;

    let access = jwt
        .verify(access_token, Expiry::Ignore)
        .map_err(|e| e.name().to_string())?
        .claims
        .identity;
    check_identity(&access)?;

    if access != refresh {
        return Err(MISMATCHED_TOKENS.to_string());
    }

    Ok((access_token, access, refresh))
}

fn check_identity(identity: &Identity) -> Result<(), String> {
    let email = Value::from(identity.email.as_str());
    let username = Value::from(identity.username.as_str());
    let role = Value::from(identity.role.as_str());
    let checked = validate_value_types(&[
        (Some(&email), "email"),
        (Some(&username), "string"),
        (Some(&role), "string"),
    ]);
    if !checked.valid {
        return Err(MISSING_INFORMATION.to_string());
    }
    Ok(())
}

/// Mint a new access token from the refresh claims if the current one is stale.
fn reissue_if_expired(
    jwt: &JwtConfig,
    access_token: &str,
    refresh: &Identity,
) -> Option<ReissuedCredential> {
    match jwt.verify(access_token, Expiry::Enforce) {
        Ok(decoded) if decoded.expired => match jwt.sign_access(refresh) {
            Ok(signed) => {
                info!(username = %refresh.username, "Reissued expired access token");
                Some(ReissuedCredential {
                    token: signed.token,
                    max_age_secs: signed.duration,
                })
            }
            Err(e) => {
                error!(error = %e, "Failed to sign replacement access token");
                None
            }
        },
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "Access token failed re-verification, keeping it");
            None
        }
    }
}
