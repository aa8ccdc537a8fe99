//! Token-based authorization for API routes.
//!
//! Every request carries a short-lived access token and a long-lived refresh
//! token as cookies. Both must verify and carry the same identity. When the
//! access token has expired but the refresh token is still good, the gate
//! authorizes the call and hands back a replacement access token.

mod cookie;
mod errors;
mod extractors;
mod gate;
mod policy;

pub use cookie::{
    ACCESS_COOKIE_NAME, COOKIE_PATH, REFRESH_COOKIE_NAME, cleared_cookie, get_cookie,
    session_cookie,
};
pub use errors::ApiAuthError;
pub use extractors::{DataResponse, Grant};
pub use gate::{
    AUTHORIZED, AuthOutcome, AuthorizationResult, INVALID_TOKENS, MISMATCHED_TOKENS,
    MISSING_INFORMATION, REFRESH_EXPIRED, REFRESHED_TOKEN_MESSAGE, ReissuedCredential,
    SessionTokens, UNKNOWN_AUTHORIZATION, verify_auth, verify_auth_descriptor,
};
pub use policy::{AuthPolicy, NOT_AN_ADMIN, NOT_IN_GROUP, OTHER_USER, PolicyDescriptor};
