//! Authentication error types.

use super::gate::AuthorizationResult;

/// A denied gate decision. Handlers turn it into a 401 carrying `cause`.
#[derive(Debug, Clone)]
pub struct ApiAuthError {
    pub cause: String,
}

impl From<AuthorizationResult> for ApiAuthError {
    fn from(result: AuthorizationResult) -> Self {
        Self {
            cause: result.cause,
        }
    }
}
