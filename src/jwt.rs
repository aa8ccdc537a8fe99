//! JWT token generation and verification.
//!
//! Access and refresh tokens carry the same identity claims and differ only in
//! lifetime. Expiry is reported as data on [`Decoded`] rather than as an error,
//! so callers decide what a stale token means.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Access token duration: 1 hour
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 60 * 60;

/// Refresh token duration: 7 days
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Identity claims shared by access and refresh tokens.
///
/// Absent fields decode as empty strings so that incomplete tokens can be
/// rejected by the claim checks instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: String,
}

/// Full JWT payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub identity: Identity,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: u64,
    /// Expiration time (Unix timestamp). Defaulted so that a token without
    /// it fails the required-claim check rather than deserialization.
    #[serde(default)]
    pub exp: u64,
}

/// How [`JwtConfig::verify`] treats the `exp` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Never report the token as expired.
    Ignore,
    /// Report whether `exp` has passed.
    Enforce,
}

/// A token whose signature checked out.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub claims: Claims,
    pub expired: bool,
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct SignedToken {
    /// The JWT token string
    pub token: String,
    /// Token duration in seconds
    pub duration: u64,
}

/// Configuration for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Sign `identity` with a validity window of `duration` seconds starting now.
    pub fn sign(&self, identity: &Identity, duration: u64) -> Result<SignedToken, JwtError> {
        let now = now_secs()?;
        let claims = Claims {
            identity: identity.clone(),
            iat: now,
            exp: now + duration,
        };
        Ok(SignedToken {
            token: self.sign_claims(&claims)?,
            duration,
        })
    }

    pub fn sign_access(&self, identity: &Identity) -> Result<SignedToken, JwtError> {
        self.sign(identity, ACCESS_TOKEN_DURATION_SECS)
    }

    pub fn sign_refresh(&self, identity: &Identity) -> Result<SignedToken, JwtError> {
        self.sign(identity, REFRESH_TOKEN_DURATION_SECS)
    }

    /// Sign an explicit payload, timestamps included.
    pub fn sign_claims(&self, claims: &Claims) -> Result<String, JwtError> {
        jsonwebtoken::encode(&Header::default(), claims, &self.encoding_key)
            .map_err(JwtError::Encoding)
    }

    /// Check the signature of `token` and decode its claims.
    ///
    /// An expired token is not an error: with [`Expiry::Enforce`] it comes back
    /// with `expired` set.
    pub fn verify(&self, token: &str, expiry: Expiry) -> Result<Decoded, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        let token_data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(JwtError::Decoding)?;

        let expired = match expiry {
            Expiry::Ignore => false,
            Expiry::Enforce => now_secs()? >= token_data.claims.exp,
        };

        Ok(Decoded {
            claims: token_data.claims,
            expired,
        })
    }
}

fn now_secs() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Error decoding the token
    Decoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
}

impl JwtError {
    /// Stable name of the failure kind, suitable for client-facing causes.
    pub fn name(&self) -> &'static str {
        match self {
            JwtError::Encoding(_) => "EncodingError",
            JwtError::TimeError => "TimeError",
            JwtError::Decoding(e) => match e.kind() {
                ErrorKind::InvalidToken => "InvalidToken",
                ErrorKind::InvalidSignature => "InvalidSignature",
                ErrorKind::InvalidAlgorithm => "InvalidAlgorithm",
                ErrorKind::MissingRequiredClaim(_) => "MissingRequiredClaim",
                ErrorKind::ExpiredSignature => "ExpiredSignature",
                ErrorKind::ImmatureSignature => "ImmatureSignature",
                ErrorKind::Base64(_) => "Base64Error",
                ErrorKind::Json(_) => "JsonError",
                ErrorKind::Utf8(_) => "Utf8Error",
                _ => "JsonWebTokenError",
            },
        }
    }
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}
