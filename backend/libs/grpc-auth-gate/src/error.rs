//! Outward authentication errors
//!
//! Callers only ever learn "missing" or "invalid". The verification reason
//! behind an invalid token stays inside the process for logs.

use crypto_core::jwt::TokenError;
use tonic::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing authorization token")]
    MissingToken,

    /// The wrapped reason is deliberately not part of `Display` or `source()`
    #[error("invalid authorization token")]
    InvalidToken(TokenError),
}

impl AuthError {
    /// Internal verification reason, if any
    pub fn reason(&self) -> Option<TokenError> {
        match self {
            AuthError::MissingToken => None,
            AuthError::InvalidToken(reason) => Some(*reason),
        }
    }

    /// Detail for logs only
    pub fn diagnostic(&self) -> String {
        match self {
            AuthError::MissingToken => "no credential presented".to_string(),
            AuthError::InvalidToken(reason) => reason.to_string(),
        }
    }
}

impl From<AuthError> for Status {
    fn from(err: AuthError) -> Self {
        Status::unauthenticated(err.to_string())
    }
}
