//! Error types for the session layer.

use std::time::Duration;

/// Why a session token was refused.
///
/// The variants follow the order checks run in
/// [`TokenVerifier::verify`](crate::TokenVerifier::verify).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Not two base64url segments, or the payload isn't claims JSON.
    #[error("malformed token")]
    Malformed,

    #[error("token signature does not match")]
    BadSignature,

    /// Blank subject, wrong issuer or unsupported version.
    #[error("token claims are invalid")]
    InvalidClaims,

    #[error("token issued in the future")]
    IssuedInFuture,

    #[error("token expired")]
    Expired,
}

impl TokenError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed => "MALFORMED",
            Self::BadSignature => "BAD_SIGNATURE",
            Self::InvalidClaims => "INVALID_CLAIMS",
            Self::IssuedInFuture => "ISSUED_IN_FUTURE",
            Self::Expired => "EXPIRED",
        }
    }
}

/// Errors from session bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The peer address has used up its auth attempts for now.
    #[error("too many auth attempts, retry in {}s", retry_after.as_secs())]
    Throttled { retry_after: Duration },

    /// The session's outbound channel is gone (its writer task ended).
    #[error("session {0} is closed")]
    Closed(crate::SessionId),
}
