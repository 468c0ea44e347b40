//! Session token verification.
//!
//! The login service hands players a short-lived token; the zone server
//! only checks it. A token is two base64url segments (no padding) joined
//! by a dot:
//!
//! ```text
//! base64url(claims JSON) "." base64url(HMAC-SHA256(secret, first segment))
//! ```
//!
//! The signature covers the *encoded* payload segment, so the payload is
//! only decoded after the signature has been checked.
//!
//! [`TokenVerifier::sign`] produces tokens in the same format. The server
//! never calls it; tests and tooling do.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::TokenError;

type HmacSha256 = Hmac<Sha256>;

/// Secret shipped in development configs. Refused in production.
pub const DEFAULT_AUTH_SECRET: &str = "a3-dev-secret-change-me";
pub const TOKEN_ISSUER: &str = "projecta3-login";
pub const TOKEN_VERSION: u32 = 1;
/// How far in the future `iat` may be before the token is refused.
pub const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// The signed payload of a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    pub iss: String,
    pub ver: u32,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

impl Claims {
    /// Claims from this server's issuer, valid for `ttl_secs` from `now`.
    pub fn new(username: &str, now: i64, ttl_secs: i64) -> Self {
        Self {
            username: username.to_string(),
            iss: TOKEN_ISSUER.to_string(),
            ver: TOKEN_VERSION,
            iat: now,
            exp: now + ttl_secs,
        }
    }
}

/// Checks session tokens against the shared server secret.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

impl TokenVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        // HMAC accepts keys of any length; this never fails in practice.
        HmacSha256::new_from_slice(&self.secret).map_err(|_| TokenError::BadSignature)
    }

    /// Verifies `token` at unix time `now` and returns its claims.
    ///
    /// Checks run in a fixed order: shape, signature, payload decoding,
    /// claim values, then the time window.
    pub fn verify(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let mut parts = token.trim().split('.');
        let (Some(payload_enc), Some(sig_enc), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let sig = URL_SAFE_NO_PAD
            .decode(sig_enc)
            .map_err(|_| TokenError::BadSignature)?;
        let mut mac = self.mac()?;
        mac.update(payload_enc.as_bytes());
        mac.verify_slice(&sig)
            .map_err(|_| TokenError::BadSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_enc)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if claims.username.trim().is_empty()
            || claims.iss != TOKEN_ISSUER
            || claims.ver != TOKEN_VERSION
        {
            return Err(TokenError::InvalidClaims);
        }
        if claims.iat > now + MAX_CLOCK_SKEW_SECS {
            return Err(TokenError::IssuedInFuture);
        }
        if now > claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    /// Encodes and signs `claims`.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        let json = serde_json::to_vec(claims).map_err(|_| TokenError::Malformed)?;
        let payload_enc = URL_SAFE_NO_PAD.encode(json);
        let mut mac = self.mac()?;
        mac.update(payload_enc.as_bytes());
        let sig_enc = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{payload_enc}.{sig_enc}"))
    }
}
