//! Signed, time-limited CSRF tokens.
//!
//! A token has the form `<nonce>.<issued_at>.<signature>` where the signature
//! is HMAC-SHA256 over `<nonce>.<issued_at>` keyed with the application secret.
//! The nonce is also stored in the `coconut_csrf` cookie; a token is only
//! accepted alongside the cookie it was issued for.

use chrono::Utc;
use shared::crypto::{hmac_sha256_hex, verify_hmac_sha256_hex};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CsrfError {
    #[error("The CSRF token is missing.")]
    Missing,

    #[error("The CSRF session token is missing.")]
    MissingCookie,

    #[error("The CSRF token is invalid.")]
    Invalid,

    #[error("The CSRF token has expired.")]
    Expired,

    #[error("The CSRF tokens do not match.")]
    Mismatch,
}

#[derive(Clone)]
pub struct CsrfTokens {
    key: Vec<u8>,
    time_limit_secs: i64,
}

impl std::fmt::Debug for CsrfTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfTokens")
            .field("time_limit_secs", &self.time_limit_secs)
            .finish_non_exhaustive()
    }
}

impl CsrfTokens {
    pub fn new(secret_key: &str, time_limit_secs: u64) -> Self {
        Self {
            key: secret_key.as_bytes().to_vec(),
            time_limit_secs: i64::try_from(time_limit_secs).unwrap_or(i64::MAX),
        }
    }

    /// Issue a token bound to `nonce`.
    pub fn issue(&self, nonce: &str) -> String {
        self.issue_at(nonce, Utc::now().timestamp())
    }

    fn issue_at(&self, nonce: &str, issued_at: i64) -> String {
        let payload = format!("{}.{}", nonce, issued_at);
        let signature = hmac_sha256_hex(&self.key, &payload);
        format!("{}.{}", payload, signature)
    }

    /// Check `token` against the nonce from the client's cookie.
    pub fn verify(&self, token: &str, nonce: &str) -> Result<(), CsrfError> {
        self.verify_at(token, nonce, Utc::now().timestamp())
    }

    fn verify_at(&self, token: &str, nonce: &str, now: i64) -> Result<(), CsrfError> {
        let (payload, signature) = token.rsplit_once('.').ok_or(CsrfError::Invalid)?;
        let (token_nonce, issued_at) = payload.split_once('.').ok_or(CsrfError::Invalid)?;
        let issued_at: i64 = issued_at.parse().map_err(|_| CsrfError::Invalid)?;

        if !verify_hmac_sha256_hex(&self.key, payload, signature) {
            return Err(CsrfError::Invalid);
        }

        // Both values come from the client; the signature already pins the token's.
        if token_nonce != nonce {
            return Err(CsrfError::Mismatch);
        }

        let age = now.saturating_sub(issued_at);
        if age < 0 {
            return Err(CsrfError::Invalid);
        }
        if age > self.time_limit_secs {
            return Err(CsrfError::Expired);
        }

        Ok(())
    }
}
