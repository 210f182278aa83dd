//! SSO Cookies
//!
//! The SSO cookie value is an unscoped signed token (see
//! [`crate::delegation`]) wrapped in unpadded base64url so it survives
//! cookie syntax. Parsing yields a cookie principal; the credential handle
//! additionally records the domain the cookie is scoped to.

use crate::{
    delegation::TokenClaims,
    error::{AuthError, Result},
    principal::Principal,
    signature::{SignatureVerifier, Signer},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name of the cookie carrying the SSO session
pub const DEFAULT_SSO_COOKIE_NAME: &str = "CREDGATE_SSO";

/// Signed SSO cookie value plus the domain it is scoped to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsoCookieCredential {
    value: String,
    domain: String,
}

impl SsoCookieCredential {
    /// Bind an already validated cookie value to `domain`
    pub(crate) fn new(value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            domain: domain.into(),
        }
    }

    /// Raw signed value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Domain the cookie is scoped to
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// `Set-Cookie` header value for re-issuing the same session
    pub fn set_cookie_header(&self, cookie_name: &str) -> String {
        format!(
            "{}={}; Domain=.{}; Path=/; Secure; HttpOnly",
            cookie_name, self.value, self.domain
        )
    }
}

/// Encode claims as a signed SSO cookie value
///
/// Any scope on `claims` is dropped; SSO sessions are domain-wide.
pub fn encode_cookie_value(claims: &TokenClaims, signer: &dyn Signer) -> String {
    let mut claims = claims.clone();
    claims.scope = None;
    URL_SAFE_NO_PAD.encode(claims.sign(signer))
}

/// Parses and validates SSO cookie values
#[derive(Clone)]
pub struct SsoCookieCodec {
    verifier: Arc<dyn SignatureVerifier>,
    clock_skew: Duration,
}

impl SsoCookieCodec {
    /// Create a codec
    pub fn new(verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self {
            verifier,
            clock_skew: Duration::zero(),
        }
    }

    /// Tolerate expiry up to `skew` in the past
    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// Parse a cookie value into the principal it carries
    pub fn parse(&self, value: &str) -> Result<Principal> {
        self.parse_at(value, Utc::now())
    }

    /// Parse a cookie value as of `now`
    pub fn parse_at(&self, value: &str, now: DateTime<Utc>) -> Result<Principal> {
        let decoded = URL_SAFE_NO_PAD.decode(value.trim())?;
        let text = String::from_utf8(decoded)
            .map_err(|_| AuthError::InvalidCookie("value is not UTF-8".to_string()))?;

        let claims = TokenClaims::decode_signed(&text, self.verifier.as_ref()).map_err(|e| match e {
            AuthError::InvalidToken(reason) => AuthError::InvalidCookie(reason),
            other => other,
        })?;

        if claims.scope.is_some() {
            return Err(AuthError::InvalidCookie(
                "cookie value carries a scope".to_string(),
            ));
        }
        claims.check_expiry(now, self.clock_skew)?;

        Principal::cookie(claims.user_id)
    }

    /// Build the credential handle for a cookie value that already parsed
    pub fn credential(&self, value: &str, domain: &str) -> SsoCookieCredential {
        SsoCookieCredential::new(value.trim(), domain)
    }
}

impl std::fmt::Debug for SsoCookieCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsoCookieCodec")
            .field("clock_skew", &self.clock_skew)
            .finish_non_exhaustive()
    }
}
