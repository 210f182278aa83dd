//! Delegation Tokens
//!
//! A delegation token binds a user to a request scope and a validity window.
//! The wire format is a form-urlencoded claim list followed by a detached
//! signature over that list:
//!
//! ```text
//! userid=alice&expirytime=1767225600&scope=%2Fdata%2Fpub&signature=<base64>
//! ```
//!
//! `scope` and `domain` are optional. A [`DelegationToken`] can only be
//! obtained through [`DelegationTokenCodec::parse`], so every instance has a
//! verified signature, has not expired and covers the request it came with.

use crate::{
    error::{AuthError, Result},
    principal::Principal,
    signature::{SignatureVerifier, Signer},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::{form_urlencoded, Url};

const SIGNATURE_FIELD: &str = "&signature=";

// Origin-form request targets and scopes are resolved against this authority
const PATH_BASE: &str = "http://request.invalid";

/// Unsigned token claims
///
/// Used to render signed token and cookie values. Verification always goes
/// through a codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User the token speaks for
    pub user_id: String,

    /// Expiration timestamp (second precision on the wire)
    pub expires_at: DateTime<Utc>,

    /// Path prefix the token is valid for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Domain the token was issued in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl TokenClaims {
    /// Create claims for `user_id` expiring at `expires_at`
    pub fn new(user_id: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            expires_at,
            scope: None,
            domain: None,
        }
    }

    /// Restrict to a path prefix
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Record the issuing domain
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Render the signed wire value
    pub fn sign(&self, signer: &dyn Signer) -> String {
        let payload = self.payload();
        let signature = signer.sign(payload.as_bytes());

        format!("{}{}{}", payload, SIGNATURE_FIELD, STANDARD.encode(signature))
    }

    fn payload(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.append_pair("userid", &self.user_id);
        serializer.append_pair("expirytime", &self.expires_at.timestamp().to_string());
        if let Some(scope) = &self.scope {
            serializer.append_pair("scope", scope);
        }
        if let Some(domain) = &self.domain {
            serializer.append_pair("domain", domain);
        }
        serializer.finish()
    }

    /// Split, verify and decode a signed wire value
    ///
    /// Errors are reported as [`AuthError::InvalidToken`]; callers that
    /// decode cookies re-label them.
    pub(crate) fn decode_signed(raw: &str, verifier: &dyn SignatureVerifier) -> Result<Self> {
        let raw = raw.trim();
        let (payload, signature) = raw
            .rsplit_once(SIGNATURE_FIELD)
            .ok_or_else(|| AuthError::InvalidToken("missing signature".to_string()))?;

        let signature = STANDARD
            .decode(signature)
            .map_err(|e| AuthError::InvalidToken(format!("bad signature encoding: {}", e)))?;

        verifier
            .verify(payload.as_bytes(), &signature)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Self::decode_payload(payload)
    }

    fn decode_payload(payload: &str) -> Result<Self> {
        let mut user_id = None;
        let mut expiry = None;
        let mut scope = None;
        let mut domain = None;

        for (key, value) in form_urlencoded::parse(payload.as_bytes()) {
            let slot = match key.as_ref() {
                "userid" => &mut user_id,
                "expirytime" => &mut expiry,
                "scope" => &mut scope,
                "domain" => &mut domain,
                other => {
                    return Err(AuthError::InvalidToken(format!(
                        "unknown field '{}'",
                        other
                    )))
                }
            };
            if slot.replace(value.into_owned()).is_some() {
                return Err(AuthError::InvalidToken(format!("duplicate field '{}'", key)));
            }
        }

        let user_id = user_id
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| AuthError::InvalidToken("missing userid".to_string()))?;

        let expiry = expiry.ok_or_else(|| AuthError::InvalidToken("missing expirytime".to_string()))?;
        let seconds: i64 = expiry
            .parse()
            .map_err(|_| AuthError::InvalidToken(format!("bad expirytime '{}'", expiry)))?;
        let expires_at = Utc
            .timestamp_opt(seconds, 0)
            .single()
            .ok_or_else(|| AuthError::InvalidToken(format!("bad expirytime '{}'", expiry)))?;

        Ok(Self {
            user_id,
            expires_at,
            scope,
            domain,
        })
    }

    pub(crate) fn check_expiry(&self, now: DateTime<Utc>, skew: Duration) -> Result<()> {
        let deadline = self
            .expires_at
            .checked_add_signed(skew)
            .ok_or_else(|| AuthError::InvalidToken("expirytime out of range".to_string()))?;
        if deadline < now {
            return Err(AuthError::CredentialExpired(self.expires_at.to_rfc3339()));
        }
        Ok(())
    }
}

/// Validated delegation token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationToken {
    user: Principal,
    expires_at: DateTime<Utc>,
    scope: Option<String>,
    domain: Option<String>,
}

impl DelegationToken {
    /// User the token speaks for
    pub fn user(&self) -> &Principal {
        &self.user
    }

    /// Expiration timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Path prefix the token is valid for (`None` = unrestricted)
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Issuing domain, if recorded
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }
}

/// Parses and validates delegation token header values
#[derive(Clone)]
pub struct DelegationTokenCodec {
    verifier: Arc<dyn SignatureVerifier>,
    clock_skew: Duration,
}

impl DelegationTokenCodec {
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

    /// Parse `raw` for a request to `request_uri`
    pub fn parse(&self, raw: &str, request_uri: &str) -> Result<DelegationToken> {
        self.parse_at(raw, request_uri, Utc::now())
    }

    /// Parse `raw` for a request to `request_uri` as of `now`
    pub fn parse_at(
        &self,
        raw: &str,
        request_uri: &str,
        now: DateTime<Utc>,
    ) -> Result<DelegationToken> {
        let claims = TokenClaims::decode_signed(raw, self.verifier.as_ref())?;
        claims.check_expiry(now, self.clock_skew)?;

        if let Some(scope) = &claims.scope {
            let mismatch = |path: &str| AuthError::ScopeMismatch {
                scope: scope.clone(),
                path: path.to_string(),
            };
            let path = request_path(request_uri).ok_or_else(|| mismatch(request_uri))?;
            if !scope_covers(scope, &path) {
                return Err(mismatch(&path));
            }
        }

        Ok(DelegationToken {
            user: Principal::token(claims.user_id)?,
            expires_at: claims.expires_at,
            scope: claims.scope,
            domain: claims.domain,
        })
    }
}

impl std::fmt::Debug for DelegationTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegationTokenCodec")
            .field("clock_skew", &self.clock_skew)
            .finish_non_exhaustive()
    }
}

/// Normalized path of a request URI, which may be absolute or origin-form
///
/// Dot segments (including percent-encoded ones) are resolved and the result
/// is percent-encoded the way [`Url::path`] renders it. `None` when the URI
/// does not parse.
fn request_path(request_uri: &str) -> Option<String> {
    let url = if request_uri.starts_with('/') {
        Url::parse(&format!("{}{}", PATH_BASE, request_uri))
    } else {
        Url::parse(request_uri)
    };

    url.ok().map(|url| url.path().to_string())
}

/// Scope is a path prefix that must end on a segment boundary
///
/// Both sides are compared in normalized form.
fn scope_covers(scope: &str, path: &str) -> bool {
    if scope.is_empty() {
        return false;
    }
    let Some(scope) = request_path(scope) else {
        return false;
    };
    if scope.ends_with('/') {
        return path.starts_with(&scope);
    }
    match path.strip_prefix(scope.as_str()) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
