//! Request Principal
//!
//! An identity assertion attributable to a request. Several kinds may be
//! present in one result set; two principals are equal when both kind and
//! name are equal.

use crate::error::{AuthError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use validator::Validate;

/// Set of principals resolved for a single request
pub type PrincipalSet = HashSet<Principal>;

/// Where a principal came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    /// Username authenticated by the transport layer
    Http,

    /// User carried by a signed SSO cookie
    Cookie,

    /// User embedded in a delegation token
    Token,

    /// Canonical subject DN of a client certificate
    X500,
}

impl PrincipalKind {
    /// Short lowercase label used in logs and JSON output
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::Http => "http",
            PrincipalKind::Cookie => "cookie",
            PrincipalKind::Token => "token",
            PrincipalKind::X500 => "x500",
        }
    }
}

/// Identity assertion
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Validate,
)]
pub struct Principal {
    /// Kind tag
    pub kind: PrincipalKind,

    /// Principal name
    ///
    /// Examples: "alice", "cn=alice,ou=people,o=example,c=ca"
    #[validate(length(min = 1, max = 1024))]
    pub name: String,
}

impl Principal {
    /// Create a validated principal
    pub fn new(kind: PrincipalKind, name: impl Into<String>) -> Result<Self> {
        let principal = Self {
            kind,
            name: name.into(),
        };

        principal.validate().map_err(|e| {
            AuthError::InternalError(format!("Invalid {} principal: {}", kind.as_str(), e))
        })?;

        Ok(principal)
    }

    /// Principal for a username authenticated by the transport layer
    pub fn http(name: impl Into<String>) -> Result<Self> {
        Self::new(PrincipalKind::Http, name)
    }

    /// Principal for a user carried by an SSO cookie
    pub fn cookie(name: impl Into<String>) -> Result<Self> {
        Self::new(PrincipalKind::Cookie, name)
    }

    /// Principal for a user embedded in a delegation token
    pub fn token(name: impl Into<String>) -> Result<Self> {
        Self::new(PrincipalKind::Token, name)
    }

    /// Principal for a certificate subject; the DN must already be canonical
    pub fn x500(canonical_dn: impl Into<String>) -> Result<Self> {
        Self::new(PrincipalKind::X500, canonical_dn)
    }

    /// Get the kind tag
    pub fn kind(&self) -> PrincipalKind {
        self.kind
    }

    /// Get the principal name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.name)
    }
}
