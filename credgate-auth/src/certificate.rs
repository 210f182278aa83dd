//! Client Certificate Chains
//!
//! Wraps the certificates presented during mutual TLS and derives the
//! canonical subject principal. The chain is ordered leaf first, as the
//! transport layer delivers it.

use crate::{
    error::{AuthError, Result},
    principal::Principal,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One presented certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Subject distinguished name as presented
    pub subject: String,

    /// Issuer distinguished name as presented
    pub issuer: String,

    /// End of the validity window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_after: Option<DateTime<Utc>>,

    /// Raw DER encoding, when the transport layer provides it
    #[serde(default, skip_serializing_if = "Option::is_none", with = "der_serde")]
    pub der: Option<Vec<u8>>,
}

impl Certificate {
    /// Create from subject and issuer DNs
    pub fn new(subject: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            issuer: issuer.into(),
            not_after: None,
            der: None,
        }
    }

    /// Set the end of the validity window
    pub fn with_not_after(mut self, not_after: DateTime<Utc>) -> Self {
        self.not_after = Some(not_after);
        self
    }

    /// Attach the DER encoding
    pub fn with_der(mut self, der: Vec<u8>) -> Self {
        self.der = Some(der);
        self
    }

    /// A proxy certificate's subject is its issuer plus one extra CN
    pub fn is_proxy(&self) -> bool {
        let subject = canonical_rdns(&self.subject);
        let issuer = canonical_rdns(&self.issuer);

        subject.len() == issuer.len() + 1
            && subject[0].starts_with("cn=")
            && subject[1..] == issuer[..]
    }
}

/// Ordered, non-empty certificate chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateChain {
    certificates: Vec<Certificate>,
    principal: Principal,
}

impl CertificateChain {
    /// Wrap a presented chain; fails on an empty list or an empty subject
    pub fn new(certificates: Vec<Certificate>) -> Result<Self> {
        let end_entity = certificates
            .iter()
            .find(|cert| !cert.is_proxy())
            .or_else(|| certificates.last())
            .ok_or_else(|| AuthError::InvalidCertificate("empty chain".to_string()))?;

        let dn = canonicalize_dn(&end_entity.subject);
        if dn.is_empty() {
            return Err(AuthError::InvalidCertificate(
                "end entity has no subject".to_string(),
            ));
        }

        let principal = Principal::x500(dn)?;

        Ok(Self {
            certificates,
            principal,
        })
    }

    /// Canonical subject principal of the end entity
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Certificates, leaf first
    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    /// Earliest expiry in the chain
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.certificates.iter().filter_map(|c| c.not_after).min()
    }
}

/// Canonical DN: lowercase RDNs, leaf-most (`cn`) first, comma-joined
///
/// Accepts RFC 2253 style (`CN=a, O=b`) and OpenSSL slash style (`/O=b/CN=a`).
/// Backslash-escaped separators (`CN=Smith\, John`) stay inside their RDN and
/// keep the escape. Multi-valued RDNs (`CN=a+UID=b`) are kept as one unit in
/// the order presented; their attributes are not sorted.
pub fn canonicalize_dn(dn: &str) -> String {
    canonical_rdns(dn).join(",")
}

fn canonical_rdns(dn: &str) -> Vec<String> {
    let dn = dn.trim();
    let (parts, slash_form) = if dn.starts_with('/') {
        (split_unescaped(dn, '/'), true)
    } else {
        (split_unescaped(dn, ','), false)
    };

    let mut rdns: Vec<String> = parts
        .into_iter()
        .map(|rdn| match rdn.split_once('=') {
            Some((attr, value)) => {
                format!("{}={}", attr.trim().to_lowercase(), value.trim().to_lowercase())
            }
            None => rdn.trim().to_lowercase(),
        })
        .filter(|rdn| !rdn.is_empty())
        .collect();

    // Slash form lists the root first
    if slash_form {
        rdns.reverse();
    } else if let (Some(first), Some(last)) = (rdns.first(), rdns.last()) {
        if !first.starts_with("cn=") && last.starts_with("cn=") {
            rdns.reverse();
        }
    }

    rdns
}

/// Split on `separator` unless it is escaped with a backslash
fn split_unescaped(dn: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (idx, c) in dn.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == separator {
            parts.push(&dn[start..idx]);
            start = idx + c.len_utf8();
        }
    }
    parts.push(&dn[start..]);

    parts
}

mod der_serde {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(der: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match der {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Option::<String>::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
