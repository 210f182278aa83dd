//! Request Snapshot
//!
//! Everything the extractor reads from a request, captured once up front.

use crate::certificate::Certificate;
use actix_web::HttpMessage;
use serde::{Deserialize, Serialize};

/// Header carrying a delegation token
pub const DEFAULT_TOKEN_HEADER: &str = "X-Delegation-Token";

/// Name/value cookie pair as delivered by the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name
    pub name: String,

    /// Cookie value
    pub value: String,
}

impl Cookie {
    /// Create a cookie
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Username authenticated by an upstream layer, stored in request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUser(pub String);

/// Client certificates presented during the TLS handshake, stored in
/// request extensions by the connection layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCertificates(pub Vec<Certificate>);

/// Read-only request inputs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    /// Client certificate chain, leaf first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificates: Option<Vec<Certificate>>,

    /// Delegation token header value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Cookies in delivery order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Vec<Cookie>>,

    /// Username authenticated by the transport layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_user: Option<String>,

    /// Request target (origin-form or absolute)
    #[serde(default)]
    pub request_uri: String,

    /// Server host name the request was addressed to
    #[serde(default)]
    pub server_name: String,
}

impl RequestSnapshot {
    /// Snapshot for `request_uri` on `server_name` with no credentials
    pub fn new(request_uri: impl Into<String>, server_name: impl Into<String>) -> Self {
        Self {
            request_uri: request_uri.into(),
            server_name: server_name.into(),
            ..Default::default()
        }
    }

    /// Set the client certificate chain
    pub fn with_certificates(mut self, certificates: Vec<Certificate>) -> Self {
        self.certificates = Some(certificates);
        self
    }

    /// Set the delegation token header value
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Append a cookie
    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.get_or_insert_with(Vec::new).push(cookie);
        self
    }

    /// Set the transport-authenticated username
    pub fn with_remote_user(mut self, user: impl Into<String>) -> Self {
        self.remote_user = Some(user.into());
        self
    }

    /// Capture an actix-web request
    ///
    /// The certificate chain and remote user are taken from request
    /// extensions ([`ClientCertificates`], [`RemoteUser`]).
    pub fn from_http_request(req: &actix_web::HttpRequest, token_header: &str) -> Self {
        // Non-ASCII bytes still count as a presented token so the codec rejects it
        let token = req
            .headers()
            .get(token_header)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

        let cookies = match req.cookies() {
            Ok(jar) if !jar.is_empty() => Some(
                jar.iter()
                    .map(|c| Cookie::new(c.name(), c.value()))
                    .collect(),
            ),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("Ignoring unparseable Cookie header: {}", e);
                None
            }
        };

        let request_uri = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.path().to_string());

        // connection_info() caches into extensions, so read it before borrowing them
        let server_name = req.connection_info().host().to_string();
        let extensions = req.extensions();

        Self {
            certificates: extensions.get::<ClientCertificates>().map(|c| c.0.clone()),
            token,
            cookies,
            remote_user: extensions.get::<RemoteUser>().map(|u| u.0.clone()),
            request_uri,
            server_name,
        }
    }
}
