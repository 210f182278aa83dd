//! Principal Extractor
//!
//! Resolves the identity of one request from four credential sources:
//!
//! ```text
//!   remote user ─┐
//!   SSO cookie ──┼─ precedence ─► primary principal (at most one)
//!   token ───────┘
//!   certificate chain ──────────► certificate subject (independent)
//! ```
//!
//! A delegation token header that fails validation aborts the request with
//! [`AuthError::AccessDenied`]. Every other unusable input (an SSO cookie that
//! fails validation, a remote user that is not a valid principal name, a
//! chain without a usable subject) is logged and treated as absent.

use crate::{
    certificate::CertificateChain,
    cookie::{SsoCookieCodec, SsoCookieCredential, DEFAULT_SSO_COOKIE_NAME},
    delegation::{DelegationToken, DelegationTokenCodec},
    error::{AuthError, Result},
    net::base_domain,
    principal::{Principal, PrincipalSet},
    request::{Cookie, RequestSnapshot, DEFAULT_TOKEN_HEADER},
};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Source of the primary identity principal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimarySource {
    /// Username authenticated by the transport layer
    RemoteUser,

    /// SSO cookie
    SsoCookie,

    /// Delegation token
    DelegationToken,
}

/// Trust order for the primary principal, strongest first
pub const PRIMARY_PRECEDENCE: [PrimarySource; 3] = [
    PrimarySource::RemoteUser,
    PrimarySource::SsoCookie,
    PrimarySource::DelegationToken,
];

/// Codecs and names shared by every extraction in a process
#[derive(Debug, Clone)]
pub struct ExtractorCodecs {
    /// Delegation token codec
    pub token: DelegationTokenCodec,

    /// SSO cookie codec
    pub cookie: SsoCookieCodec,

    /// Name of the cookie carrying the SSO session
    pub sso_cookie_name: String,

    /// Header carrying a delegation token
    pub token_header: String,
}

impl ExtractorCodecs {
    /// Codecs with the default cookie and header names
    pub fn new(token: DelegationTokenCodec, cookie: SsoCookieCodec) -> Self {
        Self {
            token,
            cookie,
            sso_cookie_name: DEFAULT_SSO_COOKIE_NAME.to_string(),
            token_header: DEFAULT_TOKEN_HEADER.to_string(),
        }
    }

    /// Override the SSO cookie name
    pub fn with_sso_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.sso_cookie_name = name.into();
        self
    }

    /// Override the token header name
    pub fn with_token_header(mut self, header: impl Into<String>) -> Self {
        self.token_header = header.into();
        self
    }
}

/// Credentials resolved for one request
///
/// Built once by [`PrincipalExtractor::extract`] and never mutated.
#[derive(Debug, Clone)]
pub struct PrincipalExtractor {
    remote_user: Option<Principal>,
    chain: Option<CertificateChain>,
    token: Option<DelegationToken>,
    cookie_principal: Option<Principal>,
    cookie_credential: Option<SsoCookieCredential>,
}

impl PrincipalExtractor {
    /// Resolve all credential sources of `snapshot`
    pub fn extract(snapshot: RequestSnapshot, codecs: &ExtractorCodecs) -> Result<Self> {
        let RequestSnapshot {
            certificates,
            token,
            cookies,
            remote_user,
            request_uri,
            server_name,
        } = snapshot;

        let remote_user = remote_user
            .filter(|u| !u.trim().is_empty())
            .and_then(|u| match Principal::http(u) {
                Ok(principal) => Some(principal),
                Err(e) => {
                    info!("Cannot use remote user. Reason: {}", e);
                    None
                }
            });

        let chain = match certificates {
            Some(certs) if !certs.is_empty() => match CertificateChain::new(certs) {
                Ok(chain) => Some(chain),
                Err(e) => {
                    info!("Cannot use client certificate chain. Reason: {}", e);
                    None
                }
            },
            _ => None,
        };

        let token = match token.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(
                codecs
                    .token
                    .parse(raw, &request_uri)
                    .map_err(|e| {
                        debug!("invalid delegation token for {}: {}", request_uri, e);
                        AuthError::AccessDenied("invalid delegation token".to_string())
                    })?,
            ),
            _ => None,
        };

        let (cookie_principal, cookie_credential) = match cookies {
            Some(cookies) if !cookies.is_empty() => {
                Self::extract_sso_cookie(&cookies, &server_name, codecs)
            }
            _ => (None, None),
        };

        Ok(Self {
            remote_user,
            chain,
            token,
            cookie_principal,
            cookie_credential,
        })
    }

    /// First SSO-named cookie that validates wins; rejected ones are skipped
    fn extract_sso_cookie(
        cookies: &[Cookie],
        server_name: &str,
        codecs: &ExtractorCodecs,
    ) -> (Option<Principal>, Option<SsoCookieCredential>) {
        let candidates = cookies
            .iter()
            .filter(|c| c.name == codecs.sso_cookie_name && !c.value.trim().is_empty());

        for cookie in candidates {
            match codecs.cookie.parse(&cookie.value) {
                Ok(principal) => {
                    let credential = codecs
                        .cookie
                        .credential(&cookie.value, &base_domain(server_name));
                    return (Some(principal), Some(credential));
                }
                Err(e) => info!("Cannot use SSO cookie. Reason: {}", e),
            }
        }

        (None, None)
    }

    fn primary_from(&self, source: PrimarySource) -> Option<&Principal> {
        match source {
            PrimarySource::RemoteUser => self.remote_user.as_ref(),
            PrimarySource::SsoCookie => self.cookie_principal.as_ref(),
            PrimarySource::DelegationToken => self.token.as_ref().map(DelegationToken::user),
        }
    }

    /// Source of the primary principal, if any credential supplies one
    pub fn primary_source(&self) -> Option<PrimarySource> {
        PRIMARY_PRECEDENCE
            .iter()
            .copied()
            .find(|source| self.primary_from(*source).is_some())
    }

    /// Principal chosen by [`PRIMARY_PRECEDENCE`]
    pub fn primary_principal(&self) -> Option<&Principal> {
        PRIMARY_PRECEDENCE.iter().find_map(|source| {
            let principal = self.primary_from(*source)?;
            trace!("primary principal from {:?}", source);
            Some(principal)
        })
    }

    /// All principals for the request; empty means anonymous
    pub fn principals(&self) -> PrincipalSet {
        let mut principals = PrincipalSet::new();

        if let Some(primary) = self.primary_principal() {
            principals.insert(primary.clone());
        }
        if let Some(chain) = &self.chain {
            principals.insert(chain.principal().clone());
        }

        principals
    }

    /// Client certificate chain, if one was presented
    pub fn certificate_chain(&self) -> Option<&CertificateChain> {
        self.chain.as_ref()
    }

    /// Validated delegation token, if one was presented
    pub fn delegation_token(&self) -> Option<&DelegationToken> {
        self.token.as_ref()
    }

    /// SSO cookie credential, if a valid SSO cookie was presented
    pub fn sso_cookie_credential(&self) -> Option<&SsoCookieCredential> {
        self.cookie_credential.as_ref()
    }
}

impl actix_web::FromRequest for PrincipalExtractor {
    type Error = AuthError;
    type Future = std::future::Ready<Result<Self>>;

    fn from_request(req: &actix_web::HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let result = match req.app_data::<actix_web::web::Data<Arc<ExtractorCodecs>>>() {
            Some(codecs) => {
                let snapshot = RequestSnapshot::from_http_request(req, &codecs.token_header);
                Self::extract(snapshot, codecs.get_ref())
            }
            None => Err(AuthError::ConfigError(
                "ExtractorCodecs not registered as app data".to_string(),
            )),
        };

        std::future::ready(result)
    }
}
