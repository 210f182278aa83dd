//! # credgate-auth: request principal extraction
//!
//! Resolves who is making an HTTP request from the credentials the request
//! carries, and hands downstream authorization a set of principals.
//!
//! ## Credential sources
//!
//! - **Remote user**: a username the transport layer already authenticated
//! - **SSO cookie**: a signed, domain-scoped browser session
//! - **Delegation token**: a signed header value bound to a path scope
//! - **Client certificate chain**: the mutual-TLS subject
//!
//! ## Trust policy
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ primary principal (one of, first present wins)           │
//! │   1. remote user                                         │
//! │   2. SSO cookie user                                     │
//! │   3. delegation token user                               │
//! ├──────────────────────────────────────────────────────────┤
//! │ certificate subject (always added when a chain exists)   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! A delegation token that does not verify denies the request. An SSO cookie
//! that does not verify is ignored.

#![warn(missing_docs)]

pub mod certificate;
pub mod config;
pub mod cookie;
pub mod delegation;
pub mod error;
pub mod extractor;
pub mod net;
pub mod principal;
pub mod request;
pub mod signature;

// Re-exports for convenience
pub use certificate::{Certificate, CertificateChain};
pub use config::ExtractorConfig;
pub use cookie::{SsoCookieCodec, SsoCookieCredential, DEFAULT_SSO_COOKIE_NAME};
pub use delegation::{DelegationToken, DelegationTokenCodec, TokenClaims};
pub use error::{AuthError, Result};
pub use extractor::{ExtractorCodecs, PrimarySource, PrincipalExtractor, PRIMARY_PRECEDENCE};
pub use principal::{Principal, PrincipalKind, PrincipalSet};
pub use request::{ClientCertificates, Cookie, RemoteUser, RequestSnapshot, DEFAULT_TOKEN_HEADER};
pub use signature::{Ed25519Signer, Ed25519Verifier, SignatureVerifier, Signer};
