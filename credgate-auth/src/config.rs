//! Extractor configuration
//!
//! Loaded once at startup; the resulting [`ExtractorCodecs`] are shared by
//! every request.

use crate::{
    cookie::{SsoCookieCodec, DEFAULT_SSO_COOKIE_NAME},
    delegation::DelegationTokenCodec,
    error::{AuthError, Result},
    extractor::ExtractorCodecs,
    request::DEFAULT_TOKEN_HEADER,
    signature::Ed25519Verifier,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use validator::Validate;

/// Environment variable overriding the SSO cookie name
pub const ENV_SSO_COOKIE_NAME: &str = "CREDGATE_SSO_COOKIE_NAME";

/// Environment variable overriding the token header name
pub const ENV_TOKEN_HEADER: &str = "CREDGATE_TOKEN_HEADER";

/// Extractor configuration
///
/// ```toml
/// sso_cookie_name = "CREDGATE_SSO"
/// token_header = "X-Delegation-Token"
/// token_public_key = "<hex ed25519 public key>"
/// cookie_public_key = "<hex ed25519 public key>"
/// clock_skew_secs = 30
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ExtractorConfig {
    /// Name of the cookie carrying the SSO session
    #[serde(default = "ExtractorConfig::default_sso_cookie_name")]
    #[validate(length(min = 1, max = 128))]
    pub sso_cookie_name: String,

    /// Header carrying a delegation token
    #[serde(default = "ExtractorConfig::default_token_header")]
    #[validate(length(min = 1, max = 128))]
    pub token_header: String,

    /// Hex Ed25519 key that signs delegation tokens
    #[validate(length(equal = 64))]
    pub token_public_key: String,

    /// Hex Ed25519 key that signs SSO cookies; defaults to the token key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(equal = 64))]
    pub cookie_public_key: Option<String>,

    /// Seconds a credential may be past its expiry and still be accepted
    #[serde(default)]
    #[validate(range(max = 3600))]
    pub clock_skew_secs: u32,
}

impl ExtractorConfig {
    /// Config with default names that trusts `token_public_key` for both
    /// tokens and cookies
    pub fn new(token_public_key: impl Into<String>) -> Self {
        Self {
            sso_cookie_name: Self::default_sso_cookie_name(),
            token_header: Self::default_token_header(),
            token_public_key: token_public_key.into(),
            cookie_public_key: None,
            clock_skew_secs: 0,
        }
    }

    fn default_sso_cookie_name() -> String {
        DEFAULT_SSO_COOKIE_NAME.to_string()
    }

    fn default_token_header() -> String {
        DEFAULT_TOKEN_HEADER.to_string()
    }

    /// Parse and validate TOML
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ExtractorConfig = toml::from_str(content)?;
        config
            .validate()
            .map_err(|e| AuthError::ConfigError(format!("Invalid config: {}", e)))?;
        Ok(config)
    }

    /// Load from a TOML file, then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AuthError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment)
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup(ENV_SSO_COOKIE_NAME) {
            self.sso_cookie_name = name;
        }
        if let Some(header) = lookup(ENV_TOKEN_HEADER) {
            self.token_header = header;
        }

        self.validate()
            .map_err(|e| AuthError::ConfigError(format!("Invalid config: {}", e)))
    }

    /// Build the shared codecs
    pub fn build_codecs(&self) -> Result<ExtractorCodecs> {
        let skew = chrono::Duration::seconds(i64::from(self.clock_skew_secs));

        let token_verifier = Arc::new(Ed25519Verifier::from_hex(&self.token_public_key)?);
        let cookie_verifier = match &self.cookie_public_key {
            Some(key) => Arc::new(Ed25519Verifier::from_hex(key)?),
            None => token_verifier.clone(),
        };

        Ok(ExtractorCodecs::new(
            DelegationTokenCodec::new(token_verifier).with_clock_skew(skew),
            SsoCookieCodec::new(cookie_verifier).with_clock_skew(skew),
        )
        .with_sso_cookie_name(&self.sso_cookie_name)
        .with_token_header(&self.token_header))
    }
}
