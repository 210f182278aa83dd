//! CLI command implementations

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use credgate_auth::{
    cookie::encode_cookie_value, Ed25519Signer, ExtractorConfig, PrincipalExtractor,
    RequestSnapshot, TokenClaims,
};
use std::io::Read;
use tracing::{debug, info};

/// Resolve the principals of a snapshot file against a config file
pub fn execute_inspect(snapshot_path: &str, config_path: &str) -> Result<serde_json::Value> {
    let config = ExtractorConfig::load(config_path)
        .with_context(|| format!("Failed to load config {}", config_path))?;
    let codecs = config.build_codecs()?;

    let content = if snapshot_path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read snapshot from stdin")?;
        buf
    } else {
        std::fs::read_to_string(snapshot_path)
            .with_context(|| format!("Failed to read snapshot {}", snapshot_path))?
    };

    let snapshot: RequestSnapshot =
        serde_json::from_str(&content).context("Failed to parse request snapshot")?;
    debug!("Inspecting request to {}", snapshot.request_uri);

    let extractor = PrincipalExtractor::extract(snapshot, &codecs)?;
    Ok(report(&extractor))
}

/// JSON view of an extractor
pub fn report(extractor: &PrincipalExtractor) -> serde_json::Value {
    let mut principals: Vec<_> = extractor.principals().into_iter().collect();
    principals.sort();

    serde_json::json!({
        "principals": principals,
        "primary_source": extractor.primary_source().map(|s| format!("{:?}", s)),
        "certificate_subject": extractor.certificate_chain().map(|c| c.principal().name().to_string()),
        "token_scope": extractor.delegation_token().and_then(|t| t.scope().map(str::to_string)),
        "sso_domain": extractor.sso_cookie_credential().map(|c| c.domain().to_string()),
    })
}

/// Render a signed token or cookie value
pub fn execute_sign(
    seed_hex: &str,
    user: &str,
    scope: Option<String>,
    domain: Option<String>,
    ttl_secs: i64,
    cookie: bool,
) -> Result<String> {
    let signer = Ed25519Signer::from_seed_hex(seed_hex)?;

    let expires_at = Duration::try_seconds(ttl_secs)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .with_context(|| format!("TTL of {} seconds is out of range", ttl_secs))?;

    let mut claims = TokenClaims::new(user, expires_at);
    claims.scope = scope;
    claims.domain = domain;

    info!("Signing {} for {}", if cookie { "cookie" } else { "token" }, user);
    Ok(if cookie {
        encode_cookie_value(&claims, &signer)
    } else {
        claims.sign(&signer)
    })
}

/// Fresh key pair as (seed hex, public key hex)
pub fn execute_keygen() -> (String, String) {
    let signer = Ed25519Signer::generate();
    (signer.seed_hex(), signer.public_key_hex())
}
