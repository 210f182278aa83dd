//! credgate Gateway Binary
//!
//! HTTP server that reports the principals resolved for each request.

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use anyhow::{Context, Result};
use credgate_auth::{ExtractorConfig, PrincipalExtractor};
use std::sync::Arc;
use tracing::info;

/// Main entry point
#[actix_web::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config_path =
        std::env::var("CREDGATE_CONFIG").unwrap_or_else(|_| "credgate.toml".to_string());
    let bind_addr = std::env::var("CREDGATE_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let config = ExtractorConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path))?;
    let codecs = Arc::new(config.build_codecs()?);

    info!(
        "Starting credgate gateway on http://{} (SSO cookie '{}', token header '{}')",
        bind_addr, codecs.sso_cookie_name, codecs.token_header
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(codecs.clone()))
            .route("/health", web::get().to(health_check))
            .route("/whoami", web::get().to(whoami))
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Principals resolved for the calling request
async fn whoami(extractor: PrincipalExtractor) -> impl Responder {
    let mut principals: Vec<_> = extractor.principals().into_iter().collect();
    principals.sort();

    HttpResponse::Ok().json(serde_json::json!({
        "principals": principals,
        "primary_source": extractor.primary_source().map(|s| format!("{:?}", s)),
        "sso_domain": extractor.sso_cookie_credential().map(|c| c.domain()),
    }))
}
