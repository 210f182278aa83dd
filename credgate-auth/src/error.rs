//! Error types for principal extraction

/// Result type for credgate operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Identity resolution for the request was aborted
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Delegation token is malformed or its signature does not verify
    #[error("Invalid delegation token: {0}")]
    InvalidToken(String),

    /// Delegation token was minted for a different resource
    #[error("Token scope '{scope}' does not cover '{path}'")]
    ScopeMismatch {
        /// Scope embedded in the token
        scope: String,
        /// Path of the request
        path: String,
    },

    /// Credential has expired
    #[error("Credential expired at {0}")]
    CredentialExpired(String),

    /// SSO cookie is malformed or its signature does not verify
    #[error("Invalid SSO cookie: {0}")]
    InvalidCookie(String),

    /// Certificate chain cannot yield a subject
    #[error("Invalid certificate chain: {0}")]
    InvalidCertificate(String),

    /// Cryptographic operation failed
    #[error("Cryptographic error: {0}")]
    CryptoError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// True for the terminal access-denied condition
    pub fn is_access_denied(&self) -> bool {
        matches!(self, AuthError::AccessDenied(_))
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::AccessDenied(_) => 403,
            AuthError::InvalidToken(_) => 401,
            AuthError::ScopeMismatch { .. } => 403,
            AuthError::CredentialExpired(_) => 401,
            AuthError::InvalidCookie(_) => 401,
            AuthError::InvalidCertificate(_) => 400,
            AuthError::CryptoError(_) => 500,
            AuthError::ConfigError(_) => 500,
            AuthError::InternalError(_) => 500,
        }
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError::InternalError(err.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::InternalError(format!("JSON error: {}", err))
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(err: toml::de::Error) -> Self {
        AuthError::ConfigError(err.to_string())
    }
}

impl From<base64::DecodeError> for AuthError {
    fn from(err: base64::DecodeError) -> Self {
        AuthError::InvalidCookie(format!("Bad encoding: {}", err))
    }
}

impl actix_web::ResponseError for AuthError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::from_u16(AuthError::status_code(self))
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        actix_web::HttpResponse::build(actix_web::ResponseError::status_code(self)).json(
            serde_json::json!({
                "error": "access_denied",
                "message": self.to_string(),
            }),
        )
    }
}
