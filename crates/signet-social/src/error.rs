//! Social authentication error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use signet_db::DbError;

/// Provider type enumeration.
///
/// The set of supported providers is closed; a provider is selected by a
/// name lookup, never by open-ended reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Google,
    Github,
    Twitter,
}

impl ProviderKind {
    /// All supported providers.
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Google,
        ProviderKind::Github,
        ProviderKind::Twitter,
    ];

    /// Stable string key used in configuration, routes and the store.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::Github => "github",
            ProviderKind::Twitter => "twitter",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = SocialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(ProviderKind::Google),
            "github" => Ok(ProviderKind::Github),
            "twitter" => Ok(ProviderKind::Twitter),
            _ => Err(SocialError::InvalidProvider {
                provider: s.to_string(),
            }),
        }
    }
}

/// Social authentication errors.
///
/// Business conflicts are NOT errors: they are returned as
/// [`crate::services::reconcile::Resolution`] variants so callers can branch
/// on them without exception handling.
#[derive(Debug, Error)]
pub enum SocialError {
    #[error("provider '{provider}' is not configured or is disabled")]
    ProviderUnavailable { provider: ProviderKind },

    #[error("invalid provider: {provider}")]
    InvalidProvider { provider: String },

    #[error("invalid provider callback: {reason}")]
    InvalidCallback { reason: String },

    #[error("invalid state parameter: {reason}")]
    InvalidState { reason: String },

    #[error("token exchange failed with provider {provider}: HTTP {status}")]
    TokenExchangeFailed { provider: ProviderKind, status: u16 },

    #[error("failed to fetch profile from {provider}")]
    ProfileFetchFailed { provider: ProviderKind },

    #[error("authentication required")]
    Unauthenticated,

    #[error("identity store error: {0}")]
    Store(#[from] DbError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Error response structure for API responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl SocialError {
    /// Get the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            SocialError::ProviderUnavailable { .. } => "provider_unavailable",
            SocialError::InvalidProvider { .. } => "invalid_provider",
            SocialError::InvalidCallback { .. } => "invalid_callback",
            SocialError::InvalidState { .. } => "invalid_state",
            SocialError::TokenExchangeFailed { .. } => "token_exchange_failed",
            SocialError::ProfileFetchFailed { .. } => "profile_fetch_failed",
            SocialError::Unauthenticated => "unauthenticated",
            SocialError::Store(_) => "store_error",
            SocialError::Http(_) => "http_error",
            SocialError::Jwt(_) => "jwt_error",
            SocialError::Internal { .. } => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            SocialError::ProviderUnavailable { .. } => StatusCode::FORBIDDEN,
            SocialError::InvalidProvider { .. } => StatusCode::BAD_REQUEST,
            SocialError::InvalidCallback { .. } => StatusCode::BAD_REQUEST,
            SocialError::InvalidState { .. } => StatusCode::BAD_REQUEST,
            SocialError::TokenExchangeFailed { .. } => StatusCode::BAD_GATEWAY,
            SocialError::ProfileFetchFailed { .. } => StatusCode::BAD_GATEWAY,
            SocialError::Unauthenticated => StatusCode::UNAUTHORIZED,
            SocialError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SocialError::Http(_) => StatusCode::BAD_GATEWAY,
            SocialError::Jwt(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SocialError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SocialError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal detail never reaches the response body; it is logged here.
        let message = match &self {
            SocialError::Store(e) => {
                tracing::error!("social store error: {:?}", e);
                "An identity store error occurred".to_string()
            }
            SocialError::Http(e) => {
                tracing::error!("social HTTP error: {:?}", e);
                "An HTTP client error occurred".to_string()
            }
            SocialError::Jwt(e) => {
                tracing::error!("social JWT error: {:?}", e);
                "A token processing error occurred".to_string()
            }
            SocialError::Internal { message } => {
                tracing::error!("social internal error: {}", message);
                "An internal error occurred".to_string()
            }
            SocialError::InvalidCallback { .. } => "Invalid provider callback".to_string(),
            SocialError::InvalidState { reason } => {
                tracing::warn!("invalid callback state: {}", reason);
                "Invalid or expired state parameter".to_string()
            }
            SocialError::TokenExchangeFailed { provider, status } => {
                tracing::warn!(provider = %provider, status = %status, "token exchange failed");
                format!("Token exchange failed with {provider}")
            }
            _ => self.to_string(),
        };
        let body = ErrorResponse {
            error: self.error_code().to_string(),
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Result type alias for social operations.
pub type SocialResult<T> = Result<T, SocialError>;
