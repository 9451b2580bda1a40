//! Configuration loading for the signet identity provider.
//!
//! Everything comes from environment variables (with `.env` support in the
//! binary). Provider credentials follow the `SIGNET_<PROVIDER>_CLIENT_ID` /
//! `SIGNET_<PROVIDER>_CLIENT_SECRET` convention; a provider is activated
//! exactly when its client id is non-empty.

use std::collections::HashMap;
use std::net::SocketAddr;

use thiserror::Error;
use uuid::Uuid;

use signet_social::{ProviderKind, ProviderSettings, SocialConfig};

/// Configuration errors raised at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {message}")]
    InvalidVar { var: &'static str, message: String },
}

/// Root application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    pub listen_addr: SocketAddr,
    /// Postgres connection string.
    pub database_url: String,
    /// Secret for signing session tokens.
    pub session_secret: String,
    /// Session lifetime in seconds.
    pub session_ttl_secs: i64,
    /// Social login configuration handed to the social router.
    pub social: SocialConfig,
}

impl AppConfig {
    /// Load configuration from the environment, failing fast on anything
    /// missing or malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_addr = optional("SIGNET_LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidVar {
                var: "SIGNET_LISTEN_ADDR",
                message: e.to_string(),
            })?;

        let database_url = required("DATABASE_URL")?;
        let session_secret = required("SIGNET_SESSION_SECRET")?;
        let session_ttl_secs = optional("SIGNET_SESSION_TTL_SECS")
            .map(|v| {
                v.parse::<i64>().map_err(|e| ConfigError::InvalidVar {
                    var: "SIGNET_SESSION_TTL_SECS",
                    message: e.to_string(),
                })
            })
            .transpose()?
            .unwrap_or(3600);

        let base_url =
            optional("SIGNET_BASE_URL").unwrap_or_else(|| "http://localhost:8080".to_string());
        let frontend_url = optional("SIGNET_FRONTEND_URL").unwrap_or_else(|| base_url.clone());
        let state_secret = required("SIGNET_STATE_SECRET")?;

        let default_group = optional("SIGNET_DEFAULT_GROUP")
            .map(|v| {
                v.parse::<Uuid>().map_err(|e| ConfigError::InvalidVar {
                    var: "SIGNET_DEFAULT_GROUP",
                    message: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            listen_addr,
            database_url,
            session_secret,
            session_ttl_secs,
            social: SocialConfig {
                base_url,
                frontend_url,
                state_secret,
                default_group,
                providers: providers_from_env(),
            },
        })
    }
}

/// Assemble provider settings from per-provider environment variables.
fn providers_from_env() -> HashMap<String, ProviderSettings> {
    let mut providers = HashMap::new();
    for kind in ProviderKind::ALL {
        let prefix = format!("SIGNET_{}", kind.as_str().to_uppercase());
        let client_id = optional(&format!("{prefix}_CLIENT_ID")).unwrap_or_default();
        let client_secret = optional(&format!("{prefix}_CLIENT_SECRET")).unwrap_or_default();
        let activate = !client_id.is_empty();
        providers.insert(
            kind.as_str().to_string(),
            ProviderSettings {
                client_id,
                client_secret,
                activate,
            },
        );
    }
    providers
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar(var))
}

fn optional(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}
