//! Provider clients for the supported identity providers.
//!
//! Two protocol families are abstracted behind one trait: OAuth2-style
//! providers that fetch a profile with a bearer token, and OAuth1-style
//! providers that sign requests with a token plus secret.

pub mod github;
pub mod google;
pub mod oauth1;
pub mod twitter;

pub use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

use crate::config::ProviderSettings;
use crate::error::{ProviderKind, SocialError, SocialResult};

/// The normalized provider identity for one reconciliation attempt.
///
/// Transient: fetched from the provider, handed to the engine, never
/// persisted as-is.
#[derive(Debug, Clone)]
pub struct Profile {
    /// Provider-assigned stable identifier.
    pub external_id: String,
    /// Email address, when the provider shares one.
    pub email: Option<String>,
    /// Display name candidate.
    pub display_name: String,
    /// Access token for the provider identity.
    pub token: String,
    /// Token secret (OAuth1-style providers only).
    pub token_secret: Option<String>,
}

/// Token material returned by a provider exchange.
#[derive(Debug, Clone)]
pub struct ProviderToken {
    pub token: String,
    pub token_secret: Option<String>,
}

/// Query parameters a provider callback may carry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub oauth_token: Option<String>,
    pub oauth_verifier: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackQuery {
    /// Whether the parameter that marks a provider callback is present.
    #[must_use]
    pub fn has_callback_param(&self, param: &str) -> bool {
        match param {
            "code" => self.code.is_some(),
            "oauth_token" => self.oauth_token.is_some(),
            _ => false,
        }
    }
}

/// Trait for provider client implementations.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Which provider this client talks to.
    fn kind(&self) -> ProviderKind;

    /// Query parameter whose presence marks a provider callback.
    fn callback_param(&self) -> &'static str {
        "code"
    }

    /// Build the URL the user is redirected to for authorization.
    ///
    /// Async because the OAuth1 family must obtain a request token first.
    async fn authorization_url(&self, state: &str, redirect_uri: &str) -> SocialResult<String>;

    /// Exchange callback parameters for token material.
    async fn exchange(
        &self,
        query: &CallbackQuery,
        redirect_uri: &str,
    ) -> SocialResult<ProviderToken>;

    /// Fetch the normalized profile for previously obtained token material.
    async fn profile_from_token(
        &self,
        token: &str,
        token_secret: Option<&str>,
    ) -> SocialResult<Profile>;

    /// Exchange the callback and fetch the profile in one step.
    async fn fetch_profile(
        &self,
        query: &CallbackQuery,
        redirect_uri: &str,
    ) -> SocialResult<Profile> {
        let tokens = self.exchange(query, redirect_uri).await?;
        self.profile_from_token(&tokens.token, tokens.token_secret.as_deref())
            .await
    }
}

/// Name-keyed lookup table over the configured provider clients.
pub struct ProviderRegistry {
    clients: HashMap<ProviderKind, Box<dyn ProviderClient>>,
}

impl ProviderRegistry {
    /// Build the registry from configuration.
    ///
    /// Providers that are not activated, or whose names are unknown, are
    /// skipped.
    #[must_use]
    pub fn from_config(providers: &HashMap<String, ProviderSettings>) -> Self {
        let mut clients: HashMap<ProviderKind, Box<dyn ProviderClient>> = HashMap::new();
        for (name, settings) in providers {
            if !settings.is_active() {
                continue;
            }
            let Ok(kind) = name.parse::<ProviderKind>() else {
                tracing::warn!(provider = %name, "ignoring unknown provider in configuration");
                continue;
            };
            let client: Box<dyn ProviderClient> = match kind {
                ProviderKind::Google => Box::new(google::GoogleClient::new(
                    settings.client_id.clone(),
                    settings.client_secret.clone(),
                )),
                ProviderKind::Github => Box::new(github::GithubClient::new(
                    settings.client_id.clone(),
                    settings.client_secret.clone(),
                )),
                ProviderKind::Twitter => Box::new(twitter::TwitterClient::new(
                    settings.client_id.clone(),
                    settings.client_secret.clone(),
                )),
            };
            clients.insert(kind, client);
        }
        Self { clients }
    }

    /// Look up the client for a provider.
    pub fn get(&self, kind: ProviderKind) -> SocialResult<&dyn ProviderClient> {
        self.clients
            .get(&kind)
            .map(|client| &**client)
            .ok_or(SocialError::ProviderUnavailable { provider: kind })
    }

    /// Providers with an active client.
    pub fn kinds(&self) -> impl Iterator<Item = ProviderKind> + '_ {
        self.clients.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(client_id: &str, activate: bool) -> ProviderSettings {
        ProviderSettings {
            client_id: client_id.to_string(),
            client_secret: "secret".to_string(),
            activate,
        }
    }

    #[test]
    fn test_registry_skips_inactive_and_unknown_providers() {
        let mut config = HashMap::new();
        config.insert("google".to_string(), settings("google-id", true));
        config.insert("github".to_string(), settings("github-id", false));
        config.insert("myspace".to_string(), settings("myspace-id", true));

        let registry = ProviderRegistry::from_config(&config);

        assert!(registry.get(ProviderKind::Google).is_ok());
        assert!(matches!(
            registry.get(ProviderKind::Github),
            Err(SocialError::ProviderUnavailable { .. })
        ));
        assert_eq!(registry.kinds().count(), 1);
    }

    #[test]
    fn test_callback_param_detection() {
        let query = CallbackQuery {
            code: Some("abc".to_string()),
            ..CallbackQuery::default()
        };
        assert!(query.has_callback_param("code"));
        assert!(!query.has_callback_param("oauth_token"));
    }
}
