//! Social login configuration types.

use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Root social login configuration.
///
/// This is read-only input: the engine itself never touches it.
#[derive(Debug, Clone, Deserialize)]
pub struct SocialConfig {
    /// Base URL this service is reachable at (used to build callback URIs).
    pub base_url: String,

    /// Frontend URL redirects land on after login or on error.
    pub frontend_url: String,

    /// Secret for signing the OAuth state parameter.
    pub state_secret: String,

    /// Group newly registered users are placed in, if any.
    #[serde(default)]
    pub default_group: Option<Uuid>,

    /// Per-provider credentials, keyed by provider name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderSettings>,
}

/// Credentials and activation flag for one provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub activate: bool,
}

impl ProviderSettings {
    /// A provider without a client id can never be activated.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.activate && !self.client_id.is_empty()
    }
}
