//! Router configuration for the social authentication surface.

use async_trait::async_trait;
use axum::{
    routing::{delete, get},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;

use signet_db::User;

use crate::config::SocialConfig;
use crate::error::SocialError;
use crate::handlers;
use crate::providers::ProviderRegistry;
use crate::services::reconcile::{ReconcileService, RegistrationPolicy};
use crate::services::state::StateService;
use crate::store::PgIdentityStore;

/// Shared state for social authentication handlers.
#[derive(Clone)]
pub struct SocialState {
    /// Base URL for building callback URIs.
    pub base_url: String,
    /// Frontend URL for redirects.
    pub frontend_url: String,
    /// The reconciliation engine over the Postgres identity store.
    pub reconciler: Arc<ReconcileService<PgIdentityStore>>,
    /// Configured provider clients.
    pub providers: Arc<ProviderRegistry>,
    /// Signed state parameter service.
    pub state_service: StateService,
    /// Session binder (interface to the session layer).
    pub session_binder: Arc<dyn SessionBinder>,
}

/// A session established for a resolved user.
#[derive(Debug, Clone)]
pub struct EstablishedSession {
    pub access_token: String,
    pub expires_in: i64,
}

/// Interface to the session layer.
///
/// Lets the social module establish a session for a resolved user without
/// depending on session internals. Invoked only after a login-mode
/// reconciliation yields an activated user.
#[async_trait]
pub trait SessionBinder: Send + Sync {
    async fn establish_session(&self, user: &User) -> Result<EstablishedSession, SocialError>;
}

impl SocialState {
    /// Create the social state from configuration.
    #[must_use]
    pub fn new(config: &SocialConfig, pool: PgPool, session_binder: Arc<dyn SessionBinder>) -> Self {
        let store = PgIdentityStore::new(pool);
        let reconciler =
            ReconcileService::new(store).with_registration_policy(RegistrationPolicy {
                default_group: config.default_group,
                ..RegistrationPolicy::default()
            });

        Self {
            base_url: config.base_url.clone(),
            frontend_url: config.frontend_url.clone(),
            reconciler: Arc::new(reconciler),
            providers: Arc::new(ProviderRegistry::from_config(&config.providers)),
            state_service: StateService::new(&config.state_secret),
            session_binder,
        }
    }
}

/// Create the public social authentication router.
///
/// One route serves both legs of the provider round-trip; the provider list
/// feeds the login page.
pub fn public_social_router() -> Router<SocialState> {
    Router::new()
        .route("/providers", get(handlers::available_providers))
        .route("/login/:provider", get(handlers::provider_callback))
}

/// Create the authenticated social router.
///
/// These routes require the session middleware to have put a session user
/// into request extensions.
pub fn authenticated_social_router() -> Router<SocialState> {
    Router::new().route("/disconnect/:provider", delete(handlers::disconnect_account))
}

/// Create the complete social router.
///
/// Typically mounted at `/auth/social`.
pub fn social_router() -> Router<SocialState> {
    Router::new()
        .merge(public_social_router())
        .merge(authenticated_social_router())
}
