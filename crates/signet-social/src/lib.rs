//! Social authentication and identity reconciliation for signet.
//!
//! This crate lets a user authenticate or link their local account to
//! third-party identity providers. Its heart is the reconciliation engine:
//! given a freshly fetched provider profile, it decides whether the profile
//! is an existing user, a returning account, a first-time registration or a
//! conflicting identity, and applies the decision transactionally against
//! the identity store.
//!
//! # Features
//!
//! - **Two provider families**: OAuth2 bearer-token providers (Google,
//!   GitHub) and OAuth1 token+secret providers (Twitter)
//! - **Conflict-safe linking**: account and email evidence is merged into
//!   one user or rejected as a typed conflict, never silently merged
//! - **CSRF protection**: signed JWT state parameter
//! - **Idempotent disconnect**: removing a linkage that is gone is a no-op
//!
//! # Example
//!
//! ```rust,ignore
//! use signet_social::social_router;
//!
//! let app = Router::new()
//!     .nest("/auth/social", social_router().with_state(state));
//! ```

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod providers;
pub mod router;
pub mod services;
pub mod store;

pub use config::{ProviderSettings, SocialConfig};
pub use error::{ProviderKind, SocialError, SocialResult};
pub use router::{
    authenticated_social_router, public_social_router, social_router, EstablishedSession,
    SessionBinder, SocialState,
};
pub use services::reconcile::{
    Conflict, ConflictKind, ReconcileService, RegistrationPolicy, Resolution,
};
