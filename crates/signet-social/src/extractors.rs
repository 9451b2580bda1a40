//! Axum extractors for social authentication handlers.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use signet_core::UserId;

use crate::error::SocialError;

/// The authenticated session user, surfaced through request extensions by
/// the session middleware. Handlers that can run with or without a session
/// take `Option<SessionUser>`.
#[derive(Debug, Clone, Copy)]
pub struct SessionUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = SocialError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionUser>()
            .copied()
            .ok_or(SocialError::Unauthenticated)
    }
}
