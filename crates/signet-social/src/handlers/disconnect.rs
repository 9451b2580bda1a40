//! Provider disconnect handler.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use crate::error::{ProviderKind, SocialError};
use crate::extractors::SessionUser;
use crate::router::SocialState;
use crate::store::IdentityStore;

/// Disconnect a provider from the current user.
///
/// Idempotent: disconnecting a provider that is not linked is a no-op.
#[utoipa::path(
    delete,
    path = "/auth/social/disconnect/{provider}",
    params(
        ("provider" = String, Path, description = "Social provider to disconnect"),
    ),
    responses(
        (status = 204, description = "Provider disconnected (or was not linked)"),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearerAuth" = [])),
    tag = "Social Authentication"
)]
pub async fn disconnect_account(
    State(state): State<SocialState>,
    SessionUser(user_id): SessionUser,
    Path(provider): Path<String>,
) -> Result<impl IntoResponse, SocialError> {
    let kind: ProviderKind = provider.parse()?;

    let user = state
        .reconciler
        .store()
        .find_user(*user_id.as_uuid())
        .await
        .map_err(SocialError::from)?
        .ok_or(SocialError::Unauthenticated)?;

    state.reconciler.disconnect(&user, kind).await?;

    info!(user_id = %user.id, provider = %kind, "disconnect handled");

    Ok(StatusCode::NO_CONTENT)
}
