//! Provider listing handler for the login page.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::SocialResult;
use crate::router::SocialState;

/// One provider a user can sign in with.
#[derive(Debug, Serialize, ToSchema)]
pub struct AvailableProvider {
    /// Provider name key.
    pub provider: String,
    /// URL that starts the login round-trip.
    pub login_url: String,
}

/// Response for the provider listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct AvailableProvidersResponse {
    pub providers: Vec<AvailableProvider>,
}

/// List the providers that are configured and activated.
#[utoipa::path(
    get,
    path = "/auth/social/providers",
    responses(
        (status = 200, description = "List of available providers", body = AvailableProvidersResponse),
    ),
    tag = "Social Authentication"
)]
pub async fn available_providers(
    State(state): State<SocialState>,
) -> SocialResult<Json<AvailableProvidersResponse>> {
    let mut providers: Vec<AvailableProvider> = state
        .providers
        .kinds()
        .map(|kind| AvailableProvider {
            provider: kind.to_string(),
            login_url: format!("{}/auth/social/login/{kind}", state.base_url),
        })
        .collect();
    providers.sort_by(|a, b| a.provider.cmp(&b.provider));

    Ok(Json(AvailableProvidersResponse { providers }))
}
