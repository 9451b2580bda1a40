//! Combined authorization/callback handler.
//!
//! One route serves both legs of the round-trip: a request without the
//! provider's callback parameter starts the authorization redirect, a request
//! with it processes the provider's answer in `login` or `connect` mode
//! depending on whether a session user is present.

use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::{info, warn};

use crate::error::{ProviderKind, SocialError};
use crate::extractors::SessionUser;
use crate::providers::CallbackQuery;
use crate::router::{EstablishedSession, SocialState};
use crate::services::reconcile::Resolution;
use crate::store::IdentityStore;

/// Rendered into the connect popup so it refreshes the opener and closes.
const CONNECT_POPUP_SNIPPET: &str =
    "<script>window.opener.location.reload();window.close();</script>";

/// Start or complete a provider login round-trip.
#[utoipa::path(
    get,
    path = "/auth/social/login/{provider}",
    params(
        ("provider" = String, Path, description = "Social provider"),
        ("code" = Option<String>, Query, description = "OAuth2 authorization code"),
        ("oauth_token" = Option<String>, Query, description = "OAuth1 request token"),
        ("state" = Option<String>, Query, description = "Signed state parameter"),
        ("error" = Option<String>, Query, description = "Error code from the provider"),
    ),
    responses(
        (status = 302, description = "Redirect to the provider or back to the app"),
        (status = 200, description = "Connect-mode popup close snippet"),
        (status = 400, description = "Invalid callback"),
    ),
    tag = "Social Authentication"
)]
pub async fn provider_callback(
    State(state): State<SocialState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    session: Option<SessionUser>,
) -> Result<Response, SocialError> {
    let kind: ProviderKind = provider.parse()?;
    let client = state.providers.get(kind)?;

    // Provider-reported denial never reaches the engine.
    if let Some(error) = &query.error {
        warn!(
            provider = %kind,
            error = %error,
            description = ?query.error_description,
            "provider returned an error"
        );
        return Ok(redirect_to_error(&state.frontend_url, error));
    }

    let redirect_uri = callback_uri(&state.base_url, kind);

    if !query.has_callback_param(client.callback_param()) {
        let signed = state
            .state_service
            .create_state(kind, session.map(|s| *s.0.as_uuid()))?;
        let url = client.authorization_url(&signed, &redirect_uri).await?;
        info!(provider = %kind, connect = session.is_some(), "redirecting to provider authorization");
        return Ok(Redirect::temporary(&url).into_response());
    }

    let raw_state = query.state.as_deref().ok_or(SocialError::InvalidState {
        reason: "missing state parameter".to_string(),
    })?;
    let claims = state.state_service.validate_state(raw_state)?;
    if claims.provider != kind.to_string() {
        return Err(SocialError::InvalidState {
            reason: "provider mismatch".to_string(),
        });
    }
    // A connect-mode round-trip must come back to the same session user.
    if let (Some(expected), Some(SessionUser(actual))) = (claims.user_id, session) {
        if expected != *actual.as_uuid() {
            return Err(SocialError::InvalidState {
                reason: "session user mismatch".to_string(),
            });
        }
    }

    let profile = client.fetch_profile(&query, &redirect_uri).await?;
    info!(
        provider = %kind,
        external_id = %profile.external_id,
        "fetched provider profile"
    );

    match session {
        Some(SessionUser(user_id)) => {
            let user = state
                .reconciler
                .store()
                .find_user(*user_id.as_uuid())
                .await
                .map_err(SocialError::from)?
                .ok_or(SocialError::Unauthenticated)?;

            match state.reconciler.connect(&user, kind, &profile).await? {
                Resolution::Resolved(_) => Ok(Html(CONNECT_POPUP_SNIPPET).into_response()),
                Resolution::Conflict(conflict) => {
                    Ok(redirect_to_error(&state.frontend_url, conflict.message_key()))
                }
                _ => Err(SocialError::Internal {
                    message: "connect produced an unexpected resolution".to_string(),
                }),
            }
        }
        None => {
            let resolution = state.reconciler.login(kind, &profile).await?;
            let user = match resolution {
                Resolution::Resolved(user) => user,
                Resolution::NeedsRegistration => state.reconciler.register(kind, &profile).await?,
                Resolution::Disabled(_) => {
                    return Ok(redirect_to_error(&state.frontend_url, "disabled_account"));
                }
                Resolution::Conflict(conflict) => {
                    return Ok(redirect_to_error(
                        &state.frontend_url,
                        conflict.message_key(),
                    ));
                }
            };

            // A freshly registered user is still subject to the status gate.
            if !user.is_activated() {
                info!(user_id = %user.id, "resolved user is not activated; no session established");
                return Ok(redirect_to_error(&state.frontend_url, "disabled_account"));
            }

            let session = state.session_binder.establish_session(&user).await?;
            info!(user_id = %user.id, provider = %kind, "user logged in via provider");
            Ok(redirect_with_session(&state.frontend_url, &session))
        }
    }
}

/// The callback URI registered with the provider for this deployment.
fn callback_uri(base_url: &str, kind: ProviderKind) -> String {
    format!("{base_url}/auth/social/login/{kind}")
}

/// Redirect to the frontend login page with a message key.
fn redirect_to_error(frontend_url: &str, message_key: &str) -> Response {
    let url = format!(
        "{}/login?error={}",
        frontend_url,
        urlencoding::encode(message_key)
    );
    Redirect::temporary(&url).into_response()
}

/// Redirect to the frontend with the session token.
///
/// Uses a URL fragment instead of query params: fragments are not sent to
/// the server, not included in Referrer headers and not access-logged.
fn redirect_with_session(frontend_url: &str, session: &EstablishedSession) -> Response {
    let url = format!(
        "{}/#access_token={}&token_type=Bearer&expires_in={}",
        frontend_url,
        urlencoding::encode(&session.access_token),
        session.expires_in
    );
    Redirect::temporary(&url).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_uri_shape() {
        assert_eq!(
            callback_uri("https://id.example.com", ProviderKind::Twitter),
            "https://id.example.com/auth/social/login/twitter"
        );
    }

    #[test]
    fn test_error_message_key_is_encoded() {
        let response = redirect_to_error("https://app.example.com", "disabled_account");
        let location = response
            .headers()
            .get(axum::http::header::LOCATION)
            .unwrap();
        assert_eq!(
            location,
            "https://app.example.com/login?error=disabled_account"
        );
    }
}
