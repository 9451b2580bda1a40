//! Google `OAuth2` provider implementation.

use reqwest::Client;
use serde::Deserialize;

use super::{async_trait, CallbackQuery, Profile, ProviderClient, ProviderToken};
use crate::error::{ProviderKind, SocialError, SocialResult};

/// Google `OAuth2` endpoints.
const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Google token response.
#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

/// Google userinfo response.
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
}

/// Google `OAuth2` provider.
#[derive(Clone)]
pub struct GoogleClient {
    client_id: String,
    client_secret: String,
    http_client: Client,
}

impl GoogleClient {
    #[must_use]
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            http_client: Client::new(),
        }
    }
}

#[async_trait]
impl ProviderClient for GoogleClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    async fn authorization_url(&self, state: &str, redirect_uri: &str) -> SocialResult<String> {
        Ok(format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            AUTHORIZATION_ENDPOINT,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode("openid email profile"),
            urlencoding::encode(state),
        ))
    }

    async fn exchange(
        &self,
        query: &CallbackQuery,
        redirect_uri: &str,
    ) -> SocialResult<ProviderToken> {
        let code = query.code.as_deref().ok_or(SocialError::InvalidCallback {
            reason: "missing authorization code".to_string(),
        })?;

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http_client
            .post(TOKEN_ENDPOINT)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SocialError::TokenExchangeFailed {
                provider: ProviderKind::Google,
                status: status.as_u16(),
            });
        }

        let token_response: GoogleTokenResponse = response.json().await?;
        Ok(ProviderToken {
            token: token_response.access_token,
            token_secret: None,
        })
    }

    async fn profile_from_token(
        &self,
        token: &str,
        _token_secret: Option<&str>,
    ) -> SocialResult<Profile> {
        let response = self
            .http_client
            .get(USERINFO_ENDPOINT)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SocialError::ProfileFetchFailed {
                provider: ProviderKind::Google,
            });
        }

        let user_info: GoogleUserInfo = response.json().await?;
        let display_name = user_info
            .name
            .or_else(|| user_info.email.clone())
            .unwrap_or_else(|| user_info.sub.clone());

        Ok(Profile {
            external_id: user_info.sub,
            email: user_info.email,
            display_name,
            token: token.to_string(),
            token_secret: None,
        })
    }
}
