//! GitHub `OAuth2` provider implementation.

use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use super::{async_trait, CallbackQuery, Profile, ProviderClient, ProviderToken};
use crate::error::{ProviderKind, SocialError, SocialResult};

/// GitHub `OAuth2` endpoints.
const AUTHORIZATION_ENDPOINT: &str = "https://github.com/login/oauth/authorize";
const TOKEN_ENDPOINT: &str = "https://github.com/login/oauth/access_token";
const USERINFO_ENDPOINT: &str = "https://api.github.com/user";
const USER_EMAILS_ENDPOINT: &str = "https://api.github.com/user/emails";

/// GitHub token response.
#[derive(Debug, Deserialize)]
struct GithubTokenResponse {
    access_token: String,
}

/// GitHub userinfo response.
#[derive(Debug, Deserialize)]
struct GithubUserInfo {
    id: i64,
    login: String,
    name: Option<String>,
    email: Option<String>,
}

/// GitHub email entry (for getting the verified primary address).
#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

/// GitHub `OAuth2` provider.
#[derive(Clone)]
pub struct GithubClient {
    client_id: String,
    client_secret: String,
    http_client: Client,
}

impl GithubClient {
    #[must_use]
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            http_client: Client::new(),
        }
    }

    /// Fetch the primary verified email, falling back to the profile email.
    async fn fetch_primary_email(&self, token: &str) -> SocialResult<Option<String>> {
        let response = self
            .http_client
            .get(USER_EMAILS_ENDPOINT)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "signet")
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(
                status = %response.status(),
                "GitHub emails endpoint failed; falling back to profile email"
            );
            return Ok(None);
        }

        let emails: Vec<GithubEmail> = response.json().await?;
        let primary = emails
            .iter()
            .find(|e| e.primary && e.verified)
            .or_else(|| emails.iter().find(|e| e.verified))
            .map(|e| e.email.clone());
        Ok(primary)
    }
}

#[async_trait]
impl ProviderClient for GithubClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Github
    }

    async fn authorization_url(&self, state: &str, redirect_uri: &str) -> SocialResult<String> {
        Ok(format!(
            "{}?client_id={}&redirect_uri={}&scope={}&state={}",
            AUTHORIZATION_ENDPOINT,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode("read:user user:email"),
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
        ];

        let response = self
            .http_client
            .post(TOKEN_ENDPOINT)
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SocialError::TokenExchangeFailed {
                provider: ProviderKind::Github,
                status: status.as_u16(),
            });
        }

        let token_response: GithubTokenResponse = response.json().await?;
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
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "signet")
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SocialError::ProfileFetchFailed {
                provider: ProviderKind::Github,
            });
        }

        let user_info: GithubUserInfo = response.json().await?;

        // The profile email may be absent when the user keeps it private;
        // the emails endpoint is the authoritative source.
        let email = match self.fetch_primary_email(token).await? {
            Some(email) => Some(email),
            None => user_info.email.clone(),
        };

        let display_name = user_info.name.unwrap_or_else(|| user_info.login.clone());

        Ok(Profile {
            external_id: user_info.id.to_string(),
            email,
            display_name,
            token: token.to_string(),
            token_secret: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_authorization_url() {
        let client = GithubClient::new("client-id".to_string(), "client-secret".to_string());

        let url = client
            .authorization_url("state-token", "https://example.com/callback")
            .await
            .unwrap();

        assert!(url.starts_with(AUTHORIZATION_ENDPOINT));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("state=state-token"));
        assert!(url.contains("scope=read%3Auser%20user%3Aemail"));
    }

    #[tokio::test]
    async fn test_exchange_requires_code() {
        let client = GithubClient::new("client-id".to_string(), "client-secret".to_string());

        let err = client
            .exchange(&CallbackQuery::default(), "https://example.com/callback")
            .await
            .unwrap_err();
        assert!(matches!(err, SocialError::InvalidCallback { .. }));
    }

    #[test]
    fn test_provider_kind() {
        let client = GithubClient::new("id".to_string(), "secret".to_string());
        assert_eq!(client.kind(), ProviderKind::Github);
    }
}
