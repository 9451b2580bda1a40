//! Twitter OAuth1 provider implementation.
//!
//! The OAuth1 family signs every request with HMAC-SHA1 and identifies the
//! callback by `oauth_token` instead of `code`. The request-token secret is
//! held in-process between the authorization redirect and the callback; the
//! signed state parameter rides along on the `oauth_callback` URL because
//! OAuth1 has no `state` of its own.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;

use super::oauth1::{authorization_header, form_value, parse_form_body};
use super::{async_trait, CallbackQuery, Profile, ProviderClient, ProviderToken};
use crate::error::{ProviderKind, SocialError, SocialResult};

/// Twitter OAuth1 endpoints.
const REQUEST_TOKEN_ENDPOINT: &str = "https://api.twitter.com/oauth/request_token";
const AUTHENTICATE_ENDPOINT: &str = "https://api.twitter.com/oauth/authenticate";
const ACCESS_TOKEN_ENDPOINT: &str = "https://api.twitter.com/oauth/access_token";
const VERIFY_CREDENTIALS_ENDPOINT: &str =
    "https://api.twitter.com/1.1/account/verify_credentials.json";

/// How long an unconsumed request-token secret is kept.
const REQUEST_SECRET_TTL: Duration = Duration::from_secs(15 * 60);

/// Twitter verify_credentials response.
#[derive(Debug, Deserialize)]
struct TwitterUserInfo {
    id_str: String,
    screen_name: String,
    name: Option<String>,
    email: Option<String>,
}

/// Twitter OAuth1 provider.
pub struct TwitterClient {
    consumer_key: String,
    consumer_secret: String,
    http_client: Client,
    /// Request-token secrets awaiting their callback, keyed by token.
    pending: Mutex<HashMap<String, (String, Instant)>>,
}

impl TwitterClient {
    #[must_use]
    pub fn new(consumer_key: String, consumer_secret: String) -> Self {
        Self {
            consumer_key,
            consumer_secret,
            http_client: Client::new(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, (String, Instant)>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn remember_request_secret(&self, token: String, secret: String) {
        let mut pending = self.pending();
        pending.retain(|_, (_, stored)| stored.elapsed() < REQUEST_SECRET_TTL);
        pending.insert(token, (secret, Instant::now()));
    }

    fn take_request_secret(&self, token: &str) -> Option<String> {
        self.pending().remove(token).map(|(secret, _)| secret)
    }
}

#[async_trait]
impl ProviderClient for TwitterClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Twitter
    }

    fn callback_param(&self) -> &'static str {
        "oauth_token"
    }

    async fn authorization_url(&self, state: &str, redirect_uri: &str) -> SocialResult<String> {
        let callback = format!("{redirect_uri}?state={}", urlencoding::encode(state));
        let header = authorization_header(
            "POST",
            REQUEST_TOKEN_ENDPOINT,
            &[],
            &[
                ("oauth_consumer_key", self.consumer_key.as_str()),
                ("oauth_callback", callback.as_str()),
            ],
            &self.consumer_secret,
            None,
        )?;

        let response = self
            .http_client
            .post(REQUEST_TOKEN_ENDPOINT)
            .header("Authorization", header)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SocialError::TokenExchangeFailed {
                provider: ProviderKind::Twitter,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let pairs = parse_form_body(&body);
        let token = form_value(&pairs, "oauth_token").ok_or(SocialError::InvalidCallback {
            reason: "request token response missing oauth_token".to_string(),
        })?;
        let secret =
            form_value(&pairs, "oauth_token_secret").ok_or(SocialError::InvalidCallback {
                reason: "request token response missing oauth_token_secret".to_string(),
            })?;

        self.remember_request_secret(token.to_string(), secret.to_string());

        Ok(format!(
            "{}?oauth_token={}",
            AUTHENTICATE_ENDPOINT,
            urlencoding::encode(token)
        ))
    }

    async fn exchange(
        &self,
        query: &CallbackQuery,
        _redirect_uri: &str,
    ) -> SocialResult<ProviderToken> {
        let token = query
            .oauth_token
            .as_deref()
            .ok_or(SocialError::InvalidCallback {
                reason: "missing oauth_token".to_string(),
            })?;
        let verifier = query
            .oauth_verifier
            .as_deref()
            .ok_or(SocialError::InvalidCallback {
                reason: "missing oauth_verifier".to_string(),
            })?;
        let request_secret = self.take_request_secret(token).unwrap_or_default();

        let header = authorization_header(
            "POST",
            ACCESS_TOKEN_ENDPOINT,
            &[("oauth_verifier", verifier)],
            &[
                ("oauth_consumer_key", self.consumer_key.as_str()),
                ("oauth_token", token),
            ],
            &self.consumer_secret,
            Some(&request_secret),
        )?;

        let response = self
            .http_client
            .post(ACCESS_TOKEN_ENDPOINT)
            .header("Authorization", header)
            .form(&[("oauth_verifier", verifier)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SocialError::TokenExchangeFailed {
                provider: ProviderKind::Twitter,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let pairs = parse_form_body(&body);
        let access_token = form_value(&pairs, "oauth_token").ok_or(SocialError::InvalidCallback {
            reason: "access token response missing oauth_token".to_string(),
        })?;
        let access_secret =
            form_value(&pairs, "oauth_token_secret").ok_or(SocialError::InvalidCallback {
                reason: "access token response missing oauth_token_secret".to_string(),
            })?;

        Ok(ProviderToken {
            token: access_token.to_string(),
            token_secret: Some(access_secret.to_string()),
        })
    }

    async fn profile_from_token(
        &self,
        token: &str,
        token_secret: Option<&str>,
    ) -> SocialResult<Profile> {
        let query = [("include_email", "true")];
        let header = authorization_header(
            "GET",
            VERIFY_CREDENTIALS_ENDPOINT,
            &query,
            &[
                ("oauth_consumer_key", self.consumer_key.as_str()),
                ("oauth_token", token),
            ],
            &self.consumer_secret,
            token_secret,
        )?;

        let response = self
            .http_client
            .get(VERIFY_CREDENTIALS_ENDPOINT)
            .query(&query)
            .header("Authorization", header)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SocialError::ProfileFetchFailed {
                provider: ProviderKind::Twitter,
            });
        }

        let user_info: TwitterUserInfo = response.json().await?;
        let display_name = user_info
            .name
            .unwrap_or_else(|| user_info.screen_name.clone());

        Ok(Profile {
            external_id: user_info.id_str,
            email: user_info.email,
            display_name,
            token: token.to_string(),
            token_secret: token_secret.map(ToOwned::to_owned),
        })
    }
}
