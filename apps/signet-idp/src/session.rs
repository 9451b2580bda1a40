//! JWT session binding and the bearer-token middleware.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::Request, http::header, middleware::Next, response::Response};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use signet_core::UserId;
use signet_db::User;
use signet_social::extractors::SessionUser;
use signet_social::{EstablishedSession, SessionBinder, SocialError};

/// Claims carried by a session token.
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    /// User id.
    sub: Uuid,
    /// Display name, for diagnostics only.
    name: String,
    /// Issued at timestamp.
    iat: i64,
    /// Expiration timestamp.
    exp: i64,
}

/// Session binder issuing HS256 session tokens.
pub struct JwtSessionBinder {
    secret: Vec<u8>,
    ttl_secs: i64,
}

impl JwtSessionBinder {
    #[must_use]
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl_secs,
        }
    }

    /// Verify a session token and return the session user id.
    pub fn verify(&self, token: &str) -> Result<Uuid, SocialError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.required_spec_claims.clear();

        let data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &validation,
        )
        .map_err(|_| SocialError::Unauthenticated)?;
        Ok(data.claims.sub)
    }
}

#[async_trait]
impl SessionBinder for JwtSessionBinder {
    async fn establish_session(&self, user: &User) -> Result<EstablishedSession, SocialError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user.id,
            name: user.display_name.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.ttl_secs)).timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )?;

        Ok(EstablishedSession {
            access_token,
            expires_in: self.ttl_secs,
        })
    }
}

/// Middleware that surfaces a valid bearer token as the session user.
///
/// Requests without a (valid) token pass through without one; handlers that
/// require authentication reject them via the `SessionUser` extractor.
pub async fn session_layer(
    binder: Arc<JwtSessionBinder>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if let Some(token) = token {
        if let Ok(user_id) = binder.verify(token) {
            request
                .extensions_mut()
                .insert(SessionUser(UserId::from_uuid(user_id)));
        }
    }

    next.run(request).await
}
