//! Signed state parameter for the callback round-trip.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ProviderKind, SocialError, SocialResult};

/// State lifetime in minutes.
const STATE_LIFETIME_MINUTES: i64 = 10;

/// State claims stored in a signed JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateClaims {
    /// Random nonce for uniqueness.
    pub nonce: String,
    /// Provider the round-trip was started for.
    pub provider: String,
    /// Session user when the round-trip links a provider to an existing user.
    pub user_id: Option<Uuid>,
    /// Expiration timestamp.
    pub exp: i64,
    /// Issued at timestamp.
    pub iat: i64,
}

/// Service for creating and validating the state parameter.
#[derive(Clone)]
pub struct StateService {
    secret: Vec<u8>,
}

impl StateService {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Create a signed state parameter for a callback round-trip.
    pub fn create_state(
        &self,
        provider: ProviderKind,
        user_id: Option<Uuid>,
    ) -> SocialResult<String> {
        let now = Utc::now();
        let exp = now + Duration::minutes(STATE_LIFETIME_MINUTES);

        let claims = StateClaims {
            nonce: Uuid::new_v4().to_string(),
            provider: provider.to_string(),
            user_id,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )?;

        Ok(token)
    }

    /// Validate and decode a state parameter.
    pub fn validate_state(&self, state: &str) -> SocialResult<StateClaims> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.required_spec_claims.clear();

        let token_data = decode::<StateClaims>(
            state,
            &DecodingKey::from_secret(&self.secret),
            &validation,
        )
        .map_err(|e| SocialError::InvalidState {
            reason: e.to_string(),
        })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> StateService {
        StateService::new("test-secret-key-for-signing-state")
    }

    #[test]
    fn test_create_and_validate_state() {
        let service = test_service();

        let state = service
            .create_state(ProviderKind::Google, None)
            .expect("state should be created");
        let claims = service
            .validate_state(&state)
            .expect("state should validate");

        assert_eq!(claims.provider, "google");
        assert!(claims.user_id.is_none());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_state_carries_connect_user() {
        let service = test_service();
        let user_id = Uuid::new_v4();

        let state = service
            .create_state(ProviderKind::Twitter, Some(user_id))
            .unwrap();
        let claims = service.validate_state(&state).unwrap();

        assert_eq!(claims.user_id, Some(user_id));
    }

    #[test]
    fn test_tampered_state_is_rejected() {
        let service = test_service();
        let state = service.create_state(ProviderKind::Github, None).unwrap();

        let mut tampered = state;
        tampered.push('x');
        assert!(service.validate_state(&tampered).is_err());
    }

    #[test]
    fn test_state_from_other_secret_is_rejected() {
        let service = test_service();
        let other = StateService::new("another-secret-entirely");

        let state = other.create_state(ProviderKind::Google, None).unwrap();
        let err = service.validate_state(&state).unwrap_err();
        assert!(matches!(err, SocialError::InvalidState { .. }));
    }
}
