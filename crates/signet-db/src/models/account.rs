//! Provider account model: the linkage between a user and one external identity.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use signet_core::AccountId;

/// A provider account linkage.
///
/// `(provider, external_id)` is globally unique: at most one local account
/// exists per external identity.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: String,
    pub external_id: String,
    pub token: String,
    pub token_secret: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new account linkage.
#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub user_id: Uuid,
    pub provider: String,
    pub external_id: String,
    pub token: String,
    pub token_secret: Option<String>,
}

impl Account {
    /// Get the account ID as a typed `AccountId`.
    #[must_use]
    pub fn account_id(&self) -> AccountId {
        AccountId::from_uuid(self.id)
    }

    /// Create a new account linkage.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        input: CreateAccount,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO user_accounts (user_id, provider, external_id, token, token_secret)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            ",
        )
        .bind(input.user_id)
        .bind(&input.provider)
        .bind(&input.external_id)
        .bind(&input.token)
        .bind(&input.token_secret)
        .fetch_one(executor)
        .await
    }

    /// Find an account by its provider identity.
    pub async fn find_by_provider_identity(
        executor: impl PgExecutor<'_>,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM user_accounts
            WHERE provider = $1 AND external_id = $2
            ",
        )
        .bind(provider)
        .bind(external_id)
        .fetch_optional(executor)
        .await
    }

    /// Find a user's account for a given provider.
    pub async fn find_by_user_and_provider(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
        provider: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM user_accounts
            WHERE user_id = $1 AND provider = $2
            ",
        )
        .bind(user_id)
        .bind(provider)
        .fetch_optional(executor)
        .await
    }

    /// Update the stored token material for an account.
    ///
    /// The secret is only touched when the provider returned one.
    pub async fn update_tokens(
        executor: impl PgExecutor<'_>,
        id: Uuid,
        token: &str,
        token_secret: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            UPDATE user_accounts
            SET token = $2,
                token_secret = COALESCE($3, token_secret),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(token)
        .bind(token_secret)
        .fetch_one(executor)
        .await
    }

    /// Delete an account linkage.
    pub async fn delete(executor: impl PgExecutor<'_>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_accounts WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
