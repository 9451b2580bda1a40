//! Email address record model.
//!
//! An address belongs to exactly one user and persists independently of any
//! provider linkage.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use signet_core::EmailId;

/// An email address owned by a user. Addresses are unique case-insensitively.
#[derive(Debug, Clone, FromRow)]
pub struct UserEmail {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new email record.
#[derive(Debug, Clone)]
pub struct CreateEmail {
    pub user_id: Uuid,
    pub address: String,
}

impl UserEmail {
    /// Get the email ID as a typed `EmailId`.
    #[must_use]
    pub fn email_id(&self) -> EmailId {
        EmailId::from_uuid(self.id)
    }

    /// Create a new email record.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        input: CreateEmail,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO user_emails (user_id, address)
            VALUES ($1, $2)
            RETURNING *
            ",
        )
        .bind(input.user_id)
        .bind(&input.address)
        .fetch_one(executor)
        .await
    }

    /// Find an email record by address, case-insensitively.
    pub async fn find_by_address(
        executor: impl PgExecutor<'_>,
        address: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM user_emails
            WHERE LOWER(address) = LOWER($1)
            ",
        )
        .bind(address)
        .fetch_optional(executor)
        .await
    }
}
