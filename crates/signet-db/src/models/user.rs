//! User entity model.
//!
//! Represents the local principal that provider accounts and email records
//! hang off.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use signet_core::UserId;

/// Account standing of a local user.
///
/// Only `Activated` users may complete a login; every other status resolves
/// but is reported back to the caller instead of establishing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Activated,
    Unactivated,
    Disabled,
}

impl Default for UserStatus {
    fn default() -> Self {
        UserStatus::Activated
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserStatus::Activated => write!(f, "activated"),
            UserStatus::Unactivated => write!(f, "unactivated"),
            UserStatus::Disabled => write!(f, "disabled"),
        }
    }
}

/// A local user account.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    /// Unique identifier for the user.
    pub id: Uuid,

    /// User's display name (globally unique).
    pub display_name: String,

    /// Current account standing.
    pub status: UserStatus,

    /// Group the user was placed in at registration, if any.
    pub group_id: Option<Uuid>,

    /// When the user was created.
    pub created_at: DateTime<Utc>,

    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub display_name: String,
    pub status: UserStatus,
    pub group_id: Option<Uuid>,
}

impl User {
    /// Get the user ID as a typed `UserId`.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        UserId::from_uuid(self.id)
    }

    /// Whether the user may complete a login.
    #[must_use]
    pub fn is_activated(&self) -> bool {
        self.status == UserStatus::Activated
    }

    /// Create a new user.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        input: CreateUser,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO users (display_name, status, group_id)
            VALUES ($1, $2, $3)
            RETURNING *
            ",
        )
        .bind(&input.display_name)
        .bind(input.status)
        .bind(input.group_id)
        .fetch_one(executor)
        .await
    }

    /// Find a user by ID.
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find a user by exact display name.
    pub async fn find_by_display_name(
        executor: impl PgExecutor<'_>,
        display_name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE display_name = $1")
            .bind(display_name)
            .fetch_optional(executor)
            .await
    }
}
