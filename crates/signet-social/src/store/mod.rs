//! Identity store contract required by the reconciliation engine.
//!
//! The engine only ever talks to this trait pair. Reads run on the store
//! itself; every multi-step write runs through an [`IdentityTx`] which the
//! engine pairs with exactly one `commit` or `rollback` on every exit path.

use async_trait::async_trait;
use uuid::Uuid;

use signet_db::{Account, CreateAccount, CreateEmail, CreateUser, DbError, User, UserEmail};

pub mod postgres;

pub use postgres::{PgIdentityStore, PgIdentityTx};

/// Lookups and single-statement operations against the identity store.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// The transaction handle this store hands out.
    type Tx: IdentityTx;

    /// Open a transaction for a multi-step write.
    async fn begin(&self) -> Result<Self::Tx, DbError>;

    /// Look up an account by its provider identity.
    async fn find_account(
        &self,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<Account>, DbError>;

    /// Look up an email record by address (case-insensitive).
    async fn find_email(&self, address: &str) -> Result<Option<UserEmail>, DbError>;

    /// Look up a user by id.
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DbError>;

    /// Look up a user by exact display name.
    async fn find_user_by_display_name(&self, name: &str) -> Result<Option<User>, DbError>;

    /// Look up a user's account for a given provider.
    async fn find_user_account(
        &self,
        user_id: Uuid,
        provider: &str,
    ) -> Result<Option<Account>, DbError>;

    /// Delete an account linkage. Returns whether a row was removed.
    async fn delete_account(&self, id: Uuid) -> Result<bool, DbError>;
}

/// Writes that participate in one atomic unit.
#[async_trait]
pub trait IdentityTx: Send {
    async fn create_user(&mut self, input: CreateUser) -> Result<User, DbError>;

    async fn create_account(&mut self, input: CreateAccount) -> Result<Account, DbError>;

    async fn create_email(&mut self, input: CreateEmail) -> Result<UserEmail, DbError>;

    /// Replace an account's token material. The secret is only touched when
    /// the provider returned one.
    async fn update_account_tokens(
        &mut self,
        id: Uuid,
        token: &str,
        token_secret: Option<&str>,
    ) -> Result<Account, DbError>;

    async fn commit(self) -> Result<(), DbError>;

    async fn rollback(self) -> Result<(), DbError>;
}
