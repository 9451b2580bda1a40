//! Postgres implementation of the identity store contract.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use signet_db::{Account, CreateAccount, CreateEmail, CreateUser, DbError, User, UserEmail};

use super::{IdentityStore, IdentityTx};

/// Identity store backed by a Postgres pool.
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    type Tx = PgIdentityTx;

    async fn begin(&self) -> Result<Self::Tx, DbError> {
        let tx = self.pool.begin().await.map_err(DbError::ConnectionFailed)?;
        Ok(PgIdentityTx { tx })
    }

    async fn find_account(
        &self,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<Account>, DbError> {
        Account::find_by_provider_identity(&self.pool, provider, external_id)
            .await
            .map_err(DbError::from)
    }

    async fn find_email(&self, address: &str) -> Result<Option<UserEmail>, DbError> {
        UserEmail::find_by_address(&self.pool, address)
            .await
            .map_err(DbError::from)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DbError> {
        User::find_by_id(&self.pool, id).await.map_err(DbError::from)
    }

    async fn find_user_by_display_name(&self, name: &str) -> Result<Option<User>, DbError> {
        User::find_by_display_name(&self.pool, name)
            .await
            .map_err(DbError::from)
    }

    async fn find_user_account(
        &self,
        user_id: Uuid,
        provider: &str,
    ) -> Result<Option<Account>, DbError> {
        Account::find_by_user_and_provider(&self.pool, user_id, provider)
            .await
            .map_err(DbError::from)
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool, DbError> {
        Account::delete(&self.pool, id).await.map_err(DbError::from)
    }
}

/// A Postgres transaction participating in one reconciliation write.
///
/// Dropping the handle without committing rolls the transaction back, so an
/// aborted engine call can never leave a half-applied write behind.
pub struct PgIdentityTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl IdentityTx for PgIdentityTx {
    async fn create_user(&mut self, input: CreateUser) -> Result<User, DbError> {
        User::create(&mut *self.tx, input).await.map_err(DbError::from)
    }

    async fn create_account(&mut self, input: CreateAccount) -> Result<Account, DbError> {
        Account::create(&mut *self.tx, input)
            .await
            .map_err(DbError::from)
    }

    async fn create_email(&mut self, input: CreateEmail) -> Result<UserEmail, DbError> {
        UserEmail::create(&mut *self.tx, input)
            .await
            .map_err(DbError::from)
    }

    async fn update_account_tokens(
        &mut self,
        id: Uuid,
        token: &str,
        token_secret: Option<&str>,
    ) -> Result<Account, DbError> {
        Account::update_tokens(&mut *self.tx, id, token, token_secret)
            .await
            .map_err(DbError::from)
    }

    async fn commit(self) -> Result<(), DbError> {
        self.tx.commit().await.map_err(DbError::from)
    }

    async fn rollback(self) -> Result<(), DbError> {
        self.tx.rollback().await.map_err(DbError::from)
    }
}
