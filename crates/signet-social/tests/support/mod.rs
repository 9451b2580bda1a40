//! In-memory identity store used by the reconciliation tests.
//!
//! Implements the engine's store contract with real uniqueness enforcement
//! and buffered-until-commit writes, so transactional behavior (rollback,
//! second-committer uniqueness violations) is observable without a database.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use signet_db::{Account, CreateAccount, CreateEmail, CreateUser, DbError, User, UserEmail};
use signet_social::providers::Profile;
use signet_social::store::{IdentityStore, IdentityTx};
use signet_social::ProviderKind;

pub fn profile(external_id: &str, email: Option<&str>, name: &str, token: &str) -> Profile {
    Profile {
        external_id: external_id.to_string(),
        email: email.map(ToOwned::to_owned),
        display_name: name.to_string(),
        token: token.to_string(),
        token_secret: None,
    }
}

pub fn oauth1_profile(
    external_id: &str,
    email: Option<&str>,
    name: &str,
    token: &str,
    secret: &str,
) -> Profile {
    Profile {
        token_secret: Some(secret.to_string()),
        ..profile(external_id, email, name, token)
    }
}

pub const PROVIDER: ProviderKind = ProviderKind::Google;

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    accounts: Vec<Account>,
    emails: Vec<UserEmail>,
    writes: usize,
}

impl Inner {
    fn display_name_taken(&self, name: &str) -> bool {
        self.users.iter().any(|u| u.display_name == name)
    }

    fn account_identity_taken(&self, provider: &str, external_id: &str) -> bool {
        self.accounts
            .iter()
            .any(|a| a.provider == provider && a.external_id == external_id)
    }

    fn user_provider_taken(&self, user_id: Uuid, provider: &str) -> bool {
        self.accounts
            .iter()
            .any(|a| a.user_id == user_id && a.provider == provider)
    }

    fn address_taken(&self, address: &str) -> bool {
        self.emails
            .iter()
            .any(|e| e.address.eq_ignore_ascii_case(address))
    }
}

/// In-memory implementation of the identity store contract.
#[derive(Clone, Default)]
pub struct MemoryIdentityStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn seed_user(&self, display_name: &str, status: signet_db::UserStatus) -> User {
        let user = make_user(display_name, status);
        self.lock().users.push(user.clone());
        user
    }

    pub fn seed_account(
        &self,
        user: &User,
        provider: ProviderKind,
        external_id: &str,
        token: &str,
    ) -> Account {
        let account = make_account(user.id, provider.as_str(), external_id, token, None);
        self.lock().accounts.push(account.clone());
        account
    }

    pub fn seed_email(&self, user: &User, address: &str) -> UserEmail {
        let email = make_email(user.id, address);
        self.lock().emails.push(email.clone());
        email
    }

    /// Commit an email record directly, bypassing any open transaction.
    /// Used to simulate a concurrent reconciliation winning the race.
    pub fn commit_email_directly(&self, user_id: Uuid, address: &str) {
        let mut inner = self.lock();
        inner.emails.push(make_email(user_id, address));
        inner.writes += 1;
    }

    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    pub fn account_count(&self) -> usize {
        self.lock().accounts.len()
    }

    pub fn email_count(&self) -> usize {
        self.lock().emails.len()
    }

    /// Number of committed mutations (creates, updates, deletes).
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    pub fn stored_token(&self, provider: ProviderKind, external_id: &str) -> Option<String> {
        self.lock()
            .accounts
            .iter()
            .find(|a| a.provider == provider.as_str() && a.external_id == external_id)
            .map(|a| a.token.clone())
    }

    pub fn accounts_of(&self, user_id: Uuid) -> usize {
        self.lock()
            .accounts
            .iter()
            .filter(|a| a.user_id == user_id)
            .count()
    }

    pub fn emails_of(&self, user_id: Uuid) -> usize {
        self.lock()
            .emails
            .iter()
            .filter(|e| e.user_id == user_id)
            .count()
    }
}

fn make_user(display_name: &str, status: signet_db::UserStatus) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        display_name: display_name.to_string(),
        status,
        group_id: None,
        created_at: now,
        updated_at: now,
    }
}

fn make_account(
    user_id: Uuid,
    provider: &str,
    external_id: &str,
    token: &str,
    token_secret: Option<&str>,
) -> Account {
    let now = Utc::now();
    Account {
        id: Uuid::new_v4(),
        user_id,
        provider: provider.to_string(),
        external_id: external_id.to_string(),
        token: token.to_string(),
        token_secret: token_secret.map(ToOwned::to_owned),
        created_at: now,
        updated_at: now,
    }
}

fn make_email(user_id: Uuid, address: &str) -> UserEmail {
    UserEmail {
        id: Uuid::new_v4(),
        user_id,
        address: address.to_string(),
        created_at: Utc::now(),
    }
}

enum Pending {
    User(User),
    Account(Account),
    Email(UserEmail),
    TokenUpdate {
        id: Uuid,
        token: String,
        token_secret: Option<String>,
    },
}

/// A buffered transaction over the in-memory store.
pub struct MemoryTx {
    inner: Arc<Mutex<Inner>>,
    pending: Vec<Pending>,
}

impl MemoryTx {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn pending_display_name_taken(&self, name: &str) -> bool {
        self.pending
            .iter()
            .any(|p| matches!(p, Pending::User(u) if u.display_name == name))
    }

    fn pending_account_taken(&self, provider: &str, external_id: &str) -> bool {
        self.pending.iter().any(
            |p| matches!(p, Pending::Account(a) if a.provider == provider && a.external_id == external_id),
        )
    }

    fn pending_address_taken(&self, address: &str) -> bool {
        self.pending
            .iter()
            .any(|p| matches!(p, Pending::Email(e) if e.address.eq_ignore_ascii_case(address)))
    }
}

fn unique_violation(constraint: &str) -> DbError {
    DbError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

#[async_trait::async_trait]
impl IdentityStore for MemoryIdentityStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, DbError> {
        Ok(MemoryTx {
            inner: self.inner.clone(),
            pending: Vec::new(),
        })
    }

    async fn find_account(
        &self,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<Account>, DbError> {
        Ok(self
            .lock()
            .accounts
            .iter()
            .find(|a| a.provider == provider && a.external_id == external_id)
            .cloned())
    }

    async fn find_email(&self, address: &str) -> Result<Option<UserEmail>, DbError> {
        Ok(self
            .lock()
            .emails
            .iter()
            .find(|e| e.address.eq_ignore_ascii_case(address))
            .cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DbError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_display_name(&self, name: &str) -> Result<Option<User>, DbError> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.display_name == name)
            .cloned())
    }

    async fn find_user_account(
        &self,
        user_id: Uuid,
        provider: &str,
    ) -> Result<Option<Account>, DbError> {
        Ok(self
            .lock()
            .accounts
            .iter()
            .find(|a| a.user_id == user_id && a.provider == provider)
            .cloned())
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool, DbError> {
        let mut inner = self.lock();
        let before = inner.accounts.len();
        inner.accounts.retain(|a| a.id != id);
        let removed = inner.accounts.len() != before;
        if removed {
            inner.writes += 1;
        }
        Ok(removed)
    }
}

#[async_trait::async_trait]
impl IdentityTx for MemoryTx {
    async fn create_user(&mut self, input: CreateUser) -> Result<User, DbError> {
        {
            let inner = self.lock();
            if inner.display_name_taken(&input.display_name) {
                return Err(unique_violation("users_display_name_key"));
            }
        }
        if self.pending_display_name_taken(&input.display_name) {
            return Err(unique_violation("users_display_name_key"));
        }
        let mut user = make_user(&input.display_name, input.status);
        user.group_id = input.group_id;
        self.pending.push(Pending::User(user.clone()));
        Ok(user)
    }

    async fn create_account(&mut self, input: CreateAccount) -> Result<Account, DbError> {
        {
            let inner = self.lock();
            if inner.account_identity_taken(&input.provider, &input.external_id) {
                return Err(unique_violation("user_accounts_provider_external_id_key"));
            }
            if inner.user_provider_taken(input.user_id, &input.provider) {
                return Err(unique_violation("user_accounts_user_provider_key"));
            }
        }
        if self.pending_account_taken(&input.provider, &input.external_id) {
            return Err(unique_violation("user_accounts_provider_external_id_key"));
        }
        let account = make_account(
            input.user_id,
            &input.provider,
            &input.external_id,
            &input.token,
            input.token_secret.as_deref(),
        );
        self.pending.push(Pending::Account(account.clone()));
        Ok(account)
    }

    async fn create_email(&mut self, input: CreateEmail) -> Result<UserEmail, DbError> {
        {
            let inner = self.lock();
            if inner.address_taken(&input.address) {
                return Err(unique_violation("user_emails_address_key"));
            }
        }
        if self.pending_address_taken(&input.address) {
            return Err(unique_violation("user_emails_address_key"));
        }
        let email = make_email(input.user_id, &input.address);
        self.pending.push(Pending::Email(email.clone()));
        Ok(email)
    }

    async fn update_account_tokens(
        &mut self,
        id: Uuid,
        token: &str,
        token_secret: Option<&str>,
    ) -> Result<Account, DbError> {
        let updated = {
            let inner = self.lock();
            let existing = inner
                .accounts
                .iter()
                .find(|a| a.id == id)
                .ok_or(DbError::NotFound { resource: "Account" })?;
            let mut updated = existing.clone();
            updated.token = token.to_string();
            if let Some(secret) = token_secret {
                updated.token_secret = Some(secret.to_string());
            }
            updated.updated_at = Utc::now();
            updated
        };
        self.pending.push(Pending::TokenUpdate {
            id,
            token: token.to_string(),
            token_secret: token_secret.map(ToOwned::to_owned),
        });
        Ok(updated)
    }

    async fn commit(self) -> Result<(), DbError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        // Re-check uniqueness against state committed since this transaction
        // opened: the second committer fails, not both.
        for write in &self.pending {
            match write {
                Pending::User(user) => {
                    if inner.display_name_taken(&user.display_name) {
                        return Err(unique_violation("users_display_name_key"));
                    }
                }
                Pending::Account(account) => {
                    if inner.account_identity_taken(&account.provider, &account.external_id) {
                        return Err(unique_violation("user_accounts_provider_external_id_key"));
                    }
                }
                Pending::Email(email) => {
                    if inner.address_taken(&email.address) {
                        return Err(unique_violation("user_emails_address_key"));
                    }
                }
                Pending::TokenUpdate { .. } => {}
            }
        }
        for write in self.pending {
            match write {
                Pending::User(user) => inner.users.push(user),
                Pending::Account(account) => inner.accounts.push(account),
                Pending::Email(email) => inner.emails.push(email),
                Pending::TokenUpdate {
                    id,
                    token,
                    token_secret,
                } => {
                    if let Some(account) = inner.accounts.iter_mut().find(|a| a.id == id) {
                        account.token = token;
                        if let Some(secret) = token_secret {
                            account.token_secret = Some(secret);
                        }
                        account.updated_at = Utc::now();
                    }
                }
            }
            inner.writes += 1;
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), DbError> {
        // Pending writes are simply dropped.
        Ok(())
    }
}

/// Store wrapper that makes the engine lose exactly one create race.
///
/// The first `create_email` fails with a uniqueness violation after the
/// "concurrent" reconciliation commits the same record, exactly what a
/// double-clicked login produces against Postgres.
pub struct RacingStore {
    pub inner: MemoryIdentityStore,
    raced: Arc<AtomicBool>,
}

impl RacingStore {
    pub fn new(inner: MemoryIdentityStore) -> Self {
        Self {
            inner,
            raced: Arc::new(AtomicBool::new(false)),
        }
    }
}

pub struct RacingTx {
    tx: MemoryTx,
    store: MemoryIdentityStore,
    raced: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl IdentityStore for RacingStore {
    type Tx = RacingTx;

    async fn begin(&self) -> Result<RacingTx, DbError> {
        Ok(RacingTx {
            tx: self.inner.begin().await?,
            store: self.inner.clone(),
            raced: self.raced.clone(),
        })
    }

    async fn find_account(
        &self,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<Account>, DbError> {
        self.inner.find_account(provider, external_id).await
    }

    async fn find_email(&self, address: &str) -> Result<Option<UserEmail>, DbError> {
        self.inner.find_email(address).await
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DbError> {
        self.inner.find_user(id).await
    }

    async fn find_user_by_display_name(&self, name: &str) -> Result<Option<User>, DbError> {
        self.inner.find_user_by_display_name(name).await
    }

    async fn find_user_account(
        &self,
        user_id: Uuid,
        provider: &str,
    ) -> Result<Option<Account>, DbError> {
        self.inner.find_user_account(user_id, provider).await
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool, DbError> {
        self.inner.delete_account(id).await
    }
}

#[async_trait::async_trait]
impl IdentityTx for RacingTx {
    async fn create_user(&mut self, input: CreateUser) -> Result<User, DbError> {
        self.tx.create_user(input).await
    }

    async fn create_account(&mut self, input: CreateAccount) -> Result<Account, DbError> {
        self.tx.create_account(input).await
    }

    async fn create_email(&mut self, input: CreateEmail) -> Result<UserEmail, DbError> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            self.store.commit_email_directly(input.user_id, &input.address);
            return Err(unique_violation("user_emails_address_key"));
        }
        self.tx.create_email(input).await
    }

    async fn update_account_tokens(
        &mut self,
        id: Uuid,
        token: &str,
        token_secret: Option<&str>,
    ) -> Result<Account, DbError> {
        self.tx.update_account_tokens(id, token, token_secret).await
    }

    async fn commit(self) -> Result<(), DbError> {
        self.tx.commit().await
    }

    async fn rollback(self) -> Result<(), DbError> {
        self.tx.rollback().await
    }
}
