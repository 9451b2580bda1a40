//! Account reconciliation: mapping a provider profile onto local identity state.
//!
//! A freshly fetched profile carries two independent pieces of evidence: an
//! account record keyed by `(provider, external_id)` and an email record keyed
//! by address. Each can exist, not exist, or point at a different user. This
//! service merges the two views into one user, backfills whichever record is
//! missing, and reports disagreement as a typed conflict instead of merging
//! two local users.

use std::future::Future;

use tracing::{debug, info};
use uuid::Uuid;

use signet_db::{Account, CreateAccount, CreateEmail, CreateUser, User, UserStatus};

use crate::error::{ProviderKind, SocialError, SocialResult};
use crate::providers::Profile;
use crate::store::{IdentityStore, IdentityTx};

/// Outcome of a reconciliation attempt.
///
/// Conflicts are ordinary values so callers branch on them like any other
/// result; only store faults travel as errors.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The profile maps onto exactly one local user who may log in.
    Resolved(User),
    /// No local identity matched; the caller decides whether to register.
    NeedsRegistration,
    /// The profile resolved, but the user's status forbids logging in.
    Disabled(User),
    /// The profile contradicts existing identity state.
    Conflict(Conflict),
}

/// What kind of disagreement the profile ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Account and email records point at two different local users.
    AmbiguousIdentity,
    /// The provider identity is already linked to another user.
    AccountAlreadyLinked,
    /// The email address is already registered to another user.
    EmailAlreadyRegistered,
}

/// A user-correctable conflict.
///
/// Carries the provider and a message key for rendering. The other party's
/// user id is deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict {
    pub provider: ProviderKind,
    pub kind: ConflictKind,
}

impl Conflict {
    fn new(provider: ProviderKind, kind: ConflictKind) -> Self {
        Self { provider, kind }
    }

    /// Stable key the caller translates into a user-facing message.
    #[must_use]
    pub fn message_key(&self) -> &'static str {
        match self.kind {
            ConflictKind::AmbiguousIdentity => "ambiguous_identity",
            ConflictKind::AccountAlreadyLinked => "account_already_linked",
            ConflictKind::EmailAlreadyRegistered => "email_already_registered",
        }
    }
}

/// Defaults applied when the engine provisions a first-time user.
#[derive(Debug, Clone, Default)]
pub struct RegistrationPolicy {
    /// Group the new user is placed in, if configured.
    pub default_group: Option<Uuid>,
    /// Status the new user starts with.
    pub initial_status: UserStatus,
}

/// The reconciliation engine.
///
/// Generic over the identity store so the same logic runs against Postgres
/// in production and an in-memory store in tests.
pub struct ReconcileService<S> {
    store: S,
    registration: RegistrationPolicy,
}

impl<S: IdentityStore> ReconcileService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            registration: RegistrationPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_registration_policy(mut self, registration: RegistrationPolicy) -> Self {
        self.registration = registration;
        self
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reconcile a profile with no authenticated session.
    ///
    /// A uniqueness violation on create means another reconciliation for the
    /// same identity committed first; state is re-read and resolution retried
    /// exactly once.
    pub async fn login(&self, provider: ProviderKind, profile: &Profile) -> SocialResult<Resolution> {
        match self.try_login(provider, profile).await {
            Err(err) if is_concurrent_create(&err) => {
                debug!(provider = %provider, "create raced with a concurrent reconciliation; retrying once");
                self.try_login(provider, profile).await
            }
            outcome => outcome,
        }
    }

    async fn try_login(&self, provider: ProviderKind, profile: &Profile) -> SocialResult<Resolution> {
        let account = self
            .store
            .find_account(provider.as_str(), &profile.external_id)
            .await?;
        let email = match profile.email.as_deref() {
            Some(address) => self.store.find_email(address).await?,
            None => None,
        };

        let user_id = match (&account, &email) {
            (None, None) => {
                debug!(provider = %provider, "no local identity matches the profile");
                return Ok(Resolution::NeedsRegistration);
            }
            (Some(account), Some(email)) if account.user_id != email.user_id => {
                info!(provider = %provider, "account and email records disagree on the owning user");
                return Ok(Resolution::Conflict(Conflict::new(
                    provider,
                    ConflictKind::AmbiguousIdentity,
                )));
            }
            (Some(account), _) => account.user_id,
            (None, Some(email)) => email.user_id,
        };

        let missing_account = account.is_none();
        let missing_email = email.is_none() && profile.email.is_some();
        let stale_tokens = account
            .as_ref()
            .is_some_and(|existing| tokens_differ(existing, profile));

        // Nothing to write means no transaction: a repeat login with an
        // unchanged token touches the store read-only.
        if missing_account || missing_email || stale_tokens {
            let mut tx = self.store.begin().await?;
            let applied: SocialResult<()> = async {
                if missing_account {
                    tx.create_account(account_data(user_id, provider, profile))
                        .await?;
                }
                if missing_email {
                    if let Some(address) = &profile.email {
                        tx.create_email(CreateEmail {
                            user_id,
                            address: address.clone(),
                        })
                        .await?;
                    }
                }
                if stale_tokens {
                    if let Some(existing) = &account {
                        tx.update_account_tokens(
                            existing.id,
                            &profile.token,
                            profile.token_secret.as_deref(),
                        )
                        .await?;
                    }
                }
                Ok(())
            }
            .await;
            match applied {
                Ok(()) => tx.commit().await?,
                Err(err) => {
                    tx.rollback().await?;
                    return Err(err);
                }
            }
            info!(provider = %provider, user_id = %user_id, "reconciled provider identity");
        }

        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| SocialError::Internal {
                message: format!("user {user_id} vanished during reconciliation"),
            })?;
        Ok(resolve_status(user))
    }

    /// Link a provider identity to an already-authenticated user.
    ///
    /// Connect only adds records, never mutates an existing linkage: a
    /// same-user account that already exists is idempotent success.
    pub async fn connect(
        &self,
        session_user: &User,
        provider: ProviderKind,
        profile: &Profile,
    ) -> SocialResult<Resolution> {
        match self.try_connect(session_user, provider, profile).await {
            Err(err) if is_concurrent_create(&err) => {
                debug!(provider = %provider, "create raced with a concurrent reconciliation; retrying once");
                self.try_connect(session_user, provider, profile).await
            }
            outcome => outcome,
        }
    }

    async fn try_connect(
        &self,
        session_user: &User,
        provider: ProviderKind,
        profile: &Profile,
    ) -> SocialResult<Resolution> {
        let account = self
            .store
            .find_account(provider.as_str(), &profile.external_id)
            .await?;
        if let Some(existing) = &account {
            if existing.user_id != session_user.id {
                info!(provider = %provider, user_id = %session_user.id, "provider identity is linked to another user");
                return Ok(Resolution::Conflict(Conflict::new(
                    provider,
                    ConflictKind::AccountAlreadyLinked,
                )));
            }
        }

        let email = match profile.email.as_deref() {
            Some(address) => self.store.find_email(address).await?,
            None => None,
        };
        if let Some(existing) = &email {
            if existing.user_id != session_user.id {
                info!(provider = %provider, user_id = %session_user.id, "profile email is registered to another user");
                return Ok(Resolution::Conflict(Conflict::new(
                    provider,
                    ConflictKind::EmailAlreadyRegistered,
                )));
            }
        }

        let missing_account = account.is_none();
        let missing_email = email.is_none() && profile.email.is_some();

        if missing_account || missing_email {
            let mut tx = self.store.begin().await?;
            let applied: SocialResult<()> = async {
                if missing_account {
                    tx.create_account(account_data(session_user.id, provider, profile))
                        .await?;
                }
                if missing_email {
                    if let Some(address) = &profile.email {
                        tx.create_email(CreateEmail {
                            user_id: session_user.id,
                            address: address.clone(),
                        })
                        .await?;
                    }
                }
                Ok(())
            }
            .await;
            match applied {
                Ok(()) => tx.commit().await?,
                Err(err) => {
                    tx.rollback().await?;
                    return Err(err);
                }
            }
            info!(provider = %provider, user_id = %session_user.id, "connected provider to user");
        } else {
            debug!(provider = %provider, user_id = %session_user.id, "provider already connected; nothing to do");
        }

        Ok(Resolution::Resolved(session_user.clone()))
    }

    /// Provision a first-time user for a profile that yielded
    /// [`Resolution::NeedsRegistration`].
    ///
    /// Disambiguates the display name, then creates the user, its account and
    /// (when the profile carries one) its email in a single transaction.
    pub async fn register(&self, provider: ProviderKind, profile: &Profile) -> SocialResult<User> {
        match self.try_register(provider, profile).await {
            Err(err) if is_concurrent_create(&err) => {
                debug!(provider = %provider, "registration raced with a concurrent create; retrying once");
                self.try_register(provider, profile).await
            }
            outcome => outcome,
        }
    }

    async fn try_register(&self, provider: ProviderKind, profile: &Profile) -> SocialResult<User> {
        let store = &self.store;
        let display_name =
            disambiguate_display_name(&profile.display_name, |candidate| async move {
                Ok::<_, SocialError>(store.find_user_by_display_name(&candidate).await?.is_some())
            })
            .await?;
        if display_name != profile.display_name {
            debug!(
                requested = %profile.display_name,
                assigned = %display_name,
                "display name was taken; assigned a suffixed one"
            );
        }

        let mut tx = self.store.begin().await?;
        let created: SocialResult<User> = async {
            let user = tx
                .create_user(CreateUser {
                    display_name,
                    status: self.registration.initial_status,
                    group_id: self.registration.default_group,
                })
                .await?;
            tx.create_account(account_data(user.id, provider, profile))
                .await?;
            if let Some(address) = &profile.email {
                tx.create_email(CreateEmail {
                    user_id: user.id,
                    address: address.clone(),
                })
                .await?;
            }
            Ok(user)
        }
        .await;
        match created {
            Ok(user) => {
                tx.commit().await?;
                info!(user_id = %user.id, provider = %provider, "registered first-time user");
                Ok(user)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        }
    }

    /// Remove a user's linkage to a provider.
    ///
    /// Idempotent: a missing account is a no-op. The associated email record
    /// is never deleted.
    pub async fn disconnect(&self, user: &User, provider: ProviderKind) -> SocialResult<()> {
        match self
            .store
            .find_user_account(user.id, provider.as_str())
            .await?
        {
            Some(account) => {
                self.store.delete_account(account.id).await?;
                info!(user_id = %user.id, provider = %provider, "disconnected provider account");
            }
            None => {
                debug!(user_id = %user.id, provider = %provider, "no account to disconnect");
            }
        }
        Ok(())
    }
}

/// Find a free display name by probing `name`, then `name 0`, `name 1`, ….
///
/// The loop has no fixed bound: it terminates because each iteration either
/// returns or advances the suffix, and only finitely many names are taken.
pub async fn disambiguate_display_name<F, Fut, E>(name: &str, mut taken: F) -> Result<String, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let mut candidate = name.to_string();
    let mut suffix = 0u32;
    loop {
        if !taken(candidate.clone()).await? {
            return Ok(candidate);
        }
        candidate = format!("{name} {suffix}");
        suffix += 1;
    }
}

fn is_concurrent_create(err: &SocialError) -> bool {
    matches!(err, SocialError::Store(db) if db.is_unique_violation())
}

fn resolve_status(user: User) -> Resolution {
    if user.is_activated() {
        Resolution::Resolved(user)
    } else {
        info!(user_id = %user.id, status = %user.status, "resolved user may not log in");
        Resolution::Disabled(user)
    }
}

/// The stored token material is stale when the token changed, or when the
/// profile carries a secret that differs from the stored one.
fn tokens_differ(account: &Account, profile: &Profile) -> bool {
    if account.token != profile.token {
        return true;
    }
    profile
        .token_secret
        .as_deref()
        .is_some_and(|secret| account.token_secret.as_deref() != Some(secret))
}

fn account_data(user_id: Uuid, provider: ProviderKind, profile: &Profile) -> CreateAccount {
    CreateAccount {
        user_id,
        provider: provider.as_str().to_string(),
        external_id: profile.external_id.clone(),
        token: profile.token.clone(),
        token_secret: profile.token_secret.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::convert::Infallible;

    async fn probe(existing: &HashSet<String>, name: &str) -> String {
        disambiguate_display_name(name, |candidate| async move {
            Ok::<_, Infallible>(existing.contains(&candidate))
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_free_name_is_kept() {
        let existing = HashSet::new();
        assert_eq!(probe(&existing, "Alice").await, "Alice");
    }

    #[tokio::test]
    async fn test_taken_name_gets_zero_suffix() {
        let existing: HashSet<String> = ["Alice".to_string()].into_iter().collect();
        assert_eq!(probe(&existing, "Alice").await, "Alice 0");
    }

    #[tokio::test]
    async fn test_suffix_advances_past_taken_names() {
        let existing: HashSet<String> = ["Alice".to_string(), "Alice 0".to_string()]
            .into_iter()
            .collect();
        assert_eq!(probe(&existing, "Alice").await, "Alice 1");
    }

    #[test]
    fn test_conflict_message_keys() {
        let conflict = Conflict::new(ProviderKind::Google, ConflictKind::AmbiguousIdentity);
        assert_eq!(conflict.message_key(), "ambiguous_identity");
        let conflict = Conflict::new(ProviderKind::Github, ConflictKind::AccountAlreadyLinked);
        assert_eq!(conflict.message_key(), "account_already_linked");
        let conflict = Conflict::new(ProviderKind::Twitter, ConflictKind::EmailAlreadyRegistered);
        assert_eq!(conflict.message_key(), "email_already_registered");
    }

    #[test]
    fn test_tokens_differ() {
        let account = Account {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            provider: "twitter".to_string(),
            external_id: "t1".to_string(),
            token: "tok".to_string(),
            token_secret: Some("sec".to_string()),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let mut profile = Profile {
            external_id: "t1".to_string(),
            email: None,
            display_name: "Alice".to_string(),
            token: "tok".to_string(),
            token_secret: Some("sec".to_string()),
        };
        assert!(!tokens_differ(&account, &profile));

        profile.token = "tok2".to_string();
        assert!(tokens_differ(&account, &profile));

        profile.token = "tok".to_string();
        profile.token_secret = Some("sec2".to_string());
        assert!(tokens_differ(&account, &profile));

        // A profile without a secret leaves the stored one alone.
        profile.token_secret = None;
        assert!(!tokens_differ(&account, &profile));
    }
}
