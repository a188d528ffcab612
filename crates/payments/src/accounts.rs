//! Provider account directory.
//!
//! Cache-aside wrapper over the profile store and the payment provider for
//! payout accounts. The cache holds the JSON snapshot of the provider
//! account exactly as retrieved; it is populated lazily on the first
//! successful read, deleted when the account is deleted, and never
//! refreshed - staleness is accepted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use homeport_core::{AccountId, UserId};

use crate::cache::{self, Cache};
use crate::db::profiles::ProfileStore;
use crate::error::{PaymentError, Result};
use crate::models::UserProfile;
use crate::provider::{Account, AccountDetails, PaymentProvider};

/// Outcome of a delete, mirroring the provider's confirmation shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteConfirmation {
    /// The deleted account, or `None` when there was nothing to delete.
    pub id: Option<AccountId>,
    pub deleted: bool,
}

/// Cache-aside directory of provider payout accounts.
#[derive(Clone)]
pub struct AccountDirectory {
    cache: Arc<dyn Cache>,
    profiles: Arc<dyn ProfileStore>,
    provider: Arc<dyn PaymentProvider>,
}

impl AccountDirectory {
    /// Create a new directory.
    #[must_use]
    pub fn new(
        cache: Arc<dyn Cache>,
        profiles: Arc<dyn ProfileStore>,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            cache,
            profiles,
            provider,
        }
    }

    /// Get a user's provider account.
    ///
    /// Reads the cache first; a hit returns the cached snapshot verbatim
    /// with no provider call. On a miss the account is retrieved from the
    /// provider and the snapshot written back. Cache failures are logged
    /// and swallowed - the cache is a speed optimization, never a
    /// correctness dependency.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when `user_id` is empty
    /// - `NotFound` when the profile or the provider account is absent
    /// - `NoAccount` when the profile has no account reference
    pub async fn get(&self, user_id: &UserId) -> Result<Account> {
        if user_id.is_empty() {
            return Err(PaymentError::InvalidInput("userId"));
        }

        let key = cache::account_key(user_id);
        if let Some(account) = self.cached_snapshot(&key).await {
            return Ok(account);
        }

        let profile = self.require_profile(user_id).await?;
        let account_id = profile
            .account_id
            .ok_or_else(|| PaymentError::NoAccount(user_id.clone()))?;

        let account = self
            .provider
            .retrieve_account(&account_id)
            .await?
            .ok_or_else(|| PaymentError::not_found("payment account", &account_id))?;

        self.write_snapshot(&key, &account).await;
        Ok(account)
    }

    /// Create a provider account for a user.
    ///
    /// The provider itself allows several accounts per entity; the
    /// one-account-per-user invariant is enforced here. When provider
    /// creation fails the profile is left untouched.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when `user_id` is empty
    /// - `NotFound` when the profile is absent
    /// - `Conflict` when the profile already has an account (no provider
    ///   call is made)
    pub async fn create(&self, user_id: &UserId, details: &AccountDetails) -> Result<Account> {
        if user_id.is_empty() {
            return Err(PaymentError::InvalidInput("userId"));
        }

        let profile = self.require_profile(user_id).await?;
        if let Some(account_id) = profile.account_id {
            return Err(PaymentError::Conflict {
                user_id: user_id.clone(),
                account_id,
            });
        }

        let account = self.provider.create_account(details).await?;

        let claimed = self
            .profiles
            .claim_account_id(profile.profile_id, &account.id)
            .await?;
        if !claimed {
            // A concurrent create won the compare-and-set after our
            // pre-check; the account we just created has no local
            // reference.
            tracing::error!(
                %user_id,
                account_id = %account.id,
                "provider account created but another account was linked concurrently"
            );
            let current = self.require_profile(user_id).await?;
            return Err(PaymentError::Conflict {
                user_id: user_id.clone(),
                account_id: current.account_id.unwrap_or_else(|| account.id.clone()),
            });
        }

        tracing::info!(%user_id, account_id = %account.id, "payment account created");
        self.write_snapshot(&cache::account_key(user_id), &account)
            .await;
        Ok(account)
    }

    /// Delete a user's provider account.
    ///
    /// A profile without an account is a no-op confirmation, with no
    /// provider call. Otherwise the provider delete must succeed before
    /// the profile is cleared, so a provider failure cannot orphan a live
    /// account with no local reference.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when `user_id` is empty
    /// - `NotFound` when the profile is absent
    pub async fn delete(&self, user_id: &UserId) -> Result<DeleteConfirmation> {
        if user_id.is_empty() {
            return Err(PaymentError::InvalidInput("userId"));
        }

        let profile = self.require_profile(user_id).await?;
        let Some(account_id) = profile.account_id else {
            return Ok(DeleteConfirmation {
                id: None,
                deleted: false,
            });
        };

        self.provider.delete_account(&account_id).await?;
        self.profiles.clear_account_id(profile.profile_id).await?;

        let key = cache::account_key(user_id);
        if let Err(err) = self.cache.del(&key).await {
            tracing::warn!(%user_id, error = %err, "account cache delete failed");
        }

        tracing::info!(%user_id, %account_id, "payment account deleted");
        Ok(DeleteConfirmation {
            id: Some(account_id),
            deleted: true,
        })
    }

    async fn require_profile(&self, user_id: &UserId) -> Result<UserProfile> {
        self.profiles
            .profile(user_id)
            .await?
            .ok_or_else(|| PaymentError::not_found("profile", user_id))
    }

    /// Read a cached snapshot. Backend errors and undecodable entries are
    /// both treated as a miss.
    async fn cached_snapshot(&self, key: &str) -> Option<Account> {
        let snapshot = match self.cache.get(key).await {
            Ok(snapshot) => snapshot?,
            Err(err) => {
                tracing::warn!(%key, error = %err, "account cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&snapshot) {
            Ok(account) => Some(account),
            Err(err) => {
                tracing::warn!(%key, error = %err, "undecodable account snapshot, treating as miss");
                None
            }
        }
    }

    /// Best-effort snapshot write; failures are logged, never raised.
    async fn write_snapshot(&self, key: &str, account: &Account) {
        let snapshot = match serde_json::to_string(account) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(%key, error = %err, "failed to serialize account snapshot");
                return;
            }
        };
        if let Err(err) = self.cache.set(key, snapshot).await {
            tracing::warn!(%key, error = %err, "account cache write failed");
        }
    }
}
