//! Process-wide composition root.
//!
//! The cache, provider client, gateway client, and repositories are
//! constructed once at startup and shared across overlapping invocations;
//! after construction they are read-only configuration. Request handlers
//! clone [`PaymentsState`] cheaply and call one directory operation or the
//! checkout orchestrator per invocation.

use std::sync::Arc;

use sqlx::PgPool;

use crate::accounts::AccountDirectory;
use crate::cache::MemoryCache;
use crate::cards::CardDirectory;
use crate::checkout::CheckoutOrchestrator;
use crate::config::PaymentsConfig;
use crate::db::profiles::PgStore;
use crate::db::transactions::PgTransactionStore;
use crate::gateway::BookingClient;
use crate::ledger::TransactionLedger;
use crate::provider::{ProviderError, StripeClient};

/// Shared service state.
///
/// Cheaply cloneable via `Arc`; create one per process.
#[derive(Clone)]
pub struct PaymentsState {
    inner: Arc<PaymentsStateInner>,
}

struct PaymentsStateInner {
    accounts: AccountDirectory,
    cards: CardDirectory,
    ledger: TransactionLedger,
    checkout: CheckoutOrchestrator,
}

impl PaymentsState {
    /// Wire up the service layer from configuration and a database pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider HTTP client fails to build.
    pub fn new(config: &PaymentsConfig, pool: PgPool) -> Result<Self, ProviderError> {
        let cache = Arc::new(MemoryCache::new(config.cache_capacity));
        let provider = Arc::new(StripeClient::new(&config.stripe)?);
        let gateway = Arc::new(BookingClient::new(&config.booking));
        let profiles = Arc::new(PgStore::new(pool.clone()));
        let transactions = Arc::new(PgTransactionStore::new(pool));

        let accounts = AccountDirectory::new(cache, profiles.clone(), provider.clone());
        let cards = CardDirectory::new(profiles.clone(), provider.clone());
        let ledger = TransactionLedger::new(transactions);
        let checkout = CheckoutOrchestrator::new(
            profiles.clone(),
            profiles,
            provider,
            gateway,
            ledger.clone(),
        );

        Ok(Self {
            inner: Arc::new(PaymentsStateInner {
                accounts,
                cards,
                ledger,
                checkout,
            }),
        })
    }

    /// The provider-account directory.
    #[must_use]
    pub fn accounts(&self) -> &AccountDirectory {
        &self.inner.accounts
    }

    /// The customer/card directory.
    #[must_use]
    pub fn cards(&self) -> &CardDirectory {
        &self.inner.cards
    }

    /// The transaction ledger.
    #[must_use]
    pub fn ledger(&self) -> &TransactionLedger {
        &self.inner.ledger
    }

    /// The checkout orchestrator.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutOrchestrator {
        &self.inner.checkout
    }
}
