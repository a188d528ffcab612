//! Idempotent persistence of completed charges.

use std::sync::Arc;

use homeport_core::{BookingId, ChargeId};

use crate::db::RepositoryError;
use crate::db::transactions::TransactionStore;
use crate::error::{PaymentError, Result};
use crate::models::{NewTransaction, Transaction};

/// The durable record of completed charges.
///
/// `record` is keyed on `(booking_id, transaction_id)` and is the system's
/// only concurrency-safety mechanism against duplicate charge
/// notifications: a retried call returns the stored row unchanged instead
/// of creating a second one.
#[derive(Clone)]
pub struct TransactionLedger {
    store: Arc<dyn TransactionStore>,
}

impl TransactionLedger {
    /// Create a ledger over a transaction store.
    #[must_use]
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Record a completed charge, idempotently.
    ///
    /// When a row with the same `(booking_id, transaction_id)` already
    /// exists it is returned unchanged, even if the other fields of
    /// `entry` differ. An insert that loses a race to a concurrent
    /// duplicate re-reads and returns the winner's row.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Repository` when storage fails.
    pub async fn record(&self, entry: NewTransaction) -> Result<Transaction> {
        if let Some(existing) = self
            .store
            .find(&entry.booking_id, &entry.transaction_id)
            .await?
        {
            tracing::debug!(
                booking_id = %existing.booking_id,
                transaction_id = %existing.transaction_id,
                "ledger row already recorded"
            );
            return Ok(existing);
        }

        match self.store.insert(&entry).await {
            Ok(row) => Ok(row),
            Err(RepositoryError::Conflict(_)) => {
                // Lost the insert race; the winner's row is the record.
                self.find(&entry.booking_id, &entry.transaction_id)
                    .await?
                    .ok_or_else(|| {
                        PaymentError::Corrupt(format!(
                            "ledger row for booking {} vanished after conflict",
                            entry.booking_id
                        ))
                    })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a recorded charge.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Repository` when storage fails.
    pub async fn find(
        &self,
        booking_id: &BookingId,
        transaction_id: &ChargeId,
    ) -> Result<Option<Transaction>> {
        Ok(self.store.find(booking_id, transaction_id).await?)
    }
}
