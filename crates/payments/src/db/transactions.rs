//! Transaction ledger storage.
//!
//! The `transactions` table has a unique constraint on
//! `(booking_id, transaction_id)`; a duplicate insert surfaces as
//! [`RepositoryError::Conflict`] so the ledger can fall back to the
//! existing row.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use homeport_core::{BookingId, ChargeId, Email, PaymentType, UserId};

use super::RepositoryError;
use crate::models::{NewTransaction, Transaction};

/// Storage for completed-charge ledger rows.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Look up a row by its natural key.
    async fn find(
        &self,
        booking_id: &BookingId,
        transaction_id: &ChargeId,
    ) -> Result<Option<Transaction>, RepositoryError>;

    /// Insert a new row.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] when a row with the same
    /// `(booking_id, transaction_id)` already exists.
    async fn insert(&self, new: &NewTransaction) -> Result<Transaction, RepositoryError>;
}

/// `PostgreSQL` implementation of [`TransactionStore`].
#[derive(Clone)]
pub struct PgTransactionStore {
    pool: PgPool,
}

impl PgTransactionStore {
    /// Create a new store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: i32,
    booking_id: String,
    transaction_id: String,
    payer_email: Option<String>,
    payer_id: Option<String>,
    receiver_email: Option<String>,
    receiver_id: Option<String>,
    total: Decimal,
    transaction_fee: Option<Decimal>,
    currency: String,
    ipn_track_id: Option<String>,
    payment_type: String,
    payment_method_id: Option<i32>,
    created_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_transaction(self) -> Result<Transaction, RepositoryError> {
        let payment_type = PaymentType::from_str(&self.payment_type).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid payment type in database: {e}"))
        })?;
        let parse_email = |value: Option<String>| -> Result<Option<Email>, RepositoryError> {
            value
                .map(|s| {
                    Email::parse(&s).map_err(|e| {
                        RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
                    })
                })
                .transpose()
        };

        Ok(Transaction {
            id: self.id,
            booking_id: BookingId::new(self.booking_id),
            transaction_id: ChargeId::new(self.transaction_id),
            payer_email: parse_email(self.payer_email)?,
            payer_id: self.payer_id.map(UserId::new),
            receiver_email: parse_email(self.receiver_email)?,
            receiver_id: self.receiver_id.map(UserId::new),
            total: self.total,
            transaction_fee: self.transaction_fee,
            currency: self.currency,
            ipn_track_id: self.ipn_track_id,
            payment_type,
            payment_method_id: self.payment_method_id,
            created_at: self.created_at,
        })
    }
}

const COLUMNS: &str = "id, booking_id, transaction_id, payer_email, payer_id, \
                       receiver_email, receiver_id, total, transaction_fee, currency, \
                       ipn_track_id, payment_type, payment_method_id, created_at";

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn find(
        &self,
        booking_id: &BookingId,
        transaction_id: &ChargeId,
    ) -> Result<Option<Transaction>, RepositoryError> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r"
            SELECT {COLUMNS}
            FROM transactions
            WHERE booking_id = $1 AND transaction_id = $2
            "
        ))
        .bind(booking_id.as_str())
        .bind(transaction_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TransactionRow::into_transaction).transpose()
    }

    async fn insert(&self, new: &NewTransaction) -> Result<Transaction, RepositoryError> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r"
            INSERT INTO transactions
                (booking_id, transaction_id, payer_email, payer_id,
                 receiver_email, receiver_id, total, transaction_fee, currency,
                 ipn_track_id, payment_type, payment_method_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {COLUMNS}
            "
        ))
        .bind(new.booking_id.as_str())
        .bind(new.transaction_id.as_str())
        .bind(new.payer_email.as_ref().map(Email::as_str))
        .bind(new.payer_id.as_ref().map(UserId::as_str))
        .bind(new.receiver_email.as_ref().map(Email::as_str))
        .bind(new.receiver_id.as_ref().map(UserId::as_str))
        .bind(new.total)
        .bind(new.transaction_fee)
        .bind(&new.currency)
        .bind(new.ipn_track_id.as_deref())
        .bind(new.payment_type.to_string())
        .bind(new.payment_method_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("ledger row already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        row.into_transaction()
    }
}
