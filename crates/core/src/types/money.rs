//! Monetary amounts using decimal arithmetic.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A monetary amount with its ISO 4217 currency code.
///
/// Amounts are held in the currency's standard unit (dollars, not cents).
/// Two derived representations exist, and they round differently on purpose:
///
/// - [`Money::minor_units`] - integer minor units (cents) as sent to the
///   payment provider when creating a charge
/// - [`Money::rounded`] - the amount at two decimal places as persisted to
///   the transaction ledger
///
/// Both round midpoints away from zero, so `120.005` becomes `12001` minor
/// units and a ledger total of `120.01`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code (e.g. "USD", "AUD").
    pub currency: String,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    /// The amount in integer minor units (cents).
    ///
    /// Returns `None` when the amount does not fit in an `i64` after
    /// conversion, which no real charge amount does.
    #[must_use]
    pub fn minor_units(&self) -> Option<i64> {
        (self.amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
    }

    /// The amount rounded to two decimal places.
    #[must_use]
    pub fn rounded(&self) -> Decimal {
        self.amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} {}", self.rounded(), self.currency)
    }
}
