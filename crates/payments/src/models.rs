//! Relational records read and written by the service layer.
//!
//! These are the typed views of the marketplace database that payments
//! cares about. The tables carry many more columns; only the fields the
//! service layer reads or writes appear here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use homeport_core::{
    AccountId, BookingId, ChargeId, CustomerId, Email, ListingId, LocationId, PaymentType,
    ProfileId, UserId,
};

/// A marketplace user, read-only input to checkout metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    /// Full display name, used in charge metadata.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Per-user payment identity record.
///
/// At most one non-null `account_id` and one non-null `customer_id` per
/// user. `account_id` is written only by the account directory,
/// `customer_id` only by the card directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Internal key used for updates.
    pub profile_id: ProfileId,
    pub user_id: UserId,
    /// Provider account reference (payout side).
    pub account_id: Option<AccountId>,
    /// Provider customer reference (paying side).
    pub customer_id: Option<CustomerId>,
}

/// A listing, read during checkout for charge metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    pub location_id: LocationId,
}

/// A listing's location, read during checkout for charge metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub address1: String,
    pub city: String,
}

impl Location {
    /// Street address as rendered into charge metadata.
    #[must_use]
    pub fn display_address(&self) -> String {
        format!("{}, {}", self.address1, self.city)
    }
}

/// A completed-charge ledger row.
///
/// `(booking_id, transaction_id)` is unique; rows are never updated or
/// deleted by this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i32,
    pub booking_id: BookingId,
    /// The provider charge id.
    pub transaction_id: ChargeId,
    pub payer_email: Option<Email>,
    pub payer_id: Option<UserId>,
    pub receiver_email: Option<Email>,
    pub receiver_id: Option<UserId>,
    /// Amount in the currency's standard unit, rounded to 2 places.
    pub total: Decimal,
    pub transaction_fee: Option<Decimal>,
    pub currency: String,
    pub ipn_track_id: Option<String>,
    pub payment_type: PaymentType,
    pub payment_method_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Fields of a ledger row to be inserted.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub booking_id: BookingId,
    pub transaction_id: ChargeId,
    pub payer_email: Option<Email>,
    pub payer_id: Option<UserId>,
    pub receiver_email: Option<Email>,
    pub receiver_id: Option<UserId>,
    pub total: Decimal,
    pub transaction_fee: Option<Decimal>,
    pub currency: String,
    pub ipn_track_id: Option<String>,
    pub payment_type: PaymentType,
    pub payment_method_id: Option<i32>,
}
