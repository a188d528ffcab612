//! Payment provider API objects and request payloads.
//!
//! The provider owns these objects; we model the fields the service layer
//! reads and keep the remainder in a flattened map so cached snapshots
//! round-trip exactly as retrieved.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use homeport_core::{AccountId, CardId, ChargeId, CustomerId, Email, TokenId};

/// A provider account (the payout-receiving side, i.e. the host).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Remaining provider fields, kept verbatim for snapshotting.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// A provider customer (the paying side, i.e. the guest), holding stored
/// cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    #[serde(default)]
    pub email: Option<String>,
    /// The card charged when no explicit source is given.
    #[serde(default)]
    pub default_source: Option<CardId>,
    #[serde(default)]
    pub sources: SourceList,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// The provider's paginated container for a customer's sources.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceList {
    #[serde(default)]
    pub data: Vec<Card>,
}

/// A stored card attached to a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
    #[serde(default)]
    pub exp_month: Option<u8>,
    #[serde(default)]
    pub exp_year: Option<u16>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// A single-use card token produced from raw card details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// A funds movement against a customer's card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub id: ChargeId,
    /// Amount in integer minor units.
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Terms-of-service acceptance recorded on account creation.
///
/// The entry layer captures these from the inbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TosAcceptance {
    /// Unix timestamp of acceptance.
    pub date: i64,
    /// IP the acceptance came from.
    pub ip: String,
}

/// Input for creating a provider account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountDetails {
    /// Provider account type (e.g. "custom").
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    /// Two-letter country code.
    pub country: Option<String>,
    pub email: Option<Email>,
    pub tos_acceptance: Option<TosAcceptance>,
}

impl AccountDetails {
    /// Flatten into form parameters the provider API expects.
    #[must_use]
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(account_type) = &self.account_type {
            params.push(("type".to_owned(), account_type.clone()));
        }
        if let Some(country) = &self.country {
            params.push(("country".to_owned(), country.clone()));
        }
        if let Some(email) = &self.email {
            params.push(("email".to_owned(), email.as_str().to_owned()));
        }
        if let Some(tos) = &self.tos_acceptance {
            params.push(("tos_acceptance[date]".to_owned(), tos.date.to_string()));
            params.push(("tos_acceptance[ip]".to_owned(), tos.ip.clone()));
        }
        params
    }
}

/// Raw card details as entered by the user.
///
/// All fields are required; the card directory rejects the request before
/// any provider call when one is empty.
#[derive(Debug, Clone, Deserialize)]
pub struct CardDetails {
    pub card_name: String,
    pub card_number: String,
    pub exp_month: String,
    pub exp_year: String,
    pub cvc: String,
}

impl CardDetails {
    /// Flatten into the `card[...]` form parameters of the token endpoint.
    #[must_use]
    pub fn to_form(&self) -> Vec<(String, String)> {
        vec![
            ("card[name]".to_owned(), self.card_name.clone()),
            ("card[number]".to_owned(), self.card_number.clone()),
            ("card[exp_month]".to_owned(), self.exp_month.clone()),
            ("card[exp_year]".to_owned(), self.exp_year.clone()),
            ("card[cvc]".to_owned(), self.cvc.clone()),
        ]
    }
}

/// Input for creating a charge.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    /// Amount in integer minor units.
    pub amount: i64,
    pub currency: String,
    /// The paying customer.
    pub customer: CustomerId,
    /// Explicit funding source; without it the provider would fall back to
    /// the customer's default card.
    pub source: CardId,
    pub description: String,
    /// Descriptive key/value pairs stored on the charge. Ordered so the
    /// encoded request is deterministic.
    pub metadata: BTreeMap<String, String>,
}

impl ChargeRequest {
    /// Flatten into form parameters the charge endpoint expects.
    #[must_use]
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("amount".to_owned(), self.amount.to_string()),
            ("currency".to_owned(), self.currency.clone()),
            ("customer".to_owned(), self.customer.as_str().to_owned()),
            ("source".to_owned(), self.source.as_str().to_owned()),
            ("description".to_owned(), self.description.clone()),
        ];
        for (key, value) in &self.metadata {
            params.push((format!("metadata[{key}]"), value.clone()));
        }
        params
    }
}
