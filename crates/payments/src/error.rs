//! Unified error handling for the payments service layer.
//!
//! Every component fails fast and propagates the first error unchanged to
//! its caller; there is no retry, backoff, or circuit breaking in this
//! crate. The embedding application translates `PaymentError` into
//! transport-level responses.

use thiserror::Error;

use homeport_core::{AccountId, UserId};

use crate::db::RepositoryError;
use crate::gateway::GatewayError;
use crate::provider::ProviderError;

/// Service-level error type for the payments crate.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// A required field is missing or empty.
    #[error("invalid input: missing {0}")]
    InvalidInput(&'static str),

    /// A referenced record does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// What kind of record was looked up.
        entity: &'static str,
        /// The identifier that failed to resolve.
        id: String,
    },

    /// The user's profile has no provider account reference.
    #[error("user {0} has no payment account")]
    NoAccount(UserId),

    /// The user already has a provider account; one account per user.
    #[error("user {user_id} already has payment account {account_id}")]
    Conflict {
        user_id: UserId,
        account_id: AccountId,
    },

    /// A card operation needs state that has not been set up yet.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The payment provider call failed.
    #[error("payment provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The booking gateway call failed.
    #[error("booking gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Database operation failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Stored data could not be decoded.
    #[error("data corruption: {0}")]
    Corrupt(String),
}

impl PaymentError {
    /// Build a [`PaymentError::NotFound`] for an entity and its id.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether this error came from an upstream system (provider or
    /// gateway) rather than from this service's own validation or storage.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Gateway(_))
    }
}

/// Result type alias for `PaymentError`.
pub type Result<T> = std::result::Result<T, PaymentError>;
