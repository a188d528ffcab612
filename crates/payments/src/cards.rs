//! Customer and stored-card lifecycle.
//!
//! The provider-side customer is created lazily on the first card
//! operation and referenced from the user's profile. Cards are created and
//! removed individually and never cached.

use std::sync::Arc;

use serde::Serialize;

use homeport_core::{CardId, CustomerId, UserId};

use crate::db::profiles::ProfileStore;
use crate::error::{PaymentError, Result};
use crate::models::UserProfile;
use crate::provider::{Card, CardDetails, Customer, PaymentProvider};

/// A user's stored cards, with the provider's default-source marker.
#[derive(Debug, Clone, Serialize)]
pub struct CardList {
    pub default_source: Option<CardId>,
    pub cards: Vec<Card>,
}

/// Directory of provider customers and their stored cards.
#[derive(Clone)]
pub struct CardDirectory {
    profiles: Arc<dyn ProfileStore>,
    provider: Arc<dyn PaymentProvider>,
}

impl CardDirectory {
    /// Create a new directory.
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileStore>, provider: Arc<dyn PaymentProvider>) -> Self {
        Self { profiles, provider }
    }

    /// Get the user's provider customer, creating it on first use.
    ///
    /// Both paths return the provider's `retrieve` shape: after creating a
    /// customer it is retrieved again, so callers see the same view a
    /// later `get` would produce.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when `user_id` is empty
    /// - `NotFound` when the profile, user, or provider customer is absent
    pub async fn get_or_create_customer(&self, user_id: &UserId) -> Result<Customer> {
        if user_id.is_empty() {
            return Err(PaymentError::InvalidInput("userId"));
        }

        let profile = self.require_profile(user_id).await?;
        let customer_id = match profile.customer_id {
            Some(customer_id) => customer_id,
            None => self.create_customer(user_id, &profile).await?,
        };

        self.retrieve_customer(&customer_id).await
    }

    /// Store a new card for the user.
    ///
    /// Tokenizes the raw details, attaches the token as a source to the
    /// user's existing customer, and returns the refreshed customer view.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when `user_id` or any card field is empty (no
    ///   provider call is made)
    /// - `NotFound` when the profile is absent
    /// - `Precondition` when the user has no customer yet
    pub async fn add_card(&self, user_id: &UserId, details: &CardDetails) -> Result<Customer> {
        if user_id.is_empty() {
            return Err(PaymentError::InvalidInput("userId"));
        }
        validate_card_details(details)?;

        let profile = self.require_profile(user_id).await?;
        let customer_id = profile.customer_id.ok_or_else(|| {
            PaymentError::Precondition(format!("user {user_id} has no payment customer"))
        })?;

        let token = self.provider.create_card_token(details).await?;
        let card = self.provider.attach_source(&customer_id, &token.id).await?;
        tracing::info!(%user_id, card_id = %card.id, "card stored");

        self.retrieve_customer(&customer_id).await
    }

    /// Remove a stored card and return the refreshed customer view.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when `user_id` is empty
    /// - `NotFound` when the profile is absent or the user has no customer
    pub async fn remove_card(&self, user_id: &UserId, card_id: &CardId) -> Result<Customer> {
        if user_id.is_empty() {
            return Err(PaymentError::InvalidInput("userId"));
        }

        let customer_id = self.require_customer_id(user_id).await?;
        self.provider.detach_source(&customer_id, card_id).await?;
        tracing::info!(%user_id, %card_id, "card removed");

        self.retrieve_customer(&customer_id).await
    }

    /// List the user's stored cards.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when `user_id` is empty
    /// - `NotFound` when the profile is absent or the user has no customer
    pub async fn cards(&self, user_id: &UserId) -> Result<CardList> {
        if user_id.is_empty() {
            return Err(PaymentError::InvalidInput("userId"));
        }

        let customer_id = self.require_customer_id(user_id).await?;
        let customer = self.retrieve_customer(&customer_id).await?;

        Ok(CardList {
            default_source: customer.default_source,
            cards: customer.sources.data,
        })
    }

    /// Make a stored card the customer's default funding source.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when `user_id` is empty
    /// - `NotFound` when the profile is absent or the user has no customer
    pub async fn set_default_card(&self, user_id: &UserId, card_id: &CardId) -> Result<Customer> {
        if user_id.is_empty() {
            return Err(PaymentError::InvalidInput("userId"));
        }

        let customer_id = self.require_customer_id(user_id).await?;
        let customer = self
            .provider
            .set_default_source(&customer_id, card_id)
            .await?;
        tracing::info!(%user_id, %card_id, "default card updated");
        Ok(customer)
    }

    /// Create the provider customer for a profile that has none and
    /// persist the reference.
    async fn create_customer(
        &self,
        user_id: &UserId,
        profile: &UserProfile,
    ) -> Result<CustomerId> {
        let user = self
            .profiles
            .user(user_id)
            .await?
            .ok_or_else(|| PaymentError::not_found("user", user_id))?;

        let customer = self.provider.create_customer(&user.email).await?;
        self.profiles
            .set_customer_id(profile.profile_id, &customer.id)
            .await?;
        tracing::info!(%user_id, customer_id = %customer.id, "payment customer created");
        Ok(customer.id)
    }

    async fn require_profile(&self, user_id: &UserId) -> Result<UserProfile> {
        self.profiles
            .profile(user_id)
            .await?
            .ok_or_else(|| PaymentError::not_found("profile", user_id))
    }

    async fn require_customer_id(&self, user_id: &UserId) -> Result<CustomerId> {
        let profile = self.require_profile(user_id).await?;
        profile
            .customer_id
            .ok_or_else(|| PaymentError::not_found("customer", user_id))
    }

    async fn retrieve_customer(&self, customer_id: &CustomerId) -> Result<Customer> {
        self.provider
            .retrieve_customer(customer_id)
            .await?
            .ok_or_else(|| PaymentError::not_found("customer", customer_id))
    }
}

/// Reject card details with any empty field before touching the provider.
fn validate_card_details(details: &CardDetails) -> Result<()> {
    if details.card_name.is_empty() {
        return Err(PaymentError::InvalidInput("cardName"));
    }
    if details.card_number.is_empty() {
        return Err(PaymentError::InvalidInput("cardNumber"));
    }
    if details.exp_month.is_empty() {
        return Err(PaymentError::InvalidInput("expMonth"));
    }
    if details.exp_year.is_empty() {
        return Err(PaymentError::InvalidInput("expYear"));
    }
    if details.cvc.is_empty() {
        return Err(PaymentError::InvalidInput("cvc"));
    }
    Ok(())
}
