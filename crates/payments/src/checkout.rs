//! Checkout orchestration.
//!
//! `do_payment` spans three independently-failing systems - the payment
//! provider, the booking gateway, and the local ledger - with no shared
//! transaction. It validates and gathers everything it needs before the
//! first side effect, then performs best-effort sequential calls and
//! surfaces the first failure.
//!
//! The charge is the point of no return: a failure in a later step leaves
//! a successful charge at the provider with no booking update or ledger
//! row. That inconsistency window is deliberate - this layer does not
//! reverse charges; the charge id is logged so callers can reconcile
//! against the provider.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use homeport_core::{BookingId, BookingState, CardId, ChargeId, CustomerId, Money, PaymentType, UserId};

use crate::db::profiles::{ListingStore, ProfileStore};
use crate::error::{PaymentError, Result};
use crate::gateway::{Booking, BookingGateway, GatewayError};
use crate::ledger::TransactionLedger;
use crate::models::{Listing, Location, NewTransaction, User};
use crate::provider::{ChargeRequest, PaymentProvider};

/// Successful checkout result.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub booking_id: BookingId,
    pub booking_state: BookingState,
}

/// Everything checkout reads before its first side effect.
struct CheckoutContext {
    guest: User,
    guest_customer: CustomerId,
    booking: Booking,
    host: User,
    listing: Listing,
    location: Location,
}

/// Orchestrates the end-to-end checkout sequence.
#[derive(Clone)]
pub struct CheckoutOrchestrator {
    profiles: Arc<dyn ProfileStore>,
    listings: Arc<dyn ListingStore>,
    provider: Arc<dyn PaymentProvider>,
    gateway: Arc<dyn BookingGateway>,
    ledger: TransactionLedger,
}

impl CheckoutOrchestrator {
    /// Create a new orchestrator.
    #[must_use]
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        listings: Arc<dyn ListingStore>,
        provider: Arc<dyn PaymentProvider>,
        gateway: Arc<dyn BookingGateway>,
        ledger: TransactionLedger,
    ) -> Self {
        Self {
            profiles,
            listings,
            provider,
            gateway,
            ledger,
        }
    }

    /// Charge the guest and advance the booking.
    ///
    /// Sequence: validate, gather, charge, transition the booking state,
    /// annotate the booking with the payment, write the ledger row. There
    /// is no rollback: a failure after the charge propagates with the
    /// charge already made.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when `card_id` or `booking_id` is missing or
    ///   `user_id` is empty (no call is made anywhere)
    /// - `NotFound` when any gathered record is absent (before any side
    ///   effect)
    /// - `Precondition` when the guest has no payment customer
    /// - `Provider` / `Gateway` / `Repository` for the failing step
    pub async fn do_payment(
        &self,
        user_id: &UserId,
        card_id: Option<CardId>,
        booking_id: Option<BookingId>,
    ) -> Result<CheckoutReceipt> {
        if user_id.is_empty() {
            return Err(PaymentError::InvalidInput("userId"));
        }
        let card_id = card_id
            .filter(|id| !id.is_empty())
            .ok_or(PaymentError::InvalidInput("cardId"))?;
        let booking_id = booking_id
            .filter(|id| !id.is_empty())
            .ok_or(PaymentError::InvalidInput("bookingId"))?;

        let ctx = self.gather(user_id, &booking_id).await?;
        let total = Money::new(ctx.booking.total_price, ctx.booking.currency.clone());

        // Point of no return.
        let charge = self
            .provider
            .create_charge(&build_charge_request(&ctx, &card_id, &total)?)
            .await?;
        tracing::info!(
            %booking_id,
            charge_id = %charge.id,
            amount = charge.amount,
            currency = %charge.currency,
            "charge created"
        );

        let booking_state = self
            .gateway
            .transition(&booking_id, ctx.booking.booking_type)
            .await
            .map_err(|e| after_charge(&booking_id, &charge.id, "booking transition", e))?;
        tracing::info!(%booking_id, state = %booking_state, "booking state advanced");

        self.gateway
            .annotate_payment(&booking_id, &card_id, &charge.id)
            .await
            .map_err(|e| after_charge(&booking_id, &charge.id, "booking annotation", e))?;

        self.ledger
            .record(NewTransaction {
                booking_id: booking_id.clone(),
                transaction_id: charge.id.clone(),
                payer_email: Some(ctx.guest.email.clone()),
                payer_id: Some(ctx.guest.id.clone()),
                receiver_email: Some(ctx.host.email.clone()),
                receiver_id: Some(ctx.host.id.clone()),
                total: total.rounded(),
                transaction_fee: None,
                currency: total.currency.clone(),
                ipn_track_id: None,
                payment_type: PaymentType::Booking,
                payment_method_id: None,
            })
            .await
            .inspect_err(|e| {
                tracing::error!(
                    %booking_id,
                    charge_id = %charge.id,
                    error = %e,
                    "ledger write failed after charge"
                );
            })?;

        Ok(CheckoutReceipt {
            booking_id,
            booking_state,
        })
    }

    /// Fetch every record the charge needs. Any absence aborts the
    /// checkout before a side effect happens.
    async fn gather(&self, user_id: &UserId, booking_id: &BookingId) -> Result<CheckoutContext> {
        let guest = self
            .profiles
            .user(user_id)
            .await?
            .ok_or_else(|| PaymentError::not_found("user", user_id))?;
        let guest_profile = self
            .profiles
            .profile(user_id)
            .await?
            .ok_or_else(|| PaymentError::not_found("profile", user_id))?;
        let guest_customer = guest_profile.customer_id.clone().ok_or_else(|| {
            PaymentError::Precondition(format!("user {user_id} has no payment customer"))
        })?;

        let booking = self
            .gateway
            .booking(booking_id)
            .await?
            .ok_or_else(|| PaymentError::not_found("booking", booking_id))?;

        let host = self
            .profiles
            .user(&booking.host_id)
            .await?
            .ok_or_else(|| PaymentError::not_found("user", &booking.host_id))?;
        // The host profile is not read past this point, but its absence
        // must abort the checkout before any side effect.
        self.profiles
            .profile(&booking.host_id)
            .await?
            .ok_or_else(|| PaymentError::not_found("profile", &booking.host_id))?;

        let listing = self
            .listings
            .listing(&booking.listing_id)
            .await?
            .ok_or_else(|| PaymentError::not_found("listing", &booking.listing_id))?;
        let location = self
            .listings
            .location(&listing.location_id)
            .await?
            .ok_or_else(|| PaymentError::not_found("location", &listing.location_id))?;

        Ok(CheckoutContext {
            guest,
            guest_customer,
            booking,
            host,
            listing,
            location,
        })
    }
}

/// Build the provider charge request with its descriptive metadata.
fn build_charge_request(
    ctx: &CheckoutContext,
    card_id: &CardId,
    total: &Money,
) -> Result<ChargeRequest> {
    let amount = total
        .minor_units()
        .ok_or(PaymentError::InvalidInput("totalPrice"))?;

    let mut metadata = BTreeMap::new();
    metadata.insert("reservationId".to_owned(), ctx.booking.id.to_string());
    metadata.insert("listingId".to_owned(), ctx.listing.id.to_string());
    metadata.insert("listingTitle".to_owned(), ctx.listing.title.clone());
    metadata.insert("guestEmail".to_owned(), ctx.guest.email.to_string());
    metadata.insert("amount".to_owned(), total.rounded().to_string());
    metadata.insert("customerId".to_owned(), ctx.guest_customer.to_string());
    metadata.insert("hostName".to_owned(), ctx.host.full_name());
    metadata.insert(
        "listingAddress".to_owned(),
        ctx.location.display_address(),
    );

    Ok(ChargeRequest {
        amount,
        currency: total.currency.clone(),
        customer: ctx.guest_customer.clone(),
        source: card_id.clone(),
        description: format!(
            "Booking {} - {}",
            ctx.booking.id, ctx.listing.title
        ),
        metadata,
    })
}

/// Log and wrap a gateway failure that happened after the charge; the
/// charge stands and must stay discoverable.
fn after_charge(
    booking_id: &BookingId,
    charge_id: &ChargeId,
    step: &'static str,
    err: GatewayError,
) -> PaymentError {
    tracing::error!(
        %booking_id,
        %charge_id,
        error = %err,
        "{step} failed after charge; charge is NOT reversed"
    );
    PaymentError::Gateway(err)
}
