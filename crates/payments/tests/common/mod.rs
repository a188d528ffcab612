//! In-memory fakes for the service-layer seams.
//!
//! Every fake counts its calls so tests can assert which collaborators
//! were (and were not) touched.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Map;

use homeport_core::{
    AccountId, BookingId, BookingState, BookingType, CardId, ChargeId, CustomerId, Email,
    ListingId, LocationId, ProfileId, TokenId, UserId,
};
use homeport_payments::cache::{Cache, CacheError};
use homeport_payments::db::RepositoryError;
use homeport_payments::db::profiles::{ListingStore, ProfileStore};
use homeport_payments::db::transactions::TransactionStore;
use homeport_payments::gateway::{Booking, BookingGateway, GatewayError};
use homeport_payments::models::{Listing, Location, NewTransaction, Transaction, User, UserProfile};
use homeport_payments::provider::{
    Account, AccountDetails, Card, CardDetails, Charge, ChargeRequest, Customer, PaymentProvider,
    ProviderError, SourceList, Token,
};

// =============================================================================
// Builders
// =============================================================================

pub fn user(id: &str, email: &str, first: &str, last: &str) -> User {
    User {
        id: UserId::new(id),
        email: Email::parse(email).unwrap(),
        first_name: first.to_owned(),
        last_name: last.to_owned(),
    }
}

pub fn profile(
    profile_id: i32,
    user_id: &str,
    account_id: Option<&str>,
    customer_id: Option<&str>,
) -> UserProfile {
    UserProfile {
        profile_id: ProfileId::new(profile_id),
        user_id: UserId::new(user_id),
        account_id: account_id.map(AccountId::new),
        customer_id: customer_id.map(CustomerId::new),
    }
}

pub fn account(id: &str) -> Account {
    Account {
        id: AccountId::new(id),
        rest: Map::new(),
    }
}

pub fn customer(id: &str, email: &str) -> Customer {
    Customer {
        id: CustomerId::new(id),
        email: Some(email.to_owned()),
        default_source: None,
        sources: SourceList::default(),
        rest: Map::new(),
    }
}

pub fn booking(
    id: &str,
    host_id: &str,
    listing_id: &str,
    total_price: &str,
    currency: &str,
    booking_type: BookingType,
) -> Booking {
    Booking {
        id: BookingId::new(id),
        host_id: UserId::new(host_id),
        listing_id: ListingId::new(listing_id),
        total_price: total_price.parse::<Decimal>().unwrap(),
        currency: currency.to_owned(),
        booking_type,
    }
}

pub fn card_details() -> CardDetails {
    CardDetails {
        card_name: "A Guest".to_owned(),
        card_number: "4242424242424242".to_owned(),
        exp_month: "12".to_owned(),
        exp_year: "2030".to_owned(),
        cvc: "123".to_owned(),
    }
}

// =============================================================================
// Profile / listing stores
// =============================================================================

#[derive(Default)]
pub struct MemoryProfileStore {
    pub users: Mutex<HashMap<String, User>>,
    pub profiles: Mutex<HashMap<String, UserProfile>>,
}

impl MemoryProfileStore {
    pub fn with_user(self, u: User) -> Self {
        self.users.lock().unwrap().insert(u.id.to_string(), u);
        self
    }

    pub fn with_profile(self, p: UserProfile) -> Self {
        self.profiles.lock().unwrap().insert(p.user_id.to_string(), p);
        self
    }

    pub fn profile_of(&self, user_id: &str) -> Option<UserProfile> {
        self.profiles.lock().unwrap().get(user_id).cloned()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.lock().unwrap().get(id.as_str()).cloned())
    }

    async fn profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self.profiles.lock().unwrap().get(user_id.as_str()).cloned())
    }

    async fn claim_account_id(
        &self,
        profile_id: ProfileId,
        account_id: &AccountId,
    ) -> Result<bool, RepositoryError> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .values_mut()
            .find(|p| p.profile_id == profile_id)
            .ok_or(RepositoryError::NotFound)?;
        if profile.account_id.is_some() {
            return Ok(false);
        }
        profile.account_id = Some(account_id.clone());
        Ok(true)
    }

    async fn clear_account_id(&self, profile_id: ProfileId) -> Result<(), RepositoryError> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .values_mut()
            .find(|p| p.profile_id == profile_id)
            .ok_or(RepositoryError::NotFound)?;
        profile.account_id = None;
        Ok(())
    }

    async fn set_customer_id(
        &self,
        profile_id: ProfileId,
        customer_id: &CustomerId,
    ) -> Result<(), RepositoryError> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .values_mut()
            .find(|p| p.profile_id == profile_id)
            .ok_or(RepositoryError::NotFound)?;
        profile.customer_id = Some(customer_id.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryListingStore {
    pub listings: Mutex<HashMap<String, Listing>>,
    pub locations: Mutex<HashMap<String, Location>>,
}

impl MemoryListingStore {
    pub fn with_listing(self, id: &str, title: &str, location_id: &str) -> Self {
        self.listings.lock().unwrap().insert(
            id.to_owned(),
            Listing {
                id: ListingId::new(id),
                title: title.to_owned(),
                location_id: LocationId::new(location_id),
            },
        );
        self
    }

    pub fn with_location(self, id: &str, address1: &str, city: &str) -> Self {
        self.locations.lock().unwrap().insert(
            id.to_owned(),
            Location {
                id: LocationId::new(id),
                address1: address1.to_owned(),
                city: city.to_owned(),
            },
        );
        self
    }
}

#[async_trait]
impl ListingStore for MemoryListingStore {
    async fn listing(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        Ok(self.listings.lock().unwrap().get(id.as_str()).cloned())
    }

    async fn location(&self, id: &LocationId) -> Result<Option<Location>, RepositoryError> {
        Ok(self.locations.lock().unwrap().get(id.as_str()).cloned())
    }
}

// =============================================================================
// Transaction store
// =============================================================================

#[derive(Default)]
pub struct MemoryTransactionStore {
    pub rows: Mutex<Vec<Transaction>>,
    next_id: AtomicUsize,
}

impl MemoryTransactionStore {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn materialize(&self, new: &NewTransaction) -> Transaction {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let id = (self.next_id.fetch_add(1, Ordering::SeqCst) + 1) as i32;
        Transaction {
            id,
            booking_id: new.booking_id.clone(),
            transaction_id: new.transaction_id.clone(),
            payer_email: new.payer_email.clone(),
            payer_id: new.payer_id.clone(),
            receiver_email: new.receiver_email.clone(),
            receiver_id: new.receiver_id.clone(),
            total: new.total,
            transaction_fee: new.transaction_fee,
            currency: new.currency.clone(),
            ipn_track_id: new.ipn_track_id.clone(),
            payment_type: new.payment_type,
            payment_method_id: new.payment_method_id,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn find(
        &self,
        booking_id: &BookingId,
        transaction_id: &ChargeId,
    ) -> Result<Option<Transaction>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| &r.booking_id == booking_id && &r.transaction_id == transaction_id)
            .cloned())
    }

    async fn insert(&self, new: &NewTransaction) -> Result<Transaction, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|r| r.booking_id == new.booking_id && r.transaction_id == new.transaction_id)
        {
            return Err(RepositoryError::Conflict(
                "ledger row already exists".to_owned(),
            ));
        }
        let row = self.materialize(new);
        rows.push(row.clone());
        Ok(row)
    }
}

// =============================================================================
// Payment provider
// =============================================================================

#[derive(Default)]
pub struct FakeProvider {
    pub accounts: Mutex<HashMap<String, Account>>,
    pub customers: Mutex<HashMap<String, Customer>>,
    pub charges: Mutex<Vec<ChargeRequest>>,
    pub calls: AtomicUsize,
    pub retrieve_account_calls: AtomicUsize,
    pub fail_charge: AtomicBool,
    next_id: AtomicUsize,
}

impl FakeProvider {
    pub fn with_account(self, a: Account) -> Self {
        self.accounts.lock().unwrap().insert(a.id.to_string(), a);
        self
    }

    pub fn with_customer(self, c: Customer) -> Self {
        self.customers.lock().unwrap().insert(c.id.to_string(), c);
        self
    }

    pub fn total_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_charge(&self) -> Option<ChargeRequest> {
        self.charges.lock().unwrap().last().cloned()
    }

    fn next(&self, prefix: &str) -> String {
        format!("{prefix}_{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn upstream(message: &str) -> ProviderError {
        ProviderError::Api {
            status: 502,
            message: message.to_owned(),
        }
    }
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn create_account(&self, _details: &AccountDetails) -> Result<Account, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let account = account(&self.next("acct"));
        self.accounts
            .lock()
            .unwrap()
            .insert(account.id.to_string(), account.clone());
        Ok(account)
    }

    async fn retrieve_account(&self, id: &AccountId) -> Result<Option<Account>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.retrieve_account_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.lock().unwrap().get(id.as_str()).cloned())
    }

    async fn delete_account(&self, id: &AccountId) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.accounts.lock().unwrap().remove(id.as_str());
        Ok(())
    }

    async fn create_customer(&self, email: &Email) -> Result<Customer, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let c = customer(&self.next("cus"), email.as_str());
        self.customers
            .lock()
            .unwrap()
            .insert(c.id.to_string(), c.clone());
        Ok(c)
    }

    async fn retrieve_customer(&self, id: &CustomerId) -> Result<Option<Customer>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.customers.lock().unwrap().get(id.as_str()).cloned())
    }

    async fn create_card_token(&self, _card: &CardDetails) -> Result<Token, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Token {
            id: TokenId::new(self.next("tok")),
            rest: Map::new(),
        })
    }

    async fn attach_source(
        &self,
        customer: &CustomerId,
        _token: &TokenId,
    ) -> Result<Card, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let card = Card {
            id: CardId::new(self.next("card")),
            name: None,
            brand: Some("visa".to_owned()),
            last4: Some("4242".to_owned()),
            exp_month: Some(12),
            exp_year: Some(2030),
            rest: Map::new(),
        };
        let mut customers = self.customers.lock().unwrap();
        let c = customers
            .get_mut(customer.as_str())
            .ok_or_else(|| Self::upstream("no such customer"))?;
        c.sources.data.push(card.clone());
        if c.default_source.is_none() {
            c.default_source = Some(card.id.clone());
        }
        Ok(card)
    }

    async fn detach_source(
        &self,
        customer: &CustomerId,
        card: &CardId,
    ) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut customers = self.customers.lock().unwrap();
        let c = customers
            .get_mut(customer.as_str())
            .ok_or_else(|| Self::upstream("no such customer"))?;
        c.sources.data.retain(|s| &s.id != card);
        if c.default_source.as_ref() == Some(card) {
            c.default_source = None;
        }
        Ok(())
    }

    async fn set_default_source(
        &self,
        customer: &CustomerId,
        card: &CardId,
    ) -> Result<Customer, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut customers = self.customers.lock().unwrap();
        let c = customers
            .get_mut(customer.as_str())
            .ok_or_else(|| Self::upstream("no such customer"))?;
        c.default_source = Some(card.clone());
        Ok(c.clone())
    }

    async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_charge.load(Ordering::SeqCst) {
            return Err(Self::upstream("charge declined"));
        }
        self.charges.lock().unwrap().push(request.clone());
        Ok(Charge {
            id: ChargeId::new(self.next("ch")),
            amount: request.amount,
            currency: request.currency.clone(),
            status: Some("succeeded".to_owned()),
            rest: Map::new(),
        })
    }
}

// =============================================================================
// Booking gateway
// =============================================================================

#[derive(Default)]
pub struct FakeGateway {
    pub bookings: Mutex<HashMap<String, Booking>>,
    pub transitions: Mutex<Vec<(BookingId, BookingType)>>,
    pub annotations: Mutex<Vec<(BookingId, CardId, ChargeId)>>,
    pub calls: AtomicUsize,
    pub fail_transition: AtomicBool,
    pub fail_annotation: AtomicBool,
}

impl FakeGateway {
    pub fn with_booking(self, b: Booking) -> Self {
        self.bookings.lock().unwrap().insert(b.id.to_string(), b);
        self
    }

    pub fn total_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn upstream(message: &str) -> GatewayError {
        GatewayError::Api {
            status: 502,
            message: message.to_owned(),
        }
    }
}

#[async_trait]
impl BookingGateway for FakeGateway {
    async fn booking(&self, id: &BookingId) -> Result<Option<Booking>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.bookings.lock().unwrap().get(id.as_str()).cloned())
    }

    async fn transition(
        &self,
        id: &BookingId,
        booking_type: BookingType,
    ) -> Result<BookingState, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_transition.load(Ordering::SeqCst) {
            return Err(Self::upstream("transition failed"));
        }
        self.transitions
            .lock()
            .unwrap()
            .push((id.clone(), booking_type));
        Ok(if booking_type.needs_approval() {
            BookingState::Pending
        } else {
            BookingState::Approved
        })
    }

    async fn annotate_payment(
        &self,
        id: &BookingId,
        source: &CardId,
        charge: &ChargeId,
    ) -> Result<(), GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_annotation.load(Ordering::SeqCst) {
            return Err(Self::upstream("annotation failed"));
        }
        self.annotations
            .lock()
            .unwrap()
            .push((id.clone(), source.clone(), charge.clone()));
        Ok(())
    }
}

// =============================================================================
// Cache
// =============================================================================

/// A cache whose writes always fail; reads always miss.
#[derive(Default)]
pub struct BrokenCache {
    pub set_attempts: AtomicUsize,
}

#[async_trait]
impl Cache for BrokenCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String) -> Result<(), CacheError> {
        self.set_attempts.fetch_add(1, Ordering::SeqCst);
        Err(CacheError("backend unavailable".to_owned()))
    }

    async fn del(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError("backend unavailable".to_owned()))
    }
}
