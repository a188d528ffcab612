//! Homeport Payments - payment identity and checkout service layer.
//!
//! This crate manages per-user payment identities (provider account,
//! customer, stored cards) and runs the checkout flow that charges a guest,
//! advances a booking, and records a ledger entry. It is an internal service
//! layer: request entry points, response formatting, and notification
//! delivery live in the embedding application.
//!
//! # Architecture
//!
//! - Payment provider (Stripe-compatible REST API) for accounts, customers,
//!   cards, and charges
//! - Booking gateway (internal REST API) for booking reads and state
//!   transitions
//! - `PostgreSQL` for user profiles and the transaction ledger
//! - In-process cache for provider account snapshots (cache-aside, no TTL)
//!
//! The checkout orchestrator spans three independently-failing systems with
//! no shared transaction. It performs best-effort sequential calls and
//! surfaces the first failure; a charge that succeeds before a later step
//! fails is NOT reversed here (see [`checkout`]).
//!
//! # Modules
//!
//! - [`config`] - Environment-based configuration
//! - [`error`] - Closed error taxonomy for the service layer
//! - [`cache`] - Key/value cache port and in-process implementation
//! - [`provider`] - Payment provider port and Stripe client
//! - [`gateway`] - Booking gateway port and client
//! - [`db`] - Profile and transaction repositories
//! - [`accounts`] - Provider-account directory (cache-aside)
//! - [`cards`] - Customer and card lifecycle
//! - [`ledger`] - Idempotent transaction ledger
//! - [`checkout`] - The `do_payment` orchestrator
//! - [`state`] - Process-wide composition root

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod accounts;
pub mod cache;
pub mod cards;
pub mod checkout;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod models;
pub mod provider;
pub mod state;

pub use accounts::{AccountDirectory, DeleteConfirmation};
pub use cards::{CardDirectory, CardList};
pub use checkout::{CheckoutOrchestrator, CheckoutReceipt};
pub use config::PaymentsConfig;
pub use error::{PaymentError, Result};
pub use ledger::TransactionLedger;
pub use state::PaymentsState;
