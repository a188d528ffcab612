//! Booking gateway API client.
//!
//! The booking system owns the booking lifecycle; payments only reads a
//! booking, advances its state after a successful charge, and annotates it
//! with the charge. The [`BookingGateway`] trait is the seam checkout
//! depends on; [`BookingClient`] is the production implementation.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use homeport_core::{BookingId, BookingState, BookingType, CardId, ChargeId, ListingId, UserId};

use crate::config::BookingConfig;

/// Errors that can occur when calling the booking gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response body.
    #[error("parse error: {0}")]
    Parse(String),
}

/// A booking as the gateway reports it.
///
/// The gateway record carries more fields; these are the ones checkout
/// reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub host_id: UserId,
    pub listing_id: ListingId,
    /// Amount in the currency's standard unit.
    pub total_price: Decimal,
    pub currency: String,
    pub booking_type: BookingType,
}

/// Operations checkout needs from the booking system.
#[async_trait]
pub trait BookingGateway: Send + Sync {
    /// Fetch a booking; `None` when the gateway has no such booking.
    async fn booking(&self, id: &BookingId) -> Result<Option<Booking>, GatewayError>;

    /// Advance the booking after payment and return the new state.
    ///
    /// `request` bookings move to a pending-request state awaiting host
    /// approval; any other type is approved directly.
    async fn transition(
        &self,
        id: &BookingId,
        booking_type: BookingType,
    ) -> Result<BookingState, GatewayError>;

    /// Attach the funding source and charge to the booking record.
    async fn annotate_payment(
        &self,
        id: &BookingId,
        source: &CardId,
        charge: &ChargeId,
    ) -> Result<(), GatewayError>;
}

/// Transition response body: `{"state": "..."}`.
#[derive(Debug, Deserialize)]
struct StateResponse {
    state: BookingState,
}

/// Annotation request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentAnnotation<'a> {
    source_id: &'a CardId,
    charge_id: &'a ChargeId,
}

/// Client for the booking gateway's REST API.
#[derive(Clone)]
pub struct BookingClient {
    inner: Arc<BookingClientInner>,
}

struct BookingClientInner {
    client: reqwest::Client,
    api_url: String,
}

impl BookingClient {
    /// Create a new booking gateway client.
    #[must_use]
    pub fn new(config: &BookingConfig) -> Self {
        Self {
            inner: Arc::new(BookingClientInner {
                client: reqwest::Client::new(),
                api_url: config.api_url.trim_end_matches('/').to_owned(),
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.api_url)
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "failed to parse booking gateway response"
            );
            GatewayError::Parse(e.to_string())
        })
    }
}

#[async_trait]
impl BookingGateway for BookingClient {
    async fn booking(&self, id: &BookingId) -> Result<Option<Booking>, GatewayError> {
        let response = self
            .inner
            .client
            .get(self.url(&format!("/bookings/{id}")))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(response).await.map(Some)
    }

    async fn transition(
        &self,
        id: &BookingId,
        booking_type: BookingType,
    ) -> Result<BookingState, GatewayError> {
        let action = if booking_type.needs_approval() {
            "request"
        } else {
            "approve"
        };
        let response = self
            .inner
            .client
            .put(self.url(&format!("/bookings/{action}/{id}")))
            .send()
            .await?;
        let state: StateResponse = Self::decode(response).await?;
        Ok(state.state)
    }

    async fn annotate_payment(
        &self,
        id: &BookingId,
        source: &CardId,
        charge: &ChargeId,
    ) -> Result<(), GatewayError> {
        let response = self
            .inner
            .client
            .put(self.url(&format!("/bookings/{id}")))
            .json(&PaymentAnnotation {
                source_id: source,
                charge_id: charge,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }
        Ok(())
    }
}
