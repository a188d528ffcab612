//! Payment provider API client.
//!
//! The provider is a Stripe-compatible REST API: form-encoded requests,
//! JSON responses, bearer authentication with a secret key. The
//! [`PaymentProvider`] trait is the seam the directories and the checkout
//! orchestrator depend on; [`StripeClient`] is the production
//! implementation.
//!
//! Retrieve-style calls surface a provider 404 as `Ok(None)` so callers
//! can translate absence into their own not-found errors; every other
//! non-success response is an API error carrying the provider's message.

mod types;

pub use types::*;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use homeport_core::{AccountId, CardId, CustomerId, Email, TokenId};

use crate::config::StripeConfig;

/// Errors that can occur when calling the payment provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response body.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Operations the service layer needs from the payment provider.
///
/// One implementation lives for the whole process and is shared across
/// overlapping invocations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a payout account.
    async fn create_account(&self, details: &AccountDetails) -> Result<Account, ProviderError>;

    /// Retrieve an account; `None` when the provider has no such account.
    async fn retrieve_account(&self, id: &AccountId) -> Result<Option<Account>, ProviderError>;

    /// Delete an account.
    async fn delete_account(&self, id: &AccountId) -> Result<(), ProviderError>;

    /// Create a customer for the given email.
    async fn create_customer(&self, email: &Email) -> Result<Customer, ProviderError>;

    /// Retrieve a customer; `None` when the provider has no such customer.
    async fn retrieve_customer(&self, id: &CustomerId) -> Result<Option<Customer>, ProviderError>;

    /// Tokenize raw card details.
    async fn create_card_token(&self, card: &CardDetails) -> Result<Token, ProviderError>;

    /// Attach a tokenized card to a customer.
    async fn attach_source(
        &self,
        customer: &CustomerId,
        token: &TokenId,
    ) -> Result<Card, ProviderError>;

    /// Detach a card from a customer.
    async fn detach_source(
        &self,
        customer: &CustomerId,
        card: &CardId,
    ) -> Result<(), ProviderError>;

    /// Make a stored card the customer's default funding source.
    async fn set_default_source(
        &self,
        customer: &CustomerId,
        card: &CardId,
    ) -> Result<Customer, ProviderError>;

    /// Create a charge.
    async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge, ProviderError>;
}

/// Provider error envelope: `{"error": {"message": ..., "type": ...}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Client for the payment provider's REST API.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: String,
}

impl StripeClient {
    /// Create a new provider API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| ProviderError::Parse(format!("invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                api_base: config.api_base.trim_end_matches('/').to_owned(),
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.api_base)
    }

    /// POST a form-encoded request and decode the JSON response.
    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, ProviderError> {
        let response = self
            .inner
            .client
            .post(self.url(path))
            .form(params)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// GET a resource; a provider 404 becomes `None`.
    async fn get_opt<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ProviderError> {
        let response = self.inner.client.get(self.url(path)).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(response).await.map(Some)
    }

    /// DELETE a resource, ignoring the confirmation body.
    async fn delete(&self, path: &str) -> Result<(), ProviderError> {
        let response = self.inner.client.delete(self.url(path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(status.as_u16(), response).await);
        }
        Ok(())
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(status.as_u16(), response).await);
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "failed to parse provider response"
            );
            ProviderError::Parse(e.to_string())
        })
    }

    /// Build an [`ProviderError::Api`] from a non-success response,
    /// preferring the provider's structured error message.
    async fn api_error(status: u16, response: reqwest::Response) -> ProviderError {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body).map_or_else(
            |_| body.chars().take(200).collect::<String>(),
            |envelope| {
                let kind = envelope.error.kind.unwrap_or_default();
                let message = envelope.error.message.unwrap_or_default();
                format!("{kind}: {message}")
            },
        );
        ProviderError::Api { status, message }
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_account(&self, details: &AccountDetails) -> Result<Account, ProviderError> {
        self.post("/v1/accounts", &details.to_form()).await
    }

    async fn retrieve_account(&self, id: &AccountId) -> Result<Option<Account>, ProviderError> {
        self.get_opt(&format!("/v1/accounts/{id}")).await
    }

    async fn delete_account(&self, id: &AccountId) -> Result<(), ProviderError> {
        self.delete(&format!("/v1/accounts/{id}")).await
    }

    async fn create_customer(&self, email: &Email) -> Result<Customer, ProviderError> {
        let params = vec![("email".to_owned(), email.as_str().to_owned())];
        self.post("/v1/customers", &params).await
    }

    async fn retrieve_customer(&self, id: &CustomerId) -> Result<Option<Customer>, ProviderError> {
        self.get_opt(&format!("/v1/customers/{id}")).await
    }

    async fn create_card_token(&self, card: &CardDetails) -> Result<Token, ProviderError> {
        self.post("/v1/tokens", &card.to_form()).await
    }

    async fn attach_source(
        &self,
        customer: &CustomerId,
        token: &TokenId,
    ) -> Result<Card, ProviderError> {
        let params = vec![("source".to_owned(), token.as_str().to_owned())];
        self.post(&format!("/v1/customers/{customer}/sources"), &params)
            .await
    }

    async fn detach_source(
        &self,
        customer: &CustomerId,
        card: &CardId,
    ) -> Result<(), ProviderError> {
        self.delete(&format!("/v1/customers/{customer}/sources/{card}"))
            .await
    }

    async fn set_default_source(
        &self,
        customer: &CustomerId,
        card: &CardId,
    ) -> Result<Customer, ProviderError> {
        let params = vec![("default_source".to_owned(), card.as_str().to_owned())];
        self.post(&format!("/v1/customers/{customer}"), &params)
            .await
    }

    async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge, ProviderError> {
        self.post("/v1/charges", &request.to_form()).await
    }
}
