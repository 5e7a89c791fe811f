//! Payment status provider client
//!
//! Thin HTTP client over the external crypto payment processor's status
//! endpoint. The provider is an opaque service: the only contract consumed
//! here is `GET /payment/{id}` returning the payment's current status and
//! paid amounts.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Explicit request timeout; a hung provider call is a transport failure,
/// not an indefinite stall
pub const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Missing credentials or malformed client setup; not retryable
    #[error("provider configuration error: {0}")]
    Configuration(String),
    /// Network failure, timeout, or non-2xx response; retryable on the
    /// next scheduled attempt
    #[error("provider transport error: {0}")]
    Transport(String),
    /// Provider returned a status string outside the known vocabulary
    #[error("unrecognized payment status '{0}'")]
    UnknownStatus(String),
}

/// Status payload returned by the provider. Field names follow the
/// provider's wire contract.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderPaymentStatus {
    pub payment_status: String,
    pub actually_paid: Option<Decimal>,
    pub outcome_amount: Option<Decimal>,
    pub network_fee: Option<Decimal>,
}

/// Seam between reconciliation and the external provider, so the state
/// machine can be driven by a scripted double in tests.
#[async_trait]
pub trait PaymentStatusProvider: Send + Sync {
    async fn fetch_status(
        &self,
        provider_payment_id: &str,
    ) -> Result<ProviderPaymentStatus, ProviderError>;
}

#[derive(Clone)]
pub struct NowPaymentsClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl NowPaymentsClient {
    pub fn new(api_key: String, base_url: String) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "payment provider API key is empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Configuration(format!("http client build failed: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }
}

#[async_trait]
impl PaymentStatusProvider for NowPaymentsClient {
    async fn fetch_status(
        &self,
        provider_payment_id: &str,
    ) -> Result<ProviderPaymentStatus, ProviderError> {
        let url = format!("{}/payment/{}", self.base_url, provider_payment_id);

        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transport(format!(
                "provider API error {}: {}",
                status, error_text
            )));
        }

        let payload: ProviderPaymentStatus = response
            .json()
            .await
            .map_err(|e| ProviderError::Transport(format!("invalid status payload: {}", e)))?;

        tracing::debug!(
            provider_payment_id = %provider_payment_id,
            payment_status = %payload.payment_status,
            "Fetched payment status"
        );

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_a_configuration_error() {
        let result = NowPaymentsClient::new("  ".to_string(), "https://api.example".to_string());
        assert!(matches!(result, Err(ProviderError::Configuration(_))));
    }

    #[test]
    fn status_payload_deserializes_with_missing_amounts() {
        let payload: ProviderPaymentStatus =
            serde_json::from_str(r#"{"payment_status": "waiting"}"#).unwrap();
        assert_eq!(payload.payment_status, "waiting");
        assert!(payload.actually_paid.is_none());
    }
}
