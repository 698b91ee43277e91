//! HTTP client for the processor's payment intent API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::config::Secret;
use crate::error::GateError;

use super::traits::{PaymentIntent, PaymentIntentRequest, PaymentProvider, ProviderError};

/// Creates payment intents over the processor's REST API.
pub struct HttpPaymentProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpPaymentProvider {
    /// Create a new provider client.
    pub fn new(api_base: &str, api_key: &Secret, timeout: Duration) -> Result<Self, GateError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GateError::Config {
                message: format!("Failed to build provider HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/payment_intents", api_base.trim_end_matches('/')),
            api_key: api_key.expose_str()?.to_string(),
        })
    }
}

#[async_trait]
impl PaymentProvider for HttpPaymentProvider {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, ProviderError> {
        let mut form = vec![
            ("amount", request.amount.to_string()),
            ("currency", request.currency.clone()),
        ];
        if let Some(payment_method) = &request.payment_method {
            form.push(("payment_method", payment_method.clone()));
        }
        if let Some(description) = &request.description {
            form.push(("description", description.clone()));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("transport error: {}", e)))?;

        let status = response.status();
        debug!(status = status.as_u16(), "Provider responded");

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::Unavailable(format!("provider status {}", status)));
        }

        if !status.is_success() {
            // The body may echo payment details; only the status is kept.
            warn!(status = status.as_u16(), "Provider rejected payment intent");
            return Err(ProviderError::Rejected(format!("provider status {}", status)));
        }

        response
            .json::<PaymentIntent>()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("unreadable provider response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalized() {
        let key = Secret::new(b"sk_test_unit".to_vec(), "test").unwrap();
        let provider =
            HttpPaymentProvider::new("https://api.example.com/", &key, Duration::from_secs(1))
                .unwrap();
        assert_eq!(provider.endpoint, "https://api.example.com/v1/payment_intents");
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_unavailable() {
        let key = Secret::new(b"sk_test_unit".to_vec(), "test").unwrap();
        // Port 9 (discard) on loopback is closed in test environments.
        let provider =
            HttpPaymentProvider::new("http://127.0.0.1:9", &key, Duration::from_millis(500))
                .unwrap();
        let request = PaymentIntentRequest {
            amount: 2_500_000,
            currency: "usd".to_string(),
            payment_method: None,
            description: None,
            idempotency_key: "key-1".to_string(),
        };
        assert!(matches!(
            provider.create_payment_intent(&request).await,
            Err(ProviderError::Unavailable(_))
        ));
    }
}
