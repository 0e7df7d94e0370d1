//! Stripe charges API client.

use crate::config::StripeConfig;
use crate::domain::id::OrderId;
use crate::domain::money::Amount;
use crate::domain::ports::PaymentGateway;
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

const CURRENCY: &str = "usd";

/// Charges stored card tokens through `POST /v1/charges`.
#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    api_url: String,
    secret_key: SecretString,
}

impl StripeGateway {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ServiceError::InternalError(Box::new(e)))?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            secret_key: config.secret_key.clone(),
        })
    }
}

/// Form fields for one charge.
pub(crate) fn charge_form(instrument: &str, order_id: &OrderId, amount: Amount) -> Vec<(String, String)> {
    let date = chrono::Utc::now().format("%-m/%-d/%Y");
    vec![
        ("amount".to_string(), amount.minor_units().to_string()),
        ("currency".to_string(), CURRENCY.to_string()),
        ("source".to_string(), instrument.to_string()),
        ("description".to_string(), format!("Food delivery on {date}")),
        ("metadata[orderId]".to_string(), order_id.to_string()),
    ]
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn charge(&self, instrument: &str, order_id: &OrderId, amount: Amount) -> Result<()> {
        let response = self
            .client
            .post(&self.api_url)
            .basic_auth(self.secret_key.expose_secret(), Some(""))
            .form(&charge_form(instrument, order_id, amount))
            .send()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("Request failed: {e}")))?;

        let status = response.status();
        if status.as_u16() == 200 || status.as_u16() == 201 {
            tracing::debug!(order_id = %order_id, amount = %amount, "Charge accepted");
            Ok(())
        } else {
            Err(ServiceError::GatewayError(format!(
                "Status code returned was {}",
                status.as_u16()
            )))
        }
    }
}
