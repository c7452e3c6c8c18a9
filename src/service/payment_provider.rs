// service/payment_provider.rs
use serde_json::Value;
use uuid::Uuid;

use crate::{config::Config, service::error::ServiceError};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Correlation data attached to every outbound call. The processor echoes it
/// back inside webhook events, which is how inbound events are matched to a
/// contract or milestone.
#[derive(Debug, Clone)]
pub struct PaymentMetadata {
    pub contract_id: Uuid,
    pub milestone_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
}

impl PaymentMetadata {
    fn to_form_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("metadata[contract_id]", self.contract_id.to_string())];
        if let Some(milestone_id) = self.milestone_id {
            params.push(("metadata[milestone_id]", milestone_id.to_string()));
        }
        if let Some(client_id) = self.client_id {
            params.push(("metadata[client_id]", client_id.to_string()));
        }
        params
    }
}

/// Thin client over the payment processor's REST API. All amounts crossing
/// this boundary are minor currency units (cents).
pub struct PaymentProviderService {
    secret_key: String,
    client: reqwest::Client,
}

impl PaymentProviderService {
    pub fn new(config: &Config) -> Self {
        Self {
            secret_key: config.stripe_secret_key.clone(),
            client: reqwest::Client::new(),
        }
    }

    // Create a payment intent for an escrow deposit or milestone payment
    pub async fn create_payment_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        metadata: &PaymentMetadata,
    ) -> Result<String, ServiceError> {
        let mut params = vec![
            ("amount", amount_cents.to_string()),
            ("currency", currency.to_string()),
        ];
        params.extend(metadata.to_form_params());

        let body = self
            .post_form(&format!("{}/payment_intents", STRIPE_API_BASE), &params)
            .await?;

        Self::extract_id(&body, "Payment intent creation failed")
    }

    // Payout transfer to the freelancer's connected account
    pub async fn create_transfer(
        &self,
        amount_cents: i64,
        destination_account: &str,
        metadata: &PaymentMetadata,
    ) -> Result<String, ServiceError> {
        let mut params = vec![
            ("amount", amount_cents.to_string()),
            ("currency", "usd".to_string()),
            ("destination", destination_account.to_string()),
        ];
        params.extend(metadata.to_form_params());

        let body = self
            .post_form(&format!("{}/transfers", STRIPE_API_BASE), &params)
            .await?;

        Self::extract_id(&body, "Transfer creation failed")
    }

    // Refund an escrow deposit, in full when amount_cents is None
    pub async fn create_refund(
        &self,
        payment_intent_id: &str,
        amount_cents: Option<i64>,
    ) -> Result<String, ServiceError> {
        let mut params = vec![("payment_intent", payment_intent_id.to_string())];
        if let Some(amount_cents) = amount_cents {
            params.push(("amount", amount_cents.to_string()));
        }

        let body = self
            .post_form(&format!("{}/refunds", STRIPE_API_BASE), &params)
            .await?;

        Self::extract_id(&body, "Refund creation failed")
    }

    async fn post_form(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Value, ServiceError> {
        let response = self
            .client
            .post(url)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(params)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalService(e.to_string()))?;

        response
            .json::<Value>()
            .await
            .map_err(|e| ServiceError::ExternalService(e.to_string()))
    }

    fn extract_id(body: &Value, fallback_message: &str) -> Result<String, ServiceError> {
        match body["id"].as_str() {
            Some(id) => Ok(id.to_string()),
            None => {
                let message = body["error"]["message"]
                    .as_str()
                    .unwrap_or(fallback_message)
                    .to_string();
                tracing::error!("Payment provider call failed: {}", message);
                Err(ServiceError::ExternalService(message))
            }
        }
    }
}
