use std::sync::Arc;

use bpg_common::Money;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
};
use serde::de::DeserializeOwned;

use crate::{config::StripeConfig, data_objects::PaymentIntent, error::StripeApiError};

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let val =
            HeaderValue::from_str(&bearer).map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        headers.insert(AUTHORIZATION, val);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_url)
    }

    /// Sends a form-encoded request (the Stripe API does not accept JSON bodies) and
    /// deserializes the JSON response.
    async fn form_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("💳️ Sending Stripe query: {method} {url}");
        let mut req = self.client.request(method, url);
        if !form.is_empty() {
            req = req.form(form);
        }
        let response = req.send().await.map_err(|e| StripeApiError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💳️ Stripe query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| StripeApiError::RequestError(e.to_string()))?;
            Err(StripeApiError::QueryError { status, message })
        }
    }

    /// Reserves `amount` for later capture. The amount is in minor currency units, matching how
    /// the rest of the system carries money.
    pub async fn create_payment_intent(
        &self,
        amount: Money,
        currency: &str,
        method_types: &[String],
    ) -> Result<PaymentIntent, StripeApiError> {
        let mut form = vec![
            ("amount".to_string(), amount.value().to_string()),
            ("currency".to_string(), currency.to_ascii_lowercase()),
        ];
        for (i, method_type) in method_types.iter().enumerate() {
            form.push((format!("payment_method_types[{i}]"), method_type.clone()));
        }
        debug!("💳️ Creating payment intent for {amount} {currency}");
        let intent = self.form_query::<PaymentIntent>(Method::POST, "/payment_intents", &form).await?;
        info!("💳️ Created payment intent {}", intent.id);
        Ok(intent)
    }

    pub async fn fetch_payment_intent(&self, id: &str) -> Result<PaymentIntent, StripeApiError> {
        let path = format!("/payment_intents/{id}");
        debug!("💳️ Fetching payment intent {id}");
        self.form_query::<PaymentIntent>(Method::GET, &path, &[]).await
    }
}
