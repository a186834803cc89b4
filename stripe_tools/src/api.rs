use std::sync::Arc;

use log::*;
use mos_common::Money;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    config::StripeConfig,
    data_objects::{CheckoutSession, NewCheckoutSession, PaymentIntent, Refund},
    StripeApiError,
};

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let mut val =
            HeaderValue::from_str(&bearer).map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert("Authorization", val);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn publishable_key(&self) -> &str {
        &self.config.publishable_key
    }

    pub fn webhook_secret(&self) -> &str {
        self.config.webhook_secret.reveal()
    }

    /// Sends a request to Stripe. All mutating Stripe endpoints are form-encoded POSTs; reads are plain GETs.
    async fn rest_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("💳️ Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if !form.is_empty() {
            req = req.form(form);
        }
        let response = req.send().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💳️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
            Err(StripeApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base)
    }

    /// Creates a payment intent for the given amount. The metadata pairs are stored on the intent and come
    /// back on every webhook event it generates.
    pub async fn create_payment_intent(
        &self,
        amount: Money,
        currency: &str,
        metadata: &[(String, String)],
    ) -> Result<PaymentIntent, StripeApiError> {
        let mut form = vec![
            ("amount".to_string(), amount.value().to_string()),
            ("currency".to_string(), currency.to_string()),
            ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
        ];
        for (key, value) in metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }
        debug!("💳️ Creating payment intent for {amount}");
        let intent = self.rest_query::<PaymentIntent>(Method::POST, "/v1/payment_intents", &form).await?;
        info!("💳️ Created payment intent {}", intent.id);
        Ok(intent)
    }

    pub async fn create_checkout_session(
        &self,
        new_session: &NewCheckoutSession,
    ) -> Result<CheckoutSession, StripeApiError> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), new_session.success_url.clone()),
            ("cancel_url".to_string(), new_session.cancel_url.clone()),
        ];
        for (i, item) in new_session.line_items.iter().enumerate() {
            form.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
            form.push((format!("line_items[{i}][price_data][currency]"), new_session.currency.clone()));
            form.push((format!("line_items[{i}][price_data][unit_amount]"), item.unit_amount.value().to_string()));
            form.push((format!("line_items[{i}][price_data][product_data][name]"), item.name.clone()));
        }
        for (key, value) in &new_session.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }
        debug!("💳️ Creating checkout session with {} line items", new_session.line_items.len());
        let session = self.rest_query::<CheckoutSession>(Method::POST, "/v1/checkout/sessions", &form).await?;
        info!("💳️ Created checkout session {}", session.id);
        Ok(session)
    }

    /// Issues a refund against a payment intent. When `amount` is `None`, Stripe refunds the full remaining
    /// captured amount.
    pub async fn create_refund(
        &self,
        payment_intent_id: &str,
        amount: Option<Money>,
        reason: Option<&str>,
    ) -> Result<Refund, StripeApiError> {
        let mut form = vec![("payment_intent".to_string(), payment_intent_id.to_string())];
        if let Some(amount) = amount {
            form.push(("amount".to_string(), amount.value().to_string()));
        }
        if let Some(reason) = reason {
            form.push(("metadata[reason]".to_string(), reason.to_string()));
        }
        debug!("💳️ Requesting refund against {payment_intent_id}");
        let refund = self.rest_query::<Refund>(Method::POST, "/v1/refunds", &form).await?;
        info!("💳️ Refund {} created with status {}", refund.id, refund.status);
        Ok(refund)
    }

    pub async fn get_payment_intent(&self, payment_intent_id: &str) -> Result<Value, StripeApiError> {
        let path = format!("/v1/payment_intents/{payment_intent_id}");
        self.rest_query::<Value>(Method::GET, &path, &[]).await
    }
}
