use std::sync::Arc;

use log::*;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use smm_common::remote::{
    PaypalApi,
    PaypalCredentials,
    PaypalMode,
    PaypalOrder,
    PaypalOrderRequest,
    PaypalOrderStatus,
    RemoteApiError,
};

use crate::{build_client, error::transport_error, helpers::parse_json, ClientInitError, RemoteConfig};

/// A PayPal Orders v2 client. Credentials are per gateway, so they are passed with every call rather than held by the
/// client.
#[derive(Clone)]
pub struct PaypalClient {
    client: Arc<Client>,
    config: RemoteConfig,
}

#[derive(Deserialize)]
struct AccessToken {
    access_token: String,
}

impl PaypalClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, ClientInitError> {
        let client = build_client(config)?;
        Ok(Self { client: Arc::new(client), config: config.clone() })
    }

    fn base_url(&self, mode: PaypalMode) -> &str {
        match mode {
            PaypalMode::Sandbox => self.config.paypal_sandbox_url.as_str(),
            PaypalMode::Live => self.config.paypal_live_url.as_str(),
        }
    }

    async fn access_token(&self, credentials: &PaypalCredentials) -> Result<String, RemoteApiError> {
        if credentials.client_id.trim().is_empty() {
            return Err(RemoteApiError::Configuration("The PayPal client id is not set".into()));
        }
        let url = format!("{}/v1/oauth2/token", self.base_url(credentials.mode));
        let response = self
            .client
            .post(url)
            .basic_auth(&credentials.client_id, Some(credentials.client_secret.reveal()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if status.as_u16() == 401 {
            return Err(RemoteApiError::Configuration(format!(
                "PayPal rejected the client credentials. {}",
                paypal_error_message(&body)
            )));
        }
        if !status.is_success() {
            return Err(RemoteApiError::Http { status: status.as_u16(), message: paypal_error_message(&body) });
        }
        let token: AccessToken = serde_json::from_str(&body)
            .map_err(|e| RemoteApiError::InvalidResponse(format!("Could not read PayPal access token. {e}")))?;
        Ok(token.access_token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<PaypalOrder, RemoteApiError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        trace!("🛰️ PayPal replied with {status}: {body}");
        if !status.is_success() {
            return Err(RemoteApiError::Http { status: status.as_u16(), message: paypal_error_message(&body) });
        }
        decode_order(&parse_json(&body)?)
    }
}

fn order_body(order: &PaypalOrderRequest) -> Value {
    json!({
        "intent": "CAPTURE",
        "purchase_units": [{
            "reference_id": order.reference,
            "amount": { "currency_code": order.currency, "value": order.amount.to_fixed(2) },
        }],
        "application_context": {
            "return_url": order.return_url,
            "cancel_url": order.cancel_url,
            "user_action": "PAY_NOW",
        },
    })
}

fn decode_order(value: &Value) -> Result<PaypalOrder, RemoteApiError> {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| RemoteApiError::InvalidResponse(format!("No PayPal order id in {value}")))?;
    let status = value
        .get("status")
        .and_then(Value::as_str)
        .map(|s| s.parse::<PaypalOrderStatus>().unwrap_or_else(|e| match e {}))
        .ok_or_else(|| RemoteApiError::InvalidResponse(format!("No PayPal order status in {value}")))?;
    let approve_url = value
        .get("links")
        .and_then(Value::as_array)
        .and_then(|links| {
            links.iter().find(|l| matches!(l.get("rel").and_then(Value::as_str), Some("approve") | Some("payer-action")))
        })
        .and_then(|l| l.get("href"))
        .and_then(Value::as_str)
        .map(String::from);
    Ok(PaypalOrder { id: id.to_string(), status, approve_url })
}

/// Pulls the most specific reason out of a PayPal error body, e.g. `ORDER_NOT_APPROVED`.
fn paypal_error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };
    let issue = value["details"][0]["issue"].as_str();
    let description = value["details"][0]["description"].as_str();
    match (issue, description) {
        (Some(issue), Some(desc)) => format!("{issue}: {desc}"),
        (Some(issue), None) => issue.to_string(),
        _ => value["message"]
            .as_str()
            .or_else(|| value["error_description"].as_str())
            .or_else(|| value["name"].as_str())
            .map(String::from)
            .unwrap_or_else(|| body.to_string()),
    }
}

impl PaypalApi for PaypalClient {
    async fn create_order(
        &self,
        credentials: &PaypalCredentials,
        order: &PaypalOrderRequest,
    ) -> Result<PaypalOrder, RemoteApiError> {
        let token = self.access_token(credentials).await?;
        let url = format!("{}/v2/checkout/orders", self.base_url(credentials.mode));
        debug!("🛰️ Creating PayPal order {} for {} {}", order.reference, order.amount, order.currency);
        let request = self.client.post(url).bearer_auth(token).json(&order_body(order));
        self.send(request).await
    }

    async fn order_status(&self, credentials: &PaypalCredentials, order_id: &str) -> Result<PaypalOrder, RemoteApiError> {
        let token = self.access_token(credentials).await?;
        let url = format!("{}/v2/checkout/orders/{order_id}", self.base_url(credentials.mode));
        self.send(self.client.get(url).bearer_auth(token)).await
    }

    async fn capture_order(
        &self,
        credentials: &PaypalCredentials,
        order_id: &str,
    ) -> Result<PaypalOrder, RemoteApiError> {
        let token = self.access_token(credentials).await?;
        let url = format!("{}/v2/checkout/orders/{order_id}/capture", self.base_url(credentials.mode));
        debug!("🛰️ Capturing PayPal order {order_id}");
        self.send(self.client.post(url).bearer_auth(token).json(&json!({}))).await
    }
}
