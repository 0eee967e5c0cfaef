use std::sync::Arc;

use log::*;
use reqwest::Client;
use serde_json::Value;
use smm_common::remote::{
    ProviderBalance,
    ProviderEndpoint,
    ProviderOrderRequest,
    ProviderOrderStatus,
    RemoteApiError,
    SmmProviderApi,
};

use crate::{
    build_client,
    error::transport_error,
    helpers::{lenient_i64, lenient_money, lenient_string, parse_json},
    ClientInitError,
    RemoteConfig,
};

/// A client for the de-facto standard SMM panel API (v2): a single endpoint that takes form-encoded `key` and
/// `action` parameters and answers in JSON.
#[derive(Clone)]
pub struct SmmProviderClient {
    client: Arc<Client>,
}

impl SmmProviderClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, ClientInitError> {
        let client = build_client(config)?;
        Ok(Self { client: Arc::new(client) })
    }

    async fn call(&self, endpoint: &ProviderEndpoint, params: Vec<(&str, String)>) -> Result<Value, RemoteApiError> {
        let mut form = vec![("key", endpoint.api_key.reveal().clone())];
        form.extend(params);
        let response = self.client.post(&endpoint.url).form(&form).send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        trace!("🛰️ Provider replied with {status}: {body}");
        if !status.is_success() {
            return Err(RemoteApiError::Http { status: status.as_u16(), message: body });
        }
        let value = parse_json(&body)?;
        check_for_error(&value)?;
        Ok(value)
    }
}

/// Providers report refusals as `{"error": "..."}` with a 200 status.
fn check_for_error(value: &Value) -> Result<(), RemoteApiError> {
    match value.get("error") {
        Some(Value::String(msg)) => Err(RemoteApiError::Rejected(msg.clone())),
        Some(Value::Null) | None => Ok(()),
        Some(other) => Err(RemoteApiError::Rejected(other.to_string())),
    }
}

fn order_params(order: &ProviderOrderRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![("action", "add".to_string()), ("service", order.service.clone()), ("link", order.link.clone())];
    if let Some(quantity) = order.quantity {
        params.push(("quantity", quantity.to_string()));
    }
    if let Some(comments) = &order.comments {
        params.push(("comments", comments.clone()));
    }
    if let (Some(runs), Some(interval)) = (order.runs, order.interval) {
        params.push(("runs", runs.to_string()));
        params.push(("interval", interval.to_string()));
    }
    params
}

fn decode_order_id(value: &Value) -> Result<String, RemoteApiError> {
    value
        .get("order")
        .and_then(lenient_string)
        .ok_or_else(|| RemoteApiError::InvalidResponse(format!("No order id in {value}")))
}

fn decode_status(value: &Value) -> Result<ProviderOrderStatus, RemoteApiError> {
    let status = value
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| RemoteApiError::InvalidResponse(format!("No order status in {value}")))?;
    let mut result = ProviderOrderStatus::new(status.parse().unwrap_or_else(|e| match e {}));
    result.start_count = value.get("start_count").and_then(lenient_i64);
    result.remains = value.get("remains").and_then(lenient_i64);
    result.charge = value.get("charge").and_then(lenient_money);
    result.currency = value.get("currency").and_then(lenient_string);
    Ok(result)
}

fn decode_balance(value: &Value) -> Result<ProviderBalance, RemoteApiError> {
    let balance = value
        .get("balance")
        .and_then(lenient_money)
        .ok_or_else(|| RemoteApiError::InvalidResponse(format!("No balance in {value}")))?;
    let currency = value.get("currency").and_then(lenient_string).unwrap_or_else(|| "USD".to_string());
    Ok(ProviderBalance { balance, currency })
}

impl SmmProviderApi for SmmProviderClient {
    async fn add_order(
        &self,
        endpoint: &ProviderEndpoint,
        order: &ProviderOrderRequest,
    ) -> Result<String, RemoteApiError> {
        debug!("🛰️ Submitting order for service {} to {}", order.service, endpoint.url);
        let value = self.call(endpoint, order_params(order)).await?;
        decode_order_id(&value)
    }

    async fn order_status(
        &self,
        endpoint: &ProviderEndpoint,
        pid: &str,
    ) -> Result<ProviderOrderStatus, RemoteApiError> {
        let params = vec![("action", "status".to_string()), ("order", pid.to_string())];
        let value = self.call(endpoint, params).await?;
        decode_status(&value)
    }

    async fn balance(&self, endpoint: &ProviderEndpoint) -> Result<ProviderBalance, RemoteApiError> {
        let value = self.call(endpoint, vec![("action", "balance".to_string())]).await?;
        decode_balance(&value)
    }
}
