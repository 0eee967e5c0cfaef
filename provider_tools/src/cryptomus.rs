use std::sync::Arc;

use log::*;
use reqwest::Client;
use serde_json::{json, Map, Value};
use smm_common::remote::{
    CryptomusApi,
    CryptomusCredentials,
    CryptomusInvoice,
    CryptomusInvoiceRequest,
    CryptomusPaymentLookup,
    CryptomusPaymentStatus,
    RemoteApiError,
};

use crate::{
    build_client,
    error::transport_error,
    helpers::{lenient_string, parse_json},
    ClientInitError,
    RemoteConfig,
};

#[derive(Clone)]
pub struct CryptomusClient {
    client: Arc<Client>,
    base_url: String,
}

/// Cryptomus request signature: `md5(base64(body) + payment_key)`, hex encoded. The body must be signed exactly as it
/// is sent.
pub fn sign_payload(body: &str, payment_key: &str) -> String {
    let encoded = base64::encode(body);
    let mut ctx = md5::Context::new();
    ctx.consume(encoded.as_bytes());
    ctx.consume(payment_key.as_bytes());
    format!("{:x}", ctx.compute())
}

impl CryptomusClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, ClientInitError> {
        let client = build_client(config)?;
        Ok(Self { client: Arc::new(client), base_url: config.cryptomus_url.clone() })
    }

    async fn call(
        &self,
        credentials: &CryptomusCredentials,
        path: &str,
        payload: &Value,
    ) -> Result<Value, RemoteApiError> {
        if credentials.merchant_id.trim().is_empty() {
            return Err(RemoteApiError::Configuration("The Cryptomus merchant id is not set".into()));
        }
        let body = payload.to_string();
        let sign = sign_payload(&body, credentials.payment_key.reveal());
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(url)
            .header("merchant", credentials.merchant_id.as_str())
            .header("sign", sign)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        trace!("🛰️ Cryptomus replied with {status}: {text}");
        if status.as_u16() == 401 {
            return Err(RemoteApiError::Configuration(format!(
                "Cryptomus rejected the merchant credentials. {}",
                cryptomus_error_message(&text)
            )));
        }
        if !status.is_success() {
            return Err(RemoteApiError::Http { status: status.as_u16(), message: cryptomus_error_message(&text) });
        }
        let value = parse_json(&text)?;
        match value.get("state").and_then(Value::as_i64) {
            Some(0) => Ok(value),
            _ => Err(RemoteApiError::Rejected(cryptomus_error_message(&text))),
        }
    }
}

fn invoice_payload(invoice: &CryptomusInvoiceRequest) -> Value {
    let mut payload = Map::new();
    payload.insert("amount".into(), json!(invoice.amount.to_fixed(2)));
    payload.insert("currency".into(), json!(invoice.currency));
    payload.insert("order_id".into(), json!(invoice.order_id));
    if let Some(url) = &invoice.url_return {
        payload.insert("url_return".into(), json!(url));
    }
    if let Some(url) = &invoice.url_callback {
        payload.insert("url_callback".into(), json!(url));
    }
    Value::Object(payload)
}

fn lookup_payload(lookup: &CryptomusPaymentLookup) -> Value {
    match lookup {
        CryptomusPaymentLookup::Uuid(uuid) => json!({ "uuid": uuid }),
        CryptomusPaymentLookup::OrderId(order_id) => json!({ "order_id": order_id }),
    }
}

fn decode_invoice(value: &Value) -> Result<CryptomusInvoice, RemoteApiError> {
    let result = value
        .get("result")
        .ok_or_else(|| RemoteApiError::InvalidResponse(format!("No result in Cryptomus response {value}")))?;
    let field = |name: &str| result.get(name).and_then(lenient_string);
    let uuid = field("uuid").ok_or_else(|| RemoteApiError::InvalidResponse("Cryptomus invoice has no uuid".into()))?;
    let status = field("payment_status")
        .or_else(|| field("status"))
        .map(|s| s.parse::<CryptomusPaymentStatus>().unwrap_or_else(|e| match e {}))
        .ok_or_else(|| RemoteApiError::InvalidResponse(format!("Cryptomus invoice {uuid} has no status")))?;
    Ok(CryptomusInvoice { order_id: field("order_id").unwrap_or_default(), url: field("url").unwrap_or_default(), uuid, status })
}

fn cryptomus_error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };
    if let Some(message) = value.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    match value.get("errors").and_then(Value::as_object) {
        Some(errors) => errors
            .iter()
            .map(|(field, problems)| match problems.as_array() {
                Some(list) => {
                    let problems = list.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(", ");
                    format!("{field}: {problems}")
                },
                None => format!("{field}: {problems}"),
            })
            .collect::<Vec<_>>()
            .join("; "),
        None => body.to_string(),
    }
}

impl CryptomusApi for CryptomusClient {
    async fn create_invoice(
        &self,
        credentials: &CryptomusCredentials,
        invoice: &CryptomusInvoiceRequest,
    ) -> Result<CryptomusInvoice, RemoteApiError> {
        debug!("🛰️ Creating Cryptomus invoice {} for {} {}", invoice.order_id, invoice.amount, invoice.currency);
        let value = self.call(credentials, "/v1/payment", &invoice_payload(invoice)).await?;
        decode_invoice(&value)
    }

    async fn payment_info(
        &self,
        credentials: &CryptomusCredentials,
        lookup: &CryptomusPaymentLookup,
    ) -> Result<CryptomusInvoice, RemoteApiError> {
        let value = self.call(credentials, "/v1/payment/info", &lookup_payload(lookup)).await?;
        decode_invoice(&value)
    }
}
