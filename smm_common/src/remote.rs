//! Client-side contracts for the external services the panel talks to.
//!
//! The panel core never speaks HTTP itself. It is handed implementations of the traits in this module:
//! * [`SmmProviderApi`] - an upstream SMM provider speaking the standard panel API (v2).
//! * [`PaypalApi`] - PayPal Orders v2.
//! * [`CryptomusApi`] - Cryptomus invoices.
//!
//! Each remote vocabulary (provider order states, PayPal order statuses, Cryptomus payment statuses) is decoded into
//! a closed enum here, so that the translation onto internal states can be written once, exhaustively.
use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Money, Secret};

//--------------------------------------      RemoteApiError     -----------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum RemoteApiError {
    #[error("Could not reach the remote service. {0}")]
    Transport(String),
    #[error("The remote service returned HTTP {status}. {message}")]
    Http { status: u16, message: String },
    #[error("The remote service returned a response we could not understand. {0}")]
    InvalidResponse(String),
    #[error("The remote service rejected the request. {0}")]
    Rejected(String),
    #[error("The remote service is not configured correctly. {0}")]
    Configuration(String),
}

impl RemoteApiError {
    /// Transient failures may succeed on a later attempt: network errors, timeouts, 5xx responses and garbled bodies.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::InvalidResponse(_) => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::Rejected(_) | Self::Configuration(_) => false,
        }
    }
}

//--------------------------------------      SMM provider     -------------------------------------------------------
/// Where to find a provider, and how to authenticate with it.
#[derive(Debug, Clone, Default)]
pub struct ProviderEndpoint {
    pub url: String,
    pub api_key: Secret<String>,
}

impl ProviderEndpoint {
    pub fn new<S: Into<String>>(url: S, api_key: S) -> Self {
        Self { url: url.into(), api_key: Secret::new(api_key.into()) }
    }
}

/// The `add` action. Exactly one of `quantity` and `comments` is expected to be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderOrderRequest {
    pub service: String,
    pub link: String,
    pub quantity: Option<i64>,
    /// Newline-separated comment list for custom-comment services
    pub comments: Option<String>,
    pub runs: Option<i64>,
    pub interval: Option<i64>,
}

/// The order state vocabulary of the standard panel API. Providers are inconsistent about case and spacing
/// ("In progress", "in_progress", "Canceled"), so parsing is lenient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderOrderState {
    Pending,
    InProgress,
    Processing,
    Completed,
    Partial,
    Canceled,
    Refunded,
    Fail,
    Unknown(String),
}

impl FromStr for ProviderOrderState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        let state = match normalized.as_str() {
            "pending" => Self::Pending,
            "in progress" | "inprogress" => Self::InProgress,
            "processing" => Self::Processing,
            "completed" | "complete" | "success" => Self::Completed,
            "partial" => Self::Partial,
            "canceled" | "cancelled" => Self::Canceled,
            "refunded" => Self::Refunded,
            "fail" | "failed" => Self::Fail,
            _ => Self::Unknown(s.to_string()),
        };
        Ok(state)
    }
}

impl Display for ProviderOrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::InProgress => write!(f, "In progress"),
            Self::Processing => write!(f, "Processing"),
            Self::Completed => write!(f, "Completed"),
            Self::Partial => write!(f, "Partial"),
            Self::Canceled => write!(f, "Canceled"),
            Self::Refunded => write!(f, "Refunded"),
            Self::Fail => write!(f, "Fail"),
            Self::Unknown(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOrderStatus {
    pub status: ProviderOrderState,
    pub start_count: Option<i64>,
    pub remains: Option<i64>,
    pub charge: Option<Money>,
    pub currency: Option<String>,
}

impl ProviderOrderStatus {
    pub fn new(status: ProviderOrderState) -> Self {
        Self { status, start_count: None, remains: None, charge: None, currency: None }
    }

    pub fn with_counts(mut self, start_count: i64, remains: i64) -> Self {
        self.start_count = Some(start_count);
        self.remains = Some(remains);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderBalance {
    pub balance: Money,
    pub currency: String,
}

#[allow(async_fn_in_trait)]
pub trait SmmProviderApi {
    /// Submits an order and returns the provider's order id.
    async fn add_order(
        &self,
        endpoint: &ProviderEndpoint,
        order: &ProviderOrderRequest,
    ) -> Result<String, RemoteApiError>;

    async fn order_status(
        &self,
        endpoint: &ProviderEndpoint,
        remote_id: &str,
    ) -> Result<ProviderOrderStatus, RemoteApiError>;

    async fn balance(&self, endpoint: &ProviderEndpoint) -> Result<ProviderBalance, RemoteApiError>;
}

//--------------------------------------         PayPal         ------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaypalMode {
    #[default]
    Sandbox,
    Live,
}

#[derive(Debug, Clone, Default)]
pub struct PaypalCredentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub mode: PaypalMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaypalOrderRequest {
    /// The amount the payer is charged, fees included
    pub amount: Money,
    pub currency: String,
    /// Our own reference, sent as the purchase unit's `reference_id`
    pub reference: String,
    pub return_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaypalOrderStatus {
    Created,
    Saved,
    Approved,
    Voided,
    Completed,
    PayerActionRequired,
    Other(String),
}

impl FromStr for PaypalOrderStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s.trim().to_ascii_uppercase().as_str() {
            "CREATED" => Self::Created,
            "SAVED" => Self::Saved,
            "APPROVED" => Self::Approved,
            "VOIDED" => Self::Voided,
            "COMPLETED" => Self::Completed,
            "PAYER_ACTION_REQUIRED" => Self::PayerActionRequired,
            _ => Self::Other(s.to_string()),
        };
        Ok(status)
    }
}

impl Display for PaypalOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Saved => write!(f, "SAVED"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Voided => write!(f, "VOIDED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::PayerActionRequired => write!(f, "PAYER_ACTION_REQUIRED"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaypalOrder {
    pub id: String,
    pub status: PaypalOrderStatus,
    /// The `approve` (or `payer-action`) HATEOAS link, when PayPal supplies one
    pub approve_url: Option<String>,
}

#[allow(async_fn_in_trait)]
pub trait PaypalApi {
    async fn create_order(
        &self,
        credentials: &PaypalCredentials,
        order: &PaypalOrderRequest,
    ) -> Result<PaypalOrder, RemoteApiError>;

    async fn order_status(&self, credentials: &PaypalCredentials, order_id: &str) -> Result<PaypalOrder, RemoteApiError>;

    async fn capture_order(&self, credentials: &PaypalCredentials, order_id: &str)
        -> Result<PaypalOrder, RemoteApiError>;
}

//--------------------------------------        Cryptomus       ------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct CryptomusCredentials {
    pub merchant_id: String,
    pub payment_key: Secret<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptomusInvoiceRequest {
    pub amount: Money,
    pub currency: String,
    pub order_id: String,
    pub url_return: Option<String>,
    pub url_callback: Option<String>,
}

/// Cryptomus lets you look a payment up by either of its identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptomusPaymentLookup {
    Uuid(String),
    OrderId(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptomusPaymentStatus {
    Paid,
    PaidOver,
    WrongAmount,
    Process,
    ConfirmCheck,
    WrongAmountWaiting,
    Check,
    Fail,
    Cancel,
    SystemFail,
    RefundProcess,
    RefundFail,
    RefundPaid,
    Locked,
    Other(String),
}

impl FromStr for CryptomusPaymentStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s.trim().to_ascii_lowercase().as_str() {
            "paid" => Self::Paid,
            "paid_over" => Self::PaidOver,
            "wrong_amount" => Self::WrongAmount,
            "process" => Self::Process,
            "confirm_check" => Self::ConfirmCheck,
            "wrong_amount_waiting" => Self::WrongAmountWaiting,
            "check" => Self::Check,
            "fail" => Self::Fail,
            "cancel" => Self::Cancel,
            "system_fail" => Self::SystemFail,
            "refund_process" => Self::RefundProcess,
            "refund_fail" => Self::RefundFail,
            "refund_paid" => Self::RefundPaid,
            "locked" => Self::Locked,
            _ => Self::Other(s.to_string()),
        };
        Ok(status)
    }
}

impl Display for CryptomusPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Paid => "paid",
            Self::PaidOver => "paid_over",
            Self::WrongAmount => "wrong_amount",
            Self::Process => "process",
            Self::ConfirmCheck => "confirm_check",
            Self::WrongAmountWaiting => "wrong_amount_waiting",
            Self::Check => "check",
            Self::Fail => "fail",
            Self::Cancel => "cancel",
            Self::SystemFail => "system_fail",
            Self::RefundProcess => "refund_process",
            Self::RefundFail => "refund_fail",
            Self::RefundPaid => "refund_paid",
            Self::Locked => "locked",
            Self::Other(s) => s.as_str(),
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptomusInvoice {
    pub uuid: String,
    pub order_id: String,
    pub url: String,
    pub status: CryptomusPaymentStatus,
}

#[allow(async_fn_in_trait)]
pub trait CryptomusApi {
    async fn create_invoice(
        &self,
        credentials: &CryptomusCredentials,
        invoice: &CryptomusInvoiceRequest,
    ) -> Result<CryptomusInvoice, RemoteApiError>;

    async fn payment_info(
        &self,
        credentials: &CryptomusCredentials,
        lookup: &CryptomusPaymentLookup,
    ) -> Result<CryptomusInvoice, RemoteApiError>;
}
