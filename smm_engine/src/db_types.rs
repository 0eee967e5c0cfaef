use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use smm_common::{
    remote::{CryptomusCredentials, PaypalCredentials, PaypalMode, ProviderEndpoint},
    Money,
    Secret,
};
use sqlx::{sqlite::SqliteRow, FromRow, Row, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

/// Implements `Display` and `FromStr` for a unit-only enum using its SCREAMING_SNAKE_CASE database names.
macro_rules! db_enum_strings {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($text),)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ConversionError(format!("{other} is not a valid {}", stringify!($name)))),
                }
            }
        }
    };
}

//--------------------------------------        Role        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Member,
    Reseller,
    Admin,
}

db_enum_strings!(Role { Member => "MEMBER", Reseller => "RESELLER", Admin => "ADMIN" });

//--------------------------------------     UserStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Banned,
}

db_enum_strings!(UserStatus { Active => "ACTIVE", Banned => "BANNED" });

//--------------------------------------        User        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub balance: Money,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The per-1000 price this user pays for `service`. Members pay the sale price; resellers and admins pay the
    /// reseller price.
    pub fn unit_price_for(&self, service: &Service) -> Money {
        match self.role {
            Role::Member => service.price_sale,
            Role::Reseller | Role::Admin => service.price_reseller,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub role: Role,
}

impl NewUser {
    pub fn new<S: Into<String>>(username: S, role: Role) -> Self {
        Self { username: username.into(), role }
    }
}

//--------------------------------------   Active/NotActive  --------------------------------------------------------
/// The status flag shared by categories, services, providers and gateways.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActiveStatus {
    #[default]
    Active,
    NotActive,
}

db_enum_strings!(ActiveStatus { Active => "ACTIVE", NotActive => "NOT_ACTIVE" });

impl ActiveStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

//--------------------------------------      Category      ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub status: ActiveStatus,
}

//--------------------------------------    ServiceType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    #[default]
    Default,
    CustomComments,
    Package,
    Poll,
    Subscriptions,
}

db_enum_strings!(ServiceType {
    Default => "DEFAULT",
    CustomComments => "CUSTOM_COMMENTS",
    Package => "PACKAGE",
    Poll => "POLL",
    Subscriptions => "SUBSCRIPTIONS",
});

//--------------------------------------      Service       ---------------------------------------------------------
/// A sellable service. Prices are per 1000 units.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Service {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub min_quantity: i64,
    pub max_quantity: i64,
    pub price_api: Money,
    pub price_sale: Money,
    pub price_reseller: Money,
    pub refill: bool,
    pub service_type: ServiceType,
    pub provider_id: Option<i64>,
    pub remote_service_id: Option<String>,
    pub status: ActiveStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewService {
    pub category_id: i64,
    pub name: String,
    pub min_quantity: i64,
    pub max_quantity: i64,
    pub price_api: Money,
    pub price_sale: Money,
    pub price_reseller: Money,
    pub refill: bool,
    pub service_type: ServiceType,
    pub provider_id: Option<i64>,
    pub remote_service_id: Option<String>,
}

impl NewService {
    pub fn new<S: Into<String>>(category_id: i64, name: S, min_quantity: i64, max_quantity: i64) -> Self {
        Self {
            category_id,
            name: name.into(),
            min_quantity,
            max_quantity,
            price_api: Money::default(),
            price_sale: Money::default(),
            price_reseller: Money::default(),
            refill: false,
            service_type: ServiceType::Default,
            provider_id: None,
            remote_service_id: None,
        }
    }

    pub fn with_prices(mut self, api: Money, sale: Money, reseller: Money) -> Self {
        self.price_api = api;
        self.price_sale = sale;
        self.price_reseller = reseller;
        self
    }

    pub fn with_type(mut self, service_type: ServiceType) -> Self {
        self.service_type = service_type;
        self
    }

    pub fn with_provider<S: Into<String>>(mut self, provider_id: i64, remote_service_id: S) -> Self {
        self.provider_id = Some(provider_id);
        self.remote_service_id = Some(remote_service_id.into());
        self
    }

    pub fn with_refill(mut self, refill: bool) -> Self {
        self.refill = refill;
        self
    }
}

//--------------------------------------   OrderStatusType   --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// Paid for and waiting to be picked up by a provider or an admin.
    Pending,
    Processing,
    InProgress,
    Completed,
    /// The provider delivered part of the quantity. It may still complete.
    Partial,
    Canceled,
    /// Dispatch failed, or the provider reported a failure. Needs admin attention.
    Error,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled | Self::Error)
    }

    pub fn terminal_statuses() -> [OrderStatusType; 3] {
        [Self::Completed, Self::Canceled, Self::Error]
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Partial => "PARTIAL",
            Self::Canceled => "CANCELED",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    /// `SUCCESS` is an older name for `COMPLETED` and is accepted on input. It is never written.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace(' ', "_").as_str() {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" | "SUCCESS" => Ok(Self::Completed),
            "PARTIAL" => Ok(Self::Partial),
            "CANCELED" | "CANCELLED" => Ok(Self::Canceled),
            "ERROR" => Ok(Self::Error),
            other => Err(ConversionError(format!("{other} is not a valid order status"))),
        }
    }
}

impl<'de> Deserialize<'de> for OrderStatusType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    /// The user-facing order reference, `ORD-<yyyymmdd>-<8 hex digits>`
    pub invoice: String,
    pub user_id: i64,
    pub service_id: i64,
    pub provider_id: Option<i64>,
    /// The provider's order id, once dispatched
    pub pid: Option<String>,
    pub link: String,
    pub quantity: i64,
    pub comments: Option<String>,
    pub runs: Option<i64>,
    pub run_interval: Option<i64>,
    pub price_api: Money,
    pub price_sale: Money,
    pub price_seller: Money,
    /// What was actually debited from the wallet
    pub charge: Money,
    pub remains: i64,
    pub start_count: i64,
    pub refill: bool,
    pub status: OrderStatusType,
    pub provider_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_provider_bound(&self) -> bool {
        self.provider_id.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub invoice: String,
    pub user_id: i64,
    pub service_id: i64,
    pub provider_id: Option<i64>,
    pub link: String,
    pub quantity: i64,
    pub comments: Option<String>,
    pub runs: Option<i64>,
    pub run_interval: Option<i64>,
    pub price_api: Money,
    pub price_sale: Money,
    pub price_seller: Money,
    pub charge: Money,
    pub refill: bool,
}

/// Generates a fresh invoice number for an order placed now.
pub fn new_invoice_number() -> String {
    format!("ORD-{}-{:08x}", Utc::now().format("%Y%m%d"), rand::random::<u32>())
}

/// Progress reported by a provider for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderProgress {
    pub status: OrderStatusType,
    pub start_count: Option<i64>,
    pub remains: Option<i64>,
}

//--------------------------------------     ApiProvider    ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ApiProvider {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub url: String,
    #[sqlx(try_from = "String")]
    #[serde(skip)]
    pub api_key: Secret<String>,
    pub balance: Option<Money>,
    pub currency: Option<String>,
    pub status: ActiveStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApiProvider {
    pub fn endpoint(&self) -> ProviderEndpoint {
        ProviderEndpoint { url: self.url.clone(), api_key: self.api_key.clone() }
    }
}

#[derive(Debug, Clone)]
pub struct NewApiProvider {
    pub name: String,
    pub code: String,
    pub url: String,
    pub api_key: Secret<String>,
}

impl NewApiProvider {
    pub fn new<S: Into<String>>(name: S, code: S, url: S, api_key: S) -> Self {
        Self { name: name.into(), code: code.into(), url: url.into(), api_key: Secret::new(api_key.into()) }
    }
}

//--------------------------------------   PaymentGateway   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayProvider {
    Paypal,
    Cryptomus,
    Manual,
}

db_enum_strings!(GatewayProvider { Paypal => "PAYPAL", Cryptomus => "CRYPTOMUS", Manual => "MANUAL" });

#[derive(Debug, Clone, Deserialize)]
pub struct PaypalConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    #[serde(default)]
    pub mode: PaypalMode,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub fee_percent: Money,
}

impl PaypalConfig {
    pub fn credentials(&self) -> PaypalCredentials {
        PaypalCredentials { client_id: self.client_id.clone(), client_secret: self.client_secret.clone(), mode: self.mode }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CryptomusConfig {
    pub merchant_id: String,
    pub payment_key: Secret<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub fee_percent: Money,
}

impl CryptomusConfig {
    pub fn credentials(&self) -> CryptomusCredentials {
        CryptomusCredentials { merchant_id: self.merchant_id.clone(), payment_key: self.payment_key.clone() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualConfig {
    #[serde(default)]
    pub bank_name: String,
    #[serde(default)]
    pub account_name: String,
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub fee_percent: Money,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Gateway settings, decoded from the stored JSON according to the gateway's provider tag.
#[derive(Debug, Clone)]
pub enum GatewayConfig {
    Paypal(PaypalConfig),
    Cryptomus(CryptomusConfig),
    Manual(ManualConfig),
    /// The stored settings could not be decoded. Any attempt to use the gateway is a configuration error.
    Invalid(String),
}

impl GatewayConfig {
    pub fn decode(provider: GatewayProvider, json: &str) -> Self {
        let result = match provider {
            GatewayProvider::Paypal => serde_json::from_str(json).map(Self::Paypal),
            GatewayProvider::Cryptomus => serde_json::from_str(json).map(Self::Cryptomus),
            GatewayProvider::Manual => serde_json::from_str(json).map(Self::Manual),
        };
        result.unwrap_or_else(|e| {
            warn!("🗃️ Stored {provider} gateway settings are invalid. {e}");
            Self::Invalid(format!("{provider} gateway settings are invalid: {e}"))
        })
    }

    pub fn fee_percent(&self) -> Money {
        match self {
            Self::Paypal(c) => c.fee_percent,
            Self::Cryptomus(c) => c.fee_percent,
            Self::Manual(c) => c.fee_percent,
            Self::Invalid(_) => Money::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentGateway {
    pub id: i64,
    pub name: String,
    pub provider: GatewayProvider,
    pub min_deposit: Money,
    #[serde(skip)]
    pub config: GatewayConfig,
    pub status: ActiveStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for PaymentGateway {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let provider: GatewayProvider = row.try_get("provider")?;
        let config: String = row.try_get("config")?;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            provider,
            min_deposit: row.try_get("min_deposit")?,
            config: GatewayConfig::decode(provider, &config),
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewPaymentGateway {
    pub name: String,
    pub provider: GatewayProvider,
    pub min_deposit: Money,
    /// Provider-specific settings, see [`PaypalConfig`], [`CryptomusConfig`] and [`ManualConfig`]
    pub config: serde_json::Value,
}

//--------------------------------------    DepositStatus    --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepositStatus {
    Pending,
    /// The payment was confirmed and the wallet has been credited.
    Payment,
    Error,
    Canceled,
}

db_enum_strings!(DepositStatus { Pending => "PENDING", Payment => "PAYMENT", Error => "ERROR", Canceled => "CANCELED" });

impl DepositStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

//--------------------------------------    DepositDetail    --------------------------------------------------------
/// Gateway-specific transaction data for a deposit, stored as JSON and tagged by provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepositDetail {
    Paypal {
        order_id: Option<String>,
        approve_url: Option<String>,
        fee: Money,
    },
    Cryptomus {
        order_id: String,
        uuid: Option<String>,
        pay_url: Option<String>,
        fee: Money,
    },
    Manual {
        bank_name: String,
        account_name: String,
        account_number: String,
        instructions: String,
        fee: Money,
    },
    #[serde(other)]
    Unsupported,
}

impl DepositDetail {
    pub fn provider_tag(&self) -> &'static str {
        match self {
            Self::Paypal { .. } => "PAYPAL",
            Self::Cryptomus { .. } => "CRYPTOMUS",
            Self::Manual { .. } => "MANUAL",
            Self::Unsupported => "UNSUPPORTED",
        }
    }

    pub fn decode(json: &str) -> Self {
        serde_json::from_str(json).unwrap_or_else(|e| {
            warn!("🗃️ Could not decode deposit detail. Treating it as unsupported. {e}");
            Self::Unsupported
        })
    }

    pub fn encode(&self) -> String {
        // Every variant holds only strings and Money, so serialization cannot fail
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"provider":"UNSUPPORTED"}"#.to_string())
    }
}

//--------------------------------------       Deposit       --------------------------------------------------------
#[derive(Debug, Clone, Serialize)]
pub struct Deposit {
    pub id: i64,
    pub user_id: i64,
    pub gateway_id: Option<i64>,
    /// The amount credited to the wallet on payment. Fees are charged on top.
    pub amount: Money,
    pub status: DepositStatus,
    pub detail: DepositDetail,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for Deposit {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let detail: String = row.try_get("detail")?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            gateway_id: row.try_get("gateway_id")?,
            amount: row.try_get("amount")?,
            status: row.try_get("status")?,
            detail: DepositDetail::decode(&detail),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewDeposit {
    pub user_id: i64,
    pub gateway_id: Option<i64>,
    pub amount: Money,
    pub detail: DepositDetail,
}

//--------------------------------------     LedgerCause     --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerCause {
    Order,
    Deposit,
    Refund,
}

db_enum_strings!(LedgerCause { Order => "ORDER", Deposit => "DEPOSIT", Refund => "REFUND" });

/// The event a wallet mutation belongs to. A cause can move a wallet at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CauseRef {
    pub cause: LedgerCause,
    pub id: i64,
}

impl CauseRef {
    pub fn order(id: i64) -> Self {
        Self { cause: LedgerCause::Order, id }
    }

    pub fn deposit(id: i64) -> Self {
        Self { cause: LedgerCause::Deposit, id }
    }

    pub fn refund(order_id: i64) -> Self {
        Self { cause: LedgerCause::Refund, id: order_id }
    }
}

impl Display for CauseRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.cause, self.id)
    }
}

//--------------------------------------     LedgerEntry     --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: i64,
    /// Signed: credits are positive, debits negative
    pub amount: Money,
    pub cause: LedgerCause,
    pub cause_id: i64,
    pub balance_after: Money,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
}
