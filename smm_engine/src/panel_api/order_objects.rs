use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType};

/// What a user submits to place an order. For custom-comment services, `comments` holds one comment per line and the
/// quantity is the number of non-blank lines; otherwise `quantity` is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub service_id: i64,
    pub link: String,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub comments: Option<String>,
    /// Drip-feed: the number of times the quantity is delivered
    #[serde(default)]
    pub runs: Option<i64>,
    /// Drip-feed: minutes between runs
    #[serde(default)]
    pub interval: Option<i64>,
}

impl PlaceOrderRequest {
    pub fn new<S: Into<String>>(service_id: i64, link: S, quantity: i64) -> Self {
        Self { service_id, link: link.into(), quantity: Some(quantity), ..Default::default() }
    }

    pub fn with_comments<S: Into<String>>(service_id: i64, link: S, comments: S) -> Self {
        Self { service_id, link: link.into(), comments: Some(comments.into()), ..Default::default() }
    }

    pub fn drip_feed(mut self, runs: i64, interval: i64) -> Self {
        self.runs = Some(runs);
        self.interval = Some(interval);
        self
    }
}

/// Whether the number of comments in a custom-comment order must lie within the service's quantity range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommentsRangePolicy {
    #[default]
    Enforce,
    /// Accept any non-zero number of comments.
    Skip,
}

impl FromStr for CommentsRangePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enforce" => Ok(Self::Enforce),
            "skip" => Ok(Self::Skip),
            other => Err(format!("{other} is not a valid comments range policy. Use 'enforce' or 'skip'")),
        }
    }
}

impl Display for CommentsRangePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enforce => f.write_str("enforce"),
            Self::Skip => f.write_str("skip"),
        }
    }
}

/// What happened when the order was handed to its provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Submitted { pid: String },
    /// The service is not bound to a provider. An admin fulfils it by hand.
    Manual,
    /// The provider did not accept the order. The order is flagged `ERROR` and the funds stay debited.
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderPlacement {
    pub order: Order,
    pub dispatch: DispatchOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnchangedReason {
    /// The order is already final. The provider was not asked.
    Terminal,
    /// The provider reports what we already have.
    SameStatus,
    /// The provider answered with a status we do not recognise.
    UnknownProviderStatus,
    /// The order changed while the provider was being asked.
    ConcurrentUpdate,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum OrderCheckResult {
    Updated { order: Order, previous: OrderStatusType },
    Unchanged { order: Order, reason: UnchangedReason },
}

impl OrderCheckResult {
    pub fn order(&self) -> &Order {
        match self {
            Self::Updated { order, .. } | Self::Unchanged { order, .. } => order,
        }
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundResult {
    pub order: Order,
    /// False if the order had already been refunded (or cost nothing)
    pub credited: bool,
}
