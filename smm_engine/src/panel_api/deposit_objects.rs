use serde::{Deserialize, Serialize};
use smm_common::Money;

use crate::db_types::{Deposit, DepositStatus, GatewayProvider};

/// A request to fund the wallet. The gateway is chosen by id, or else the default gateway for `provider` is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDepositRequest {
    pub amount: Money,
    #[serde(default)]
    pub gateway_id: Option<i64>,
    #[serde(default)]
    pub provider: Option<GatewayProvider>,
}

impl CreateDepositRequest {
    pub fn via_gateway(gateway_id: i64, amount: Money) -> Self {
        Self { amount, gateway_id: Some(gateway_id), provider: None }
    }

    pub fn via_provider(provider: GatewayProvider, amount: Money) -> Self {
        Self { amount, gateway_id: None, provider: Some(provider) }
    }
}

/// Where the payer is sent back to after a hosted checkout. `{id}` is replaced with the deposit id.
#[derive(Debug, Clone, Default)]
pub struct DepositUrls {
    pub return_url: String,
    pub cancel_url: String,
    pub callback_url: Option<String>,
}

impl DepositUrls {
    pub fn return_url_for(&self, deposit_id: i64) -> String {
        self.return_url.replace("{id}", &deposit_id.to_string())
    }

    pub fn cancel_url_for(&self, deposit_id: i64) -> String {
        self.cancel_url.replace("{id}", &deposit_id.to_string())
    }

    pub fn callback_url_for(&self, deposit_id: i64) -> Option<String> {
        self.callback_url.as_ref().map(|u| u.replace("{id}", &deposit_id.to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DepositInitiation {
    pub deposit: Deposit,
    /// Deposit amount plus the gateway fee
    pub charged: Money,
    pub fee: Money,
    /// The hosted checkout page for PayPal and Cryptomus deposits
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DepositCheckResult {
    Updated { deposit: Deposit, previous: DepositStatus, credited: bool },
    Unchanged { deposit: Deposit },
    /// Manual and unrecognised gateways cannot be polled. This is not an error.
    NoAutoCheck { deposit: Deposit },
}

impl DepositCheckResult {
    pub fn deposit(&self) -> &Deposit {
        match self {
            Self::Updated { deposit, .. } | Self::Unchanged { deposit } | Self::NoAutoCheck { deposit } => deposit,
        }
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}
