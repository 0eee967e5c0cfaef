//! # Database backend contracts
//!
//! These traits define what a storage backend must provide to run the panel core.
//!
//! * [`PanelDatabase`] holds every operation that moves money or changes an order or deposit status. Each of its
//!   methods is atomic: the status write and the wallet mutation it causes commit together, or not at all.
//! * [`CatalogManagement`] looks up the reference data that orders and deposits are validated against (services,
//!   providers, gateways) and updates cached provider balances.
//! * [`AccountManagement`] provides the read-only views used by the user dashboard.
mod account_management;
mod catalog_management;
mod data_objects;
mod panel_database;

pub use account_management::AccountManagement;
pub use catalog_management::CatalogManagement;
pub use data_objects::{CreditOutcome, DepositTransition, TransitionMode};
pub use panel_database::PanelDatabase;
use smm_common::Money;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PanelDatabaseError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User #{0} does not exist")]
    UserNotFound(i64),
    #[error("Service #{0} does not exist")]
    ServiceNotFound(i64),
    #[error("Order #{0} does not exist")]
    OrderNotFound(i64),
    #[error("Deposit #{0} does not exist")]
    DepositNotFound(i64),
    #[error("Provider #{0} does not exist")]
    ProviderNotFound(i64),
    #[error("Payment gateway {0} does not exist")]
    GatewayNotFound(String),
    #[error("Insufficient balance. Required {required}, but the balance is {balance}")]
    InsufficientBalance { balance: Money, required: Money },
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<sqlx::Error> for PanelDatabaseError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}
