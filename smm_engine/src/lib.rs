//! SMM Panel Engine
//!
//! The core of a social-media-marketing reseller panel: users hold a prepaid wallet, spend it on orders that are
//! fulfilled by upstream SMM providers, and top it up through PayPal, Cryptomus or manual bank transfer.
//!
//! The library is divided into two main sections:
//! 1. Database management ([`mod@db`]). SQLite is the supported backend. The data types stored in the database are
//!    defined in [`db_types`] and are public. Everything else goes through the traits re-exported here.
//! 2. The panel API ([`mod@panel_api`]): order placement, order and deposit reconciliation, admin overrides and
//!    account views. It is generic over the backend and over the remote provider and gateway clients, whose contracts
//!    live in `smm_common::remote`.
//!
//! Wallet balances only ever move through the ledger. Every debit or credit is recorded against a unique cause (an
//! order, a deposit or a refund), which is what makes repeated reconciliation and repeated admin overrides safe.
mod db;

pub mod db_types;
mod panel_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{db_url, SqliteDatabase};
pub use db::traits::{
    AccountManagement,
    CatalogManagement,
    CreditOutcome,
    DepositTransition,
    PanelDatabase,
    PanelDatabaseError,
    TransitionMode,
};
pub use panel_api::{
    accounts_api::{AccountApi, WalletBalance},
    admin_api::AdminApi,
    batch::{BatchFailure, BatchReport},
    deposit_api::DepositApi,
    deposit_objects,
    errors::{ErrorKind, PanelApiError},
    order_flow_api::OrderFlowApi,
    order_objects,
    order_sync_api::OrderSyncApi,
    status_maps,
};
