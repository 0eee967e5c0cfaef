use super::{AccountManagement, CatalogManagement, CreditOutcome, DepositTransition, PanelDatabaseError, TransitionMode};
use crate::db_types::{Deposit, DepositDetail, DepositStatus, NewDeposit, NewOrder, Order, OrderProgress, OrderStatusType};

/// This trait defines the highest level of behaviour for backends supporting the panel core.
///
/// Every method that touches a balance does so in the same database transaction as the status write that causes it.
/// Balances are never set directly: they move only through guarded debits and credits, each recorded in the wallet
/// ledger against a unique cause.
#[allow(async_fn_in_trait)]
pub trait PanelDatabase: Clone + AccountManagement + CatalogManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// In a single atomic transaction,
    /// * debits `order.charge` from the user's wallet, failing with [`PanelDatabaseError::InsufficientBalance`] if the
    ///   balance would go negative,
    /// * inserts the order with status `PENDING`,
    /// * records the debit in the ledger against the new order.
    ///
    /// If any step fails, nothing is written.
    async fn insert_order_with_debit(&self, order: NewOrder) -> Result<Order, PanelDatabaseError>;

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, PanelDatabaseError>;

    /// Records the provider's order id after a successful dispatch.
    async fn mark_order_dispatched(&self, order_id: i64, pid: &str) -> Result<Order, PanelDatabaseError>;

    /// Flags the order as `ERROR` and stores the reason the dispatch failed. The debit stands.
    async fn mark_order_dispatch_failed(&self, order_id: i64, reason: &str) -> Result<Order, PanelDatabaseError>;

    /// Applies provider-reported progress to an order, but only if the order still has the `expected` status and is not
    /// terminal. Returns `None` if the guard did not match (the order moved on in the meantime).
    async fn apply_order_progress(
        &self,
        order_id: i64,
        expected: OrderStatusType,
        progress: OrderProgress,
    ) -> Result<Option<Order>, PanelDatabaseError>;

    /// Every non-terminal order that has been dispatched to a provider.
    async fn fetch_syncable_orders(&self) -> Result<Vec<Order>, PanelDatabaseError>;

    /// Writes the status unconditionally. There is no wallet effect.
    async fn set_order_status(&self, order_id: i64, status: OrderStatusType) -> Result<Order, PanelDatabaseError>;

    /// Removes the order row. The original debit and its ledger entry remain.
    async fn delete_order(&self, order_id: i64) -> Result<Order, PanelDatabaseError>;

    /// Credits the order's charge back to its owner (once, ever) and marks the order `CANCELED`, atomically.
    async fn refund_order(&self, order_id: i64) -> Result<(Order, CreditOutcome), PanelDatabaseError>;

    async fn insert_deposit(&self, deposit: NewDeposit) -> Result<Deposit, PanelDatabaseError>;

    async fn fetch_deposit(&self, deposit_id: i64) -> Result<Option<Deposit>, PanelDatabaseError>;

    async fn update_deposit_detail(
        &self,
        deposit_id: i64,
        detail: &DepositDetail,
    ) -> Result<Deposit, PanelDatabaseError>;

    /// The single guarded path for deposit status changes.
    ///
    /// The write is a compare-and-set against the status that was read, so a concurrent transition makes this call a
    /// no-op. In [`TransitionMode::Automatic`], terminal deposits are never changed. Entering `PAYMENT` credits the
    /// deposit amount to the user's wallet, in the same transaction, at most once per deposit.
    async fn transition_deposit(
        &self,
        deposit_id: i64,
        status: DepositStatus,
        mode: TransitionMode,
    ) -> Result<DepositTransition, PanelDatabaseError>;

    /// All `PENDING` deposits made through a gateway that can be polled (PayPal and Cryptomus).
    async fn fetch_pending_remote_deposits(&self) -> Result<Vec<Deposit>, PanelDatabaseError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PanelDatabaseError> {
        Ok(())
    }
}
