use super::PanelDatabaseError;
use crate::db_types::{Deposit, LedgerEntry, Order, User};

/// Read-only queries behind the user dashboard.
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    /// Fetches the user with the given id. If no user exists, `None` is returned.
    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, PanelDatabaseError>;

    /// All orders placed by the user, newest first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, PanelDatabaseError>;

    /// All deposits initiated by the user, newest first.
    async fn fetch_deposits_for_user(&self, user_id: i64) -> Result<Vec<Deposit>, PanelDatabaseError>;

    /// The user's wallet history, newest first.
    async fn fetch_ledger_for_user(&self, user_id: i64) -> Result<Vec<LedgerEntry>, PanelDatabaseError>;
}
