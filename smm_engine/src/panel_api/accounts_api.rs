use std::fmt::Debug;

use serde::Serialize;
use smm_common::Money;

use crate::{
    db::traits::AccountManagement,
    db_types::{Deposit, LedgerEntry, Order, Role, User},
    panel_api::errors::PanelApiError,
};

/// Read-only views of a user's wallet and history.
pub struct AccountApi<B> {
    db: B,
}

impl<B> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletBalance {
    pub user_id: i64,
    pub role: Role,
    pub balance: Money,
}

impl<B> AccountApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    pub async fn user(&self, user_id: i64) -> Result<User, PanelApiError> {
        self.db.fetch_user(user_id).await?.ok_or_else(|| PanelApiError::NotFound(format!("User #{user_id} does not exist")))
    }

    pub async fn balance(&self, user_id: i64) -> Result<WalletBalance, PanelApiError> {
        let user = self.user(user_id).await?;
        Ok(WalletBalance { user_id: user.id, role: user.role, balance: user.balance })
    }

    /// Newest first
    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, PanelApiError> {
        Ok(self.db.fetch_orders_for_user(user_id).await?)
    }

    pub async fn deposits_for_user(&self, user_id: i64) -> Result<Vec<Deposit>, PanelApiError> {
        Ok(self.db.fetch_deposits_for_user(user_id).await?)
    }

    pub async fn ledger_for_user(&self, user_id: i64) -> Result<Vec<LedgerEntry>, PanelApiError> {
        Ok(self.db.fetch_ledger_for_user(user_id).await?)
    }
}
