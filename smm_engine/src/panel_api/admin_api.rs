use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::{DepositTransition, PanelDatabase, TransitionMode},
    db_types::{DepositStatus, Order, OrderStatusType},
    panel_api::{errors::PanelApiError, order_objects::RefundResult},
};

/// Operator overrides. Unlike reconciliation, these bypass the terminal-state guards.
pub struct AdminApi<B> {
    db: B,
}

impl<B> Debug for AdminApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AdminApi")
    }
}

impl<B> AdminApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> AdminApi<B>
where B: PanelDatabase
{
    /// Sets an order's status. This has no effect on the wallet; use [`Self::refund_order`] to return funds.
    pub async fn set_order_status(&self, order_id: i64, status: OrderStatusType) -> Result<Order, PanelApiError> {
        let order = self.db.set_order_status(order_id, status).await?;
        info!("🧑‍💼️📦️ Order #{order_id} manually set to {status}");
        Ok(order)
    }

    /// Sets a deposit's status, even if it is terminal. Moving a deposit into `PAYMENT` credits the wallet, unless that
    /// deposit has credited it before.
    pub async fn set_deposit_status(
        &self,
        deposit_id: i64,
        status: DepositStatus,
    ) -> Result<DepositTransition, PanelApiError> {
        let transition = self.db.transition_deposit(deposit_id, status, TransitionMode::Override).await?;
        match &transition {
            DepositTransition::Changed { previous, credit, .. } => {
                info!("🧑‍💼️💰️ Deposit #{deposit_id} manually moved from {previous} to {status}. Credit: {credit:?}");
            },
            DepositTransition::Unchanged(_) => debug!("🧑‍💼️💰️ Deposit #{deposit_id} is already {status}"),
        }
        Ok(transition)
    }

    /// Deletes the order record. The debit it caused stays on the ledger.
    pub async fn delete_order(&self, order_id: i64) -> Result<Order, PanelApiError> {
        let order = self.db.delete_order(order_id).await?;
        info!("🧑‍💼️📦️ Order #{order_id} ({}) deleted", order.invoice);
        Ok(order)
    }

    /// Returns an order's charge to its owner and cancels it. An order is only ever refunded once.
    pub async fn refund_order(&self, order_id: i64) -> Result<RefundResult, PanelApiError> {
        let (order, outcome) = self.db.refund_order(order_id).await?;
        let credited = outcome.was_credited();
        if credited {
            info!("🧑‍💼️💰️ Order #{order_id} refunded. {} returned to user #{}", order.charge, order.user_id);
        } else {
            debug!("🧑‍💼️💰️ Order #{order_id} was not refunded again ({outcome:?})");
        }
        Ok(RefundResult { order, credited })
    }
}
