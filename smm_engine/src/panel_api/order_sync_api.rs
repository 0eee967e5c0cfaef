use std::fmt::Debug;

use log::*;
use smm_common::remote::SmmProviderApi;

use crate::{
    db::traits::PanelDatabase,
    db_types::{ApiProvider, Order, OrderProgress},
    panel_api::{
        batch::BatchReport,
        errors::PanelApiError,
        order_objects::{OrderCheckResult, UnchangedReason},
        status_maps::order_status_for_provider_state,
    },
};

/// `OrderSyncApi` pulls order progress from providers and folds it into local order state.
///
/// Terminal orders are never touched, and every write is guarded on the status that was read before the provider was
/// asked, so a sync that races an admin override loses rather than clobbering it.
pub struct OrderSyncApi<B, P> {
    db: B,
    provider_client: P,
}

impl<B, P> Debug for OrderSyncApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderSyncApi")
    }
}

impl<B, P> OrderSyncApi<B, P> {
    pub fn new(db: B, provider_client: P) -> Self {
        Self { db, provider_client }
    }
}

impl<B, P> OrderSyncApi<B, P>
where
    B: PanelDatabase,
    P: SmmProviderApi,
{
    pub async fn fetch_order(&self, order_id: i64) -> Result<Order, PanelApiError> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| PanelApiError::NotFound(format!("Order #{order_id} does not exist")))
    }

    /// Asks the order's provider for its current status and applies it.
    pub async fn check_order_status(&self, order_id: i64) -> Result<OrderCheckResult, PanelApiError> {
        let order = self.fetch_order(order_id).await?;
        self.check_order(order).await
    }

    async fn check_order(&self, order: Order) -> Result<OrderCheckResult, PanelApiError> {
        let Some(provider_id) = order.provider_id else {
            return Err(PanelApiError::validation(format!("Order #{} is not fulfilled by a provider", order.id)));
        };
        if order.status.is_terminal() {
            trace!("🔄️📦️ Order #{} is {}. Not asking the provider", order.id, order.status);
            return Ok(OrderCheckResult::Unchanged { order, reason: UnchangedReason::Terminal });
        }
        let Some(pid) = order.pid.clone() else {
            return Err(PanelApiError::validation(format!("Order #{} has not been accepted by its provider", order.id)));
        };
        let provider = self.fetch_provider(provider_id).await?;
        let remote = self.provider_client.order_status(&provider.endpoint(), &pid).await?;
        let Some(status) = order_status_for_provider_state(&remote.status) else {
            warn!("🛰️📦️ Provider {} reports unknown status '{}' for order #{}", provider.code, remote.status, order.id);
            return Ok(OrderCheckResult::Unchanged { order, reason: UnchangedReason::UnknownProviderStatus });
        };
        let same_counts = remote.start_count.map_or(true, |c| c == order.start_count) &&
            remote.remains.map_or(true, |r| r == order.remains);
        if status == order.status && same_counts {
            return Ok(OrderCheckResult::Unchanged { order, reason: UnchangedReason::SameStatus });
        }
        let progress = OrderProgress { status, start_count: remote.start_count, remains: remote.remains };
        match self.db.apply_order_progress(order.id, order.status, progress).await? {
            Some(updated) => {
                info!("🔄️📦️ Order #{} moved from {} to {}", order.id, order.status, updated.status);
                Ok(OrderCheckResult::Updated { previous: order.status, order: updated })
            },
            None => {
                debug!("🔄️📦️ Order #{} changed while its provider was being queried. Leaving it alone", order.id);
                Ok(OrderCheckResult::Unchanged { order, reason: UnchangedReason::ConcurrentUpdate })
            },
        }
    }

    /// Checks every dispatched, non-terminal order. One order failing to sync does not stop the others.
    pub async fn sync_all_orders(&self) -> Result<BatchReport, PanelApiError> {
        let orders = self.db.fetch_syncable_orders().await?;
        debug!("🔄️📦️ Syncing {} orders with their providers", orders.len());
        let mut report = BatchReport::default();
        for order in orders {
            let id = order.id;
            match self.check_order(order).await {
                Ok(result) => report.record_success(result.is_updated()),
                Err(e) => {
                    warn!("🔄️📦️ Could not sync order #{id}. {e}");
                    report.record_failure(id, e.to_string());
                },
            }
        }
        info!("🔄️📦️ Order sync complete. {report}");
        Ok(report)
    }

    /// Fetches the provider's account balance and stores it against the provider.
    pub async fn refresh_provider_balance(&self, provider_id: i64) -> Result<ApiProvider, PanelApiError> {
        let provider = self
            .db
            .fetch_provider(provider_id)
            .await?
            .ok_or_else(|| PanelApiError::NotFound(format!("Provider #{provider_id} does not exist")))?;
        self.refresh_balance(&provider).await
    }

    pub async fn refresh_all_provider_balances(&self) -> Result<BatchReport, PanelApiError> {
        let providers = self.db.fetch_active_providers().await?;
        let mut report = BatchReport::default();
        for provider in providers {
            match self.refresh_balance(&provider).await {
                Ok(_) => report.record_success(true),
                Err(e) => {
                    warn!("🛰️💰️ Could not refresh the balance for provider {}. {e}", provider.code);
                    report.record_failure(provider.id, e.to_string());
                },
            }
        }
        info!("🛰️💰️ Provider balances refreshed. {report}");
        Ok(report)
    }

    async fn refresh_balance(&self, provider: &ApiProvider) -> Result<ApiProvider, PanelApiError> {
        let balance = self.provider_client.balance(&provider.endpoint()).await?;
        debug!("🛰️💰️ Provider {} balance is {} {}", provider.code, balance.balance, balance.currency);
        let updated = self.db.update_provider_balance(provider.id, balance.balance, &balance.currency).await?;
        Ok(updated)
    }

    async fn fetch_provider(&self, provider_id: i64) -> Result<ApiProvider, PanelApiError> {
        self.db
            .fetch_provider(provider_id)
            .await?
            .ok_or_else(|| PanelApiError::Configuration(format!("Provider #{provider_id} does not exist")))
    }
}
