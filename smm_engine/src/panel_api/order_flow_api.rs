use std::fmt::Debug;

use log::*;
use smm_common::{
    helpers::{is_blank, non_blank_lines},
    remote::{ProviderOrderRequest, SmmProviderApi},
};

use crate::{
    db::traits::PanelDatabase,
    db_types::{new_invoice_number, ActiveStatus, ApiProvider, NewOrder, Order, Service, ServiceType, UserStatus},
    panel_api::{
        errors::PanelApiError,
        order_objects::{CommentsRangePolicy, DispatchOutcome, OrderPlacement, PlaceOrderRequest},
    },
};

/// `OrderFlowApi` turns a user's order request into a priced, paid-for order and hands it to the fulfilling provider.
///
/// The wallet is debited before the provider is contacted. If the provider then refuses the order, the order is kept,
/// flagged `ERROR` with the provider's reason, and the funds stay debited until an admin refunds them.
pub struct OrderFlowApi<B, P> {
    db: B,
    provider_client: P,
    comments_policy: CommentsRangePolicy,
}

impl<B, P> Debug for OrderFlowApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({})", self.comments_policy)
    }
}

impl<B, P> OrderFlowApi<B, P> {
    pub fn new(db: B, provider_client: P) -> Self {
        Self { db, provider_client, comments_policy: CommentsRangePolicy::default() }
    }

    pub fn with_comments_policy(mut self, policy: CommentsRangePolicy) -> Self {
        self.comments_policy = policy;
        self
    }

    pub fn comments_policy(&self) -> CommentsRangePolicy {
        self.comments_policy
    }
}

/// The validated shape of an order, before pricing.
#[derive(Debug)]
struct OrderShape {
    quantity: i64,
    comments: Option<String>,
    runs: Option<i64>,
    interval: Option<i64>,
    /// `quantity` times the number of drip-feed runs
    billable_quantity: i64,
}

impl<B, P> OrderFlowApi<B, P>
where
    B: PanelDatabase,
    P: SmmProviderApi,
{
    /// Validates, prices and places an order for `user_id`, then dispatches it to the service's provider.
    ///
    /// Validation failures, an unknown user or service, and insufficient funds all leave the wallet untouched. Once the
    /// debit has happened, a provider failure is *not* an error: the order is returned with a
    /// [`DispatchOutcome::Failed`] outcome.
    pub async fn place_order(&self, user_id: i64, request: PlaceOrderRequest) -> Result<OrderPlacement, PanelApiError> {
        let link = request.link.trim().to_string();
        if is_blank(&link) {
            return Err(PanelApiError::validation("A link is required"));
        }
        let user = self
            .db
            .fetch_user(user_id)
            .await?
            .ok_or_else(|| PanelApiError::NotFound(format!("User #{user_id} does not exist")))?;
        if user.status != UserStatus::Active {
            return Err(PanelApiError::validation(format!("User #{user_id} may not place orders")));
        }
        let service = self
            .db
            .fetch_service(request.service_id)
            .await?
            .ok_or_else(|| PanelApiError::NotFound(format!("Service #{} does not exist", request.service_id)))?;
        if !service.status.is_active() {
            return Err(PanelApiError::validation(format!("Service #{} is not available", service.id)));
        }
        let shape = self.order_shape(&service, &request)?;
        let provider = self.resolve_provider(&service).await?;
        let unit_price = user.unit_price_for(&service);
        let charge = unit_price
            .per_thousand(shape.billable_quantity)
            .map_err(|e| PanelApiError::validation(e.to_string()))?;
        let new_order = NewOrder {
            invoice: new_invoice_number(),
            user_id,
            service_id: service.id,
            provider_id: provider.as_ref().map(|p| p.id),
            link,
            quantity: shape.quantity,
            comments: shape.comments,
            runs: shape.runs,
            run_interval: shape.interval,
            price_api: service.price_api,
            price_sale: service.price_sale,
            price_seller: service.price_reseller,
            charge,
            refill: service.refill,
        };
        let order = self.db.insert_order_with_debit(new_order).await?;
        info!("🔄️📦️ Order {} placed for user #{user_id}. {charge} debited for {}", order.invoice, service.name);
        match provider {
            Some(provider) => self.dispatch(order, &service, &provider).await,
            None => {
                debug!("🔄️📦️ Service #{} has no provider. Order {} awaits manual fulfilment", service.id, order.invoice);
                Ok(OrderPlacement { order, dispatch: DispatchOutcome::Manual })
            },
        }
    }

    fn order_shape(&self, service: &Service, request: &PlaceOrderRequest) -> Result<OrderShape, PanelApiError> {
        let (quantity, comments) = if service.service_type == ServiceType::CustomComments {
            let text = request.comments.as_deref().unwrap_or_default();
            let lines = non_blank_lines(text);
            if lines.is_empty() {
                return Err(PanelApiError::validation("At least one comment is required"));
            }
            let count = lines.len() as i64;
            if self.comments_policy == CommentsRangePolicy::Enforce {
                check_range(count, service)?;
            }
            (count, Some(lines.join("\n")))
        } else {
            let quantity = request.quantity.ok_or_else(|| PanelApiError::validation("A quantity is required"))?;
            check_range(quantity, service)?;
            (quantity, None)
        };
        let (runs, interval) = match request.runs {
            None | Some(1) => (None, None),
            Some(runs) if runs < 1 => {
                return Err(PanelApiError::validation("The number of runs must be at least 1"));
            },
            Some(runs) => match request.interval {
                Some(interval) if interval >= 1 => (Some(runs), Some(interval)),
                _ => return Err(PanelApiError::validation("Drip-feed orders need an interval of at least 1 minute")),
            },
        };
        let billable_quantity = quantity
            .checked_mul(runs.unwrap_or(1))
            .ok_or_else(|| PanelApiError::validation("The order is too large"))?;
        Ok(OrderShape { quantity, comments, runs, interval, billable_quantity })
    }

    /// The provider a service is bound to, if any. A bound provider that is missing or switched off is a configuration
    /// problem, and is detected before any money moves.
    async fn resolve_provider(&self, service: &Service) -> Result<Option<ApiProvider>, PanelApiError> {
        let Some(provider_id) = service.provider_id else {
            return Ok(None);
        };
        let provider = self.db.fetch_provider(provider_id).await?.ok_or_else(|| {
            PanelApiError::Configuration(format!(
                "Service #{} is bound to provider #{provider_id}, which does not exist",
                service.id
            ))
        })?;
        if provider.status != ActiveStatus::Active {
            return Err(PanelApiError::Configuration(format!(
                "Service #{} is bound to provider {}, which is not active",
                service.id, provider.code
            )));
        }
        if service.remote_service_id.as_deref().map(is_blank).unwrap_or(true) {
            return Err(PanelApiError::Configuration(format!(
                "Service #{} has no remote service id for provider {}",
                service.id, provider.code
            )));
        }
        Ok(Some(provider))
    }

    async fn dispatch(
        &self,
        order: Order,
        service: &Service,
        provider: &ApiProvider,
    ) -> Result<OrderPlacement, PanelApiError> {
        let request = ProviderOrderRequest {
            service: service.remote_service_id.clone().unwrap_or_default(),
            link: order.link.clone(),
            quantity: if order.comments.is_some() { None } else { Some(order.quantity) },
            comments: order.comments.clone(),
            runs: order.runs,
            interval: order.run_interval,
        };
        trace!("🛰️📦️ Sending order {} to provider {}", order.invoice, provider.code);
        match self.provider_client.add_order(&provider.endpoint(), &request).await {
            Ok(pid) => match self.db.mark_order_dispatched(order.id, &pid).await {
                Ok(order) => {
                    info!("🛰️📦️ Order {} accepted by {} as #{pid}", order.invoice, provider.code);
                    Ok(OrderPlacement { order, dispatch: DispatchOutcome::Submitted { pid } })
                },
                // The provider has the order and the money is spent, so this is still a submission. Without the pid
                // the order is invisible to sync until an admin links it.
                Err(e) => {
                    error!(
                        "🛰️📦️ Order {} (#{}) was accepted by {} as #{pid}, but the remote id could not be saved. {e}",
                        order.invoice, order.id, provider.code
                    );
                    Ok(OrderPlacement { order, dispatch: DispatchOutcome::Submitted { pid } })
                },
            },
            Err(e) => {
                let reason = e.to_string();
                warn!("🛰️📦️ Provider {} did not accept order {}. {reason}", provider.code, order.invoice);
                let order = self.db.mark_order_dispatch_failed(order.id, &reason).await?;
                Ok(OrderPlacement { order, dispatch: DispatchOutcome::Failed { reason } })
            },
        }
    }
}

fn check_range(quantity: i64, service: &Service) -> Result<(), PanelApiError> {
    if quantity < service.min_quantity || quantity > service.max_quantity {
        return Err(PanelApiError::validation(format!(
            "Quantity {quantity} is outside the allowed range of {} to {}",
            service.min_quantity, service.max_quantity
        )));
    }
    Ok(())
}
