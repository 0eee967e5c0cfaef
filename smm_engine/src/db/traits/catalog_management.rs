use smm_common::Money;

use super::PanelDatabaseError;
use crate::db_types::{ApiProvider, GatewayProvider, PaymentGateway, Service};

/// Reference data that orders and deposits are validated against.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn fetch_service(&self, service_id: i64) -> Result<Option<Service>, PanelDatabaseError>;

    async fn fetch_provider(&self, provider_id: i64) -> Result<Option<ApiProvider>, PanelDatabaseError>;

    async fn fetch_active_providers(&self) -> Result<Vec<ApiProvider>, PanelDatabaseError>;

    /// Stores the balance most recently reported by the provider. This is informational only.
    async fn update_provider_balance(
        &self,
        provider_id: i64,
        balance: Money,
        currency: &str,
    ) -> Result<ApiProvider, PanelDatabaseError>;

    async fn fetch_gateway(&self, gateway_id: i64) -> Result<Option<PaymentGateway>, PanelDatabaseError>;

    /// The default gateway for a provider type: the first active gateway of that type, by id.
    async fn fetch_default_gateway(
        &self,
        provider: GatewayProvider,
    ) -> Result<Option<PaymentGateway>, PanelDatabaseError>;
}
