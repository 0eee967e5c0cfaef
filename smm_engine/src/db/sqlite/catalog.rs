use log::debug;
use smm_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db::traits::PanelDatabaseError,
    db_types::{
        ActiveStatus,
        ApiProvider,
        Category,
        GatewayProvider,
        NewApiProvider,
        NewPaymentGateway,
        NewService,
        PaymentGateway,
        Service,
    },
};

pub async fn insert_category(name: &str, conn: &mut SqliteConnection) -> Result<Category, PanelDatabaseError> {
    let category: Category = sqlx::query_as("INSERT INTO categories (name) VALUES ($1) RETURNING *")
        .bind(name)
        .fetch_all(conn)
        .await?
        .into_iter()
        .next()
        .ok_or(sqlx::Error::RowNotFound)?;
    Ok(category)
}

pub async fn insert_service(service: NewService, conn: &mut SqliteConnection) -> Result<Service, PanelDatabaseError> {
    let service: Service = sqlx::query_as(
        r#"
            INSERT INTO services (
                category_id,
                name,
                min_quantity,
                max_quantity,
                price_api,
                price_sale,
                price_reseller,
                refill,
                service_type,
                provider_id,
                remote_service_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *;
        "#,
    )
    .bind(service.category_id)
    .bind(service.name)
    .bind(service.min_quantity)
    .bind(service.max_quantity)
    .bind(service.price_api)
    .bind(service.price_sale)
    .bind(service.price_reseller)
    .bind(service.refill)
    .bind(service.service_type)
    .bind(service.provider_id)
    .bind(service.remote_service_id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next()
    .ok_or(sqlx::Error::RowNotFound)?;
    debug!("🗃️ Created service #{} ({})", service.id, service.name);
    Ok(service)
}

pub async fn fetch_service(service_id: i64, conn: &mut SqliteConnection) -> Result<Option<Service>, PanelDatabaseError> {
    let service = sqlx::query_as("SELECT * FROM services WHERE id = $1").bind(service_id).fetch_optional(conn).await?;
    Ok(service)
}

pub async fn update_service_status(
    service_id: i64,
    status: ActiveStatus,
    conn: &mut SqliteConnection,
) -> Result<Service, PanelDatabaseError> {
    let service: Option<Service> =
        sqlx::query_as("UPDATE services SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(service_id)
            .fetch_all(conn)
            .await?
            .into_iter()
            .next();
    service.ok_or(PanelDatabaseError::ServiceNotFound(service_id))
}

/// Reprices a service. Orders already placed keep the prices they were placed at.
pub async fn update_service_prices(
    service_id: i64,
    price_api: Money,
    price_sale: Money,
    price_reseller: Money,
    conn: &mut SqliteConnection,
) -> Result<Service, PanelDatabaseError> {
    let service: Option<Service> = sqlx::query_as(
        r#"
            UPDATE services SET price_api = $1, price_sale = $2, price_reseller = $3, updated_at = CURRENT_TIMESTAMP
            WHERE id = $4
            RETURNING *
        "#,
    )
    .bind(price_api)
    .bind(price_sale)
    .bind(price_reseller)
    .bind(service_id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    service.ok_or(PanelDatabaseError::ServiceNotFound(service_id))
}

pub async fn insert_provider(
    provider: NewApiProvider,
    conn: &mut SqliteConnection,
) -> Result<ApiProvider, PanelDatabaseError> {
    let provider: ApiProvider =
        sqlx::query_as("INSERT INTO api_providers (name, code, url, api_key) VALUES ($1, $2, $3, $4) RETURNING *")
            .bind(provider.name)
            .bind(provider.code)
            .bind(provider.url)
            .bind(provider.api_key.reveal().as_str())
            .fetch_all(conn)
            .await?
            .into_iter()
            .next()
            .ok_or(sqlx::Error::RowNotFound)?;
    debug!("🗃️ Created API provider #{} ({})", provider.id, provider.code);
    Ok(provider)
}

pub async fn fetch_provider(
    provider_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<ApiProvider>, PanelDatabaseError> {
    let provider =
        sqlx::query_as("SELECT * FROM api_providers WHERE id = $1").bind(provider_id).fetch_optional(conn).await?;
    Ok(provider)
}

pub async fn fetch_active_providers(conn: &mut SqliteConnection) -> Result<Vec<ApiProvider>, PanelDatabaseError> {
    let providers = sqlx::query_as("SELECT * FROM api_providers WHERE status = $1 ORDER BY id")
        .bind(ActiveStatus::Active)
        .fetch_all(conn)
        .await?;
    Ok(providers)
}

pub async fn update_provider_balance(
    provider_id: i64,
    balance: Money,
    currency: &str,
    conn: &mut SqliteConnection,
) -> Result<ApiProvider, PanelDatabaseError> {
    let provider: Option<ApiProvider> = sqlx::query_as(
        r#"
            UPDATE api_providers SET balance = $1, currency = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING *
        "#,
    )
    .bind(balance)
    .bind(currency)
    .bind(provider_id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    provider.ok_or(PanelDatabaseError::ProviderNotFound(provider_id))
}

pub async fn update_provider_status(
    provider_id: i64,
    status: ActiveStatus,
    conn: &mut SqliteConnection,
) -> Result<ApiProvider, PanelDatabaseError> {
    let provider: Option<ApiProvider> =
        sqlx::query_as("UPDATE api_providers SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(provider_id)
            .fetch_all(conn)
            .await?
            .into_iter()
            .next();
    provider.ok_or(PanelDatabaseError::ProviderNotFound(provider_id))
}

pub async fn insert_gateway(
    gateway: NewPaymentGateway,
    conn: &mut SqliteConnection,
) -> Result<PaymentGateway, PanelDatabaseError> {
    let gateway: PaymentGateway = sqlx::query_as(
        "INSERT INTO payment_gateways (name, provider, min_deposit, config) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(gateway.name)
    .bind(gateway.provider)
    .bind(gateway.min_deposit)
    .bind(gateway.config.to_string())
    .fetch_all(conn)
    .await?
    .into_iter()
    .next()
    .ok_or(sqlx::Error::RowNotFound)?;
    debug!("🗃️ Created {} payment gateway #{} ({})", gateway.provider, gateway.id, gateway.name);
    Ok(gateway)
}

pub async fn fetch_gateway(
    gateway_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentGateway>, PanelDatabaseError> {
    let gateway =
        sqlx::query_as("SELECT * FROM payment_gateways WHERE id = $1").bind(gateway_id).fetch_optional(conn).await?;
    Ok(gateway)
}

pub async fn fetch_default_gateway(
    provider: GatewayProvider,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentGateway>, PanelDatabaseError> {
    let gateway = sqlx::query_as(
        "SELECT * FROM payment_gateways WHERE provider = $1 AND status = $2 ORDER BY id LIMIT 1",
    )
    .bind(provider)
    .bind(ActiveStatus::Active)
    .fetch_optional(conn)
    .await?;
    Ok(gateway)
}

pub async fn update_gateway_status(
    gateway_id: i64,
    status: ActiveStatus,
    conn: &mut SqliteConnection,
) -> Result<PaymentGateway, PanelDatabaseError> {
    let gateway: Option<PaymentGateway> = sqlx::query_as(
        "UPDATE payment_gateways SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(status)
    .bind(gateway_id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    gateway.ok_or_else(|| PanelDatabaseError::GatewayNotFound(format!("#{gateway_id}")))
}
