use std::time::Duration;

use actix_web::{
    dev::Server,
    error::JsonPayloadError,
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpRequest,
    HttpServer,
};
use log::*;
use provider_tools::{CryptomusClient, PaypalClient, SmmProviderClient};
use smm_engine::{AccountApi, AdminApi, DepositApi, OrderFlowApi, OrderSyncApi, SqliteDatabase};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    reconcile_worker::start_reconcile_worker,
    routes::{
        health,
        AllProviderBalancesRoute,
        CaptureDepositRoute,
        CheckDepositRoute,
        CheckOrderRoute,
        CreateDepositRoute,
        DeleteOrderRoute,
        MyBalanceRoute,
        MyDepositsRoute,
        MyLedgerRoute,
        MyOrdersRoute,
        PlaceOrderRoute,
        ProviderBalanceRoute,
        RefundOrderRoute,
        SetDepositStatusRoute,
        SetOrderStatusRoute,
        SyncOrdersRoute,
        UpdateAllDepositsRoute,
    },
};

/// The remote clients the server talks to. They share connection pools, so cloning them is cheap.
#[derive(Clone)]
pub struct RemoteClients {
    pub provider: SmmProviderClient,
    pub paypal: PaypalClient,
    pub cryptomus: CryptomusClient,
}

impl RemoteClients {
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let init_error = |e: provider_tools::ClientInitError| ServerError::InitializeError(e.to_string());
        Ok(Self {
            provider: SmmProviderClient::new(&config.remote).map_err(init_error)?,
            paypal: PaypalClient::new(&config.remote).map_err(init_error)?,
            cryptomus: CryptomusClient::new(&config.remote).map_err(init_error)?,
        })
    }
}

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    let clients = RemoteClients::from_config(&config)?;
    let _worker = config.reconcile_interval.map(|interval| {
        start_reconcile_worker(db.clone(), clients.clone(), config.deposit_urls.clone(), interval)
    });
    let srv = create_server_instance(config, db, clients)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    clients: RemoteClients,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), clients.provider.clone())
            .with_comments_policy(config.comments_policy);
        let sync_api = OrderSyncApi::new(db.clone(), clients.provider.clone());
        let deposit_api =
            DepositApi::new(db.clone(), clients.paypal.clone(), clients.cryptomus.clone(), config.deposit_urls.clone());
        let admin_api = AdminApi::new(db.clone());
        let accounts_api = AccountApi::new(db.clone());
        let api_scope = web::scope("/api")
            .service(MyBalanceRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(MyDepositsRoute::<SqliteDatabase>::new())
            .service(MyLedgerRoute::<SqliteDatabase>::new())
            .service(PlaceOrderRoute::<SqliteDatabase, SmmProviderClient>::new())
            .service(CheckOrderRoute::<SqliteDatabase, SmmProviderClient>::new())
            .service(CreateDepositRoute::<SqliteDatabase, PaypalClient, CryptomusClient>::new())
            .service(CheckDepositRoute::<SqliteDatabase, PaypalClient, CryptomusClient>::new())
            .service(CaptureDepositRoute::<SqliteDatabase, PaypalClient, CryptomusClient>::new())
            .service(SyncOrdersRoute::<SqliteDatabase, SmmProviderClient>::new())
            .service(SetOrderStatusRoute::<SqliteDatabase>::new())
            .service(DeleteOrderRoute::<SqliteDatabase>::new())
            .service(RefundOrderRoute::<SqliteDatabase>::new())
            .service(UpdateAllDepositsRoute::<SqliteDatabase, PaypalClient, CryptomusClient>::new())
            .service(SetDepositStatusRoute::<SqliteDatabase>::new())
            .service(ProviderBalanceRoute::<SqliteDatabase, SmmProviderClient>::new())
            .service(AllProviderBalancesRoute::<SqliteDatabase, SmmProviderClient>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("smm::access_log"))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(sync_api))
            .app_data(web::Data::new(deposit_api))
            .app_data(web::Data::new(admin_api))
            .app_data(web::Data::new(accounts_api))
            .service(health)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Malformed request bodies get the same JSON error shape as every other failure.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!("💻️ Could not deserialize request body. {err}");
    ServerError::InvalidRequestBody(err.to_string()).into()
}
