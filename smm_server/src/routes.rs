//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler here awaits the database or a remote service, so
//! they are all `async` and never block.
//!
//! The handlers are generic over the database backend and the remote clients so that the endpoint tests can swap in
//! mocks. The `route!` macro generates the service factories that actix needs for that.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use smm_common::remote::{CryptomusApi, PaypalApi, SmmProviderApi};
use smm_engine::{
    db_types::Role,
    deposit_objects::CreateDepositRequest,
    order_objects::PlaceOrderRequest,
    AccountApi,
    AccountManagement,
    AdminApi,
    DepositApi,
    OrderFlowApi,
    OrderSyncApi,
    PanelDatabase,
};

use crate::{
    auth::Caller,
    data_objects::{DepositStatusChange, DepositStatusUpdate, OrderStatusUpdate},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+ where requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Account  ----------------------------------------------------

route!(my_balance => Get "/balance" impl AccountManagement);
/// The caller's wallet balance and role.
pub async fn my_balance<B: AccountManagement>(
    caller: Caller,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET balance for user #{}", caller.user_id);
    let balance = api.balance(caller.user_id).await?;
    Ok(HttpResponse::Ok().json(balance))
}

route!(my_orders => Get "/orders" impl AccountManagement);
pub async fn my_orders<B: AccountManagement>(
    caller: Caller,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for user #{}", caller.user_id);
    let orders = api.orders_for_user(caller.user_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(my_deposits => Get "/deposits" impl AccountManagement);
pub async fn my_deposits<B: AccountManagement>(
    caller: Caller,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET deposits for user #{}", caller.user_id);
    let deposits = api.deposits_for_user(caller.user_id).await?;
    Ok(HttpResponse::Ok().json(deposits))
}

route!(my_ledger => Get "/ledger" impl AccountManagement);
/// Every credit and debit on the caller's wallet, newest first.
pub async fn my_ledger<B: AccountManagement>(
    caller: Caller,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET ledger for user #{}", caller.user_id);
    let entries = api.ledger_for_user(caller.user_id).await?;
    Ok(HttpResponse::Ok().json(entries))
}

//----------------------------------------------   Orders  ----------------------------------------------------

route!(place_order => Post "/orders" impl PanelDatabase, SmmProviderApi);
/// Places an order on the caller's wallet.
///
/// A provider refusing the order is not an HTTP error. The order is still created (and paid for), and the `dispatch`
/// field of the response says what happened.
pub async fn place_order<B, P>(
    caller: Caller,
    body: web::Json<PlaceOrderRequest>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: PanelDatabase,
    P: SmmProviderApi,
{
    let request = body.into_inner();
    debug!("💻️ POST order for service #{} from user #{}", request.service_id, caller.user_id);
    let placement = api.place_order(caller.user_id, request).await.map_err(|e| {
        debug!("💻️ Order was not placed. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(placement))
}

route!(check_order => Post "/orders/{order_id}/check" impl PanelDatabase, SmmProviderApi);
/// Refreshes an order from its provider. Users may only check their own orders.
pub async fn check_order<B, P>(
    caller: Caller,
    path: web::Path<i64>,
    api: web::Data<OrderSyncApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: PanelDatabase,
    P: SmmProviderApi,
{
    let order_id = path.into_inner();
    debug!("💻️ POST check order #{order_id}");
    let order = api.fetch_order(order_id).await?;
    caller.check_owner(order.user_id)?;
    let result = api.check_order_status(order_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Deposits  ----------------------------------------------------

route!(create_deposit => Post "/deposits" impl PanelDatabase, PaypalApi, CryptomusApi);
/// Opens a deposit for the caller. PayPal and Cryptomus deposits come back with a `redirect_url` for the payer.
pub async fn create_deposit<B, Pp, C>(
    caller: Caller,
    body: web::Json<CreateDepositRequest>,
    api: web::Data<DepositApi<B, Pp, C>>,
) -> Result<HttpResponse, ServerError>
where
    B: PanelDatabase,
    Pp: PaypalApi,
    C: CryptomusApi,
{
    let request = body.into_inner();
    debug!("💻️ POST deposit of {} for user #{}", request.amount, caller.user_id);
    let initiation = api.create_deposit(caller.user_id, request).await?;
    Ok(HttpResponse::Ok().json(initiation))
}

route!(check_deposit => Post "/deposits/{deposit_id}/check" impl PanelDatabase, PaypalApi, CryptomusApi);
pub async fn check_deposit<B, Pp, C>(
    caller: Caller,
    path: web::Path<i64>,
    api: web::Data<DepositApi<B, Pp, C>>,
) -> Result<HttpResponse, ServerError>
where
    B: PanelDatabase,
    Pp: PaypalApi,
    C: CryptomusApi,
{
    let deposit_id = path.into_inner();
    debug!("💻️ POST check deposit #{deposit_id}");
    let deposit = api.fetch_deposit(deposit_id).await?;
    caller.check_owner(deposit.user_id)?;
    let result = api.check_deposit_status(deposit_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(capture_deposit => Post "/deposits/{deposit_id}/capture" impl PanelDatabase, PaypalApi, CryptomusApi);
/// Captures an approved PayPal checkout. The payer's browser lands here (via the dashboard) after approving.
pub async fn capture_deposit<B, Pp, C>(
    caller: Caller,
    path: web::Path<i64>,
    api: web::Data<DepositApi<B, Pp, C>>,
) -> Result<HttpResponse, ServerError>
where
    B: PanelDatabase,
    Pp: PaypalApi,
    C: CryptomusApi,
{
    let deposit_id = path.into_inner();
    debug!("💻️ POST capture deposit #{deposit_id}");
    let deposit = api.fetch_deposit(deposit_id).await?;
    caller.check_owner(deposit.user_id)?;
    let result = api.capture_paypal_deposit(deposit_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Admin  ----------------------------------------------------

route!(sync_orders => Post "/admin/orders/sync" impl PanelDatabase, SmmProviderApi where requires [Role::Admin]);
pub async fn sync_orders<B, P>(api: web::Data<OrderSyncApi<B, P>>) -> Result<HttpResponse, ServerError>
where
    B: PanelDatabase,
    P: SmmProviderApi,
{
    debug!("💻️ POST sync all orders");
    let report = api.sync_all_orders().await?;
    Ok(HttpResponse::Ok().json(report))
}

route!(set_order_status => Put "/admin/orders/{order_id}/status" impl PanelDatabase where requires [Role::Admin]);
/// Forces an order into any status. The wallet is not touched.
pub async fn set_order_status<B: PanelDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<OrderStatusUpdate>,
    api: web::Data<AdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let status = body.into_inner().status;
    info!("💻️ Admin #{} is setting order #{order_id} to {status}", caller.user_id);
    let order = api.set_order_status(order_id, status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(delete_order => Delete "/admin/orders/{order_id}" impl PanelDatabase where requires [Role::Admin]);
pub async fn delete_order<B: PanelDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    api: web::Data<AdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    info!("💻️ Admin #{} is deleting order #{order_id}", caller.user_id);
    let order = api.delete_order(order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(refund_order => Post "/admin/orders/{order_id}/refund" impl PanelDatabase where requires [Role::Admin]);
pub async fn refund_order<B: PanelDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    api: web::Data<AdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    info!("💻️ Admin #{} is refunding order #{order_id}", caller.user_id);
    let result = api.refund_order(order_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(update_all_deposits => Post "/admin/deposits/update_all" impl PanelDatabase, PaypalApi, CryptomusApi where requires [Role::Admin]);
pub async fn update_all_deposits<B, Pp, C>(api: web::Data<DepositApi<B, Pp, C>>) -> Result<HttpResponse, ServerError>
where
    B: PanelDatabase,
    Pp: PaypalApi,
    C: CryptomusApi,
{
    debug!("💻️ POST update all deposits");
    let report = api.update_all_deposits().await?;
    Ok(HttpResponse::Ok().json(report))
}

route!(set_deposit_status => Put "/admin/deposits/{deposit_id}/status" impl PanelDatabase where requires [Role::Admin]);
/// Forces a deposit into any status. Moving it into `PAYMENT` credits the wallet once per deposit, ever.
pub async fn set_deposit_status<B: PanelDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<DepositStatusUpdate>,
    api: web::Data<AdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let deposit_id = path.into_inner();
    let status = body.into_inner().status;
    info!("💻️ Admin #{} is setting deposit #{deposit_id} to {status}", caller.user_id);
    let transition = api.set_deposit_status(deposit_id, status).await?;
    Ok(HttpResponse::Ok().json(DepositStatusChange::from(transition)))
}

route!(provider_balance => Post "/admin/providers/{provider_id}/balance" impl PanelDatabase, SmmProviderApi where requires [Role::Admin]);
pub async fn provider_balance<B, P>(
    path: web::Path<i64>,
    api: web::Data<OrderSyncApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: PanelDatabase,
    P: SmmProviderApi,
{
    let provider_id = path.into_inner();
    debug!("💻️ POST refresh balance for provider #{provider_id}");
    let provider = api.refresh_provider_balance(provider_id).await?;
    Ok(HttpResponse::Ok().json(provider))
}

route!(all_provider_balances => Post "/admin/providers/balance" impl PanelDatabase, SmmProviderApi where requires [Role::Admin]);
pub async fn all_provider_balances<B, P>(api: web::Data<OrderSyncApi<B, P>>) -> Result<HttpResponse, ServerError>
where
    B: PanelDatabase,
    P: SmmProviderApi,
{
    debug!("💻️ POST refresh all provider balances");
    let report = api.refresh_all_provider_balances().await?;
    Ok(HttpResponse::Ok().json(report))
}
