use futures_util::future::join_all;
use log::*;
use smm_common::Money;
use smm_engine::{
    db_types::Role,
    order_objects::PlaceOrderRequest,
    test_utils::{
        fakes::FakeProvider,
        fixtures::{create_user, fund_user, money, seed_catalog},
        prepare_env::new_test_db,
    },
    AccountManagement,
    ErrorKind,
    OrderFlowApi,
};

const NUM_ORDERS: usize = 20;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_never_overdraw_the_wallet() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let user = create_user(&db, "burst", Role::Member).await;
    // Manual service: 1.00 per 1000, so each 100-unit order costs 0.10 and exactly 10 of them fit.
    fund_user(&db, user.id, money("1.00")).await;

    info!("🚀️ Injecting {NUM_ORDERS} concurrent orders");
    let tasks = (0..NUM_ORDERS).map(|i| {
        let db = db.clone();
        let service_id = catalog.manual.id;
        let user_id = user.id;
        tokio::spawn(async move {
            let api = OrderFlowApi::new(db, FakeProvider::new());
            let request = PlaceOrderRequest::new(service_id, format!("https://instagram.com/burst/{i}"), 100);
            api.place_order(user_id, request).await
        })
    });
    let results = join_all(tasks).await.into_iter().map(|r| r.expect("Task panicked")).collect::<Vec<_>>();

    let placed = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.kind() == ErrorKind::InsufficientBalance))
        .count();
    assert_eq!(placed, 10);
    assert_eq!(refused, NUM_ORDERS - 10);

    let user = db.fetch_user(user.id).await.unwrap().unwrap();
    assert_eq!(user.balance, Money::default());
    assert_eq!(db.fetch_orders_for_user(user.id).await.unwrap().len(), 10);
    assert_eq!(db.fetch_ledger_for_user(user.id).await.unwrap().len(), 11);
    info!("🚀️ test complete");
}
