use smm_engine::{
    db_types::{DepositDetail, NewDeposit, Role},
    order_objects::{DispatchOutcome, PlaceOrderRequest},
    test_utils::{
        fakes::FakeProvider,
        fixtures::{create_user, fund_user, money, seed_catalog},
        prepare_env::new_test_db,
    },
    OrderFlowApi,
    PanelDatabase,
};

const ROUNDS: usize = 50;

fn bank_transfer() -> DepositDetail {
    DepositDetail::Manual {
        bank_name: "First Bank".into(),
        account_name: "Panel Ltd".into(),
        account_number: "12-3456-7890".into(),
        instructions: String::new(),
        fee: money("0"),
    }
}

#[tokio::test]
async fn deposits_are_readable_as_soon_as_they_are_written() {
    let db = new_test_db().await;
    let user = create_user(&db, "writer", Role::Member).await;
    for i in 0..ROUNDS {
        let new_deposit =
            NewDeposit { user_id: user.id, gateway_id: None, amount: money("1.00"), detail: bank_transfer() };
        let deposit = db.insert_deposit(new_deposit).await.unwrap();
        let fetched = db.fetch_deposit(deposit.id).await.unwrap();
        assert!(fetched.is_some(), "Deposit #{} was not visible after insert (round {i})", deposit.id);

        let detail = DepositDetail::Paypal { order_id: Some(format!("PP-{i}")), approve_url: None, fee: money("0") };
        db.update_deposit_detail(deposit.id, &detail).await.unwrap();
        let fetched = db.fetch_deposit(deposit.id).await.unwrap().unwrap();
        assert_eq!(fetched.detail, detail, "Detail update was not visible (round {i})");
    }
}

#[tokio::test]
async fn dispatched_orders_are_immediately_syncable() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let user = create_user(&db, "dispatcher", Role::Member).await;
    fund_user(&db, user.id, money("100.00")).await;
    let api = OrderFlowApi::new(db.clone(), FakeProvider::new());
    for i in 0..ROUNDS {
        let request = PlaceOrderRequest::new(catalog.followers.id, format!("https://instagram.com/dispatcher/{i}"), 100);
        let placement = api.place_order(user.id, request).await.unwrap();
        let DispatchOutcome::Submitted { pid } = placement.dispatch else {
            panic!("Order was not submitted (round {i})");
        };
        let stored = db.fetch_order(placement.order.id).await.unwrap().unwrap();
        assert_eq!(stored.pid.as_deref(), Some(pid.as_str()), "pid was not visible (round {i})");
    }
    assert_eq!(db.fetch_syncable_orders().await.unwrap().len(), ROUNDS);
}
