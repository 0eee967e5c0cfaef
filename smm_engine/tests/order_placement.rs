use smm_common::remote::{
    ProviderBalance,
    ProviderEndpoint,
    ProviderOrderRequest,
    ProviderOrderStatus,
    RemoteApiError,
    SmmProviderApi,
};
use smm_engine::{
    db_types::{ActiveStatus, OrderStatusType, Role, UserStatus},
    order_objects::{CommentsRangePolicy, DispatchOutcome, PlaceOrderRequest},
    test_utils::{
        fakes::FakeProvider,
        fixtures::{create_user, fund_user, money, seed_catalog},
        prepare_env::new_test_db,
    },
    AccountApi,
    AccountManagement,
    ErrorKind,
    OrderFlowApi,
    PanelDatabase,
    SqliteDatabase,
};

/// Accepts every order, but deletes it from the panel first, so that the pid can no longer be stored.
#[derive(Clone)]
struct VanishingOrderProvider {
    db: SqliteDatabase,
    user_id: i64,
}

impl SmmProviderApi for VanishingOrderProvider {
    async fn add_order(
        &self,
        _endpoint: &ProviderEndpoint,
        _order: &ProviderOrderRequest,
    ) -> Result<String, RemoteApiError> {
        for order in self.db.fetch_orders_for_user(self.user_id).await.unwrap() {
            self.db.delete_order(order.id).await.unwrap();
        }
        Ok("7001".into())
    }

    async fn order_status(
        &self,
        _endpoint: &ProviderEndpoint,
        _pid: &str,
    ) -> Result<ProviderOrderStatus, RemoteApiError> {
        Err(RemoteApiError::Rejected("Incorrect order ID".into()))
    }

    async fn balance(&self, _endpoint: &ProviderEndpoint) -> Result<ProviderBalance, RemoteApiError> {
        Err(RemoteApiError::Rejected("Not supported".into()))
    }
}

#[tokio::test]
async fn member_order_is_priced_debited_and_dispatched() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let user = create_user(&db, "alice", Role::Member).await;
    fund_user(&db, user.id, money("100.00")).await;
    let provider = FakeProvider::new();
    let api = OrderFlowApi::new(db.clone(), provider.clone());

    let request = PlaceOrderRequest::new(catalog.followers.id, "https://instagram.com/alice", 1000);
    let placement = api.place_order(user.id, request).await.expect("Order should be placed");

    assert_eq!(placement.dispatch, DispatchOutcome::Submitted { pid: "9001".into() });
    let order = placement.order;
    assert_eq!(order.charge, money("0.50"));
    assert_eq!(order.pid.as_deref(), Some("9001"));
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.remains, 1000);
    assert_eq!(order.price_sale, money("0.50"));
    assert_eq!(order.price_seller, money("0.40"));
    assert_eq!(order.price_api, money("0.30"));
    assert!(order.invoice.starts_with("ORD-"));

    let accounts = AccountApi::new(db.clone());
    assert_eq!(accounts.balance(user.id).await.unwrap().balance, money("99.50"));
    let ledger = accounts.ledger_for_user(user.id).await.unwrap();
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger[0].amount, -money("0.50"));
    assert_eq!(ledger[0].cause_id, order.id);

    let sent = provider.submitted();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].service, "101");
    assert_eq!(sent[0].quantity, Some(1000));
    assert_eq!(sent[0].comments, None);
}

#[tokio::test]
async fn resellers_pay_the_reseller_price() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let user = create_user(&db, "bulkbuyer", Role::Reseller).await;
    fund_user(&db, user.id, money("10.00")).await;
    let api = OrderFlowApi::new(db.clone(), FakeProvider::new());
    let request = PlaceOrderRequest::new(catalog.followers.id, "https://instagram.com/shop", 2500);
    let placement = api.place_order(user.id, request).await.unwrap();
    assert_eq!(placement.order.charge, money("1.00"));
}

#[tokio::test]
async fn insufficient_balance_changes_nothing() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let user = create_user(&db, "bob", Role::Member).await;
    fund_user(&db, user.id, money("0.10")).await;
    let provider = FakeProvider::new();
    let api = OrderFlowApi::new(db.clone(), provider.clone());

    let request = PlaceOrderRequest::new(catalog.followers.id, "https://instagram.com/bob", 1000);
    let err = api.place_order(user.id, request).await.expect_err("Order should be refused");
    assert_eq!(err.kind(), ErrorKind::InsufficientBalance);

    let accounts = AccountApi::new(db.clone());
    assert_eq!(accounts.balance(user.id).await.unwrap().balance, money("0.10"));
    assert!(accounts.orders_for_user(user.id).await.unwrap().is_empty());
    assert!(provider.submitted().is_empty());
}

#[tokio::test]
async fn quantity_and_link_are_validated() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let user = create_user(&db, "carol", Role::Member).await;
    fund_user(&db, user.id, money("50.00")).await;
    let api = OrderFlowApi::new(db.clone(), FakeProvider::new());

    let too_few = PlaceOrderRequest::new(catalog.followers.id, "https://instagram.com/carol", 99);
    assert_eq!(api.place_order(user.id, too_few).await.unwrap_err().kind(), ErrorKind::Validation);
    let too_many = PlaceOrderRequest::new(catalog.followers.id, "https://instagram.com/carol", 10_001);
    assert_eq!(api.place_order(user.id, too_many).await.unwrap_err().kind(), ErrorKind::Validation);
    let no_link = PlaceOrderRequest::new(catalog.followers.id, "   ", 500);
    assert_eq!(api.place_order(user.id, no_link).await.unwrap_err().kind(), ErrorKind::Validation);
    let mut no_quantity = PlaceOrderRequest::new(catalog.followers.id, "https://instagram.com/carol", 500);
    no_quantity.quantity = None;
    assert_eq!(api.place_order(user.id, no_quantity).await.unwrap_err().kind(), ErrorKind::Validation);
    let unknown = PlaceOrderRequest::new(9999, "https://instagram.com/carol", 500);
    assert_eq!(api.place_order(user.id, unknown).await.unwrap_err().kind(), ErrorKind::NotFound);

    let accounts = AccountApi::new(db.clone());
    assert_eq!(accounts.balance(user.id).await.unwrap().balance, money("50.00"));
}

#[tokio::test]
async fn inactive_services_and_banned_users_cannot_order() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let user = create_user(&db, "dave", Role::Member).await;
    fund_user(&db, user.id, money("50.00")).await;
    let api = OrderFlowApi::new(db.clone(), FakeProvider::new());

    db.set_service_status(catalog.followers.id, ActiveStatus::NotActive).await.unwrap();
    let request = PlaceOrderRequest::new(catalog.followers.id, "https://instagram.com/dave", 500);
    assert_eq!(api.place_order(user.id, request).await.unwrap_err().kind(), ErrorKind::Validation);

    db.set_user_status(user.id, UserStatus::Banned).await.unwrap();
    let request = PlaceOrderRequest::new(catalog.manual.id, "https://instagram.com/dave", 50);
    assert_eq!(api.place_order(user.id, request).await.unwrap_err().kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn inactive_provider_is_a_configuration_error_before_any_debit() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let user = create_user(&db, "erin", Role::Member).await;
    fund_user(&db, user.id, money("50.00")).await;
    db.set_provider_status(catalog.provider.id, ActiveStatus::NotActive).await.unwrap();
    let api = OrderFlowApi::new(db.clone(), FakeProvider::new());

    let request = PlaceOrderRequest::new(catalog.followers.id, "https://instagram.com/erin", 500);
    assert_eq!(api.place_order(user.id, request).await.unwrap_err().kind(), ErrorKind::Configuration);
    let user = db.fetch_user(user.id).await.unwrap().unwrap();
    assert_eq!(user.balance, money("50.00"));
}

#[tokio::test]
async fn custom_comments_set_the_quantity() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let user = create_user(&db, "frank", Role::Member).await;
    fund_user(&db, user.id, money("5.00")).await;
    let provider = FakeProvider::new();
    let api = OrderFlowApi::new(db.clone(), provider.clone());

    let comments = "Great post!\n\n  Love it  \nWow\n";
    let request = PlaceOrderRequest::with_comments(catalog.comments.id, "https://instagram.com/p/1", comments);
    let placement = api.place_order(user.id, request).await.unwrap();
    assert_eq!(placement.order.quantity, 3);
    assert_eq!(placement.order.comments.as_deref(), Some("Great post!\nLove it\nWow"));
    // 2.00 per 1000, 3 comments
    assert_eq!(placement.order.charge, money("0.006"));
    let sent = provider.submitted();
    assert_eq!(sent[0].quantity, None);
    assert_eq!(sent[0].comments.as_deref(), Some("Great post!\nLove it\nWow"));

    let blank = PlaceOrderRequest::with_comments(catalog.comments.id, "https://instagram.com/p/1", " \n \n");
    assert_eq!(api.place_order(user.id, blank).await.unwrap_err().kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn comment_count_range_follows_the_policy() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let user = create_user(&db, "grace", Role::Member).await;
    fund_user(&db, user.id, money("5.00")).await;
    let six = "a\nb\nc\nd\ne\nf";

    let strict = OrderFlowApi::new(db.clone(), FakeProvider::new());
    assert_eq!(strict.comments_policy(), CommentsRangePolicy::Enforce);
    let request = PlaceOrderRequest::with_comments(catalog.comments.id, "https://instagram.com/p/2", six);
    assert_eq!(strict.place_order(user.id, request).await.unwrap_err().kind(), ErrorKind::Validation);

    let lenient = OrderFlowApi::new(db.clone(), FakeProvider::new()).with_comments_policy(CommentsRangePolicy::Skip);
    let request = PlaceOrderRequest::with_comments(catalog.comments.id, "https://instagram.com/p/2", six);
    let placement = lenient.place_order(user.id, request).await.unwrap();
    assert_eq!(placement.order.quantity, 6);
}

#[tokio::test]
async fn drip_feed_charges_every_run() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let user = create_user(&db, "heidi", Role::Member).await;
    fund_user(&db, user.id, money("10.00")).await;
    let provider = FakeProvider::new();
    let api = OrderFlowApi::new(db.clone(), provider.clone());

    let request = PlaceOrderRequest::new(catalog.followers.id, "https://instagram.com/heidi", 1000).drip_feed(4, 30);
    let placement = api.place_order(user.id, request).await.unwrap();
    assert_eq!(placement.order.charge, money("2.00"));
    assert_eq!(placement.order.runs, Some(4));
    assert_eq!(placement.order.run_interval, Some(30));
    assert_eq!(provider.submitted()[0].runs, Some(4));
    assert_eq!(provider.submitted()[0].interval, Some(30));

    let no_interval = PlaceOrderRequest::new(catalog.followers.id, "https://instagram.com/heidi", 1000).drip_feed(4, 0);
    assert_eq!(api.place_order(user.id, no_interval).await.unwrap_err().kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn provider_refusal_keeps_the_debit_and_flags_the_order() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let user = create_user(&db, "ivan", Role::Member).await;
    fund_user(&db, user.id, money("100.00")).await;
    let provider = FakeProvider::new();
    provider.fail_next_order(RemoteApiError::Rejected("Not enough funds on balance".into()));
    let api = OrderFlowApi::new(db.clone(), provider.clone());

    let request = PlaceOrderRequest::new(catalog.followers.id, "https://instagram.com/ivan", 1000);
    let placement = api.place_order(user.id, request).await.expect("A provider refusal is not an order error");
    match &placement.dispatch {
        DispatchOutcome::Failed { reason } => assert!(reason.contains("Not enough funds")),
        other => panic!("Expected a failed dispatch, got {other:?}"),
    }
    assert_eq!(placement.order.status, OrderStatusType::Error);
    assert!(placement.order.provider_error.as_deref().unwrap_or_default().contains("Not enough funds"));
    assert_eq!(placement.order.pid, None);
    let user = db.fetch_user(user.id).await.unwrap().unwrap();
    assert_eq!(user.balance, money("99.50"));
}

#[tokio::test]
async fn services_without_a_provider_wait_for_manual_fulfilment() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let user = create_user(&db, "judy", Role::Member).await;
    fund_user(&db, user.id, money("1.00")).await;
    let provider = FakeProvider::new();
    let api = OrderFlowApi::new(db.clone(), provider.clone());

    let request = PlaceOrderRequest::new(catalog.manual.id, "https://instagram.com/judy", 100);
    let placement = api.place_order(user.id, request).await.unwrap();
    assert_eq!(placement.dispatch, DispatchOutcome::Manual);
    assert_eq!(placement.order.status, OrderStatusType::Pending);
    assert_eq!(placement.order.provider_id, None);
    assert_eq!(placement.order.charge, money("0.10"));
    assert!(provider.submitted().is_empty());
}

#[tokio::test]
async fn accepted_order_stays_submitted_when_the_pid_cannot_be_saved() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let user = create_user(&db, "vanishing", Role::Member).await;
    fund_user(&db, user.id, money("10.00")).await;
    let api = OrderFlowApi::new(db.clone(), VanishingOrderProvider { db: db.clone(), user_id: user.id });

    let request = PlaceOrderRequest::new(catalog.followers.id, "https://instagram.com/vanishing", 1000);
    let placement = api.place_order(user.id, request).await.expect("Accepted orders are not errors");
    assert_eq!(placement.dispatch, DispatchOutcome::Submitted { pid: "7001".into() });
    assert_eq!(placement.order.pid, None);
    assert!(db.fetch_order(placement.order.id).await.unwrap().is_none());
    // The provider has the order, so the debit stands.
    assert_eq!(db.fetch_user(user.id).await.unwrap().unwrap().balance, money("9.50"));
}
