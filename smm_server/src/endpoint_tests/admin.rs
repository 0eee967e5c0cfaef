use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use serde_json::json;
use smm_common::{
    remote::{ProviderBalance, ProviderOrderState, ProviderOrderStatus},
    Money,
};
use smm_engine::{
    db_types::{DepositDetail, NewDeposit, Role},
    order_objects::PlaceOrderRequest,
    test_utils::{
        fakes::FakeProvider,
        fixtures::{create_user, fund_user, money, seed_catalog},
        prepare_env::new_test_db,
    },
    AccountApi,
    AdminApi,
    OrderFlowApi,
    OrderSyncApi,
    PanelDatabase,
    SqliteDatabase,
};

use super::{
    helpers::{as_admin, as_user, send_request},
    mocks::MockSmmProvider,
};
use crate::routes::{
    AllProviderBalancesRoute,
    DeleteOrderRoute,
    ProviderBalanceRoute,
    RefundOrderRoute,
    SetDepositStatusRoute,
    SetOrderStatusRoute,
    SyncOrdersRoute,
};

fn configure(db: SqliteDatabase, provider: MockSmmProvider) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let admin_api = AdminApi::new(db.clone());
        let sync_api = OrderSyncApi::new(db, provider);
        cfg.service(
            web::scope("/api")
                .service(SyncOrdersRoute::<SqliteDatabase, MockSmmProvider>::new())
                .service(SetOrderStatusRoute::<SqliteDatabase>::new())
                .service(DeleteOrderRoute::<SqliteDatabase>::new())
                .service(RefundOrderRoute::<SqliteDatabase>::new())
                .service(SetDepositStatusRoute::<SqliteDatabase>::new())
                .service(ProviderBalanceRoute::<SqliteDatabase, MockSmmProvider>::new())
                .service(AllProviderBalancesRoute::<SqliteDatabase, MockSmmProvider>::new()),
        )
        .app_data(web::Data::new(admin_api))
        .app_data(web::Data::new(sync_api));
    }
}

async fn pending_manual_deposit(db: &SqliteDatabase, user_id: i64, amount: Money) -> i64 {
    let detail = DepositDetail::Manual {
        bank_name: "First Bank".into(),
        account_name: "Panel Ltd".into(),
        account_number: "12-3456-7890".into(),
        instructions: String::new(),
        fee: Money::default(),
    };
    let deposit = db.insert_deposit(NewDeposit { user_id, gateway_id: None, amount, detail }).await.unwrap();
    deposit.id
}

#[actix_web::test]
async fn admin_routes_refuse_other_roles() {
    let db = new_test_db().await;
    let user = create_user(&db, "mallory", Role::Reseller).await;
    let deposit_id = pending_manual_deposit(&db, user.id, money("50.00")).await;

    let req = as_user(TestRequest::put().uri(&format!("/api/admin/deposits/{deposit_id}/status")), user.id)
        .set_json(json!({ "status": "PAYMENT" }))
        .insert_header(("smm_role", "RESELLER"));
    let (status, err) = send_request(req, configure(db.clone(), MockSmmProvider::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["kind"], "forbidden");

    let req = TestRequest::post().uri("/api/admin/orders/sync");
    let (status, _) = send_request(req, configure(db.clone(), MockSmmProvider::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let accounts = AccountApi::new(db);
    assert_eq!(accounts.balance(user.id).await.unwrap().balance, Money::default());
}

#[actix_web::test]
async fn deposit_override_credits_once() {
    let db = new_test_db().await;
    let admin = create_user(&db, "root", Role::Admin).await;
    let user = create_user(&db, "heidi", Role::Member).await;
    let deposit_id = pending_manual_deposit(&db, user.id, money("50.00")).await;
    let uri = format!("/api/admin/deposits/{deposit_id}/status");

    let req = as_admin(TestRequest::put().uri(&uri), admin.id).set_json(json!({ "status": "PAYMENT" }));
    let (status, change) = send_request(req, configure(db.clone(), MockSmmProvider::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(change["previous"], "PENDING");
    assert_eq!(change["credited"], true);

    // Flip it out of PAYMENT and back in again. The wallet is not credited a second time.
    for status in ["CANCELED", "PAYMENT"] {
        let req = as_admin(TestRequest::put().uri(&uri), admin.id).set_json(json!({ "status": status }));
        let (code, change) = send_request(req, configure(db.clone(), MockSmmProvider::new())).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(change["deposit"]["status"], status);
        assert_eq!(change["credited"], false);
    }

    let accounts = AccountApi::new(db);
    assert_eq!(accounts.balance(user.id).await.unwrap().balance, money("50.00"));
}

#[actix_web::test]
async fn order_overrides() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let admin = create_user(&db, "root", Role::Admin).await;
    let user = create_user(&db, "ivan", Role::Member).await;
    fund_user(&db, user.id, money("10.00")).await;
    let flow = OrderFlowApi::new(db.clone(), FakeProvider::new());
    let order = flow
        .place_order(user.id, PlaceOrderRequest::new(catalog.followers.id, "https://instagram.com/ivan", 2000))
        .await
        .unwrap()
        .order;

    let uri = format!("/api/admin/orders/{}/status", order.id);
    let req = as_admin(TestRequest::put().uri(&uri), admin.id).set_json(json!({ "status": "SUCCESS" }));
    let (status, updated) = send_request(req, configure(db.clone(), MockSmmProvider::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "COMPLETED");

    let req = as_admin(TestRequest::put().uri(&uri), admin.id).set_json(json!({ "status": "DELIVERED" }));
    let (status, err) = send_request(req, configure(db.clone(), MockSmmProvider::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["kind"], "validation");

    let uri = format!("/api/admin/orders/{}/refund", order.id);
    for expect_credit in [true, false] {
        let req = as_admin(TestRequest::post().uri(&uri), admin.id);
        let (status, refund) = send_request(req, configure(db.clone(), MockSmmProvider::new())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(refund["credited"], expect_credit);
        assert_eq!(refund["order"]["status"], "CANCELED");
    }
    let accounts = AccountApi::new(db.clone());
    assert_eq!(accounts.balance(user.id).await.unwrap().balance, money("10.00"));

    let uri = format!("/api/admin/orders/{}", order.id);
    let (status, deleted) =
        send_request(as_admin(TestRequest::delete().uri(&uri), admin.id), configure(db.clone(), MockSmmProvider::new()))
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["id"], order.id);
    let (status, _) =
        send_request(as_admin(TestRequest::delete().uri(&uri), admin.id), configure(db.clone(), MockSmmProvider::new()))
            .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(accounts.ledger_for_user(user.id).await.unwrap().len(), 3);
}

#[actix_web::test]
async fn sync_orders_and_provider_balances() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let admin = create_user(&db, "root", Role::Admin).await;
    let user = create_user(&db, "judy", Role::Member).await;
    fund_user(&db, user.id, money("10.00")).await;
    let flow = OrderFlowApi::new(db.clone(), FakeProvider::new());
    for link in ["https://instagram.com/judy", "https://instagram.com/judy/reel"] {
        flow.place_order(user.id, PlaceOrderRequest::new(catalog.followers.id, link, 1000)).await.unwrap();
    }

    let mut provider = MockSmmProvider::new();
    provider.expect_order_status().times(2).returning(|_, pid| {
        if pid == "9001" {
            Ok(ProviderOrderStatus::new(ProviderOrderState::Completed).with_counts(100, 0))
        } else {
            Ok(ProviderOrderStatus::new(ProviderOrderState::Pending))
        }
    });
    let req = as_admin(TestRequest::post().uri("/api/admin/orders/sync"), admin.id);
    let (status, report) = send_request(req, configure(db.clone(), provider)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total"], 2);
    assert_eq!(report["updated"], 1);
    assert_eq!(report["failed"], 0);

    let mut provider = MockSmmProvider::new();
    provider
        .expect_balance()
        .returning(|_| Ok(ProviderBalance { balance: "87.6543".parse().unwrap(), currency: "USD".into() }));
    let uri = format!("/api/admin/providers/{}/balance", catalog.provider.id);
    let req = as_admin(TestRequest::post().uri(&uri), admin.id);
    let (status, refreshed) = send_request(req, configure(db.clone(), provider)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refreshed["balance"], "87.6543");
    assert_eq!(refreshed["currency"], "USD");
    assert!(refreshed.get("api_key").is_none());

    let req = as_admin(TestRequest::post().uri("/api/admin/providers/9999/balance"), admin.id);
    let (status, _) = send_request(req, configure(db.clone(), MockSmmProvider::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut provider = MockSmmProvider::new();
    provider.expect_balance().returning(|_| Ok(ProviderBalance { balance: money("12.00"), currency: "USD".into() }));
    let req = as_admin(TestRequest::post().uri("/api/admin/providers/balance"), admin.id);
    let (status, report) = send_request(req, configure(db, provider)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["succeeded"], 1);
}
