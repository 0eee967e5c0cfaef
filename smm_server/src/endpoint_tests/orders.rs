use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use serde_json::json;
use smm_common::remote::{ProviderOrderState, ProviderOrderStatus, RemoteApiError};
use smm_engine::{
    db_types::{OrderStatusType, Role},
    order_objects::PlaceOrderRequest,
    test_utils::{
        fakes::FakeProvider,
        fixtures::{create_user, fund_user, money, seed_catalog},
        prepare_env::new_test_db,
    },
    AccountApi,
    OrderFlowApi,
    OrderSyncApi,
    SqliteDatabase,
};

use super::{
    helpers::{as_admin, as_user, send_request},
    mocks::MockSmmProvider,
};
use crate::routes::{CheckOrderRoute, MyBalanceRoute, MyOrdersRoute, PlaceOrderRoute};

fn configure(db: SqliteDatabase, provider: MockSmmProvider) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let orders_api = OrderFlowApi::new(db.clone(), provider);
        let accounts_api = AccountApi::new(db);
        cfg.service(
            web::scope("/api")
                .service(PlaceOrderRoute::<SqliteDatabase, MockSmmProvider>::new())
                .service(MyOrdersRoute::<SqliteDatabase>::new())
                .service(MyBalanceRoute::<SqliteDatabase>::new()),
        )
        .app_data(web::Data::new(orders_api))
        .app_data(web::Data::new(accounts_api));
    }
}

fn configure_sync(db: SqliteDatabase, provider: MockSmmProvider) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let sync_api = OrderSyncApi::new(db, provider);
        cfg.service(web::scope("/api").service(CheckOrderRoute::<SqliteDatabase, MockSmmProvider>::new()))
            .app_data(web::Data::new(sync_api));
    }
}

#[actix_web::test]
async fn place_order() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let user = create_user(&db, "alice", Role::Member).await;
    fund_user(&db, user.id, money("10.00")).await;
    let mut provider = MockSmmProvider::new();
    provider
        .expect_add_order()
        .withf(|_, order| order.service == "101" && order.quantity == Some(1000))
        .times(1)
        .returning(|_, _| Ok("555".to_string()));

    let body = json!({ "service_id": catalog.followers.id, "link": "https://instagram.com/alice", "quantity": 1000 });
    let req = as_user(TestRequest::post().uri("/api/orders").set_json(body), user.id);
    let (status, placement) = send_request(req, configure(db.clone(), provider)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(placement["dispatch"], json!({ "outcome": "submitted", "pid": "555" }));
    assert_eq!(placement["order"]["charge"], "0.50");
    assert_eq!(placement["order"]["status"], "PENDING");

    let req = as_user(TestRequest::get().uri("/api/balance"), user.id);
    let (status, balance) = send_request(req, configure(db.clone(), MockSmmProvider::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance["balance"], "9.50");

    let req = as_user(TestRequest::get().uri("/api/orders"), user.id);
    let (status, orders) = send_request(req, configure(db, MockSmmProvider::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().map(|a| a.len()), Some(1));
}

#[actix_web::test]
async fn provider_refusal_is_reported_in_the_placement() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let user = create_user(&db, "bob", Role::Member).await;
    fund_user(&db, user.id, money("10.00")).await;
    let mut provider = MockSmmProvider::new();
    provider.expect_add_order().returning(|_, _| Err(RemoteApiError::Rejected("Incorrect service ID".into())));

    let body = json!({ "service_id": catalog.followers.id, "link": "https://instagram.com/bob", "quantity": 200 });
    let req = as_user(TestRequest::post().uri("/api/orders").set_json(body), user.id);
    let (status, placement) = send_request(req, configure(db, provider)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(placement["dispatch"]["outcome"], "failed");
    assert_eq!(placement["order"]["status"], "ERROR");
}

#[actix_web::test]
async fn insufficient_balance() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let user = create_user(&db, "carol", Role::Member).await;
    let mut provider = MockSmmProvider::new();
    provider.expect_add_order().never();

    let body = json!({ "service_id": catalog.followers.id, "link": "https://instagram.com/carol", "quantity": 1000 });
    let req = as_user(TestRequest::post().uri("/api/orders").set_json(body), user.id);
    let (status, err) = send_request(req, configure(db, provider)).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(err["kind"], "insufficient_balance");
}

#[actix_web::test]
async fn validation_errors() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let user = create_user(&db, "dave", Role::Member).await;
    fund_user(&db, user.id, money("10.00")).await;

    let body = json!({ "service_id": catalog.followers.id, "link": "https://instagram.com/dave", "quantity": 5 });
    let req = as_user(TestRequest::post().uri("/api/orders").set_json(body), user.id);
    let (status, err) = send_request(req, configure(db.clone(), MockSmmProvider::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["kind"], "validation");

    let req = as_user(
        TestRequest::post()
            .uri("/api/orders")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"service_id\": "),
        user.id,
    );
    let (status, err) = send_request(req, configure(db.clone(), MockSmmProvider::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["kind"], "validation");

    let body = json!({ "service_id": 9999, "link": "https://instagram.com/dave", "quantity": 500 });
    let req = as_user(TestRequest::post().uri("/api/orders").set_json(body), user.id);
    let (status, err) = send_request(req, configure(db, MockSmmProvider::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["kind"], "not_found");
}

#[actix_web::test]
async fn caller_identity_is_required() {
    let db = new_test_db().await;
    let req = TestRequest::get().uri("/api/balance");
    let (status, err) = send_request(req, configure(db.clone(), MockSmmProvider::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["kind"], "unauthorized");

    let req = TestRequest::get().uri("/api/balance").insert_header(("smm_user_id", "alice"));
    let (status, _) = send_request(req, configure(db, MockSmmProvider::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn check_order_status() {
    let db = new_test_db().await;
    let catalog = seed_catalog(&db).await;
    let owner = create_user(&db, "erin", Role::Member).await;
    let other = create_user(&db, "frank", Role::Member).await;
    fund_user(&db, owner.id, money("10.00")).await;
    let placement = OrderFlowApi::new(db.clone(), FakeProvider::new())
        .place_order(owner.id, PlaceOrderRequest::new(catalog.followers.id, "https://instagram.com/erin", 1000))
        .await
        .expect("Order should be placed");
    let uri = format!("/api/orders/{}/check", placement.order.id);

    let mut provider = MockSmmProvider::new();
    provider.expect_order_status().never();
    let req = as_user(TestRequest::post().uri(&uri), other.id);
    let (status, err) = send_request(req, configure_sync(db.clone(), provider)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["kind"], "forbidden");

    let mut provider = MockSmmProvider::new();
    provider
        .expect_order_status()
        .withf(|_, pid| pid == "9001")
        .returning(|_, _| Ok(ProviderOrderStatus::new(ProviderOrderState::InProgress).with_counts(120, 400)));
    let req = as_user(TestRequest::post().uri(&uri), owner.id);
    let (status, result) = send_request(req, configure_sync(db.clone(), provider)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["result"], "updated");
    assert_eq!(result["previous"], "PENDING");
    assert_eq!(result["order"]["status"], OrderStatusType::InProgress.to_string());
    assert_eq!(result["order"]["remains"], 400);

    let mut provider = MockSmmProvider::new();
    provider.expect_order_status().returning(|_, _| Err(RemoteApiError::Transport("operation timed out".into())));
    let req = as_admin(TestRequest::post().uri(&uri), other.id);
    let (status, err) = send_request(req, configure_sync(db, provider)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(err["kind"], "transient");
}
