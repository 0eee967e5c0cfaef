use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use serde_json::json;
use smm_common::remote::{CryptomusInvoice, CryptomusPaymentStatus, PaypalOrder, PaypalOrderStatus};
use smm_engine::{
    db_types::Role,
    deposit_objects::DepositUrls,
    test_utils::{
        fixtures::{create_user, cryptomus_gateway, manual_gateway, paypal_gateway},
        prepare_env::new_test_db,
    },
    AccountApi,
    DepositApi,
    SqliteDatabase,
};

use super::{
    helpers::{as_user, send_request},
    mocks::{MockCryptomus, MockPaypal},
};
use crate::routes::{CaptureDepositRoute, CheckDepositRoute, CreateDepositRoute, MyBalanceRoute};

fn urls() -> DepositUrls {
    DepositUrls {
        return_url: "https://panel.test/deposits/{id}/return".into(),
        cancel_url: "https://panel.test/deposits/{id}/cancel".into(),
        callback_url: None,
    }
}

fn configure(db: SqliteDatabase, paypal: MockPaypal, cryptomus: MockCryptomus) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let deposit_api = DepositApi::new(db.clone(), paypal, cryptomus, urls());
        let accounts_api = AccountApi::new(db);
        cfg.service(
            web::scope("/api")
                .service(CreateDepositRoute::<SqliteDatabase, MockPaypal, MockCryptomus>::new())
                .service(CheckDepositRoute::<SqliteDatabase, MockPaypal, MockCryptomus>::new())
                .service(CaptureDepositRoute::<SqliteDatabase, MockPaypal, MockCryptomus>::new())
                .service(MyBalanceRoute::<SqliteDatabase>::new()),
        )
        .app_data(web::Data::new(deposit_api))
        .app_data(web::Data::new(accounts_api));
    }
}

#[actix_web::test]
async fn paypal_deposit_and_capture() {
    let db = new_test_db().await;
    paypal_gateway(&db, "5").await;
    let user = create_user(&db, "erin", Role::Member).await;
    let other = create_user(&db, "frank", Role::Member).await;

    let mut paypal = MockPaypal::new();
    paypal
        .expect_create_order()
        .withf(|_, order| order.amount.to_string() == "10.50" && order.reference.starts_with("DEP-"))
        .times(1)
        .returning(|_, _| {
            Ok(PaypalOrder {
                id: "PP-1".into(),
                status: PaypalOrderStatus::Created,
                approve_url: Some("https://www.sandbox.paypal.com/checkoutnow?token=PP-1".into()),
            })
        });
    let body = json!({ "amount": "10.00", "provider": "PAYPAL" });
    let req = as_user(TestRequest::post().uri("/api/deposits").set_json(body), user.id);
    let (status, initiation) = send_request(req, configure(db.clone(), paypal, MockCryptomus::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(initiation["fee"], "0.50");
    assert_eq!(initiation["charged"], "10.50");
    assert_eq!(initiation["redirect_url"], "https://www.sandbox.paypal.com/checkoutnow?token=PP-1");
    assert_eq!(initiation["deposit"]["status"], "PENDING");
    assert_eq!(initiation["deposit"]["detail"]["order_id"], "PP-1");
    let deposit_id = initiation["deposit"]["id"].as_i64().expect("deposit id");

    let mut paypal = MockPaypal::new();
    paypal.expect_capture_order().never();
    let uri = format!("/api/deposits/{deposit_id}/capture");
    let req = as_user(TestRequest::post().uri(&uri), other.id);
    let (status, err) = send_request(req, configure(db.clone(), paypal, MockCryptomus::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["kind"], "forbidden");

    let mut paypal = MockPaypal::new();
    paypal
        .expect_capture_order()
        .withf(|_, order_id| order_id == "PP-1")
        .times(1)
        .returning(|_, _| Ok(PaypalOrder { id: "PP-1".into(), status: PaypalOrderStatus::Completed, approve_url: None }));
    let req = as_user(TestRequest::post().uri(&uri), user.id);
    let (status, result) = send_request(req, configure(db.clone(), paypal, MockCryptomus::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["result"], "updated");
    assert_eq!(result["previous"], "PENDING");
    assert_eq!(result["credited"], true);
    assert_eq!(result["deposit"]["status"], "PAYMENT");

    // A second capture of a settled deposit does not reach PayPal and does not credit again
    let mut paypal = MockPaypal::new();
    paypal.expect_capture_order().never();
    let req = as_user(TestRequest::post().uri(&uri), user.id);
    let (status, result) = send_request(req, configure(db.clone(), paypal, MockCryptomus::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["result"], "unchanged");

    let req = as_user(TestRequest::get().uri("/api/balance"), user.id);
    let (_, balance) = send_request(req, configure(db, MockPaypal::new(), MockCryptomus::new())).await;
    assert_eq!(balance["balance"], "10.00");
}

#[actix_web::test]
async fn cryptomus_deposit_is_credited_on_check() {
    let db = new_test_db().await;
    cryptomus_gateway(&db).await;
    let user = create_user(&db, "grace", Role::Member).await;

    let mut cryptomus = MockCryptomus::new();
    cryptomus.expect_create_invoice().times(1).returning(|_, invoice| {
        Ok(CryptomusInvoice {
            uuid: "inv-uuid-1".into(),
            order_id: invoice.order_id.clone(),
            url: "https://pay.cryptomus.com/pay/inv-uuid-1".into(),
            status: CryptomusPaymentStatus::Check,
        })
    });
    let body = json!({ "amount": 20, "provider": "CRYPTOMUS" });
    let req = as_user(TestRequest::post().uri("/api/deposits").set_json(body), user.id);
    let (status, initiation) = send_request(req, configure(db.clone(), MockPaypal::new(), cryptomus)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(initiation["redirect_url"], "https://pay.cryptomus.com/pay/inv-uuid-1");
    let deposit_id = initiation["deposit"]["id"].as_i64().expect("deposit id");

    let mut cryptomus = MockCryptomus::new();
    cryptomus.expect_payment_info().times(1).returning(|_, _| {
        Ok(CryptomusInvoice {
            uuid: "inv-uuid-1".into(),
            order_id: "DEP-1".into(),
            url: "https://pay.cryptomus.com/pay/inv-uuid-1".into(),
            status: CryptomusPaymentStatus::Paid,
        })
    });
    let uri = format!("/api/deposits/{deposit_id}/check");
    let req = as_user(TestRequest::post().uri(&uri), user.id);
    let (status, result) = send_request(req, configure(db.clone(), MockPaypal::new(), cryptomus)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["result"], "updated");
    assert_eq!(result["credited"], true);

    let req = as_user(TestRequest::get().uri("/api/balance"), user.id);
    let (_, balance) = send_request(req, configure(db, MockPaypal::new(), MockCryptomus::new())).await;
    assert_eq!(balance["balance"], "20.00");
}

#[actix_web::test]
async fn manual_deposits_cannot_be_polled() {
    let db = new_test_db().await;
    manual_gateway(&db).await;
    let user = create_user(&db, "heidi", Role::Member).await;

    let body = json!({ "amount": "50.00", "provider": "MANUAL" });
    let req = as_user(TestRequest::post().uri("/api/deposits").set_json(body), user.id);
    let (status, initiation) = send_request(req, configure(db.clone(), MockPaypal::new(), MockCryptomus::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(initiation["redirect_url"], serde_json::Value::Null);
    assert_eq!(initiation["deposit"]["detail"]["provider"], "MANUAL");
    let deposit_id = initiation["deposit"]["id"].as_i64().expect("deposit id");

    let uri = format!("/api/deposits/{deposit_id}/check");
    let req = as_user(TestRequest::post().uri(&uri), user.id);
    let (status, result) = send_request(req, configure(db.clone(), MockPaypal::new(), MockCryptomus::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["result"], "no_auto_check");
    assert_eq!(result["deposit"]["status"], "PENDING");

    let uri = format!("/api/deposits/{deposit_id}/capture");
    let req = as_user(TestRequest::post().uri(&uri), user.id);
    let (status, err) = send_request(req, configure(db, MockPaypal::new(), MockCryptomus::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["kind"], "validation");
}

#[actix_web::test]
async fn deposit_validation() {
    let db = new_test_db().await;
    paypal_gateway(&db, "5").await;
    let user = create_user(&db, "ivan", Role::Member).await;

    let body = json!({ "amount": "1.00", "provider": "PAYPAL" });
    let req = as_user(TestRequest::post().uri("/api/deposits").set_json(body), user.id);
    let (status, err) = send_request(req, configure(db.clone(), MockPaypal::new(), MockCryptomus::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["kind"], "validation");

    let body = json!({ "amount": "10.00", "provider": "CRYPTOMUS" });
    let req = as_user(TestRequest::post().uri("/api/deposits").set_json(body), user.id);
    let (status, err) = send_request(req, configure(db.clone(), MockPaypal::new(), MockCryptomus::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["kind"], "not_found");

    let req = as_user(TestRequest::post().uri("/api/deposits/999/check"), user.id);
    let (status, _) = send_request(req, configure(db, MockPaypal::new(), MockCryptomus::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
