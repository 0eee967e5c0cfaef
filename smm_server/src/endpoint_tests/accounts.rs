use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use smm_engine::{
    db_types::Role,
    test_utils::{
        fixtures::{create_user, fund_user, money},
        prepare_env::new_test_db,
    },
    AccountApi,
    SqliteDatabase,
};

use super::helpers::{as_user, send_request};
use crate::routes::{MyBalanceRoute, MyDepositsRoute, MyLedgerRoute};

fn configure(db: SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(
            web::scope("/api")
                .service(MyBalanceRoute::<SqliteDatabase>::new())
                .service(MyDepositsRoute::<SqliteDatabase>::new())
                .service(MyLedgerRoute::<SqliteDatabase>::new()),
        )
        .app_data(web::Data::new(AccountApi::new(db)));
    }
}

#[actix_web::test]
async fn wallet_views() {
    let db = new_test_db().await;
    let user = create_user(&db, "grace", Role::Reseller).await;
    let deposit = fund_user(&db, user.id, money("25.00")).await;

    let (status, balance) = send_request(as_user(TestRequest::get().uri("/api/balance"), user.id), configure(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance["balance"], "25.00");
    assert_eq!(balance["role"], "RESELLER");

    let (status, deposits) =
        send_request(as_user(TestRequest::get().uri("/api/deposits"), user.id), configure(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deposits[0]["id"], deposit.id);
    assert_eq!(deposits[0]["status"], "PAYMENT");

    let (status, ledger) = send_request(as_user(TestRequest::get().uri("/api/ledger"), user.id), configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ledger[0]["cause"], "DEPOSIT");
    assert_eq!(ledger[0]["amount"], "25.00");
}

#[actix_web::test]
async fn unknown_user() {
    let db = new_test_db().await;
    let (status, err) = send_request(as_user(TestRequest::get().uri("/api/balance"), 404), configure(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["kind"], "not_found");
}
