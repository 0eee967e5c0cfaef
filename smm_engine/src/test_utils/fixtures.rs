use serde_json::json;
use smm_common::Money;

use crate::{
    db_types::{
        ApiProvider,
        Category,
        Deposit,
        DepositDetail,
        DepositStatus,
        GatewayProvider,
        NewApiProvider,
        NewDeposit,
        NewPaymentGateway,
        NewService,
        NewUser,
        PaymentGateway,
        Role,
        Service,
        ServiceType,
        User,
    },
    PanelDatabase,
    SqliteDatabase,
    TransitionMode,
};

pub fn money(value: &str) -> Money {
    value.parse().expect("Invalid money literal")
}

/// Reference data shared by most tests.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub category: Category,
    pub provider: ApiProvider,
    /// Member price 0.50/1000, reseller 0.40/1000, quantity 100 to 10 000. Fulfilled by `provider` as service "101".
    pub followers: Service,
    /// Custom comments at 2.00/1000, 2 to 5 comments. Fulfilled by `provider` as service "202".
    pub comments: Service,
    /// 1.00/1000, quantity 10 to 1000. No provider; fulfilled by hand.
    pub manual: Service,
}

pub async fn seed_catalog(db: &SqliteDatabase) -> Catalog {
    let category = db.create_category("Instagram").await.expect("Error creating category");
    let provider = db
        .create_provider(NewApiProvider::new("Upstream SMM", "upstream", "https://upstream.example/api/v2", "key-123"))
        .await
        .expect("Error creating provider");
    let followers = NewService::new(category.id, "Instagram followers", 100, 10_000)
        .with_prices(money("0.30"), money("0.50"), money("0.40"))
        .with_provider(provider.id, "101");
    let followers = db.create_service(followers).await.expect("Error creating service");
    let comments = NewService::new(category.id, "Instagram custom comments", 2, 5)
        .with_prices(money("1.00"), money("2.00"), money("1.50"))
        .with_type(ServiceType::CustomComments)
        .with_provider(provider.id, "202");
    let comments = db.create_service(comments).await.expect("Error creating service");
    let manual = NewService::new(category.id, "Hand-curated shoutout", 10, 1000)
        .with_prices(money("0.00"), money("1.00"), money("1.00"));
    let manual = db.create_service(manual).await.expect("Error creating service");
    Catalog { category, provider, followers, comments, manual }
}

pub async fn create_user(db: &SqliteDatabase, username: &str, role: Role) -> User {
    db.create_user(NewUser::new(username, role)).await.expect("Error creating user")
}

/// Credits `amount` to a user the only way balances ever change: through a paid deposit.
pub async fn fund_user(db: &SqliteDatabase, user_id: i64, amount: Money) -> Deposit {
    let detail = DepositDetail::Manual {
        bank_name: "Test bank".into(),
        account_name: "Panel Ltd".into(),
        account_number: "000-111".into(),
        instructions: String::new(),
        fee: Money::default(),
    };
    let deposit = db
        .insert_deposit(NewDeposit { user_id, gateway_id: None, amount, detail })
        .await
        .expect("Error creating deposit");
    db.transition_deposit(deposit.id, DepositStatus::Payment, TransitionMode::Override)
        .await
        .expect("Error paying deposit")
        .into_deposit()
}

pub async fn paypal_gateway(db: &SqliteDatabase, fee_percent: &str) -> PaymentGateway {
    let gateway = NewPaymentGateway {
        name: "PayPal".into(),
        provider: GatewayProvider::Paypal,
        min_deposit: money("5.00"),
        config: json!({
            "client_id": "paypal-client",
            "client_secret": "paypal-secret",
            "mode": "sandbox",
            "currency": "USD",
            "fee_percent": fee_percent,
        }),
    };
    db.create_gateway(gateway).await.expect("Error creating gateway")
}

pub async fn cryptomus_gateway(db: &SqliteDatabase) -> PaymentGateway {
    let gateway = NewPaymentGateway {
        name: "Cryptomus".into(),
        provider: GatewayProvider::Cryptomus,
        min_deposit: money("1.00"),
        config: json!({ "merchant_id": "merchant-uuid", "payment_key": "crypto-key", "currency": "USD" }),
    };
    db.create_gateway(gateway).await.expect("Error creating gateway")
}

pub async fn manual_gateway(db: &SqliteDatabase) -> PaymentGateway {
    let gateway = NewPaymentGateway {
        name: "Bank transfer".into(),
        provider: GatewayProvider::Manual,
        min_deposit: money("10.00"),
        config: json!({
            "bank_name": "First Bank",
            "account_name": "Panel Ltd",
            "account_number": "12-3456-7890",
            "instructions": "Use your username as the reference",
        }),
    };
    db.create_gateway(gateway).await.expect("Error creating gateway")
}
