use actix_web::{http::StatusCode, test::TestRequest, web};
use chrono::{TimeZone, Utc};
use market_engine::{
    db_types::{Money, OrderId, OrderItem, Payout, TransactionType, Wallet, WalletTransaction},
    helpers::CommissionRate,
    LedgerError,
    SettlementConfig,
    WalletApi,
};
use serde_json::{json, Value};

use super::{
    helpers::{as_user, send_request},
    mocks::MockLedgerManager,
};
use crate::routes::{MyWalletRoute, VendorBalancesRoute, WithdrawRoute};

fn configure(db: MockLedgerManager) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(WalletApi::new(db, SettlementConfig::new(CommissionRate::default()))))
            .service(MyWalletRoute::<MockLedgerManager>::new())
            .service(VendorBalancesRoute::<MockLedgerManager>::new())
            .service(WithdrawRoute::<MockLedgerManager>::new());
    }
}

fn wallet(user_id: i64, balance: Money) -> Wallet {
    let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
    Wallet { id: user_id + 100, user_id, balance, created_at, updated_at: created_at }
}

fn shipped_item(vendor_id: i64, price: Money, quantity: i64) -> OrderItem {
    OrderItem {
        id: 11,
        order_id: OrderId::from("ORD-9"),
        product_id: 3,
        vendor_id,
        product_name: "Ankara fabric".into(),
        quantity,
        price_at_purchase: price,
        commission_rate: None,
        commission: None,
        vendor_share: None,
        credited_at: None,
        created_at: Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap(),
    }
}

fn json_body(body: &str) -> Value {
    serde_json::from_str(body).expect("Response was not JSON")
}

#[actix_web::test]
async fn fetch_my_wallet() {
    let _ = env_logger::try_init().ok();
    let mut db = MockLedgerManager::new();
    db.expect_fetch_or_create_wallet().withf(|id| *id == 42).returning(|id| Ok(wallet(id, Money::from_major(1_000))));
    db.expect_fetch_wallet_transactions().withf(|id| *id == 42).returning(|_| {
        Ok(vec![WalletTransaction {
            id: 1,
            wallet_id: 142,
            transaction_type: TransactionType::Credit,
            amount: Money::from_major(1_000),
            source: "REFUND".into(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 3, 12, 0, 0).unwrap(),
        }])
    });
    let req = as_user(TestRequest::get().uri("/api/wallet"), "customer:42");
    let (status, body) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["data"]["wallet"]["balance"], 100_000);
    assert_eq!(body["data"]["transactions"][0]["transaction_type"], "CREDIT");
}

#[actix_web::test]
async fn vendor_balances_include_shipped_items() {
    let _ = env_logger::try_init().ok();
    let mut db = MockLedgerManager::new();
    db.expect_fetch_or_create_wallet().returning(|id| Ok(wallet(id, Money::from_major(5_000))));
    db.expect_fetch_pending_vendor_items()
        .withf(|id| *id == 7)
        .returning(|id| Ok(vec![shipped_item(id, Money::from_major(1_000), 2)]));
    let req = as_user(TestRequest::get().uri("/api/vendor/balances"), "vendor:7");
    let (status, body) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["data"]["available"], 500_000);
    // 2000.00 less 10% commission
    assert_eq!(body["data"]["pending"], 180_000);
}

#[actix_web::test]
async fn vendor_balances_for_customers_are_forbidden() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::get().uri("/api/vendor/balances"), "customer:42");
    let (status, _) = send_request(req, configure(MockLedgerManager::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn withdraw() {
    let _ = env_logger::try_init().ok();
    let mut db = MockLedgerManager::new();
    db.expect_withdraw().withf(|id, amount| *id == 7 && *amount == Money::from(250_050)).times(1).returning(
        |id, amount| {
            let payout = Payout {
                id: 1,
                user_id: id,
                amount,
                reference: "WD-1".into(),
                created_at: Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap(),
            };
            Ok((wallet(id, Money::from_major(500)), payout))
        },
    );
    let req =
        as_user(TestRequest::post().uri("/api/wallet/withdraw"), "vendor:7").set_json(json!({ "amount": "2500.50" }));
    let (status, body) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["data"]["payout"]["reference"], "WD-1");
    assert_eq!(body["data"]["wallet"]["balance"], 50_000);
}

#[actix_web::test]
async fn withdraw_more_than_balance() {
    let _ = env_logger::try_init().ok();
    let mut db = MockLedgerManager::new();
    db.expect_withdraw().returning(|_, amount| {
        Err(LedgerError::InsufficientFunds { requested: amount, available: Money::from_major(100) })
    });
    let req = as_user(TestRequest::post().uri("/api/wallet/withdraw"), "customer:42").set_json(json!({"amount": 500}));
    let (status, body) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["success"], false);
}

#[actix_web::test]
async fn withdraw_nothing() {
    let _ = env_logger::try_init().ok();
    // The backend must not be touched
    let db = MockLedgerManager::new();
    let req = as_user(TestRequest::post().uri("/api/wallet/withdraw"), "customer:42").set_json(json!({"amount": "0"}));
    let (status, _) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn admins_cannot_withdraw() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/api/wallet/withdraw"), "admin:1").set_json(json!({"amount": "10"}));
    let (status, _) = send_request(req, configure(MockLedgerManager::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
