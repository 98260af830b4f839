//! Checkout, verification and order flow over HTTP, against a real SQLite backend and the fake gateway.
use actix_web::{http::StatusCode, test::TestRequest, web};
use market_common::Secret;
use market_engine::{
    db_types::{Money, NewIdentity, NewProduct, Role},
    events::EventProducers,
    helpers::{CommissionRate, GeoPoint},
    test_utils::{
        fake_gateway::FakeGateway,
        prepare_env::{fresh_database, tear_down},
    },
    CatalogManagement,
    CheckoutApi,
    CheckoutConfig,
    OrderFlowApi,
    SettlementConfig,
    SqliteDatabase,
    VerificationApi,
};
use paystack_tools::signature::{compute_signature, SIGNATURE_HEADER};
use serde_json::{json, Value};

use super::helpers::{as_user, send_public_request, send_request};
use crate::{
    middleware::WebhookSignatureFactory,
    routes::{
        AssignDeliveryAgentRoute,
        CheckoutRoute,
        InstallmentCheckoutRoute,
        PaystackWebhookRoute,
        SettleOrderRoute,
        UpdateOrderStatusRoute,
        VerifyPaymentPostRoute,
        VerifyPaymentRoute,
    },
};

const CUSTOMER: i64 = 1;
const VENDOR: i64 = 10;
const AGENT: i64 = 200;
const LAMP: i64 = 1;
const WEBHOOK_SECRET: &str = "sk_test_checkout_endpoints";

struct Market {
    db: SqliteDatabase,
    gateway: FakeGateway,
}

impl Market {
    async fn new() -> Self {
        let db = fresh_database().await;
        let lagos = GeoPoint::new(6.5244, 3.3792);
        db.upsert_identity(NewIdentity::new(CUSTOMER, "ada@example.com", Role::Customer).with_location(lagos))
            .await
            .unwrap();
        db.upsert_identity(NewIdentity::new(VENDOR, "lamps@example.com", Role::Vendor)).await.unwrap();
        db.upsert_identity(NewIdentity::new(AGENT, "rider@example.com", Role::DeliveryAgent)).await.unwrap();
        db.upsert_product(NewProduct::new(LAMP, VENDOR, "Brass lamp", Money::from_major(10_000))).await.unwrap();
        Self { db, gateway: FakeGateway::new() }
    }

    async fn fill_cart(&self) {
        self.db.set_cart_quantity(CUSTOMER, LAMP, 1).await.unwrap();
    }

    fn configure(&self) -> impl FnOnce(&mut web::ServiceConfig) {
        let db = self.db.clone();
        let gateway = self.gateway.clone();
        move |cfg| {
            let settlement = SettlementConfig::new(CommissionRate::default());
            cfg.app_data(web::Data::new(CheckoutApi::new(db.clone(), gateway.clone(), CheckoutConfig::default())))
                .app_data(web::Data::new(VerificationApi::new(db.clone(), gateway, EventProducers::default())))
                .app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default(), settlement)))
                .service(CheckoutRoute::<SqliteDatabase, FakeGateway>::new())
                .service(InstallmentCheckoutRoute::<SqliteDatabase, FakeGateway>::new())
                .service(VerifyPaymentRoute::<SqliteDatabase, FakeGateway>::new())
                .service(VerifyPaymentPostRoute::<SqliteDatabase, FakeGateway>::new())
                .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
                .service(AssignDeliveryAgentRoute::<SqliteDatabase>::new())
                .service(SettleOrderRoute::<SqliteDatabase>::new());
        }
    }

    fn configure_webhook(&self) -> impl FnOnce(&mut web::ServiceConfig) {
        let api = VerificationApi::new(self.db.clone(), self.gateway.clone(), EventProducers::default());
        move |cfg| {
            cfg.app_data(web::Data::new(api)).service(
                web::scope("/webhook")
                    .wrap(WebhookSignatureFactory::new(Secret::new(WEBHOOK_SECRET.to_string())))
                    .service(PaystackWebhookRoute::<SqliteDatabase, FakeGateway>::new()),
            );
        }
    }

    async fn call(&self, req: TestRequest, identity: &str) -> (StatusCode, Value) {
        let (status, body) = send_request(as_user(req, identity), self.configure()).await;
        let body = serde_json::from_str(&body).unwrap_or(Value::String(body));
        (status, body)
    }

    async fn checkout(&self) -> Value {
        self.fill_cart().await;
        let req = TestRequest::post().uri("/api/checkout/").set_json(json!({}));
        let (status, body) = self.call(req, "customer:1").await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }

    async fn send_webhook(&self, payload: Value) -> (StatusCode, String) {
        let body = payload.to_string();
        let signature = compute_signature(WEBHOOK_SECRET, body.as_bytes()).unwrap();
        let req =
            TestRequest::post().uri("/webhook/").insert_header((SIGNATURE_HEADER, signature)).set_payload(body);
        send_public_request(req, self.configure_webhook()).await
    }
}

#[actix_web::test]
async fn checkout_and_verify() {
    let market = Market::new().await;
    let checkout = market.checkout().await;
    let reference = checkout["reference"].as_str().unwrap().to_string();
    assert!(reference.starts_with("PAY-"));
    // Below the free delivery threshold
    assert_eq!(checkout["amount"], 1_000_000);
    assert_eq!(checkout["delivery_fee"], 0);

    let uri = format!("/api/verify-payment/?trxref={reference}");
    let (status, body) = market.call(TestRequest::get().uri(&uri), "customer:1").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Payment verified");
    assert_eq!(body["data"]["order"]["status"], "PAID");
    assert_eq!(body["data"]["order_paid"], true);

    let req = TestRequest::post().uri("/api/verify-payment/").set_json(json!({ "reference": reference }));
    let (status, body) = market.call(req, "customer:1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Payment already verified");
    assert_eq!(market.gateway.verify_calls(), 1);
    tear_down(market.db).await;
}

#[actix_web::test]
async fn other_customers_cannot_verify() {
    let market = Market::new().await;
    let checkout = market.checkout().await;
    let uri = format!("/api/verify-payment/?reference={}", checkout["reference"].as_str().unwrap());
    let (status, _) = market.call(TestRequest::get().uri(&uri), "customer:2").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = market.call(TestRequest::get().uri(&uri), "vendor:10").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = market.call(TestRequest::get().uri("/api/verify-payment/"), "customer:1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    tear_down(market.db).await;
}

#[actix_web::test]
async fn empty_cart() {
    let market = Market::new().await;
    let req = TestRequest::post().uri("/api/checkout/");
    let (status, body) = market.call(req, "customer:1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    let req = TestRequest::post().uri("/api/checkout/");
    let (status, _) = market.call(req, "vendor:10").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    tear_down(market.db).await;
}

#[actix_web::test]
async fn installment_checkout() {
    let market = Market::new().await;
    market.fill_cart().await;
    let req = TestRequest::post().uri("/api/checkout/installment/").set_json(json!({ "duration": "2_weeks" }));
    let (status, _) = market.call(req, "customer:1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = TestRequest::post().uri("/api/checkout/installment/").set_json(json!({ "duration": "3_months" }));
    let (status, body) = market.call(req, "customer:1").await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let data = &body["data"];
    assert_eq!(data["number_of_installments"], 3);
    let first = data["first_installment_reference"].as_str().unwrap();
    assert!(first.ends_with("-installment-1"), "{first}");
    assert_eq!(data["installments"].as_array().unwrap().len(), 3);
    tear_down(market.db).await;
}

#[actix_web::test]
async fn gateway_outage_during_checkout() {
    let market = Market::new().await;
    market.fill_cart().await;
    market.gateway.fail_initialization(market_engine::GatewayError::Timeout);
    let req = TestRequest::post().uri("/api/checkout/");
    let (status, _) = market.call(req, "customer:1").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    tear_down(market.db).await;
}

#[actix_web::test]
async fn webhook_confirms_payment() {
    let market = Market::new().await;
    let checkout = market.checkout().await;
    let reference = checkout["reference"].as_str().unwrap();
    let event = json!({ "event": "charge.success", "data": { "reference": reference, "status": "success" } });
    let (status, body) = market.send_webhook(event).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"ok"}"#);

    let uri = format!("/api/verify-payment/?reference={reference}");
    let (_, body) = market.call(TestRequest::get().uri(&uri), "customer:1").await;
    assert_eq!(body["message"], "Payment already verified");
    tear_down(market.db).await;
}

#[actix_web::test]
async fn webhooks_are_always_acknowledged() {
    let market = Market::new().await;
    let event = json!({ "event": "charge.success", "data": { "reference": "PAY-00000000000000000000000000000000" } });
    let (status, body) = market.send_webhook(event).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"ok"}"#);
    let (status, _) = market.send_webhook(json!({ "event": "transfer.success", "data": {} })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = market.send_webhook(json!(["not", "an", "event"])).await;
    assert_eq!(status, StatusCode::OK);
    tear_down(market.db).await;
}

#[actix_web::test]
async fn webhooks_are_redelivered_after_gateway_outage() {
    let market = Market::new().await;
    let checkout = market.checkout().await;
    let reference = checkout["reference"].as_str().unwrap();
    let event = json!({ "event": "charge.success", "data": { "reference": reference, "status": "success" } });
    market.gateway.fail_verification(market_engine::GatewayError::Timeout);
    let (status, body) = market.send_webhook(event.clone()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, r#"{"status":"retry"}"#);

    market.gateway.heal();
    let (status, body) = market.send_webhook(event).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"ok"}"#);
    let uri = format!("/api/verify-payment/?reference={reference}");
    let (_, body) = market.call(TestRequest::get().uri(&uri), "customer:1").await;
    assert_eq!(body["message"], "Payment already verified");
    assert_eq!(body["data"]["order"]["status"], "PAID");
    tear_down(market.db).await;
}

#[actix_web::test]
async fn deliver_and_settle() {
    let market = Market::new().await;
    let checkout = market.checkout().await;
    let order_id = checkout["order_id"].as_str().unwrap().to_string();
    let uri = format!("/api/verify-payment/?reference={}", checkout["reference"].as_str().unwrap());
    let (status, _) = market.call(TestRequest::get().uri(&uri), "customer:1").await;
    assert_eq!(status, StatusCode::OK);

    let status_uri = format!("/api/orders/{order_id}/status");
    let req = TestRequest::patch().uri(&status_uri).set_json(json!({ "status": "shipped" }));
    let (status, _) = market.call(req, "customer:1").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = TestRequest::post().uri(&format!("/api/orders/{order_id}/assign")).set_json(json!({ "agent_id": AGENT }));
    let (status, body) = market.call(req, "admin:100").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["delivery_agent_id"], AGENT);

    let req = TestRequest::patch().uri(&status_uri).set_json(json!({ "status": "shipped" }));
    let (status, body) = market.call(req, "admin:100").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"].get("settlement").is_none());

    let req = TestRequest::patch().uri(&status_uri).set_json(json!({ "status": "DELIVERED", "reason": "Signed for" }));
    let (status, body) = market.call(req, "admin:100").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let settlement = &body["data"]["settlement"];
    assert_eq!(settlement["already_settled"], false);
    assert_eq!(settlement["credited"].as_array().unwrap().len(), 1);
    // 10,000.00 less 10% commission
    assert_eq!(settlement["credited"][0]["vendor_share"], 900_000);
    assert_eq!(settlement["failed"].as_array().unwrap().len(), 0);

    let req = TestRequest::post().uri(&format!("/api/orders/{order_id}/settle"));
    let (status, body) = market.call(req, "admin:100").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["settlement"]["already_settled"], true);

    let req = TestRequest::patch().uri(&status_uri).set_json(json!({ "status": "PENDING" }));
    let (status, _) = market.call(req, "admin:100").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    tear_down(market.db).await;
}
