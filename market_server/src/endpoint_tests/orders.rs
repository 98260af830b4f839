use actix_web::{http::StatusCode, test::TestRequest, web};
use market_engine::{db_types::OrderId, OrdersApi};
use serde_json::Value;

use super::{
    helpers::{as_user, sample_order, send_request},
    mocks::MockOrderQuerier,
};
use crate::routes::{MyOrdersRoute, OrderDetailsRoute, OrderLogsRoute, SearchOrdersRoute};

fn configure(db: MockOrderQuerier) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(OrdersApi::new(db)))
            .service(SearchOrdersRoute::<MockOrderQuerier>::new())
            .service(MyOrdersRoute::<MockOrderQuerier>::new())
            .service(OrderLogsRoute::<MockOrderQuerier>::new())
            .service(OrderDetailsRoute::<MockOrderQuerier>::new());
    }
}

fn json(body: &str) -> Value {
    serde_json::from_str(body).expect("Response was not JSON")
}

#[actix_web::test]
async fn fetch_my_orders_without_identity() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_request(TestRequest::get().uri("/api/orders"), configure(MockOrderQuerier::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let body = json(&body);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("No identity"));
}

#[actix_web::test]
async fn fetch_my_orders_with_forged_signature() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::get().uri("/api/orders"), "customer:42").insert_header(("x-market-user", "admin:1"));
    let (status, _) = send_request(req, configure(MockOrderQuerier::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn fetch_my_orders_as_customer() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderQuerier::new();
    db.expect_search_orders()
        .withf(|q| q.customer_id == Some(42) && q.vendor_id.is_none())
        .times(1)
        .returning(|_| Ok(vec![sample_order("ORD-1", 42)]));
    let req = as_user(TestRequest::get().uri("/api/orders"), "customer:42");
    let (status, body) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"][0]["order_id"], "ORD-1");
    assert_eq!(body["data"][0]["total_price"], 1_750_000);
}

#[actix_web::test]
async fn vendors_see_orders_with_their_products() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderQuerier::new();
    db.expect_search_orders()
        .withf(|q| q.vendor_id == Some(7) && q.customer_id.is_none())
        .times(1)
        .returning(|_| Ok(vec![]));
    let req = as_user(TestRequest::get().uri("/api/orders"), "vendor:7");
    let (status, body) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["data"], Value::Array(vec![]));
}

#[actix_web::test]
async fn order_details_for_owner() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderQuerier::new();
    db.expect_fetch_order()
        .withf(|id| id.as_str() == "ORD-1")
        .returning(|_| Ok(Some(sample_order("ORD-1", 42))));
    db.expect_fetch_order_items().returning(|_| Ok(vec![]));
    db.expect_fetch_payment_for_order().returning(|_| Ok(None));
    db.expect_fetch_plan_for_order().returning(|_| Ok(None));
    db.expect_fetch_status_history().returning(|_| Ok(vec![]));
    let req = as_user(TestRequest::get().uri("/api/orders/ORD-1"), "customer:42");
    let (status, body) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["data"]["order"]["order_id"], "ORD-1");
    assert_eq!(body["data"]["installments"], Value::Array(vec![]));
}

#[actix_web::test]
async fn order_details_are_hidden_from_other_customers() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderQuerier::new();
    db.expect_fetch_order().returning(|_| Ok(Some(sample_order("ORD-1", 42))));
    db.expect_fetch_order_items().returning(|_| Ok(vec![]));
    db.expect_fetch_payment_for_order().returning(|_| Ok(None));
    db.expect_fetch_plan_for_order().returning(|_| Ok(None));
    db.expect_fetch_status_history().returning(|_| Ok(vec![]));
    let req = as_user(TestRequest::get().uri("/api/orders/ORD-1"), "customer:43");
    let (status, body) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["success"], false);
}

#[actix_web::test]
async fn unknown_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderQuerier::new();
    db.expect_fetch_order().returning(|_| Ok(None));
    let req = as_user(TestRequest::get().uri("/api/orders/ORD-404"), "admin:1");
    let (status, _) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn order_logs_need_admin() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::get().uri("/api/orders/ORD-1/logs"), "customer:42");
    let (status, body) = send_request(req, configure(MockOrderQuerier::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(json(&body)["error"].as_str().unwrap().contains("Insufficient Permissions"));
}

#[actix_web::test]
async fn order_logs_as_admin() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderQuerier::new();
    db.expect_fetch_transaction_logs()
        .withf(|id| id == &OrderId::from("ORD-1"))
        .times(1)
        .returning(|_| Ok(vec![]));
    let req = as_user(TestRequest::get().uri("/api/orders/ORD-1/logs"), "admin:1");
    let (status, body) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["message"], "0 log entries");
}

#[actix_web::test]
async fn search_orders_as_admin() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderQuerier::new();
    db.expect_search_orders()
        .withf(|q| q.status.as_deref().map(|s| s.len()) == Some(1) && q.customer_id == Some(42))
        .times(1)
        .returning(|_| Ok(vec![sample_order("ORD-1", 42), sample_order("ORD-2", 42)]));
    let req = as_user(TestRequest::post().uri("/api/orders/search"), "admin:1")
        .set_json(serde_json::json!({ "customer_id": 42, "status": ["PAID"] }));
    let (status, body) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["data"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn search_orders_as_vendor_is_forbidden() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/api/orders/search"), "vendor:7").set_json(serde_json::json!({}));
    let (status, _) = send_request(req, configure(MockOrderQuerier::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
