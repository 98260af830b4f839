use actix_web::{
    body::{to_bytes, MessageBody},
    dev::ServiceResponse,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
    Error,
};
use chrono::{TimeZone, Utc};
use log::debug;
use market_common::Secret;
use market_engine::db_types::{Money, Order, OrderId, OrderPaymentStatus, OrderStatusType};

use crate::{
    auth::{sign_identity, IdentityVerifier, IDENTITY_HEADER, IDENTITY_SIGNATURE_HEADER},
    middleware::IdentityMiddlewareFactory,
};

// DO NOT re-use this secret anywhere.
pub const TEST_IDENTITY_SECRET: &str = "endpoint-tests-identity-secret";

/// Adds a correctly signed identity assertion, e.g. `customer:42`, to the request.
pub fn as_user(req: TestRequest, identity: &str) -> TestRequest {
    let signature = sign_identity(TEST_IDENTITY_SECRET, identity).expect("Failed to sign identity");
    req.insert_header((IDENTITY_HEADER, identity)).insert_header((IDENTITY_SIGNATURE_HEADER, signature))
}

/// Sends the request to an app with the routes from `configure` mounted under `/api`, behind the identity middleware.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let verifier = IdentityVerifier::new(Secret::new(TEST_IDENTITY_SECRET.to_string()));
    let scope = web::scope("/api").wrap(IdentityMiddlewareFactory::new(verifier)).configure(configure);
    let app = App::new().service(scope);
    let service = test::init_service(app).await;
    debug!("Making request");
    render(test::try_call_service(&service, req.to_request()).await).await
}

/// Sends the request to an app with the routes from `configure` mounted at the root, without an identity check.
pub async fn send_public_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making public request");
    render(test::try_call_service(&service, req.to_request()).await).await
}

// Errors raised by middleware are rendered the same way the server renders them.
async fn render<B: MessageBody + 'static>(result: Result<ServiceResponse<B>, Error>) -> (StatusCode, String) {
    let res = match result {
        Ok(res) => res.map_into_boxed_body().into_parts().1,
        Err(e) => e.error_response(),
    };
    let status = res.status();
    let body = to_bytes(res.into_body()).await.expect("Failed to read response body");
    (status, String::from_utf8_lossy(&body).into_owned())
}

pub fn sample_order(order_id: &str, customer_id: i64) -> Order {
    let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
    Order {
        id: 1,
        order_id: OrderId::from(order_id),
        customer_id,
        status: OrderStatusType::Paid,
        payment_status: OrderPaymentStatus::Paid,
        total_price: Money::from_major(17_500),
        delivery_fee: Money::from_major(2_500),
        discount: Money::default(),
        currency: "NGN".into(),
        latitude: Some(6.5244),
        longitude: Some(3.3792),
        vendors_credited: false,
        delivery_agent_id: None,
        assigned_at: None,
        shipped_at: None,
        delivered_at: None,
        created_at,
        updated_at: created_at,
    }
}
