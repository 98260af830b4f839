use actix_web::{http::StatusCode, test::TestRequest, web, HttpResponse};
use market_common::Secret;
use paystack_tools::signature::{compute_signature, SIGNATURE_HEADER};

use super::helpers::send_public_request;
use crate::middleware::WebhookSignatureFactory;

const WEBHOOK_SECRET: &str = "sk_test_endpoint_tests";
const BODY: &str = r#"{"event":"charge.success","data":{"reference":"PAY-0123456789abcdef0123456789abcdef"}}"#;

async fn echo(body: web::Bytes) -> HttpResponse {
    HttpResponse::Ok().body(body)
}

async fn send_webhook(secret: &str, signature: Option<String>) -> (StatusCode, String) {
    let mut req = TestRequest::post().uri("/webhook/").set_payload(BODY);
    if let Some(signature) = signature {
        req = req.insert_header((SIGNATURE_HEADER, signature));
    }
    let secret = Secret::new(secret.to_string());
    send_public_request(req, move |cfg| {
        cfg.service(
            web::scope("/webhook").wrap(WebhookSignatureFactory::new(secret)).route("/", web::post().to(echo)),
        );
    })
    .await
}

#[actix_web::test]
async fn signed_webhook_reaches_handler_with_body_intact() {
    let _ = env_logger::try_init().ok();
    let signature = compute_signature(WEBHOOK_SECRET, BODY.as_bytes()).unwrap();
    let (status, body) = send_webhook(WEBHOOK_SECRET, Some(signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, BODY);
}

#[actix_web::test]
async fn unsigned_webhook() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_webhook(WEBHOOK_SECRET, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("No webhook signature found"));
}

#[actix_web::test]
async fn webhook_signed_with_another_key() {
    let _ = env_logger::try_init().ok();
    let signature = compute_signature("sk_test_someone_else", BODY.as_bytes()).unwrap();
    let (status, _) = send_webhook(WEBHOOK_SECRET, Some(signature)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn webhook_without_configured_secret() {
    let _ = env_logger::try_init().ok();
    let signature = compute_signature("", BODY.as_bytes()).unwrap();
    let (status, _) = send_webhook("", Some(signature)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
