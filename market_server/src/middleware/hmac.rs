//! Webhook signature middleware for Actix Web.
//!
//! Paystack signs every webhook body with HMAC-SHA512, using the account's secret key, and sends the hex digest in
//! the `x-paystack-signature` header.
//!
//! Wrap the webhook route with this middleware. Requests with a missing or invalid signature are rejected with
//! 403 Forbidden before the body is parsed. The body is buffered to compute the digest and handed back to the
//! handler untouched.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use market_common::Secret;
use paystack_tools::signature::{verify_signature, SIGNATURE_HEADER};

use crate::errors::ServerError;

pub struct WebhookSignatureFactory {
    key: Secret<String>,
}

impl WebhookSignatureFactory {
    pub fn new(key: Secret<String>) -> Self {
        WebhookSignatureFactory { key }
    }
}

impl<S, B> Transform<S, ServiceRequest> for WebhookSignatureFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = WebhookSignatureService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(WebhookSignatureService { key: self.key.clone(), service: Rc::new(service) }))
    }
}

pub struct WebhookSignatureService<S> {
    key: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for WebhookSignatureService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.key.reveal().clone();
        Box::pin(async move {
            trace!("🔐️ Checking webhook signature");
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract webhook body: {e:?}");
                ServerError::InvalidRequestBody("Failed to extract request data.".into())
            })?;
            let signature = req.headers().get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()).ok_or_else(|| {
                warn!("🔐️ No signature found on webhook. Denying access.");
                ServerError::InsufficientPermissions("No webhook signature found.".into())
            })?;
            if !secret.is_empty() && verify_signature(&secret, data.as_ref(), signature) {
                trace!("🔐️ Webhook signature ✅️");
                req.set_payload(bytes_to_payload(data));
                service.call(req).await
            } else {
                warn!("🔐️ Invalid webhook signature. Denying access.");
                Err(ServerError::InsufficientPermissions("Invalid webhook signature.".into()).into())
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
