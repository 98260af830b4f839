//! Identity middleware.
//!
//! Wraps the authenticated part of the API. Every request must carry a valid identity assertion (see
//! [`crate::auth`]); the resolved [`market_engine::db_types::Principal`] is stored in the request extensions.
//! Requests without one are turned away with 401 Unauthorized before they reach a handler.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::*;

use crate::{auth::IdentityVerifier, errors::ServerError};

pub struct IdentityMiddlewareFactory {
    verifier: IdentityVerifier,
}

impl IdentityMiddlewareFactory {
    pub fn new(verifier: IdentityVerifier) -> Self {
        IdentityMiddlewareFactory { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = IdentityMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddlewareService { verifier: self.verifier.clone(), service: Rc::new(service) }))
    }
}

pub struct IdentityMiddlewareService<S> {
    verifier: IdentityVerifier,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let result = self.verifier.verify_headers(req.headers());
        Box::pin(async move {
            match result {
                Ok(principal) => {
                    trace!("🔐️ {} {} called by {principal}", req.method(), req.path());
                    req.extensions_mut().insert(principal);
                    service.call(req).await
                },
                Err(e) => {
                    info!("🔐️ Rejecting {} {}. {e}", req.method(), req.path());
                    Err(ServerError::AuthenticationError(e).into())
                },
            }
        })
    }
}
