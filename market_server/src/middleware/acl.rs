//! Access control list middleware.
//! This middleware can be placed on any route or service that sits behind the identity middleware.
//!
//! It reads the [`Principal`] that the identity middleware stored in the request extensions and checks its role
//! against the roles allowed on the route. If the caller holds any of them, the request is allowed to continue.
//! Otherwise, a 403 Forbidden response is returned.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;
use market_engine::db_types::{Principal, Role};

use crate::errors::{AuthError, ServerError};

pub struct AclMiddlewareFactory {
    allowed_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(allowed_roles: &[Role]) -> Self {
        AclMiddlewareFactory { allowed_roles: allowed_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { allowed_roles: self.allowed_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    allowed_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let allowed_roles = self.allowed_roles.clone();
        Box::pin(async move {
            let principal = req.extensions().get::<Principal>().copied().ok_or_else(|| {
                warn!("🔐️ No principal found in request extensions for {}", req.path());
                ServerError::AuthenticationError(AuthError::MissingIdentity)
            })?;
            if allowed_roles.contains(&principal.role()) {
                service.call(req).await
            } else {
                debug!("🔐️ {principal} may not call {}", req.path());
                Err(ServerError::InsufficientPermissions(format!("{} access is not allowed", principal.role())).into())
            }
        })
    }
}
