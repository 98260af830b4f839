//! Identity assertions.
//!
//! The marketplace does not issue tokens itself. An upstream authenticator resolves the user and forwards two headers
//! with every API request:
//! * `x-market-user`: `<role>:<user id>`, e.g. `customer:42`.
//! * `x-market-signature`: the hex HMAC-SHA256 of the `x-market-user` value, keyed by `MKT_IDENTITY_SECRET`.
//!
//! [`crate::middleware::IdentityMiddlewareFactory`] checks the pair once per request and stores the resulting
//! [`Principal`] in the request extensions, where the [`Caller`] extractor and the ACL middleware pick it up.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpMessage, HttpRequest};
use hmac::{Hmac, Mac};
use log::*;
use market_common::Secret;
use market_engine::db_types::Principal;
use sha2::Sha256;

use crate::errors::{AuthError, ServerError};

pub const IDENTITY_HEADER: &str = "x-market-user";
pub const IDENTITY_SIGNATURE_HEADER: &str = "x-market-signature";

type HmacSha256 = Hmac<Sha256>;

/// Signs an identity assertion. This is what the upstream authenticator does, and is handy for tools and tests.
pub fn sign_identity(secret: &str, identity: &str) -> Result<String, AuthError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| AuthError::PoorlyFormattedIdentity(e.to_string()))?;
    mac.update(identity.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[derive(Clone, Debug)]
pub struct IdentityVerifier {
    secret: Secret<String>,
}

impl IdentityVerifier {
    pub fn new(secret: Secret<String>) -> Self {
        Self { secret }
    }

    /// Resolves the principal asserted by the request headers.
    pub fn verify_headers(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let identity = header_value(headers, IDENTITY_HEADER)?.ok_or(AuthError::MissingIdentity)?;
        let signature = header_value(headers, IDENTITY_SIGNATURE_HEADER)?.ok_or(AuthError::InvalidSignature)?;
        self.verify(identity, signature)
    }

    pub fn verify(&self, identity: &str, signature: &str) -> Result<Principal, AuthError> {
        let secret = self.secret.reveal();
        if secret.is_empty() {
            warn!("🔐️ No identity secret is configured. Rejecting identity assertion for {identity}");
            return Err(AuthError::InvalidSignature);
        }
        let expected = hex::decode(signature.trim()).map_err(|_| AuthError::InvalidSignature)?;
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidSignature)?;
        mac.update(identity.as_bytes());
        mac.verify_slice(&expected).map_err(|_| {
            debug!("🔐️ Identity signature for {identity} does not match");
            AuthError::InvalidSignature
        })?;
        identity.parse::<Principal>().map_err(|e| AuthError::PoorlyFormattedIdentity(e.to_string()))
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, AuthError> {
    headers
        .get(name)
        .map(|v| v.to_str().map_err(|e| AuthError::PoorlyFormattedIdentity(format!("{name}: {e}"))))
        .transpose()
}

/// The authenticated principal making the request.
///
/// Only available behind the identity middleware. Extraction fails with a 401 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub Principal);

impl Caller {
    pub fn principal(&self) -> &Principal {
        &self.0
    }
}

impl FromRequest for Caller {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let principal = req.extensions().get::<Principal>().copied();
        ready(principal.map(Caller).ok_or(ServerError::AuthenticationError(AuthError::MissingIdentity)))
    }
}

#[cfg(test)]
mod test {
    use actix_web::http::header::{HeaderName, HeaderValue};

    use super::*;

    const SECRET: &str = "identity-test-secret";

    fn headers(identity: &str, signature: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(IDENTITY_HEADER), HeaderValue::from_str(identity).unwrap());
        headers.insert(HeaderName::from_static(IDENTITY_SIGNATURE_HEADER), HeaderValue::from_str(signature).unwrap());
        headers
    }

    #[test]
    fn valid_assertions_resolve_to_principals() {
        let verifier = IdentityVerifier::new(Secret::new(SECRET.to_string()));
        let sig = sign_identity(SECRET, "vendor:7").unwrap();
        assert_eq!(sig.len(), 64);
        let principal = verifier.verify_headers(&headers("vendor:7", &sig)).unwrap();
        assert_eq!(principal, Principal::Vendor(7));
    }

    #[test]
    fn tampered_assertions_are_rejected() {
        let verifier = IdentityVerifier::new(Secret::new(SECRET.to_string()));
        let sig = sign_identity(SECRET, "customer:7").unwrap();
        let err = verifier.verify_headers(&headers("admin:7", &sig)).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
        let err = verifier.verify_headers(&headers("customer:7", "not-hex")).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
        let err = verifier.verify_headers(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AuthError::MissingIdentity));
    }

    #[test]
    fn delivery_agents_and_garbage_are_not_principals() {
        let verifier = IdentityVerifier::new(Secret::new(SECRET.to_string()));
        for identity in ["delivery_agent:3", "customer", "customer:abc"] {
            let sig = sign_identity(SECRET, identity).unwrap();
            let err = verifier.verify(identity, &sig).unwrap_err();
            assert!(matches!(err, AuthError::PoorlyFormattedIdentity(_)), "{identity}");
        }
    }

    #[test]
    fn nothing_is_accepted_without_a_secret() {
        let verifier = IdentityVerifier::new(Secret::default());
        let sig = sign_identity("", "admin:1").unwrap();
        assert!(verifier.verify("admin:1", &sig).is_err());
    }
}
