mod acl;
mod hmac;
mod identity;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use hmac::{WebhookSignatureFactory, WebhookSignatureService};
pub use identity::{IdentityMiddlewareFactory, IdentityMiddlewareService};
