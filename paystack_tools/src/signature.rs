//! Paystack signs every webhook body with HMAC-SHA512, keyed by the account's secret key, and sends the lowercase hex
//! digest in the `x-paystack-signature` header.
use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::PaystackApiError;

pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

type HmacSha512 = Hmac<Sha512>;

pub fn compute_signature(secret: &str, body: &[u8]) -> Result<String, PaystackApiError> {
    let mut mac =
        HmacSha512::new_from_slice(secret.as_bytes()).map_err(|e| PaystackApiError::SignatureError(e.to_string()))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks `signature` (hex) against the body. The digest comparison is constant-time.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha512::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
