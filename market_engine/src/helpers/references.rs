use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::db_types::OrderId;

static REFERENCE_PATTERN: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._=-]{5,99}$"));

/// A fresh single-shot payment reference, e.g. `PAY-2f1c...`. It doubles as the idempotency key at the gateway.
pub fn new_payment_reference() -> String {
    format!("PAY-{}", Uuid::new_v4().simple())
}

pub fn installment_reference(order_id: &OrderId, payment_number: i64) -> String {
    format!("{order_id}-installment-{payment_number}")
}

/// Paystack allows alphanumerics and `-`, `.` and `=` in references. Anything else is rejected before it gets
/// anywhere near the database or the gateway.
pub fn is_valid_reference(reference: &str) -> bool {
    match &*REFERENCE_PATTERN {
        Ok(re) => re.is_match(reference),
        Err(_) => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn references_are_valid() {
        let r = new_payment_reference();
        assert!(r.starts_with("PAY-"));
        assert_eq!(r.len(), 36);
        assert!(is_valid_reference(&r));
        let order_id = OrderId::random();
        assert!(is_valid_reference(&installment_reference(&order_id, 12)));
    }

    #[test]
    fn malformed_references() {
        assert!(!is_valid_reference(""));
        assert!(!is_valid_reference("abc"));
        assert!(!is_valid_reference("PAY-123'; DROP TABLE payments"));
        assert!(!is_valid_reference("-leading-dash"));
        assert!(!is_valid_reference(&"x".repeat(120)));
    }
}
