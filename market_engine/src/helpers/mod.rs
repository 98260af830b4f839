mod commission;
pub mod delivery;
mod installments;
mod references;

pub use commission::{CommissionRate, CommissionRateError, CommissionSplit, DEFAULT_COMMISSION_RATE};
pub use delivery::{estimate_delivery_fee, haversine_km, DeliveryFeeConfig, DeliveryFeeError, GeoPoint};
pub use installments::{installment_schedule, InstallmentScheduleError, INSTALLMENT_INTERVAL_DAYS};
pub use references::{installment_reference, is_valid_reference, new_payment_reference};
