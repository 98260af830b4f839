use chrono::{DateTime, Duration, Utc};
use market_common::Money;
use thiserror::Error;

use crate::{
    db_types::{InstallmentDuration, NewInstallment, OrderId},
    helpers::installment_reference,
};

pub const INSTALLMENT_INTERVAL_DAYS: i64 = 30;

#[derive(Debug, Clone, Error)]
pub enum InstallmentScheduleError {
    #[error("Cannot split a non-positive amount ({0}) into installments")]
    NonPositiveTotal(Money),
}

/// Builds the payment schedule for an installment plan.
///
/// Every installment gets `total / n`, floor-rounded to the minor unit, and the last one picks up the remainder, so
/// the amounts always add up to `total`. Installment `n` falls due `30 * n` days after `start`.
pub fn installment_schedule(
    order_id: &OrderId,
    total: Money,
    duration: InstallmentDuration,
    start: DateTime<Utc>,
) -> Result<Vec<NewInstallment>, InstallmentScheduleError> {
    if !total.is_positive() {
        return Err(InstallmentScheduleError::NonPositiveTotal(total));
    }
    let amounts = total
        .split_evenly(duration.number_of_installments())
        .ok_or(InstallmentScheduleError::NonPositiveTotal(total))?;
    let schedule = amounts
        .into_iter()
        .zip(1i64..)
        .map(|(amount, payment_number)| NewInstallment {
            payment_number,
            reference: installment_reference(order_id, payment_number),
            amount,
            due_date: start + Duration::days(INSTALLMENT_INTERVAL_DAYS * payment_number),
        })
        .collect();
    Ok(schedule)
}
