use sqlx::SqliteConnection;

use crate::{
    db_types::{
        InstallmentDuration,
        InstallmentPayment,
        InstallmentPlan,
        Money,
        NewInstallment,
        OrderId,
        Payment,
        PlanStatus,
    },
    traits::PaymentRecord,
};

pub async fn insert_payment(
    order_id: &OrderId,
    reference: &str,
    amount: Money,
    currency: &str,
    conn: &mut SqliteConnection,
) -> Result<Payment, sqlx::Error> {
    let payment = sqlx::query_as(
        "INSERT INTO payments (order_id, reference, amount, currency) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(order_id.as_str())
    .bind(reference)
    .bind(amount)
    .bind(currency)
    .fetch_one(conn)
    .await?;
    Ok(payment)
}

pub async fn fetch_payment_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

pub async fn fetch_payment(reference: &str, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment =
        sqlx::query_as("SELECT * FROM payments WHERE reference = $1").bind(reference).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn fetch_installment(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<InstallmentPayment>, sqlx::Error> {
    let installment = sqlx::query_as("SELECT * FROM installment_payments WHERE reference = $1")
        .bind(reference)
        .fetch_optional(conn)
        .await?;
    Ok(installment)
}

pub async fn fetch_payment_record(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, sqlx::Error> {
    if let Some(payment) = fetch_payment(reference, &mut *conn).await? {
        return Ok(Some(PaymentRecord::Single(payment)));
    }
    let installment = fetch_installment(reference, conn).await?;
    Ok(installment.map(PaymentRecord::Installment))
}

/// Sets the `verified` latch on the payment. Returns `None` if there is no such payment, or it was already verified.
pub async fn claim_payment(reference: &str, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
        UPDATE payments SET
            verified = 1,
            status = 'SUCCESS',
            paid_at = CURRENT_TIMESTAMP,
            updated_at = CURRENT_TIMESTAMP
        WHERE reference = $1 AND verified = 0
        RETURNING *
        "#,
    )
    .bind(reference)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// Marks the installment as paid. Returns `None` if there is no such installment, or it was already paid.
pub async fn claim_installment(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<InstallmentPayment>, sqlx::Error> {
    let installment = sqlx::query_as(
        r#"
        UPDATE installment_payments SET status = 'PAID', paid_at = CURRENT_TIMESTAMP
        WHERE reference = $1 AND status = 'PENDING'
        RETURNING *
        "#,
    )
    .bind(reference)
    .fetch_optional(conn)
    .await?;
    Ok(installment)
}

pub async fn set_payment_amount(
    reference: &str,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
        UPDATE payments SET amount = $1, updated_at = CURRENT_TIMESTAMP
        WHERE reference = $2 AND verified = 0
        RETURNING *
        "#,
    )
    .bind(amount)
    .bind(reference)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// Records the gateway's authorization URL against an unsettled payment or installment.
pub async fn set_authorization_url(
    reference: &str,
    url: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, sqlx::Error> {
    let payment: Option<Payment> = sqlx::query_as(
        r#"
        UPDATE payments SET authorization_url = $1, updated_at = CURRENT_TIMESTAMP
        WHERE reference = $2 AND verified = 0
        RETURNING *
        "#,
    )
    .bind(url)
    .bind(reference)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(payment) = payment {
        return Ok(Some(PaymentRecord::Single(payment)));
    }
    let installment: Option<InstallmentPayment> = sqlx::query_as(
        r#"
        UPDATE installment_payments SET authorization_url = $1
        WHERE reference = $2 AND status = 'PENDING'
        RETURNING *
        "#,
    )
    .bind(url)
    .bind(reference)
    .fetch_optional(conn)
    .await?;
    Ok(installment.map(PaymentRecord::Installment))
}

pub async fn insert_plan(
    order_id: &OrderId,
    duration: InstallmentDuration,
    schedule: &[NewInstallment],
    conn: &mut SqliteConnection,
) -> Result<(InstallmentPlan, Vec<InstallmentPayment>), sqlx::Error> {
    let total = schedule.iter().map(|i| i.amount).sum::<Money>();
    let plan: InstallmentPlan = sqlx::query_as(
        r#"
        INSERT INTO installment_plans (order_id, duration, number_of_installments, total_amount)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(order_id.as_str())
    .bind(duration.to_string())
    .bind(schedule.len() as i64)
    .bind(total)
    .fetch_one(&mut *conn)
    .await?;
    let mut installments = Vec::with_capacity(schedule.len());
    for installment in schedule {
        let installment = sqlx::query_as(
            r#"
            INSERT INTO installment_payments (plan_id, order_id, payment_number, reference, amount, due_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(plan.id)
        .bind(order_id.as_str())
        .bind(installment.payment_number)
        .bind(installment.reference.as_str())
        .bind(installment.amount)
        .bind(installment.due_date)
        .fetch_one(&mut *conn)
        .await?;
        installments.push(installment);
    }
    Ok((plan, installments))
}

pub async fn fetch_plan_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<(InstallmentPlan, Vec<InstallmentPayment>)>, sqlx::Error> {
    let plan: Option<InstallmentPlan> = sqlx::query_as("SELECT * FROM installment_plans WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    let Some(plan) = plan else {
        return Ok(None);
    };
    let installments = fetch_installments(plan.id, conn).await?;
    Ok(Some((plan, installments)))
}

pub async fn fetch_installments(
    plan_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<InstallmentPayment>, sqlx::Error> {
    let installments = sqlx::query_as("SELECT * FROM installment_payments WHERE plan_id = $1 ORDER BY payment_number")
        .bind(plan_id)
        .fetch_all(conn)
        .await?;
    Ok(installments)
}

pub async fn count_unpaid_installments(plan_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM installment_payments WHERE plan_id = $1 AND status != 'PAID'")
            .bind(plan_id)
            .fetch_one(conn)
            .await?;
    Ok(count)
}

pub async fn set_plan_status(
    plan_id: i64,
    status: PlanStatus,
    conn: &mut SqliteConnection,
) -> Result<InstallmentPlan, sqlx::Error> {
    let plan = sqlx::query_as(
        "UPDATE installment_plans SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(status.to_string())
    .bind(plan_id)
    .fetch_one(conn)
    .await?;
    Ok(plan)
}
