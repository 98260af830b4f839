use sqlx::SqliteConnection;

use crate::db_types::{Money, OrderId, Refund, RefundStatus};

pub async fn insert_refund(
    payment_id: i64,
    order_id: &OrderId,
    customer_id: i64,
    reason: &str,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<Refund, sqlx::Error> {
    let refund = sqlx::query_as(
        r#"
        INSERT INTO refunds (payment_id, order_id, customer_id, reason, refunded_amount) VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(payment_id)
    .bind(order_id.as_str())
    .bind(customer_id)
    .bind(reason)
    .bind(amount)
    .fetch_one(conn)
    .await?;
    Ok(refund)
}

pub async fn fetch_refund(refund_id: i64, conn: &mut SqliteConnection) -> Result<Option<Refund>, sqlx::Error> {
    let refund = sqlx::query_as("SELECT * FROM refunds WHERE id = $1").bind(refund_id).fetch_optional(conn).await?;
    Ok(refund)
}

pub async fn fetch_refunds(conn: &mut SqliteConnection) -> Result<Vec<Refund>, sqlx::Error> {
    let refunds = sqlx::query_as("SELECT * FROM refunds ORDER BY created_at DESC, id DESC").fetch_all(conn).await?;
    Ok(refunds)
}

/// Moves a PENDING refund to `status`. Returns `None` if the refund does not exist or has already been processed.
pub async fn claim_refund(
    refund_id: i64,
    status: RefundStatus,
    rejection_reason: Option<&str>,
    admin_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Refund>, sqlx::Error> {
    let refund = sqlx::query_as(
        r#"
        UPDATE refunds SET status = $1, rejection_reason = $2, processed_by = $3, processed_at = CURRENT_TIMESTAMP
        WHERE id = $4 AND status = 'PENDING'
        RETURNING *
        "#,
    )
    .bind(status.to_string())
    .bind(rejection_reason)
    .bind(admin_id)
    .bind(refund_id)
    .fetch_optional(conn)
    .await?;
    Ok(refund)
}

pub async fn set_commission_reversed(refund_id: i64, conn: &mut SqliteConnection) -> Result<Refund, sqlx::Error> {
    let refund = sqlx::query_as("UPDATE refunds SET commission_reversed = 1 WHERE id = $1 RETURNING *")
        .bind(refund_id)
        .fetch_one(conn)
        .await?;
    Ok(refund)
}
