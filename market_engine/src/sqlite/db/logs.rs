use sqlx::SqliteConnection;

use crate::{
    db_types::{NewTransactionLog, OrderId, StoredNotification, TransactionLog},
    traits::Notification,
};

pub async fn insert_log(entry: NewTransactionLog, conn: &mut SqliteConnection) -> Result<TransactionLog, sqlx::Error> {
    let log = sqlx::query_as(
        r#"
        INSERT INTO transaction_logs (order_id, action, level, message, amount, metadata, related_user_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(entry.order_id.map(|id| id.0))
    .bind(entry.action.to_string())
    .bind(entry.level.to_string())
    .bind(entry.message)
    .bind(entry.amount)
    .bind(entry.metadata.to_string())
    .bind(entry.related_user_id)
    .fetch_one(conn)
    .await?;
    Ok(log)
}

pub async fn fetch_logs_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<TransactionLog>, sqlx::Error> {
    let logs = sqlx::query_as("SELECT * FROM transaction_logs WHERE order_id = $1 ORDER BY id")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(logs)
}

pub async fn insert_notification(
    notification: Notification,
    conn: &mut SqliteConnection,
) -> Result<StoredNotification, sqlx::Error> {
    let stored = sqlx::query_as(
        "INSERT INTO notifications (recipient_id, title, message, metadata) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(notification.recipient_id)
    .bind(notification.title)
    .bind(notification.message)
    .bind(notification.metadata.to_string())
    .fetch_one(conn)
    .await?;
    Ok(stored)
}

pub async fn fetch_notifications(
    recipient_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<StoredNotification>, sqlx::Error> {
    let notifications = sqlx::query_as("SELECT * FROM notifications WHERE recipient_id = $1 ORDER BY id")
        .bind(recipient_id)
        .fetch_all(conn)
        .await?;
    Ok(notifications)
}
