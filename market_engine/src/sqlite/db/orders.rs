use chrono::Duration;
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{
        Money,
        NewOrder,
        NewOrderItem,
        Order,
        OrderId,
        OrderItem,
        OrderPaymentStatus,
        OrderStatusHistory,
        OrderStatusType,
    },
    market_api::order_objects::OrderQueryFilter,
};

const SQLITE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
///
/// `total_price` is the checked total of the items, delivery fee and discount, see [`NewOrder::total_price`].
pub async fn insert_order(
    order: &NewOrder,
    total_price: Money,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let (latitude, longitude) = match order.location {
        Some(p) => (Some(p.latitude), Some(p.longitude)),
        None => (None, None),
    };
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                customer_id,
                total_price,
                delivery_fee,
                discount,
                currency,
                latitude,
                longitude
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(order.customer_id)
    .bind(total_price)
    .bind(order.delivery_fee)
    .bind(order.discount)
    .bind(order.currency.as_str())
    .bind(latitude)
    .bind(longitude)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn insert_order_items(
    order_id: &OrderId,
    items: &[NewOrderItem],
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, sqlx::Error> {
    let mut result = Vec::with_capacity(items.len());
    for item in items {
        let item = sqlx::query_as(
            r#"
            INSERT INTO order_items (order_id, product_id, vendor_id, product_name, quantity, price_at_purchase)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(order_id.as_str())
        .bind(item.product_id)
        .bind(item.vendor_id)
        .bind(item.product_name.as_str())
        .bind(item.quantity)
        .bind(item.price_at_purchase)
        .fetch_one(&mut *conn)
        .await?;
        result.push(item);
    }
    Ok(result)
}

pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in descending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = query.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id.0);
    }
    if let Some(cid) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(cid);
    }
    if let Some(vid) = query.vendor_id {
        where_clause.push("order_id IN (SELECT order_id FROM order_items WHERE vendor_id = ");
        where_clause.push_bind_unseparated(vid);
        where_clause.push_unseparated(")");
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        let status_clause = statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("status IN ({status_clause})"));
    }
    if let Some(payment_status) = query.payment_status {
        where_clause.push("payment_status = ");
        where_clause.push_bind_unseparated(payment_status.to_string());
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since.format(SQLITE_TIMESTAMP_FORMAT).to_string());
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until.format(SQLITE_TIMESTAMP_FORMAT).to_string());
    }
    builder.push(" ORDER BY created_at DESC, id DESC");

    trace!("🗃️ Executing query: {}", builder.sql());
    let query = builder.build_query_as::<Order>();
    let orders = query.fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {:?}", orders.len());
    Ok(orders)
}

/// Moves the order into `new_status`, if it is currently in a status from which that move is allowed. Returns the
/// updated order, or `None` if the order does not exist or the guard did not hold.
///
/// Moving to SHIPPED stamps `shipped_at`, and moving to DELIVERED stamps `delivered_at`.
pub async fn claim_status_change(
    order_id: &OrderId,
    new_status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let allowed = new_status.allowed_predecessors();
    if allowed.is_empty() {
        return Ok(None);
    }
    let allowed = allowed.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
    let sql = format!(
        r#"
        UPDATE orders SET
            status = $1,
            shipped_at = CASE WHEN $1 = 'SHIPPED' THEN CURRENT_TIMESTAMP ELSE shipped_at END,
            delivered_at = CASE WHEN $1 = 'DELIVERED' THEN CURRENT_TIMESTAMP ELSE delivered_at END,
            updated_at = CURRENT_TIMESTAMP
        WHERE order_id = $2 AND status IN ({allowed})
        RETURNING *
        "#
    );
    let order = sqlx::query_as(&sql)
        .bind(new_status.to_string())
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn set_payment_status(
    order_id: &OrderId,
    status: OrderPaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let order = sqlx::query_as(
        "UPDATE orders SET payment_status = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2 RETURNING *",
    )
    .bind(status.to_string())
    .bind(order_id.as_str())
    .fetch_one(conn)
    .await?;
    Ok(order)
}

/// Sets the `vendors_credited` latch on a delivered order. Returns `None` if the order is not delivered, or has
/// already been settled.
pub async fn claim_settlement(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders SET vendors_credited = 1, updated_at = CURRENT_TIMESTAMP
        WHERE order_id = $1 AND status = 'DELIVERED' AND vendors_credited = 0 AND payment_status != 'REFUNDED'
        RETURNING *
        "#,
    )
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Recomputes `total_price = sum(price_at_purchase * quantity) + delivery_fee - discount` from the stored items.
pub async fn recompute_total(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders SET
            total_price = (
                SELECT COALESCE(SUM(price_at_purchase * quantity), 0) FROM order_items WHERE order_id = $1
            ) + delivery_fee - discount,
            updated_at = CURRENT_TIMESTAMP
        WHERE order_id = $1
        RETURNING *
        "#,
    )
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn claim_delivery_agent(
    order_id: &OrderId,
    agent_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders SET delivery_agent_id = $1, assigned_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
        WHERE order_id = $2 AND status IN ('PAID', 'SHIPPED')
        RETURNING *
        "#,
    )
    .bind(agent_id)
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Deletes an unpaid, pending order. Items, payments, installment plans, history and logs go with it.
pub async fn delete_unpaid_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM orders WHERE order_id = $1 AND status = 'PENDING' AND payment_status = 'UNPAID'")
            .bind(order_id.as_str())
            .execute(conn)
            .await?;
    debug!("🗃️ Deleted {} staged order(s) for {order_id}", result.rows_affected());
    Ok(result.rows_affected() > 0)
}

pub async fn insert_status_history(
    order_id: &OrderId,
    status: OrderStatusType,
    actor_id: Option<i64>,
    reason: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<OrderStatusHistory, sqlx::Error> {
    let entry = sqlx::query_as(
        "INSERT INTO order_status_history (order_id, status, actor_id, reason) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(order_id.as_str())
    .bind(status.to_string())
    .bind(actor_id)
    .bind(reason)
    .fetch_one(conn)
    .await?;
    Ok(entry)
}

pub async fn fetch_status_history(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderStatusHistory>, sqlx::Error> {
    let history = sqlx::query_as("SELECT * FROM order_status_history WHERE order_id = $1 ORDER BY id")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(history)
}

/// Shipped orders whose `shipped_at` is older than `max_age`.
pub async fn fetch_overdue_shipments(
    max_age: Duration,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let modifier = format!("-{} seconds", max_age.num_seconds());
    let orders = sqlx::query_as(
        r#"
        SELECT * FROM orders
        WHERE status = 'SHIPPED' AND shipped_at IS NOT NULL AND shipped_at <= datetime('now', $1)
        ORDER BY shipped_at
        "#,
    )
    .bind(modifier)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}
