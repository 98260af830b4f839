//! Per-item settlement steps.
//!
//! Each step runs in its own savepoint on the caller's transaction. A step either completes entirely (wallet
//! movement, item snapshot and audit entry) or leaves no trace, which lets the caller carry on with the next item.
use log::*;
use serde_json::json;
use sqlx::{Connection, SqliteConnection};

use super::{catalog, ledger, logs};
use crate::{
    db_types::{LogAction, LogLevel, NewTransactionLog, OrderId, OrderItem, Role},
    helpers::CommissionRate,
    traits::{CommissionReversal, CommissionReversalFailure, VendorCredit, VendorCreditFailure},
};

pub async fn credit_vendor_for_item(
    order_id: &OrderId,
    item: &OrderItem,
    rate: CommissionRate,
    conn: &mut SqliteConnection,
) -> Result<VendorCredit, VendorCreditFailure> {
    let failure = |reason: String| VendorCreditFailure {
        order_item_id: item.id,
        vendor_id: item.vendor_id,
        product_id: item.product_id,
        reason,
    };
    let mut savepoint = conn.begin().await.map_err(|e| failure(e.to_string()))?;
    match try_credit_vendor(order_id, item, rate, &mut savepoint).await {
        Ok(credit) => {
            savepoint.commit().await.map_err(|e| failure(e.to_string()))?;
            Ok(credit)
        },
        Err(reason) => {
            if let Err(e) = savepoint.rollback().await {
                warn!("💸️ Could not roll back the savepoint for item #{}: {e}", item.id);
            }
            Err(failure(reason))
        },
    }
}

async fn try_credit_vendor(
    order_id: &OrderId,
    item: &OrderItem,
    rate: CommissionRate,
    conn: &mut SqliteConnection,
) -> Result<VendorCredit, String> {
    let vendor = catalog::fetch_identity(item.vendor_id, &mut *conn)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Vendor #{} does not exist", item.vendor_id))?;
    if vendor.role != Role::Vendor || !vendor.is_active {
        return Err(format!("User #{} is not an active vendor", vendor.id));
    }
    let subtotal = item.item_subtotal();
    let split = rate.split(subtotal).map_err(|e| e.to_string())?;
    let source = format!("Sale of {}x {} (order {order_id})", item.quantity, item.product_name);
    let (_, transaction) =
        ledger::credit(item.vendor_id, split.vendor_share, &source, &mut *conn).await.map_err(|e| e.to_string())?;
    let stamped = sqlx::query(
        r#"
        UPDATE order_items SET commission_rate = $1, commission = $2, vendor_share = $3, credited_at = CURRENT_TIMESTAMP
        WHERE id = $4 AND credited_at IS NULL
        "#,
    )
    .bind(rate.to_string())
    .bind(split.commission)
    .bind(split.vendor_share)
    .bind(item.id)
    .execute(&mut *conn)
    .await
    .map_err(|e| e.to_string())?;
    if stamped.rows_affected() == 0 {
        return Err(format!("Order item #{} has already been credited", item.id));
    }
    let entry = NewTransactionLog::new(
        LogAction::VendorCredited,
        LogLevel::Success,
        format!("Vendor #{} credited {} for {}", item.vendor_id, split.vendor_share, item.product_name),
    )
    .for_order(order_id)
    .with_amount(split.vendor_share)
    .with_user(item.vendor_id)
    .with_metadata(json!({
        "order_item_id": item.id,
        "product_id": item.product_id,
        "item_subtotal": subtotal,
        "commission_rate": rate.to_string(),
        "commission": split.commission,
        "vendor_share": split.vendor_share,
    }));
    logs::insert_log(entry, conn).await.map_err(|e| e.to_string())?;
    Ok(VendorCredit {
        order_item_id: item.id,
        vendor_id: item.vendor_id,
        product_id: item.product_id,
        item_subtotal: subtotal,
        commission_rate: rate.to_string(),
        commission: split.commission,
        vendor_share: split.vendor_share,
        transaction,
    })
}

/// Debits the commission stored against the item from the vendor. Only call this for items that have a settlement
/// snapshot with a positive commission.
pub async fn reverse_commission_for_item(
    order_id: &OrderId,
    refund_id: i64,
    item: &OrderItem,
    conn: &mut SqliteConnection,
) -> Result<CommissionReversal, CommissionReversalFailure> {
    let commission = item.commission.unwrap_or_default();
    let failure = |reason: String| CommissionReversalFailure {
        order_item_id: item.id,
        vendor_id: item.vendor_id,
        commission,
        reason,
    };
    let mut savepoint = conn.begin().await.map_err(|e| failure(e.to_string()))?;
    let source = format!("Commission reversal for refund #{refund_id} (order {order_id})");
    let transaction = match ledger::debit(item.vendor_id, commission, &source, &mut savepoint).await {
        Ok((_, tx)) => tx,
        Err(e) => {
            if let Err(e) = savepoint.rollback().await {
                warn!("↩️ Could not roll back the savepoint for item #{}: {e}", item.id);
            }
            return Err(failure(e.to_string()));
        },
    };
    let entry = NewTransactionLog::new(
        LogAction::CommissionDeducted,
        LogLevel::Info,
        format!("Commission of {commission} deducted from vendor #{} for refund #{refund_id}", item.vendor_id),
    )
    .for_order(order_id)
    .with_amount(-commission)
    .with_user(item.vendor_id)
    .with_metadata(json!({
        "refund_id": refund_id,
        "order_item_id": item.id,
        "commission_rate": item.commission_rate,
    }));
    if let Err(e) = logs::insert_log(entry, &mut savepoint).await {
        if let Err(e) = savepoint.rollback().await {
            warn!("↩️ Could not roll back the savepoint for item #{}: {e}", item.id);
        }
        return Err(failure(e.to_string()));
    }
    savepoint.commit().await.map_err(|e| failure(e.to_string()))?;
    Ok(CommissionReversal { order_item_id: item.id, vendor_id: item.vendor_id, commission, transaction })
}
