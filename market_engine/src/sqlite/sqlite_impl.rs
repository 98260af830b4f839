//! `SqliteDatabase` is a concrete implementation of a marketplace engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
//!
//! Every mutating transaction starts with a guarded `UPDATE` (a "claim") or an `INSERT`. SQLite takes the write lock
//! on the first write, so two callers racing for the same row serialize on that statement and the loser's guard
//! simply matches nothing.
use std::{fmt::Debug, future::Future};

use chrono::{Duration, Utc};
use log::*;
use serde_json::json;
use sqlx::{
    migrate::{MigrateDatabase, MigrateError},
    Sqlite,
    SqliteConnection,
    SqlitePool,
};

use super::db::{catalog, db_url, ledger, logs, new_pool, orders, payments, refunds, settlement};
use crate::{
    db_types::{
        CartItem,
        Identity,
        InstallmentPayment,
        InstallmentPlan,
        LogAction,
        LogLevel,
        Money,
        NewIdentity,
        NewProduct,
        NewRefund,
        NewTransactionLog,
        Order,
        OrderId,
        OrderItem,
        OrderPaymentStatus,
        OrderStatusHistory,
        OrderStatusType,
        Payment,
        Payout,
        PlanStatus,
        Product,
        Refund,
        RefundDecision,
        Role,
        StoredNotification,
        TransactionLog,
        Wallet,
        WalletTransaction,
    },
    helpers::CommissionRate,
    market_api::order_objects::OrderQueryFilter,
    traits::{
        BatchOutcome,
        CatalogError,
        CatalogManagement,
        LedgerError,
        LedgerManagement,
        MarketplaceDatabase,
        MarketplaceError,
        NewCheckout,
        NewCheckoutPayment,
        Notification,
        NotificationDispatcher,
        NotificationError,
        OrderQueries,
        OverdueDelivery,
        PaymentConfirmation,
        PaymentRecord,
        QueryError,
        RefundOutcome,
        SettlementOutcome,
        StagedCheckout,
        StagedPayment,
        TransitionResult,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn stage_checkout(&self, checkout: NewCheckout) -> Result<StagedCheckout, MarketplaceError> {
        let NewCheckout { order, payment, logs: entries } = checkout;
        if order.items.is_empty() {
            return Err(MarketplaceError::EmptyOrder);
        }
        let total = order.total_price().map_err(|e| MarketplaceError::AmountOutOfRange(e.to_string()))?;
        if !total.is_positive() {
            return Err(MarketplaceError::InvalidOrderTotal(total));
        }
        let mut tx = self.pool.begin().await?;
        let saved = orders::insert_order(&order, total, &mut tx).await?;
        let order_id = saved.order_id.clone();
        let items = orders::insert_order_items(&order_id, &order.items, &mut tx).await?;
        orders::insert_status_history(&order_id, OrderStatusType::Pending, Some(order.customer_id), None, &mut tx)
            .await?;
        let payment = match payment {
            NewCheckoutPayment::Single { reference } => {
                let payment =
                    payments::insert_payment(&order_id, &reference, saved.total_price, &saved.currency, &mut tx).await?;
                StagedPayment::Single(payment)
            },
            NewCheckoutPayment::Installments { duration, schedule } => {
                let scheduled = schedule.iter().map(|i| i.amount).sum::<Money>();
                if scheduled != saved.total_price {
                    return Err(MarketplaceError::InvalidOrderTotal(scheduled));
                }
                let (plan, installments) = payments::insert_plan(&order_id, duration, &schedule, &mut tx).await?;
                StagedPayment::Installments { plan, installments }
            },
        };
        for entry in entries {
            logs::insert_log(entry.for_order(&order_id), &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order {order_id} staged with {} items. Total: {}", items.len(), saved.total_price);
        Ok(StagedCheckout { order: saved, items, payment })
    }

    async fn discard_checkout(&self, order_id: &OrderId) -> Result<(), MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        if orders::delete_unpaid_order(order_id, &mut conn).await? {
            return Ok(());
        }
        match orders::fetch_order(order_id, &mut conn).await? {
            Some(order) => Err(MarketplaceError::Forbidden(format!(
                "Order {order_id} is {} ({}) and cannot be discarded",
                order.status, order.payment_status
            ))),
            None => Err(MarketplaceError::OrderNotFound(order_id.clone())),
        }
    }

    async fn finalize_checkout(
        &self,
        order_id: &OrderId,
        reference: &str,
        authorization_url: &str,
    ) -> Result<PaymentRecord, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let record = payments::set_authorization_url(reference, authorization_url, &mut tx)
            .await?
            .filter(|r| r.order_id() == order_id)
            .ok_or_else(|| MarketplaceError::PaymentNotFound(reference.to_string()))?;
        let order = orders::fetch_order(order_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
        let items = orders::fetch_order_items(order_id, &mut tx).await?;
        let product_ids = items.iter().map(|i| i.product_id).collect::<Vec<_>>();
        let removed = catalog::remove_from_cart(order.customer_id, &product_ids, &mut tx).await?;
        trace!("🗃️ Removed {removed} lines from the cart of customer #{}", order.customer_id);
        let entry = NewTransactionLog::new(
            LogAction::PaymentInitialized,
            LogLevel::Info,
            format!("Payment of {} initialized with reference {reference}", record.amount()),
        )
        .for_order(order_id)
        .with_amount(record.amount())
        .with_user(order.customer_id)
        .with_metadata(json!({ "reference": reference, "authorization_url": authorization_url }));
        logs::insert_log(entry, &mut tx).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn recompute_order_total(&self, order_id: &OrderId) -> Result<(Order, Option<Payment>), MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::recompute_total(order_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
        let mut payment = payments::fetch_payment_for_order(order_id, &mut tx).await?;
        let stale =
            payment.as_ref().filter(|p| !p.verified && p.amount != order.total_price).map(|p| p.reference.clone());
        if let Some(reference) = stale {
            debug!("🗃️ Payment {reference} for order {order_id} now expects {}", order.total_price);
            payment = payments::set_payment_amount(&reference, order.total_price, &mut tx).await?;
        }
        tx.commit().await?;
        Ok((order, payment))
    }

    async fn set_authorization_url(
        &self,
        reference: &str,
        authorization_url: &str,
    ) -> Result<PaymentRecord, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let record = payments::set_authorization_url(reference, authorization_url, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::PaymentNotFound(reference.to_string()))?;
        let entry = NewTransactionLog::new(
            LogAction::PaymentInitialized,
            LogLevel::Info,
            format!("Payment of {} re-initialized with reference {reference}", record.amount()),
        )
        .for_order(record.order_id())
        .with_amount(record.amount())
        .with_metadata(json!({ "reference": reference, "authorization_url": authorization_url }));
        logs::insert_log(entry, &mut tx).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn confirm_payment(&self, reference: &str) -> Result<PaymentConfirmation, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        if let Some(payment) = payments::claim_payment(reference, &mut tx).await? {
            let entry = NewTransactionLog::new(
                LogAction::PaymentVerified,
                LogLevel::Success,
                format!("Payment {reference} of {} verified", payment.amount),
            )
            .for_order(&payment.order_id)
            .with_amount(payment.amount)
            .with_metadata(json!({ "reference": reference }));
            logs::insert_log(entry, &mut tx).await?;
            let (order, order_paid) = mark_order_paid(&payment.order_id, &mut tx).await?;
            tx.commit().await?;
            info!("🗃️ Payment {reference} for order {} confirmed", payment.order_id);
            let record = PaymentRecord::Single(payment);
            return Ok(PaymentConfirmation { record, order, newly_verified: true, order_paid });
        }
        if let Some(installment) = payments::claim_installment(reference, &mut tx).await? {
            let order_id = installment.order_id.clone();
            let entry = NewTransactionLog::new(
                LogAction::PaymentVerified,
                LogLevel::Success,
                format!("Installment #{} ({reference}) of {} verified", installment.payment_number, installment.amount),
            )
            .for_order(&order_id)
            .with_amount(installment.amount)
            .with_metadata(json!({ "reference": reference, "payment_number": installment.payment_number }));
            logs::insert_log(entry, &mut tx).await?;
            let unpaid = payments::count_unpaid_installments(installment.plan_id, &mut tx).await?;
            let (order, order_paid) = if unpaid == 0 {
                payments::set_plan_status(installment.plan_id, PlanStatus::Completed, &mut tx).await?;
                mark_order_paid(&order_id, &mut tx).await?
            } else {
                trace!("🗃️ {unpaid} installments remain for order {order_id}");
                (orders::set_payment_status(&order_id, OrderPaymentStatus::Partial, &mut tx).await?, false)
            };
            tx.commit().await?;
            info!("🗃️ Installment {reference} for order {order_id} confirmed");
            let record = PaymentRecord::Installment(installment);
            return Ok(PaymentConfirmation { record, order, newly_verified: true, order_paid });
        }
        // Nothing was claimed, so this is either a replay or an unknown reference
        let record = payments::fetch_payment_record(reference, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::PaymentNotFound(reference.to_string()))?;
        let order = orders::fetch_order(record.order_id(), &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(record.order_id().clone()))?;
        tx.rollback().await?;
        debug!("🗃️ Payment {reference} was already confirmed. Nothing to do");
        Ok(PaymentConfirmation { record, order, newly_verified: false, order_paid: false })
    }

    async fn transition_order(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
        actor_id: Option<i64>,
        reason: Option<String>,
        commission_rate: CommissionRate,
    ) -> Result<TransitionResult, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::claim_status_change(order_id, new_status, &mut tx).await? else {
            let current = orders::fetch_order(order_id, &mut tx)
                .await?
                .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
            return Err(MarketplaceError::InvalidTransition { from: current.status, to: new_status });
        };
        let old_status = previous_status(order_id, new_status, &mut tx).await?;
        record_transition(&order, old_status, actor_id, reason.as_deref(), &mut tx).await?;
        let (order, settlement) = if new_status == OrderStatusType::Delivered {
            let settlement = settle_in_transaction(order_id, commission_rate, &mut tx).await?;
            (settlement.order.clone(), Some(settlement))
        } else {
            (order, None)
        };
        tx.commit().await?;
        info!("🗃️ Order {order_id} moved from {old_status} to {new_status}");
        Ok(TransitionResult { old_status, order, settlement })
    }

    async fn settle_order(
        &self,
        order_id: &OrderId,
        commission_rate: CommissionRate,
    ) -> Result<SettlementOutcome, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let outcome = settle_in_transaction(order_id, commission_rate, &mut tx).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    async fn assign_delivery_agent(&self, order_id: &OrderId, agent_id: i64) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::claim_delivery_agent(order_id, agent_id, &mut tx).await? else {
            let current = orders::fetch_order(order_id, &mut tx)
                .await?
                .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
            return Err(MarketplaceError::Forbidden(format!(
                "Cannot assign a delivery agent to an order that is {}",
                current.status
            )));
        };
        let agent = catalog::fetch_identity(agent_id, &mut tx).await?;
        if !agent.is_some_and(|a| a.is_active && a.role == Role::DeliveryAgent) {
            return Err(MarketplaceError::InvalidDeliveryAgent(agent_id));
        }
        let entry = NewTransactionLog::new(
            LogAction::Other,
            LogLevel::Info,
            format!("Delivery agent #{agent_id} assigned to order {order_id}"),
        )
        .for_order(order_id)
        .with_user(agent_id);
        logs::insert_log(entry, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn create_refund(&self, refund: NewRefund) -> Result<Refund, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(&refund.order_id, &mut conn)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(refund.order_id.clone()))?;
        if order.customer_id != refund.customer_id {
            return Err(MarketplaceError::Forbidden("You can only request refunds for your own orders".into()));
        }
        let payment = payments::fetch_payment_for_order(&refund.order_id, &mut conn)
            .await?
            .filter(|p| p.verified)
            .ok_or_else(|| MarketplaceError::NoRefundablePayment(refund.order_id.clone()))?;
        let amount = refund.amount.unwrap_or(payment.amount);
        if !amount.is_positive() {
            return Err(MarketplaceError::InvalidAmount(amount));
        }
        if amount > payment.amount {
            return Err(MarketplaceError::RefundExceedsPayment { requested: amount, paid: payment.amount });
        }
        let result =
            refunds::insert_refund(payment.id, &refund.order_id, refund.customer_id, &refund.reason, amount, &mut conn)
                .await;
        match result {
            Ok(refund) => {
                info!("↩️ Refund #{} of {amount} requested for order {}", refund.id, refund.order_id);
                Ok(refund)
            },
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(MarketplaceError::RefundAlreadyExists(refund.order_id))
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn process_refund(
        &self,
        refund_id: i64,
        decision: RefundDecision,
        admin_id: i64,
    ) -> Result<RefundOutcome, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let rejection_reason = match &decision {
            RefundDecision::Reject { reason } => reason.as_deref(),
            RefundDecision::Approve => None,
        };
        let claimed = refunds::claim_refund(refund_id, decision.status(), rejection_reason, admin_id, &mut tx).await?;
        let Some(refund) = claimed else {
            return match refunds::fetch_refund(refund_id, &mut tx).await? {
                Some(_) => Err(MarketplaceError::RefundAlreadyProcessed(refund_id)),
                None => Err(MarketplaceError::RefundNotFound(refund_id)),
            };
        };
        let order_id = refund.order_id.clone();
        let order = orders::fetch_order(&order_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
        if let RefundDecision::Reject { reason } = &decision {
            let entry = NewTransactionLog::new(
                LogAction::RefundRejected,
                LogLevel::Info,
                format!("Refund #{refund_id} rejected by admin #{admin_id}"),
            )
            .for_order(&order_id)
            .with_amount(refund.refunded_amount)
            .with_user(refund.customer_id)
            .with_metadata(json!({ "refund_id": refund_id, "admin_id": admin_id, "reason": reason }));
            logs::insert_log(entry, &mut tx).await?;
            tx.commit().await?;
            info!("↩️ Refund #{refund_id} for order {order_id} rejected");
            return Ok(RefundOutcome { refund, order, customer_credit: None, reversals: BatchOutcome::default() });
        }

        let source = format!("Refund #{refund_id} for order {order_id}");
        let (_, credit) = ledger::credit(refund.customer_id, refund.refunded_amount, &source, &mut tx).await?;
        let entry = NewTransactionLog::new(
            LogAction::RefundApproved,
            LogLevel::Success,
            format!("Refund #{refund_id} of {} credited to customer #{}", refund.refunded_amount, refund.customer_id),
        )
        .for_order(&order_id)
        .with_amount(refund.refunded_amount)
        .with_user(refund.customer_id)
        .with_metadata(json!({ "refund_id": refund_id, "admin_id": admin_id }));
        logs::insert_log(entry, &mut tx).await?;
        let order = orders::set_payment_status(&order_id, OrderPaymentStatus::Refunded, &mut tx).await?;

        let mut refund = refund;
        let mut reversals = BatchOutcome::default();
        let was_settled =
            order.vendors_credited && matches!(order.status, OrderStatusType::Delivered | OrderStatusType::Returned);
        if was_settled {
            let items = orders::fetch_order_items(&order_id, &mut tx).await?;
            let reversible = items.iter().filter(|i| i.is_credited() && i.commission.is_some_and(|c| c.is_positive()));
            for item in reversible {
                let result = settlement::reverse_commission_for_item(&order_id, refund_id, item, &mut tx).await;
                if let Err(failure) = &result {
                    warn!(
                        "↩️ Could not reverse commission of {} from vendor #{} for refund #{refund_id}. {}",
                        failure.commission, failure.vendor_id, failure.reason
                    );
                    let entry = NewTransactionLog::new(
                        LogAction::CommissionDeducted,
                        LogLevel::Error,
                        format!(
                            "Could not deduct commission of {} from vendor #{}",
                            failure.commission, failure.vendor_id
                        ),
                    )
                    .for_order(&order_id)
                    .with_amount(-failure.commission)
                    .with_user(failure.vendor_id)
                    .with_metadata(json!({
                        "refund_id": refund_id,
                        "order_item_id": failure.order_item_id,
                        "reason": failure.reason,
                    }));
                    logs::insert_log(entry, &mut tx).await?;
                }
                reversals.push(result);
            }
            refund = refunds::set_commission_reversed(refund_id, &mut tx).await?;
        }
        tx.commit().await?;
        info!(
            "↩️ Refund #{refund_id} for order {order_id} approved. {} commission reversals, {} failed",
            reversals.success_count(),
            reversals.failure_count()
        );
        Ok(RefundOutcome { refund, order, customer_credit: Some(credit), reversals })
    }

    async fn append_log(&self, entry: NewTransactionLog) -> Result<TransactionLog, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let log = logs::insert_log(entry, &mut conn).await?;
        Ok(log)
    }

    async fn flag_overdue_deliveries(&self, max_age: Duration) -> Result<Vec<OverdueDelivery>, MarketplaceError> {
        let overdue = {
            let mut conn = self.pool.acquire().await?;
            orders::fetch_overdue_shipments(max_age, &mut conn).await?
        };
        if overdue.is_empty() {
            return Ok(Vec::new());
        }
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut result = Vec::with_capacity(overdue.len());
        for order in overdue {
            let days_overdue = order.shipped_at.map(|t| (now - t).num_days()).unwrap_or_default();
            let entry = NewTransactionLog::new(
                LogAction::OverdueDelivery,
                LogLevel::Warning,
                format!("Order {} shipped {days_overdue} days ago and has not been delivered", order.order_id),
            )
            .for_order(&order.order_id)
            .with_metadata(json!({
                "days_overdue": days_overdue,
                "delivery_agent_id": order.delivery_agent_id,
            }));
            logs::insert_log(entry, &mut tx).await?;
            result.push(OverdueDelivery { order, days_overdue });
        }
        tx.commit().await?;
        Ok(result)
    }

    async fn close(&mut self) -> Result<(), MarketplaceError> {
        self.pool.close().await;
        Ok(())
    }
}

/// Moves a freshly paid order to PAID. A payment for an order that has moved on (e.g. it was canceled while the
/// customer was paying) is still recorded, but the order status is left alone and the mismatch is logged for review.
async fn mark_order_paid(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<(Order, bool), MarketplaceError> {
    let claimed = orders::claim_status_change(order_id, OrderStatusType::Paid, &mut *conn).await?;
    let order = orders::set_payment_status(order_id, OrderPaymentStatus::Paid, &mut *conn).await?;
    if claimed.is_some() {
        record_transition(&order, OrderStatusType::Pending, None, Some("Payment verified"), conn).await?;
        return Ok((order, true));
    }
    warn!(
        "🗃️ Payment for order {order_id} was received, but the order is {}. The status was not changed",
        order.status
    );
    let entry = NewTransactionLog::new(
        LogAction::Other,
        LogLevel::Warning,
        format!("Payment received for an order that is {}. Manual review required", order.status),
    )
    .for_order(order_id)
    .with_amount(order.total_price);
    logs::insert_log(entry, conn).await?;
    Ok((order, false))
}

async fn record_transition(
    order: &Order,
    old_status: OrderStatusType,
    actor_id: Option<i64>,
    reason: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceError> {
    orders::insert_status_history(&order.order_id, order.status, actor_id, reason, &mut *conn).await?;
    let mut entry = NewTransactionLog::new(
        LogAction::StatusChanged,
        LogLevel::Info,
        format!("Order status changed from {old_status} to {}", order.status),
    )
    .for_order(&order.order_id)
    .with_metadata(json!({ "from": old_status, "to": order.status, "reason": reason }));
    if let Some(actor) = actor_id {
        entry = entry.with_user(actor);
    }
    logs::insert_log(entry, conn).await?;
    Ok(())
}

/// The status the order held before the transition that was just claimed. Every status change lands in the history,
/// so the latest entry (the new one has not been written yet) holds it.
async fn previous_status(
    order_id: &OrderId,
    new_status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<OrderStatusType, MarketplaceError> {
    let history = orders::fetch_status_history(order_id, conn).await?;
    let from_history = history.last().map(|h| h.status).filter(|s| s.can_transition_to(new_status));
    let fallback = new_status.allowed_predecessors().first().copied().unwrap_or(OrderStatusType::Pending);
    Ok(from_history.unwrap_or(fallback))
}

async fn settle_in_transaction(
    order_id: &OrderId,
    rate: CommissionRate,
    conn: &mut SqliteConnection,
) -> Result<SettlementOutcome, MarketplaceError> {
    let Some(order) = orders::claim_settlement(order_id, &mut *conn).await? else {
        let order = orders::fetch_order(order_id, &mut *conn)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
        if order.status != OrderStatusType::Delivered {
            return Err(MarketplaceError::OrderNotDelivered(order_id.clone()));
        }
        if !order.vendors_credited && order.payment_status == OrderPaymentStatus::Refunded {
            warn!("💸️ Order {order_id} was refunded before delivery. Vendors are not credited");
            let entry = NewTransactionLog::new(
                LogAction::VendorCreditFailed,
                LogLevel::Warning,
                "Settlement skipped. The payment was refunded before delivery",
            )
            .for_order(order_id)
            .with_amount(order.total_price);
            logs::insert_log(entry, &mut *conn).await?;
            return Ok(SettlementOutcome::refunded(order));
        }
        debug!("💸️ Order {order_id} has already been settled");
        return Ok(SettlementOutcome::already_settled(order));
    };
    let items = orders::fetch_order_items(order_id, &mut *conn).await?;
    let mut credits = BatchOutcome::default();
    for item in items.iter().filter(|i| !i.is_credited()) {
        let result = settlement::credit_vendor_for_item(order_id, item, rate, &mut *conn).await;
        if let Err(failure) = &result {
            warn!(
                "💸️ Could not credit vendor #{} for item #{}. {}",
                failure.vendor_id, failure.order_item_id, failure.reason
            );
            let entry = NewTransactionLog::new(
                LogAction::VendorCreditFailed,
                LogLevel::Error,
                format!("Could not credit vendor #{} for {}", failure.vendor_id, item.product_name),
            )
            .for_order(order_id)
            .with_amount(item.item_subtotal())
            .with_user(failure.vendor_id)
            .with_metadata(json!({
                "order_item_id": failure.order_item_id,
                "product_id": failure.product_id,
                "reason": failure.reason,
            }));
            logs::insert_log(entry, &mut *conn).await?;
        }
        credits.push(result);
    }
    info!(
        "💸️ Order {order_id} settled. {} items credited, {} failed",
        credits.success_count(),
        credits.failure_count()
    );
    Ok(SettlementOutcome { order, already_settled: false, refunded: false, credits })
}

impl LedgerManagement for SqliteDatabase {
    async fn fetch_or_create_wallet(&self, user_id: i64) -> Result<Wallet, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = ledger::fetch_or_create_wallet(user_id, &mut conn).await?;
        Ok(wallet)
    }

    async fn fetch_wallet_transactions(&self, user_id: i64) -> Result<Vec<WalletTransaction>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let transactions = ledger::fetch_wallet_transactions(user_id, &mut conn).await?;
        Ok(transactions)
    }

    async fn credit_wallet(
        &self,
        user_id: i64,
        amount: Money,
        source: &str,
    ) -> Result<(Wallet, WalletTransaction), LedgerError> {
        let mut tx = self.pool.begin().await?;
        let result = ledger::credit(user_id, amount, source, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn debit_wallet(
        &self,
        user_id: i64,
        amount: Money,
        source: &str,
    ) -> Result<(Wallet, WalletTransaction), LedgerError> {
        let mut tx = self.pool.begin().await?;
        let result = ledger::debit(user_id, amount, source, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn withdraw(&self, user_id: i64, amount: Money) -> Result<(Wallet, Payout), LedgerError> {
        let mut tx = self.pool.begin().await?;
        let (wallet, _) = ledger::debit(user_id, amount, ledger::WITHDRAWAL_SOURCE, &mut tx).await?;
        let payout = ledger::insert_payout(user_id, amount, &mut tx).await?;
        let entry =
            NewTransactionLog::new(LogAction::Withdrawal, LogLevel::Info, format!("User #{user_id} withdrew {amount}"))
                .with_amount(amount)
                .with_user(user_id)
                .with_metadata(json!({ "payout_reference": payout.reference }));
        logs::insert_log(entry, &mut tx).await?;
        tx.commit().await?;
        info!("💸️ User #{user_id} withdrew {amount}. Payout reference {}", payout.reference);
        Ok((wallet, payout))
    }

    async fn fetch_pending_vendor_items(&self, vendor_id: i64) -> Result<Vec<OrderItem>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let items = ledger::fetch_pending_vendor_items(vendor_id, &mut conn).await?;
        Ok(items)
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn fetch_identity(&self, user_id: i64) -> Result<Option<Identity>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let identity = catalog::fetch_identity(user_id, &mut conn).await?;
        Ok(identity)
    }

    async fn fetch_active_admins(&self) -> Result<Vec<Identity>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let admins = catalog::fetch_active_identities_with_role(Role::Admin, &mut conn).await?;
        Ok(admins)
    }

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let product = catalog::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_cart(&self, customer_id: i64) -> Result<Vec<CartItem>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let cart = catalog::fetch_cart(customer_id, &mut conn).await?;
        Ok(cart)
    }

    async fn upsert_identity(&self, identity: NewIdentity) -> Result<Identity, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let identity = catalog::upsert_identity(identity, &mut conn).await?;
        Ok(identity)
    }

    async fn upsert_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let product = catalog::upsert_product(product, &mut conn).await?;
        Ok(product)
    }

    async fn set_product_active(&self, product_id: i64, active: bool) -> Result<Product, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::set_product_active(product_id, active, &mut conn).await
    }

    async fn set_cart_quantity(&self, customer_id: i64, product_id: i64, quantity: i64) -> Result<(), CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::set_cart_quantity(customer_id, product_id, quantity, &mut conn).await
    }
}

impl OrderQueries for SqliteDatabase {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, QueryError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, QueryError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn fetch_payment_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, QueryError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment_for_order(order_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_payment_by_reference(&self, reference: &str) -> Result<Option<PaymentRecord>, QueryError> {
        let mut conn = self.pool.acquire().await?;
        let record = payments::fetch_payment_record(reference, &mut conn).await?;
        Ok(record)
    }

    async fn fetch_plan_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<(InstallmentPlan, Vec<InstallmentPayment>)>, QueryError> {
        let mut conn = self.pool.acquire().await?;
        let plan = payments::fetch_plan_for_order(order_id, &mut conn).await?;
        Ok(plan)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, QueryError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_status_history(&self, order_id: &OrderId) -> Result<Vec<OrderStatusHistory>, QueryError> {
        let mut conn = self.pool.acquire().await?;
        let history = orders::fetch_status_history(order_id, &mut conn).await?;
        Ok(history)
    }

    async fn fetch_transaction_logs(&self, order_id: &OrderId) -> Result<Vec<TransactionLog>, QueryError> {
        let mut conn = self.pool.acquire().await?;
        let logs = logs::fetch_logs_for_order(order_id, &mut conn).await?;
        Ok(logs)
    }

    async fn fetch_refund(&self, refund_id: i64) -> Result<Option<Refund>, QueryError> {
        let mut conn = self.pool.acquire().await?;
        let refund = refunds::fetch_refund(refund_id, &mut conn).await?;
        Ok(refund)
    }

    async fn fetch_refunds(&self) -> Result<Vec<Refund>, QueryError> {
        let mut conn = self.pool.acquire().await?;
        let refunds = refunds::fetch_refunds(&mut conn).await?;
        Ok(refunds)
    }
}

/// Notifications are written to the `notifications` table, where the delivery transport picks them up.
impl NotificationDispatcher for SqliteDatabase {
    fn notify(&self, notification: Notification) -> impl Future<Output = Result<(), NotificationError>> + Send {
        let pool = self.pool.clone();
        async move {
            let mut conn = pool.acquire().await?;
            let stored = logs::insert_notification(notification, &mut conn).await?;
            trace!("📬️ Notification #{} stored for user #{}", stored.id, stored.recipient_id);
            Ok(())
        }
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the SQLite database file at `url` if it does not exist yet.
    pub async fn create_if_missing(url: &str) -> Result<(), sqlx::Error> {
        if !Sqlite::database_exists(url).await? {
            info!("🗃️ Creating new database at {url}");
            Sqlite::create_database(url).await?;
        }
        Ok(())
    }

    /// Brings the schema up to date with the migrations embedded in this crate.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        debug!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub async fn fetch_notifications(&self, recipient_id: i64) -> Result<Vec<StoredNotification>, NotificationError> {
        let mut conn = self.pool.acquire().await?;
        let notifications = logs::fetch_notifications(recipient_id, &mut conn).await?;
        Ok(notifications)
    }
}
