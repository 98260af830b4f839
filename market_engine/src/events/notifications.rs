//! Hooks that turn marketplace events into user notifications.
//!
//! Delivery is fire-and-forget: each notification is retried according to the [`RetryPolicy`], and a notification
//! that still cannot be delivered is logged and dropped. Nothing upstream waits on, or fails because of, a
//! notification.
use log::*;
use serde_json::json;

use crate::{
    db_types::RefundStatus,
    events::{EventHooks, HookFuture, RetryPolicy},
    traits::{Notification, NotificationDispatcher},
};

pub async fn deliver<D: NotificationDispatcher>(dispatcher: &D, policy: &RetryPolicy, notification: Notification) {
    let recipient = notification.recipient_id;
    let label = format!("Notification '{}' for user #{recipient}", notification.title);
    match policy.run(&label, || dispatcher.notify(notification.clone())).await {
        Ok(()) => trace!("📬️ {label} delivered"),
        Err(e) => error!("📬️ {label} could not be delivered and has been dropped. {e}"),
    }
}

fn send_all<D>(dispatcher: &D, policy: RetryPolicy, notifications: Vec<Notification>) -> HookFuture
where D: NotificationDispatcher {
    let dispatcher = dispatcher.clone();
    Box::pin(async move {
        for notification in notifications {
            deliver(&dispatcher, &policy, notification).await;
        }
    })
}

/// Builds the notification hooks: customers hear about payments, status changes and refunds; vendors about credits;
/// admins about overdue deliveries.
pub fn notification_hooks<D: NotificationDispatcher>(dispatcher: D, policy: RetryPolicy) -> EventHooks {
    let mut hooks = EventHooks::default();
    let d = dispatcher.clone();
    hooks.on_order_paid(move |ev| {
        let order = ev.order;
        let n = Notification::new(
            order.customer_id,
            "Payment received",
            format!("We have received your payment of {} for order {}.", order.total_price, order.order_id),
        )
        .with_metadata(json!({ "order_id": order.order_id, "amount": order.total_price }));
        send_all(&d, policy, vec![n])
    });
    let d = dispatcher.clone();
    hooks.on_status_changed(move |ev| {
        let status = ev.new_status();
        let order = ev.order;
        let n = Notification::new(
            order.customer_id,
            "Order update",
            format!("Your order {} is now {status}.", order.order_id),
        )
        .with_metadata(json!({ "order_id": order.order_id, "from": ev.old_status, "to": status }));
        send_all(&d, policy, vec![n])
    });
    let d = dispatcher.clone();
    hooks.on_vendor_credited(move |ev| {
        let credit = ev.credit;
        let n = Notification::new(
            credit.vendor_id,
            "Wallet credited",
            format!("Your wallet was credited {} for a sale in order {}.", credit.vendor_share, ev.order_id),
        )
        .with_metadata(json!({
            "order_id": ev.order_id,
            "order_item_id": credit.order_item_id,
            "vendor_share": credit.vendor_share,
            "commission": credit.commission,
        }));
        send_all(&d, policy, vec![n])
    });
    let d = dispatcher.clone();
    hooks.on_refund_processed(move |ev| {
        let refund = ev.refund;
        let message = match refund.status {
            RefundStatus::Approved => {
                format!("Your refund of {} for order {} was approved.", refund.refunded_amount, refund.order_id)
            },
            _ => format!("Your refund request for order {} was rejected.", refund.order_id),
        };
        let n = Notification::new(refund.customer_id, "Refund update", message)
            .with_metadata(json!({ "refund_id": refund.id, "status": refund.status }));
        send_all(&d, policy, vec![n])
    });
    let d = dispatcher;
    hooks.on_overdue_delivery(move |ev| {
        let order_id = ev.order.order_id;
        let notifications = ev
            .admin_ids
            .iter()
            .map(|admin| {
                Notification::new(
                    *admin,
                    "Overdue delivery",
                    format!("Order {order_id} shipped {} days ago and has not been delivered.", ev.days_overdue),
                )
                .with_metadata(json!({
                    "order_id": order_id,
                    "days_overdue": ev.days_overdue,
                    "delivery_agent_id": ev.order.delivery_agent_id,
                }))
            })
            .collect();
        send_all(&d, policy, notifications)
    });
    hooks
}
