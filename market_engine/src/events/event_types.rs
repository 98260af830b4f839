use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, OrderId, OrderStatusType, Refund},
    traits::VendorCredit,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order: Order,
    pub old_status: OrderStatusType,
}

impl OrderStatusChangedEvent {
    pub fn new(order: Order, old_status: OrderStatusType) -> Self {
        Self { order, old_status }
    }

    pub fn new_status(&self) -> OrderStatusType {
        self.order.status
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorCreditedEvent {
    pub order_id: OrderId,
    pub credit: VendorCredit,
}

impl VendorCreditedEvent {
    pub fn new(order_id: OrderId, credit: VendorCredit) -> Self {
        Self { order_id, credit }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundProcessedEvent {
    pub refund: Refund,
    pub order: Order,
}

impl RefundProcessedEvent {
    pub fn new(refund: Refund, order: Order) -> Self {
        Self { refund, order }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverdueDeliveryEvent {
    pub order: Order,
    pub days_overdue: i64,
    /// The active admins at the time the delivery was flagged. Each of them is notified.
    pub admin_ids: Vec<i64>,
}

impl OverdueDeliveryEvent {
    pub fn new(order: Order, days_overdue: i64, admin_ids: Vec<i64>) -> Self {
        Self { order, days_overdue, admin_ids }
    }
}
