use thiserror::Error;

use crate::{
    db_types::{
        InstallmentPayment,
        InstallmentPlan,
        Order,
        OrderId,
        OrderItem,
        OrderStatusHistory,
        Payment,
        Refund,
        TransactionLog,
    },
    market_api::order_objects::OrderQueryFilter,
    traits::PaymentRecord,
};

#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User error constructing query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for QueryError {
    fn from(e: sqlx::Error) -> Self {
        QueryError::DatabaseError(e.to_string())
    }
}

/// Read-only access to orders and everything hanging off them.
#[allow(async_fn_in_trait)]
pub trait OrderQueries {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, QueryError>;

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, QueryError>;

    /// The single-shot payment for the order, if it was not bought on installments.
    async fn fetch_payment_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, QueryError>;

    /// Looks the reference up in single-shot payments first, then in installments.
    async fn fetch_payment_by_reference(&self, reference: &str) -> Result<Option<PaymentRecord>, QueryError>;

    /// The installment plan for the order, along with its installments in payment order.
    async fn fetch_plan_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<(InstallmentPlan, Vec<InstallmentPayment>)>, QueryError>;

    /// Orders matching the filter, newest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, QueryError>;

    async fn fetch_status_history(&self, order_id: &OrderId) -> Result<Vec<OrderStatusHistory>, QueryError>;

    /// The audit trail for the order, oldest first.
    async fn fetch_transaction_logs(&self, order_id: &OrderId) -> Result<Vec<TransactionLog>, QueryError>;

    async fn fetch_refund(&self, refund_id: i64) -> Result<Option<Refund>, QueryError>;

    /// All refunds, newest first.
    async fn fetch_refunds(&self) -> Result<Vec<Refund>, QueryError>;
}
