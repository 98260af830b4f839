use std::fmt::Debug;

use crate::{
    db_types::{Order, OrderId, Principal, TransactionLog},
    market_api::order_objects::{OrderDetails, OrderQueryFilter},
    traits::{OrderQueries, QueryError},
};

/// Read-only access to orders.
pub struct OrdersApi<B> {
    db: B,
}

impl<B> Debug for OrdersApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrdersApi")
    }
}

impl<B> OrdersApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrdersApi<B>
where B: OrderQueries
{
    /// The order with its items, payment or installment plan, and status history.
    pub async fn order_details(&self, order_id: &OrderId) -> Result<Option<OrderDetails>, QueryError> {
        let Some(order) = self.db.fetch_order(order_id).await? else {
            return Ok(None);
        };
        let items = self.db.fetch_order_items(order_id).await?;
        let payment = self.db.fetch_payment_for_order(order_id).await?;
        let (installment_plan, installments) = match self.db.fetch_plan_for_order(order_id).await? {
            Some((plan, installments)) => (Some(plan), installments),
            None => (None, Vec::new()),
        };
        let history = self.db.fetch_status_history(order_id).await?;
        Ok(Some(OrderDetails { order, items, payment, installment_plan, installments, history }))
    }

    /// The orders visible to the principal: customers see what they bought, vendors see orders containing their
    /// products, and admins see everything.
    pub async fn orders_for(&self, principal: &Principal) -> Result<Vec<Order>, QueryError> {
        let filter = match principal {
            Principal::Customer(id) => OrderQueryFilter::default().with_customer_id(*id),
            Principal::Vendor(id) => OrderQueryFilter::default().with_vendor_id(*id),
            Principal::Admin(_) => OrderQueryFilter::default(),
        };
        self.db.search_orders(filter).await
    }

    pub async fn search(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, QueryError> {
        self.db.search_orders(filter).await
    }

    pub async fn logs(&self, order_id: &OrderId) -> Result<Vec<TransactionLog>, QueryError> {
        self.db.fetch_transaction_logs(order_id).await
    }
}
