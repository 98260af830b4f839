use chrono::Duration;
use thiserror::Error;

use crate::{
    db_types::{
        Money,
        NewRefund,
        NewTransactionLog,
        Order,
        OrderId,
        OrderStatusType,
        Payment,
        Refund,
        RefundDecision,
        TransactionLog,
    },
    helpers::CommissionRate,
    traits::{
        data_objects::{
            NewCheckout,
            OverdueDelivery,
            PaymentConfirmation,
            PaymentRecord,
            RefundOutcome,
            SettlementOutcome,
            StagedCheckout,
            TransitionResult,
        },
        CatalogError,
        CatalogManagement,
        LedgerError,
        LedgerManagement,
        OrderQueries,
        QueryError,
    },
};

/// This trait defines the highest level of behaviour for marketplace backends.
///
/// Every mutating method here is a single atomic unit of work. Implementations must make the latches (`verified`,
/// `vendors_credited`, `commission_reversed`) safe under concurrent callers: the check and the set happen under the
/// same lock, so two racing callers can never both see the latch open.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone + LedgerManagement + CatalogManagement + OrderQueries {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Writes the order, its items, the payment (or installment plan) and any audit entries in one transaction.
    /// The customer's cart is left untouched.
    async fn stage_checkout(&self, checkout: NewCheckout) -> Result<StagedCheckout, MarketplaceError>;

    /// Compensates for a checkout whose gateway initialization failed: deletes the staged order and everything that
    /// hangs off it. Only unpaid, pending orders can be discarded.
    async fn discard_checkout(&self, order_id: &OrderId) -> Result<(), MarketplaceError>;

    /// Completes a staged checkout once the gateway has handed out an authorization URL: records the URL against
    /// the payment with `reference`, removes the ordered products from the customer's cart and logs the
    /// initialization.
    async fn finalize_checkout(
        &self,
        order_id: &OrderId,
        reference: &str,
        authorization_url: &str,
    ) -> Result<PaymentRecord, MarketplaceError>;

    /// Recomputes the order total from its items, delivery fee and discount. An unverified single-shot payment
    /// follows the new total.
    async fn recompute_order_total(&self, order_id: &OrderId) -> Result<(Order, Option<Payment>), MarketplaceError>;

    /// Records a fresh authorization URL for an unsettled payment or installment, and logs the re-initialization.
    async fn set_authorization_url(
        &self,
        reference: &str,
        authorization_url: &str,
    ) -> Result<PaymentRecord, MarketplaceError>;

    /// Marks the payment or installment with `reference` as paid. Must only be called once the gateway has vouched
    /// for the payment.
    ///
    /// If it was already paid, the existing record is returned unchanged with `newly_verified == false`.
    /// A single-shot payment moves the order to PAID. An installment does so only if it was the last unpaid one;
    /// otherwise the order's payment status becomes PARTIAL.
    async fn confirm_payment(&self, reference: &str) -> Result<PaymentConfirmation, MarketplaceError>;

    /// Moves the order to `new_status` and appends the status history entry. Transitions not allowed by the order
    /// lifecycle fail with [`MarketplaceError::InvalidTransition`].
    ///
    /// Moving to DELIVERED settles the order in the same transaction (see [`Self::settle_order`]).
    async fn transition_order(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
        actor_id: Option<i64>,
        reason: Option<String>,
        commission_rate: CommissionRate,
    ) -> Result<TransitionResult, MarketplaceError>;

    /// Credits every vendor in a delivered order with their share of each item, net of commission.
    ///
    /// Runs at most once per order, gated by the `vendors_credited` latch. A failed credit for one item is logged and
    /// does not stop the others. The latch is set once every item has been attempted.
    async fn settle_order(
        &self,
        order_id: &OrderId,
        commission_rate: CommissionRate,
    ) -> Result<SettlementOutcome, MarketplaceError>;

    async fn assign_delivery_agent(&self, order_id: &OrderId, agent_id: i64) -> Result<Order, MarketplaceError>;

    /// Creates a PENDING refund against the order's verified single-shot payment.
    async fn create_refund(&self, refund: NewRefund) -> Result<Refund, MarketplaceError>;

    /// Approves or rejects a pending refund.
    ///
    /// Approval credits the customer with the refunded amount and marks the order REFUNDED. If the vendors were
    /// already credited for the order, each vendor's stored commission is debited back, item by item; a failed
    /// reversal is logged and skipped. Rejection moves no money.
    async fn process_refund(
        &self,
        refund_id: i64,
        decision: RefundDecision,
        admin_id: i64,
    ) -> Result<RefundOutcome, MarketplaceError>;

    async fn append_log(&self, entry: NewTransactionLog) -> Result<TransactionLog, MarketplaceError>;

    /// Finds shipped orders that have been on the road for longer than `max_age` and logs a warning against each.
    async fn flag_overdue_deliveries(&self, max_age: Duration) -> Result<Vec<OverdueDelivery>, MarketplaceError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), MarketplaceError>;
}

#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The order must contain at least one item")]
    EmptyOrder,
    #[error("The order total must be positive. Got {0}")]
    InvalidOrderTotal(Money),
    #[error("The order total cannot be computed. {0}")]
    AmountOutOfRange(String),
    #[error("No payment exists with reference {0}")]
    PaymentNotFound(String),
    #[error("Order {0} cannot be paid for in its current state")]
    OrderNotPayable(OrderId),
    #[error("Cannot move an order from {from} to {to}")]
    InvalidTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("Order {0} has not been delivered yet")]
    OrderNotDelivered(OrderId),
    #[error("User {0} is not an active delivery agent")]
    InvalidDeliveryAgent(i64),
    #[error("The refund with id {0} does not exist")]
    RefundNotFound(i64),
    #[error("Refund already processed")]
    RefundAlreadyProcessed(i64),
    #[error("A refund has already been requested for order {0}")]
    RefundAlreadyExists(OrderId),
    #[error("Order {0} has no verified payment that can be refunded")]
    NoRefundablePayment(OrderId),
    #[error("Cannot refund {requested}. Only {paid} was paid")]
    RefundExceedsPayment { requested: Money, paid: Money },
    #[error("Invalid amount: {0}")]
    InvalidAmount(Money),
    #[error("{0}")]
    Forbidden(String),
    #[error("Ledger error. {0}")]
    LedgerError(#[from] LedgerError),
    #[error("Catalog error. {0}")]
    CatalogError(#[from] CatalogError),
    #[error("Query error. {0}")]
    QueryError(#[from] QueryError),
}

impl From<sqlx::Error> for MarketplaceError {
    fn from(e: sqlx::Error) -> Self {
        MarketplaceError::DatabaseError(e.to_string())
    }
}
