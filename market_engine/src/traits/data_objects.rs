use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{
    InstallmentDuration,
    InstallmentPayment,
    InstallmentPlan,
    Money,
    NewInstallment,
    NewOrder,
    NewTransactionLog,
    Order,
    OrderId,
    OrderItem,
    OrderStatusType,
    Payment,
    Refund,
    WalletTransaction,
};

//--------------------------------------       Checkout        ---------------------------------------------------------
/// Everything a checkout writes before the gateway is contacted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCheckout {
    pub order: NewOrder,
    pub payment: NewCheckoutPayment,
    /// Audit entries to write alongside the order (e.g. a failed delivery fee estimate)
    pub logs: Vec<NewTransactionLog>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewCheckoutPayment {
    Single { reference: String },
    Installments { duration: InstallmentDuration, schedule: Vec<NewInstallment> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedCheckout {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment: StagedPayment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StagedPayment {
    Single(Payment),
    Installments { plan: InstallmentPlan, installments: Vec<InstallmentPayment> },
}

impl StagedCheckout {
    /// The reference and amount of the payment the customer must make first.
    pub fn first_payment_due(&self) -> Option<(&str, Money)> {
        match &self.payment {
            StagedPayment::Single(p) => Some((p.reference.as_str(), p.amount)),
            StagedPayment::Installments { installments, .. } => {
                installments.first().map(|i| (i.reference.as_str(), i.amount))
            },
        }
    }
}

//--------------------------------------       Payments        ---------------------------------------------------------
/// A payment record located by its gateway reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payment", rename_all = "snake_case")]
pub enum PaymentRecord {
    Single(Payment),
    Installment(InstallmentPayment),
}

impl PaymentRecord {
    pub fn order_id(&self) -> &OrderId {
        match self {
            Self::Single(p) => &p.order_id,
            Self::Installment(i) => &i.order_id,
        }
    }

    pub fn reference(&self) -> &str {
        match self {
            Self::Single(p) => p.reference.as_str(),
            Self::Installment(i) => i.reference.as_str(),
        }
    }

    pub fn amount(&self) -> Money {
        match self {
            Self::Single(p) => p.amount,
            Self::Installment(i) => i.amount,
        }
    }

    /// True once the latch (`verified` for payments, `PAID` for installments) has been set.
    pub fn is_settled(&self) -> bool {
        match self {
            Self::Single(p) => p.verified,
            Self::Installment(i) => i.is_paid(),
        }
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Single(p) => p.paid_at,
            Self::Installment(i) => i.paid_at,
        }
    }
}

/// The result of confirming a payment that the gateway has vouched for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub record: PaymentRecord,
    pub order: Order,
    /// False if the payment had already been confirmed; nothing was changed in that case.
    pub newly_verified: bool,
    /// True if this confirmation moved the order to PAID.
    pub order_paid: bool,
}

//--------------------------------------     Batch outcomes    ---------------------------------------------------------
/// The per-item results of an operation that carries on when individual items fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome<S, F> {
    pub results: Vec<Result<S, F>>,
}

impl<S, F> Default for BatchOutcome<S, F> {
    fn default() -> Self {
        Self { results: Vec::new() }
    }
}

impl<S, F> BatchOutcome<S, F> {
    pub fn push(&mut self, result: Result<S, F>) {
        self.results.push(result);
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &S> {
        self.results.iter().filter_map(|r| r.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &F> {
        self.results.iter().filter_map(|r| r.as_ref().err())
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorCredit {
    pub order_item_id: i64,
    pub vendor_id: i64,
    pub product_id: i64,
    pub item_subtotal: Money,
    pub commission_rate: String,
    pub commission: Money,
    pub vendor_share: Money,
    pub transaction: WalletTransaction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorCreditFailure {
    pub order_item_id: i64,
    pub vendor_id: i64,
    pub product_id: i64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    pub order: Order,
    /// True if the order had already been settled. No wallet was touched in that case.
    pub already_settled: bool,
    /// True if the payment was refunded before the order was settled. Nothing is owed to the vendors.
    pub refunded: bool,
    pub credits: BatchOutcome<VendorCredit, VendorCreditFailure>,
}

impl SettlementOutcome {
    pub fn already_settled(order: Order) -> Self {
        Self { order, already_settled: true, refunded: false, credits: BatchOutcome::default() }
    }

    pub fn refunded(order: Order) -> Self {
        Self { order, already_settled: false, refunded: true, credits: BatchOutcome::default() }
    }

    pub fn total_credited(&self) -> Money {
        self.credits.succeeded().map(|c| c.vendor_share).sum()
    }

    pub fn total_commission(&self) -> Money {
        self.credits.succeeded().map(|c| c.commission).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionReversal {
    pub order_item_id: i64,
    pub vendor_id: i64,
    pub commission: Money,
    pub transaction: WalletTransaction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionReversalFailure {
    pub order_item_id: i64,
    pub vendor_id: i64,
    pub commission: Money,
    pub reason: String,
}

//--------------------------------------      Order flow       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionResult {
    pub old_status: OrderStatusType,
    pub order: Order,
    /// Present when the transition delivered the order and settlement ran
    pub settlement: Option<SettlementOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundOutcome {
    pub refund: Refund,
    pub order: Order,
    /// The credit to the customer's wallet. `None` when the refund was rejected.
    pub customer_credit: Option<WalletTransaction>,
    pub reversals: BatchOutcome<CommissionReversal, CommissionReversalFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverdueDelivery {
    pub order: Order,
    pub days_overdue: i64,
}
