use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use market_common::{Money, MoneyConversionError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

use crate::helpers::{delivery::GeoPoint, CommissionRate};

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

/// Implements `Display` and `FromStr` for the enums that are stored as text in the database. The strings must match
/// the `sqlx` renaming rules applied to the type.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $text),)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ConversionError(format!("'{s}' is not a valid {}", stringify!($name)))),
                }
            }
        }
    };
}

//--------------------------------------       OrderId         ---------------------------------------------------------
/// The public identifier of an order. It is a UUID, and is distinct from the internal primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

//--------------------------------------         Role          ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Vendor,
    Admin,
    DeliveryAgent,
}

text_enum!(Role { Customer => "customer", Vendor => "vendor", Admin => "admin", DeliveryAgent => "delivery_agent" });

//--------------------------------------       Principal       ---------------------------------------------------------
/// The authenticated caller of an operation. It is resolved once, when the request is authenticated, and then passed
/// explicitly to every operation that needs to know who is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Principal {
    Customer(i64),
    Vendor(i64),
    Admin(i64),
}

impl Principal {
    pub fn user_id(&self) -> i64 {
        match self {
            Self::Customer(id) | Self::Vendor(id) | Self::Admin(id) => *id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::Customer(_) => Role::Customer,
            Self::Vendor(_) => Role::Vendor,
            Self::Admin(_) => Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin(_))
    }

    /// Admins can see everything. Everyone else can only see records that belong to them.
    pub fn can_access(&self, owner_id: i64) -> bool {
        self.is_admin() || self.user_id() == owner_id
    }
}

impl Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.role(), self.user_id())
    }
}

impl FromStr for Principal {
    type Err = ConversionError;

    /// Parses `<role>:<user id>`, e.g. `customer:42`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (role, id) = s.split_once(':').ok_or_else(|| ConversionError(format!("'{s}' is not role:id")))?;
        let id = id.trim().parse::<i64>().map_err(|e| ConversionError(format!("Invalid user id in '{s}'. {e}")))?;
        match role.trim().to_lowercase().parse::<Role>()? {
            Role::Customer => Ok(Self::Customer(id)),
            Role::Vendor => Ok(Self::Vendor(id)),
            Role::Admin => Ok(Self::Admin(id)),
            Role::DeliveryAgent => Err(ConversionError("Delivery agents cannot call the marketplace API".into())),
        }
    }
}

//--------------------------------------       Identity        ---------------------------------------------------------
/// A record from the identity directory.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Identity {
    /// The default delivery location on file for this identity, if any.
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIdentity {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub location: Option<GeoPoint>,
}

impl NewIdentity {
    pub fn new<S: Into<String>>(id: i64, email: S, role: Role) -> Self {
        Self { id, email: email.into(), role, is_active: true, location: None }
    }

    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

//--------------------------------------        Product        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub vendor_id: i64,
    pub name: String,
    pub price: Money,
    pub discount_price: Option<Money>,
    pub is_active: bool,
}

impl Product {
    /// The price a customer pays right now: the discounted price if there is one, otherwise the list price.
    pub fn final_price(&self) -> Money {
        self.discount_price.unwrap_or(self.price)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub id: i64,
    pub vendor_id: i64,
    pub name: String,
    pub price: Money,
    pub discount_price: Option<Money>,
}

impl NewProduct {
    pub fn new<S: Into<String>>(id: i64, vendor_id: i64, name: S, price: Money) -> Self {
        Self { id, vendor_id, name: name.into(), price, discount_price: None }
    }

    pub fn with_discount_price(mut self, price: Money) -> Self {
        self.discount_price = Some(price);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    pub customer_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// The order has been created, but has not been paid for in full yet.
    Pending,
    /// Payment has been received and verified with the gateway.
    Paid,
    Shipped,
    Delivered,
    /// A delivered order that came back.
    Returned,
    Canceled,
}

text_enum!(OrderStatusType {
    Pending => "PENDING",
    Paid => "PAID",
    Shipped => "SHIPPED",
    Delivered => "DELIVERED",
    Returned => "RETURNED",
    Canceled => "CANCELED",
});

impl OrderStatusType {
    /// The order lifecycle:
    ///
    /// ```text
    /// PENDING -> PAID -> SHIPPED -> DELIVERED -> RETURNED
    ///    \________\________\-----> CANCELED
    /// ```
    pub fn can_transition_to(&self, new_status: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!(
            (self, new_status),
            (Pending, Paid) |
                (Paid, Shipped) |
                (Shipped, Delivered) |
                (Pending | Paid | Shipped, Canceled) |
                (Delivered, Returned)
        )
    }

    /// The statuses from which an order may move into `self`.
    pub fn allowed_predecessors(&self) -> Vec<OrderStatusType> {
        use OrderStatusType::*;
        [Pending, Paid, Shipped, Delivered, Returned, Canceled]
            .into_iter()
            .filter(|s| s.can_transition_to(*self))
            .collect()
    }
}

//-------------------------------------- OrderPaymentStatus  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderPaymentStatus {
    Unpaid,
    /// At least one, but not every installment has been paid.
    Partial,
    Paid,
    Refunded,
}

text_enum!(OrderPaymentStatus { Unpaid => "UNPAID", Partial => "PARTIAL", Paid => "PAID", Refunded => "REFUNDED" });

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub customer_id: i64,
    pub status: OrderStatusType,
    pub payment_status: OrderPaymentStatus,
    pub total_price: Money,
    pub delivery_fee: Money,
    pub discount: Money,
    pub currency: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Latch. Once set, settlement never runs again for this order.
    pub vendors_credited: bool,
    pub delivery_agent_id: Option<i64>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_delivered(&self) -> bool {
        self.status == OrderStatusType::Delivered
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub customer_id: i64,
    pub currency: String,
    pub delivery_fee: Money,
    pub discount: Money,
    pub location: Option<GeoPoint>,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn new<S: Into<String>>(customer_id: i64, currency: S, items: Vec<NewOrderItem>) -> Self {
        Self {
            order_id: OrderId::random(),
            customer_id,
            currency: currency.into(),
            delivery_fee: Money::default(),
            discount: Money::default(),
            location: None,
            items,
        }
    }

    pub fn subtotal(&self) -> Result<Money, MoneyConversionError> {
        let subtotals = self.items.iter().map(NewOrderItem::item_subtotal).collect::<Result<Vec<_>, _>>()?;
        Money::checked_sum(subtotals)
    }

    pub fn total_price(&self) -> Result<Money, MoneyConversionError> {
        self.subtotal()?.checked_add(self.delivery_fee)?.checked_sub(self.discount)
    }
}

//--------------------------------------       OrderItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: i64,
    pub vendor_id: i64,
    pub product_name: String,
    pub quantity: i64,
    /// Snapshotted from the catalog at checkout. Never re-read from the live catalog.
    pub price_at_purchase: Money,
    /// The settlement snapshot. These are only set once the vendor has been credited for this item.
    pub commission_rate: Option<String>,
    pub commission: Option<Money>,
    pub vendor_share: Option<Money>,
    pub credited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Stored items passed the checked arithmetic at checkout, so this cannot saturate for them.
    pub fn item_subtotal(&self) -> Money {
        Money::from(self.price_at_purchase.value().saturating_mul(self.quantity))
    }

    pub fn is_credited(&self) -> bool {
        self.credited_at.is_some()
    }

    /// The commission rate in force when this item was settled.
    pub fn settled_commission_rate(&self) -> Option<CommissionRate> {
        self.commission_rate.as_deref().and_then(|r| r.parse().ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub vendor_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub price_at_purchase: Money,
}

impl NewOrderItem {
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        Self {
            product_id: product.id,
            vendor_id: product.vendor_id,
            product_name: product.name.clone(),
            quantity,
            price_at_purchase: product.final_price(),
        }
    }

    pub fn item_subtotal(&self) -> Result<Money, MoneyConversionError> {
        self.price_at_purchase.checked_mul(self.quantity)
    }
}

//--------------------------------------  OrderStatusHistory   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderStatusHistory {
    pub id: i64,
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub actor_id: Option<i64>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------        Payment        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

text_enum!(PaymentStatus { Pending => "PENDING", Success => "SUCCESS", Failed => "FAILED" });

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: OrderId,
    /// The idempotency key shared with the payment gateway.
    pub reference: String,
    pub amount: Money,
    pub currency: String,
    pub status: PaymentStatus,
    /// Latch. Once set, re-verification returns this record unchanged.
    pub verified: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub authorization_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//-------------------------------------- InstallmentDuration ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum InstallmentDuration {
    #[sqlx(rename = "1_month")]
    #[serde(rename = "1_month")]
    OneMonth,
    #[sqlx(rename = "3_months")]
    #[serde(rename = "3_months")]
    ThreeMonths,
    #[sqlx(rename = "6_months")]
    #[serde(rename = "6_months")]
    SixMonths,
    #[sqlx(rename = "1_year")]
    #[serde(rename = "1_year")]
    OneYear,
}

text_enum!(InstallmentDuration {
    OneMonth => "1_month",
    ThreeMonths => "3_months",
    SixMonths => "6_months",
    OneYear => "1_year",
});

impl InstallmentDuration {
    pub fn number_of_installments(&self) -> u32 {
        match self {
            Self::OneMonth => 1,
            Self::ThreeMonths => 3,
            Self::SixMonths => 6,
            Self::OneYear => 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Active,
    Completed,
    Canceled,
}

text_enum!(PlanStatus { Active => "ACTIVE", Completed => "COMPLETED", Canceled => "CANCELED" });

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct InstallmentPlan {
    pub id: i64,
    pub order_id: OrderId,
    pub duration: InstallmentDuration,
    pub number_of_installments: i64,
    pub total_amount: Money,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallmentStatus {
    Pending,
    Paid,
}

text_enum!(InstallmentStatus { Pending => "PENDING", Paid => "PAID" });

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct InstallmentPayment {
    pub id: i64,
    pub plan_id: i64,
    pub order_id: OrderId,
    pub payment_number: i64,
    pub reference: String,
    pub amount: Money,
    pub due_date: DateTime<Utc>,
    pub status: InstallmentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub authorization_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InstallmentPayment {
    pub fn is_paid(&self) -> bool {
        self.status == InstallmentStatus::Paid
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInstallment {
    pub payment_number: i64,
    pub reference: String,
    pub amount: Money,
    pub due_date: DateTime<Utc>,
}

//--------------------------------------        Refund         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Pending,
    Approved,
    Rejected,
}

text_enum!(RefundStatus { Pending => "PENDING", Approved => "APPROVED", Rejected => "REJECTED" });

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Refund {
    pub id: i64,
    pub payment_id: i64,
    pub order_id: OrderId,
    pub customer_id: i64,
    pub reason: String,
    pub refunded_amount: Money,
    pub status: RefundStatus,
    /// Latch. Set once vendor commissions have been clawed back for this refund.
    pub commission_reversed: bool,
    pub rejection_reason: Option<String>,
    pub processed_by: Option<i64>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRefund {
    pub order_id: OrderId,
    pub customer_id: i64,
    pub reason: String,
    /// Defaults to the full payment amount.
    pub amount: Option<Money>,
}

/// What an admin decided to do with a pending refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefundDecision {
    Approve,
    Reject { reason: Option<String> },
}

impl RefundDecision {
    pub fn status(&self) -> RefundStatus {
        match self {
            Self::Approve => RefundStatus::Approved,
            Self::Reject { .. } => RefundStatus::Rejected,
        }
    }
}

//--------------------------------------        Wallet         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Wallet {
    pub id: i64,
    pub user_id: i64,
    /// Never negative. Always equal to the signed sum of the wallet's transactions.
    pub balance: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Credit,
    Debit,
}

text_enum!(TransactionType { Credit => "CREDIT", Debit => "DEBIT" });

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: i64,
    pub wallet_id: i64,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    pub fn signed_amount(&self) -> Money {
        match self.transaction_type {
            TransactionType::Credit => self.amount,
            TransactionType::Debit => -self.amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Payout {
    pub id: i64,
    pub user_id: i64,
    pub amount: Money,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    TransactionLog     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogAction {
    PaymentInitialized,
    PaymentVerified,
    PaymentRejected,
    StatusChanged,
    VendorCredited,
    VendorCreditFailed,
    CommissionDeducted,
    RefundApproved,
    RefundRejected,
    Withdrawal,
    DeliveryFeeFailed,
    OverdueDelivery,
    Other,
}

text_enum!(LogAction {
    PaymentInitialized => "PAYMENT_INITIALIZED",
    PaymentVerified => "PAYMENT_VERIFIED",
    PaymentRejected => "PAYMENT_REJECTED",
    StatusChanged => "STATUS_CHANGED",
    VendorCredited => "VENDOR_CREDITED",
    VendorCreditFailed => "VENDOR_CREDIT_FAILED",
    CommissionDeducted => "COMMISSION_DEDUCTED",
    RefundApproved => "REFUND_APPROVED",
    RefundRejected => "REFUND_REJECTED",
    Withdrawal => "WITHDRAWAL",
    DeliveryFeeFailed => "DELIVERY_FEE_FAILED",
    OverdueDelivery => "OVERDUE_DELIVERY",
    Other => "OTHER",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

text_enum!(LogLevel { Info => "INFO", Success => "SUCCESS", Warning => "WARNING", Error => "ERROR" });

/// An append-only audit record. Never modified once written.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct TransactionLog {
    pub id: i64,
    pub order_id: Option<OrderId>,
    pub action: LogAction,
    pub level: LogLevel,
    pub message: String,
    pub amount: Option<Money>,
    /// JSON text
    pub metadata: String,
    pub related_user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl TransactionLog {
    pub fn metadata_json(&self) -> Value {
        serde_json::from_str(&self.metadata).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransactionLog {
    pub order_id: Option<OrderId>,
    pub action: LogAction,
    pub level: LogLevel,
    pub message: String,
    pub amount: Option<Money>,
    pub metadata: Value,
    pub related_user_id: Option<i64>,
}

impl NewTransactionLog {
    pub fn new<S: Into<String>>(action: LogAction, level: LogLevel, message: S) -> Self {
        Self {
            order_id: None,
            action,
            level,
            message: message.into(),
            amount: None,
            metadata: Value::Object(Default::default()),
            related_user_id: None,
        }
    }

    pub fn for_order(mut self, order_id: &OrderId) -> Self {
        self.order_id = Some(order_id.clone());
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.related_user_id = Some(user_id);
        self
    }
}

//--------------------------------------     Notification      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StoredNotification {
    pub id: i64,
    pub recipient_id: i64,
    pub title: String,
    pub message: String,
    pub metadata: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
