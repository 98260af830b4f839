use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{
        InstallmentPayment,
        InstallmentPlan,
        Money,
        Order,
        OrderId,
        OrderItem,
        OrderPaymentStatus,
        OrderStatusHistory,
        OrderStatusType,
        Payment,
        Wallet,
        WalletTransaction,
    },
    helpers::GeoPoint,
    traits::QueryError,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub order_id: Option<OrderId>,
    pub customer_id: Option<i64>,
    /// Orders containing at least one item sold by this vendor
    pub vendor_id: Option<i64>,
    pub status: Option<Vec<OrderStatusType>>,
    pub payment_status: Option<OrderPaymentStatus>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn since<T>(mut self, since: T) -> Result<Self, QueryError>
    where
        T: TryInto<DateTime<Utc>>,
        T::Error: Display,
    {
        let dt = since.try_into().map_err(|e| QueryError::QueryError(e.to_string()))?;
        self.since = Some(dt);
        Ok(self)
    }

    pub fn until<T>(mut self, until: T) -> Result<Self, QueryError>
    where
        T: TryInto<DateTime<Utc>>,
        T::Error: Display,
    {
        let dt = until.try_into().map_err(|e| QueryError::QueryError(e.to_string()))?;
        self.until = Some(dt);
        Ok(self)
    }

    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_customer_id(mut self, customer_id: i64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_vendor_id(mut self, vendor_id: i64) -> Self {
        self.vendor_id = Some(vendor_id);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        match &mut self.status {
            Some(statuses) => statuses.push(status),
            None => self.status = Some(vec![status]),
        }
        self
    }

    pub fn with_payment_status(mut self, status: OrderPaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none() &&
            self.customer_id.is_none() &&
            self.vendor_id.is_none() &&
            self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true) &&
            self.payment_status.is_none() &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

/// Optional delivery coordinates supplied at checkout. When absent, the customer's location on file is used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl CheckoutRequest {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self { latitude: Some(latitude), longitude: Some(longitude) }
    }

    /// Both coordinates must be supplied for a location to count.
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub order_id: OrderId,
    pub authorization_url: String,
    pub reference: String,
    pub amount: Money,
    pub delivery_fee: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentCheckoutResult {
    pub order_id: OrderId,
    pub installment_plan_id: i64,
    pub number_of_installments: i64,
    /// The amount of the first installment, which is the one being paid now
    pub installment_amount: Money,
    pub first_installment_reference: String,
    pub authorization_url: String,
    pub delivery_fee: Money,
    pub installments: Vec<InstallmentPayment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment: Option<Payment>,
    pub installment_plan: Option<InstallmentPlan>,
    pub installments: Vec<InstallmentPayment>,
    pub history: Vec<OrderStatusHistory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSummary {
    pub wallet: Wallet,
    /// Newest first
    pub transactions: Vec<WalletTransaction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorBalances {
    /// The wallet balance, which can be withdrawn
    pub available: Money,
    /// Vendor shares of items in orders that have shipped but not been delivered yet
    pub pending: Money,
}
