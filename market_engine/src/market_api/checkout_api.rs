//! Checkout: cart → order → payment intent.
//!
//! Checkout happens in three steps, so that the payment gateway is never called while a database transaction is open:
//! 1. The order, its items and the payment (or installment plan) are staged and committed. The cart is untouched.
//! 2. The gateway is asked to initialize the (first) payment.
//! 3. On success, the cart is cleared and the authorization URL recorded. On failure, the staged rows are deleted
//!    again, so no orphan order or payment is left behind.
use std::fmt::Debug;

use chrono::Utc;
use log::*;
use serde_json::json;

use crate::{
    db_types::{
        Identity,
        InstallmentDuration,
        LogAction,
        LogLevel,
        Money,
        NewOrder,
        NewOrderItem,
        NewTransactionLog,
        OrderId,
        OrderStatusType,
        Principal,
    },
    helpers::{estimate_delivery_fee, installment_schedule, new_payment_reference},
    market_api::{
        config::CheckoutConfig,
        errors::CheckoutError,
        order_objects::{CheckoutRequest, CheckoutResult, InstallmentCheckoutResult},
    },
    traits::{
        GatewayAuthorization,
        GatewayInitRequest,
        MarketplaceDatabase,
        NewCheckout,
        NewCheckoutPayment,
        PaymentGateway,
        StagedPayment,
    },
};

pub struct CheckoutApi<B, G> {
    db: B,
    gateway: G,
    config: CheckoutConfig,
}

impl<B, G> Debug for CheckoutApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi ({})", self.config.currency)
    }
}

impl<B, G> CheckoutApi<B, G> {
    pub fn new(db: B, gateway: G, config: CheckoutConfig) -> Self {
        Self { db, gateway, config }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }
}

/// An order that has been priced but not written yet, along with who it is for.
struct PreparedOrder {
    customer: Identity,
    order: NewOrder,
    logs: Vec<NewTransactionLog>,
}

impl<B, G> CheckoutApi<B, G>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    /// Single-shot checkout of the customer's whole cart.
    pub async fn checkout(&self, customer_id: i64, request: CheckoutRequest) -> Result<CheckoutResult, CheckoutError> {
        let PreparedOrder { customer, order, logs } = self.prepare_order(customer_id, request).await?;
        let reference = new_payment_reference();
        let payment = NewCheckoutPayment::Single { reference: reference.clone() };
        let checkout = NewCheckout { order, payment, logs };
        let staged = self.db.stage_checkout(checkout).await?;
        let order = staged.order;
        debug!("🛒️ Order {} staged for customer #{customer_id}. Total {}", order.order_id, order.total_price);
        let auth = self.initialize_or_discard(&order.order_id, &customer.email, &reference, order.total_price).await?;
        self.db.finalize_checkout(&order.order_id, &reference, &auth.authorization_url).await?;
        info!("🛒️ Checkout complete for order {}. Awaiting payment {reference}", order.order_id);
        Ok(CheckoutResult {
            order_id: order.order_id,
            authorization_url: auth.authorization_url,
            reference,
            amount: order.total_price,
            delivery_fee: order.delivery_fee,
        })
    }

    /// Installment checkout. The total is split into the number of installments the duration calls for, and only the
    /// first installment is initialized with the gateway.
    pub async fn checkout_installments(
        &self,
        customer_id: i64,
        request: CheckoutRequest,
        duration: InstallmentDuration,
    ) -> Result<InstallmentCheckoutResult, CheckoutError> {
        let PreparedOrder { customer, order, logs } = self.prepare_order(customer_id, request).await?;
        let schedule = installment_schedule(&order.order_id, order.total_price()?, duration, Utc::now())
            .map_err(|e| CheckoutError::InvalidSchedule(e.to_string()))?;
        let checkout = NewCheckout { order, payment: NewCheckoutPayment::Installments { duration, schedule }, logs };
        let staged = self.db.stage_checkout(checkout).await?;
        let StagedPayment::Installments { plan, installments } = staged.payment else {
            return Err(CheckoutError::InvalidSchedule("The backend did not stage an installment plan".into()));
        };
        let order = staged.order;
        let Some(first) = installments.first().cloned() else {
            self.discard(&order.order_id).await;
            return Err(CheckoutError::InvalidSchedule("The installment plan is empty".into()));
        };
        debug!(
            "🛒️ Order {} staged for customer #{customer_id} over {} installments",
            order.order_id, plan.number_of_installments
        );
        let auth = self.initialize_or_discard(&order.order_id, &customer.email, &first.reference, first.amount).await?;
        self.db.finalize_checkout(&order.order_id, &first.reference, &auth.authorization_url).await?;
        info!("🛒️ Installment checkout complete for order {}. Awaiting payment {}", order.order_id, first.reference);
        Ok(InstallmentCheckoutResult {
            order_id: order.order_id,
            installment_plan_id: plan.id,
            number_of_installments: plan.number_of_installments,
            installment_amount: first.amount,
            first_installment_reference: first.reference,
            authorization_url: auth.authorization_url,
            delivery_fee: order.delivery_fee,
            installments,
        })
    }

    /// Initializes the gateway transaction again for an order that is still awaiting payment. For a single-shot
    /// payment the total is recomputed first, and for installment plans the next unpaid installment is initialized.
    pub async fn reinitialize_payment(
        &self,
        caller: &Principal,
        order_id: &OrderId,
    ) -> Result<CheckoutResult, CheckoutError> {
        let order = self.db.fetch_order(order_id).await?.ok_or_else(|| CheckoutError::OrderNotFound(order_id.clone()))?;
        if !caller.can_access(order.customer_id) {
            return Err(CheckoutError::Forbidden("You can only pay for your own orders".into()));
        }
        if order.status != OrderStatusType::Pending {
            return Err(CheckoutError::OrderNotPayable(order_id.clone()));
        }
        let (order, reference, amount) = match self.db.fetch_payment_for_order(order_id).await? {
            Some(payment) if payment.verified => return Err(CheckoutError::OrderNotPayable(order_id.clone())),
            Some(_) => {
                let (order, payment) = self.db.recompute_order_total(order_id).await?;
                let payment = payment.ok_or_else(|| CheckoutError::OrderNotPayable(order_id.clone()))?;
                (order, payment.reference, payment.amount)
            },
            None => {
                let (_, installments) = self
                    .db
                    .fetch_plan_for_order(order_id)
                    .await?
                    .ok_or_else(|| CheckoutError::OrderNotPayable(order_id.clone()))?;
                let next = installments
                    .into_iter()
                    .find(|i| !i.is_paid())
                    .ok_or_else(|| CheckoutError::OrderNotPayable(order_id.clone()))?;
                (order, next.reference, next.amount)
            },
        };
        let customer = self.active_customer(order.customer_id).await?;
        let request = self.init_request(&customer.email, &reference, amount);
        let auth = match self.gateway.initialize(request).await {
            Ok(auth) => auth,
            Err(e) => {
                warn!("🛒️ Could not re-initialize payment {reference} for order {order_id}. {e}");
                let entry = NewTransactionLog::new(
                    LogAction::PaymentInitialized,
                    LogLevel::Error,
                    format!("Payment re-initialization failed. {e}"),
                )
                .for_order(order_id)
                .with_amount(amount)
                .with_metadata(json!({ "reference": reference }));
                if let Err(log_err) = self.db.append_log(entry).await {
                    error!("🛒️ Could not record the failed payment initialization. {log_err}");
                }
                return Err(e.into());
            },
        };
        self.db.set_authorization_url(&reference, &auth.authorization_url).await?;
        info!("🛒️ Payment {reference} for order {order_id} re-initialized");
        Ok(CheckoutResult {
            order_id: order.order_id,
            authorization_url: auth.authorization_url,
            reference,
            amount,
            delivery_fee: order.delivery_fee,
        })
    }

    async fn active_customer(&self, customer_id: i64) -> Result<Identity, CheckoutError> {
        self.db
            .fetch_identity(customer_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or(CheckoutError::CustomerNotFound(customer_id))
    }

    /// Validates the cart and delivery location, snapshots current catalog prices into order items and estimates the
    /// delivery fee. Nothing is written.
    async fn prepare_order(&self, customer_id: i64, request: CheckoutRequest) -> Result<PreparedOrder, CheckoutError> {
        let customer = self.active_customer(customer_id).await?;
        let cart = self.db.fetch_cart(customer_id).await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let location = request.location().or_else(|| customer.location());
        match location {
            Some(p) if !p.is_valid() => return Err(CheckoutError::InvalidLocation),
            None if self.config.enforce_delivery_address => return Err(CheckoutError::MissingDeliveryAddress),
            _ => {},
        }
        let mut items = Vec::with_capacity(cart.len());
        for line in &cart {
            let product = self
                .db
                .fetch_product(line.product_id)
                .await?
                .filter(|p| p.is_active)
                .ok_or(CheckoutError::ProductUnavailable(line.product_id))?;
            items.push(NewOrderItem::from_product(&product, line.quantity));
        }
        let mut order = NewOrder::new(customer_id, self.config.currency.as_str(), items);
        order.location = location;
        let mut logs = Vec::new();
        let subtotal = order.subtotal()?;
        match estimate_delivery_fee(&self.config.delivery, subtotal, location) {
            Ok(fee) => order.delivery_fee = fee,
            Err(e) => {
                warn!("🛒️ Could not estimate the delivery fee for customer #{customer_id}. Charging no fee. {e}");
                let entry = NewTransactionLog::new(
                    LogAction::DeliveryFeeFailed,
                    LogLevel::Warning,
                    format!("Delivery fee estimate failed. No fee was charged. {e}"),
                )
                .with_user(customer_id)
                .with_metadata(json!({ "subtotal": subtotal, "location": location }));
                logs.push(entry);
            },
        }
        let total = order.total_price()?;
        trace!("🛒️ Order for customer #{customer_id} priced at {total}");
        Ok(PreparedOrder { customer, order, logs })
    }

    fn init_request(&self, email: &str, reference: &str, amount: Money) -> GatewayInitRequest {
        GatewayInitRequest {
            email: email.to_string(),
            amount,
            currency: self.config.currency.clone(),
            reference: reference.to_string(),
            callback_url: self.config.callback_url.clone(),
        }
    }

    async fn initialize_or_discard(
        &self,
        order_id: &OrderId,
        email: &str,
        reference: &str,
        amount: Money,
    ) -> Result<GatewayAuthorization, CheckoutError> {
        let request = self.init_request(email, reference, amount);
        match self.gateway.initialize(request).await {
            Ok(auth) => Ok(auth),
            Err(e) => {
                warn!("🛒️ The gateway could not initialize payment {reference}. Discarding order {order_id}. {e}");
                self.discard(order_id).await;
                Err(e.into())
            },
        }
    }

    async fn discard(&self, order_id: &OrderId) {
        if let Err(e) = self.db.discard_checkout(order_id).await {
            error!("🛒️ Could not discard staged order {order_id}. It must be removed by hand. {e}");
        }
    }
}
