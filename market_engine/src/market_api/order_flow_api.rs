use std::fmt::Debug;

use chrono::Duration;
use log::*;

use crate::{
    db_types::{Order, OrderId, OrderStatusType},
    events::{EventProducers, OrderPaidEvent, OrderStatusChangedEvent, OverdueDeliveryEvent, VendorCreditedEvent},
    market_api::config::SettlementConfig,
    traits::{
        MarketplaceDatabase,
        MarketplaceError,
        OverdueDelivery,
        SettlementOutcome,
        TransitionResult,
    },
};

/// Moves orders through their lifecycle. Delivery triggers vendor settlement, using the commission rate this API
/// was constructed with.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    config: SettlementConfig,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi (commission {})", self.config.commission_rate)
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers, config: SettlementConfig) -> Self {
        Self { db, producers, config }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: MarketplaceDatabase
{
    /// Moves the order to `new_status` on behalf of `actor_id`.
    ///
    /// When the order is delivered, every vendor in it is credited in the same transaction. Credit failures do not
    /// fail the transition; they are reported in the returned settlement outcome.
    pub async fn transition(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
        actor_id: Option<i64>,
        reason: Option<String>,
    ) -> Result<TransitionResult, MarketplaceError> {
        let result =
            self.db.transition_order(order_id, new_status, actor_id, reason, self.config.commission_rate).await?;
        debug!("🔄️ Order {order_id}: {} → {new_status}", result.old_status);
        if let Some(settlement) = &result.settlement {
            self.report_settlement(settlement).await;
        }
        let event = OrderStatusChangedEvent::new(result.order.clone(), result.old_status);
        self.producers.publish_status_changed(event).await;
        if new_status == OrderStatusType::Paid {
            self.producers.publish_order_paid(OrderPaidEvent::new(result.order.clone())).await;
        }
        Ok(result)
    }

    /// Runs settlement for a delivered order. This is a no-op, reporting `already_settled`, if the order has been
    /// settled before.
    pub async fn settle(&self, order_id: &OrderId) -> Result<SettlementOutcome, MarketplaceError> {
        let outcome = self.db.settle_order(order_id, self.config.commission_rate).await?;
        if outcome.already_settled {
            info!("💸️ Order {order_id} has already been settled. Nothing to do");
        } else if outcome.refunded {
            info!("💸️ Order {order_id} was refunded before delivery. Nothing to do");
        } else {
            self.report_settlement(&outcome).await;
        }
        Ok(outcome)
    }

    pub async fn assign_delivery_agent(&self, order_id: &OrderId, agent_id: i64) -> Result<Order, MarketplaceError> {
        let order = self.db.assign_delivery_agent(order_id, agent_id).await?;
        info!("🔄️ Delivery agent #{agent_id} assigned to order {order_id}");
        Ok(order)
    }

    /// Flags shipped orders that have been on the road for longer than `max_age`, and lets every active admin know.
    pub async fn flag_overdue_deliveries(&self, max_age: Duration) -> Result<Vec<OverdueDelivery>, MarketplaceError> {
        let overdue = self.db.flag_overdue_deliveries(max_age).await?;
        if overdue.is_empty() {
            debug!("🔄️ No overdue deliveries");
            return Ok(overdue);
        }
        warn!("🔄️ {} deliveries are overdue", overdue.len());
        let admin_ids = self.db.fetch_active_admins().await?.into_iter().map(|a| a.id).collect::<Vec<_>>();
        for delivery in &overdue {
            let event = OverdueDeliveryEvent::new(delivery.order.clone(), delivery.days_overdue, admin_ids.clone());
            self.producers.publish_overdue_delivery(event).await;
        }
        Ok(overdue)
    }

    async fn report_settlement(&self, settlement: &SettlementOutcome) {
        let order_id = &settlement.order.order_id;
        let failures = settlement.credits.failure_count();
        if failures > 0 {
            warn!(
                "💸️ Order {order_id} settled with {failures} failed vendor credit(s). {} credited in total",
                settlement.total_credited()
            );
            for failure in settlement.credits.failed() {
                warn!(
                    "💸️ Vendor #{} was not credited for item #{}. {}",
                    failure.vendor_id, failure.order_item_id, failure.reason
                );
            }
        } else {
            info!(
                "💸️ Order {order_id} settled. {} credited to vendors, {} commission",
                settlement.total_credited(),
                settlement.total_commission()
            );
        }
        for credit in settlement.credits.succeeded() {
            self.producers.publish_vendor_credited(VendorCreditedEvent::new(order_id.clone(), credit.clone())).await;
        }
    }
}
