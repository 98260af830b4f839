use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewRefund, Refund, RefundDecision},
    events::{EventProducers, RefundProcessedEvent},
    market_api::errors::RefundError,
    traits::{MarketplaceDatabase, RefundOutcome},
};

pub struct RefundApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for RefundApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RefundApi")
    }
}

impl<B> RefundApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> RefundApi<B>
where B: MarketplaceDatabase
{
    /// Files a refund request against the customer's paid order. The refund stays PENDING until an admin processes
    /// it.
    pub async fn request_refund(&self, mut refund: NewRefund) -> Result<Refund, RefundError> {
        refund.reason = refund.reason.trim().to_string();
        if refund.reason.is_empty() {
            return Err(RefundError::MissingReason);
        }
        let refund = self.db.create_refund(refund).await?;
        debug!("↩️ Refund #{} is awaiting review", refund.id);
        Ok(refund)
    }

    /// Approves or rejects a pending refund.
    ///
    /// An approval credits the customer. If the vendors had already been paid for the order, their commissions are
    /// clawed back. Failed reversals are reported in the outcome and do not fail the approval.
    pub async fn process_refund(
        &self,
        refund_id: i64,
        decision: RefundDecision,
        admin_id: i64,
    ) -> Result<RefundOutcome, RefundError> {
        let outcome = self.db.process_refund(refund_id, decision, admin_id).await?;
        let failures = outcome.reversals.failure_count();
        if failures > 0 {
            warn!(
                "↩️ Refund #{refund_id}: {failures} commission reversal(s) failed and need manual reconciliation"
            );
        }
        info!("↩️ Refund #{refund_id} {} by admin #{admin_id}", outcome.refund.status);
        let event = RefundProcessedEvent::new(outcome.refund.clone(), outcome.order.clone());
        self.producers.publish_refund_processed(event).await;
        Ok(outcome)
    }

    /// All refunds, newest first.
    pub async fn list_refunds(&self) -> Result<Vec<Refund>, RefundError> {
        let refunds = self.db.fetch_refunds().await?;
        Ok(refunds)
    }

    pub async fn fetch_refund(&self, refund_id: i64) -> Result<Option<Refund>, RefundError> {
        let refund = self.db.fetch_refund(refund_id).await?;
        Ok(refund)
    }
}
