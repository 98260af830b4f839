//! Payment verification.
//!
//! The user poll and the gateway webhook both end up in [`VerificationApi::verify`]. The gateway is asked about the
//! reference *before* any lock is taken, and its answer is checked against the local record. Only then is the
//! payment claimed, in a single write-first transaction, so that two callers racing on the same reference see exactly
//! one state change between them.
use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    db_types::{LogAction, LogLevel, NewTransactionLog, Order, Principal},
    events::{EventProducers, OrderPaidEvent},
    helpers::is_valid_reference,
    market_api::errors::VerificationError,
    traits::{
        GatewayPaymentStatus,
        GatewayVerification,
        MarketplaceDatabase,
        PaymentConfirmation,
        PaymentGateway,
        PaymentRecord,
    },
};

/// The only webhook event that leads to a verification.
pub const CHARGE_SUCCESS_EVENT: &str = "charge.success";

/// What became of a webhook delivery. Every outcome except [`WebhookOutcome::Deferred`] is final and is
/// acknowledged to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// Not a `charge.success` event, or no reference was supplied.
    Ignored,
    UnknownReference,
    /// The gateway's answer did not match the local record.
    Rejected(String),
    Verified(PaymentConfirmation),
    /// Verification could not complete right now (gateway or database unavailable). Nothing was changed. The gateway
    /// must be asked to deliver the event again.
    Deferred(String),
}

impl WebhookOutcome {
    /// True if the outcome is not final and the gateway should redeliver the event.
    pub fn needs_redelivery(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

pub struct VerificationApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
}

impl<B, G> Debug for VerificationApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerificationApi")
    }
}

impl<B, G> VerificationApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, producers }
    }
}

impl<B, G> VerificationApi<B, G>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    /// Verifies the payment with `reference` against the gateway and marks it paid.
    ///
    /// `caller` is the principal polling for the result. It must own the order or be an admin. The webhook passes
    /// `None`, since the gateway has already been authenticated by its signature.
    ///
    /// Verifying a payment that has already been confirmed returns the stored record with
    /// `newly_verified == false`, without contacting the gateway.
    pub async fn verify(
        &self,
        reference: &str,
        caller: Option<&Principal>,
    ) -> Result<PaymentConfirmation, VerificationError> {
        if !is_valid_reference(reference) {
            return Err(VerificationError::InvalidReference(reference.to_string()));
        }
        let record = self
            .db
            .fetch_payment_by_reference(reference)
            .await?
            .ok_or_else(|| VerificationError::NotFound(reference.to_string()))?;
        let order_id = record.order_id().clone();
        let order = self
            .db
            .fetch_order(&order_id)
            .await?
            .ok_or_else(|| VerificationError::NotFound(reference.to_string()))?;
        if let Some(principal) = caller {
            if !principal.can_access(order.customer_id) {
                warn!(
                    "✅️ {principal} tried to verify payment {reference}, which belongs to customer #{}",
                    order.customer_id
                );
                return Err(VerificationError::Forbidden);
            }
        }
        if record.is_settled() {
            debug!("✅️ Payment {reference} has already been verified");
            return Ok(PaymentConfirmation { record, order, newly_verified: false, order_paid: false });
        }
        let verification = self.gateway.verify(reference).await.map_err(|e| {
            warn!("✅️ Could not verify payment {reference} with the gateway. State is unchanged. {e}");
            VerificationError::from(e)
        })?;
        if let Err((level, reason)) = check_verification(&verification, &record, &order) {
            self.log_rejection(&record, &order, &verification, level, &reason).await;
            return Err(VerificationError::Rejected(reason));
        }
        let confirmation = self.db.confirm_payment(reference).await?;
        if confirmation.newly_verified {
            info!("✅️ Payment {reference} for order {order_id} verified");
        } else {
            debug!("✅️ Payment {reference} was verified concurrently. Nothing to do");
        }
        if confirmation.order_paid {
            info!("✅️ Order {order_id} is fully paid");
            self.producers.publish_order_paid(OrderPaidEvent::new(confirmation.order.clone())).await;
        }
        Ok(confirmation)
    }

    /// Handles a webhook whose signature has already been checked. Never fails. Business-level outcomes (verified,
    /// rejected, unknown) are final. An infrastructure failure is [`WebhookOutcome::Deferred`], which the caller
    /// must report back to the gateway as a failed delivery so that the event is retried.
    pub async fn handle_webhook(&self, event: &str, reference: Option<&str>) -> WebhookOutcome {
        if event != CHARGE_SUCCESS_EVENT {
            debug!("✅️ Ignoring webhook event '{event}'");
            return WebhookOutcome::Ignored;
        }
        let Some(reference) = reference.filter(|r| !r.is_empty()) else {
            warn!("✅️ Received a {CHARGE_SUCCESS_EVENT} webhook without a reference");
            return WebhookOutcome::Ignored;
        };
        match self.verify(reference, None).await {
            Ok(confirmation) => WebhookOutcome::Verified(confirmation),
            Err(VerificationError::NotFound(_)) | Err(VerificationError::InvalidReference(_)) => {
                info!("✅️ Webhook for unknown reference {reference}. Acknowledging anyway");
                WebhookOutcome::UnknownReference
            },
            Err(VerificationError::Rejected(reason)) => WebhookOutcome::Rejected(reason),
            Err(e) => {
                warn!("✅️ Webhook verification of {reference} deferred. {e}");
                WebhookOutcome::Deferred(e.to_string())
            },
        }
    }

    async fn log_rejection(
        &self,
        record: &PaymentRecord,
        order: &Order,
        verification: &GatewayVerification,
        level: LogLevel,
        reason: &str,
    ) {
        let reference = record.reference();
        match level {
            LogLevel::Error => error!("✅️ Payment {reference} rejected. {reason}"),
            _ => warn!("✅️ Payment {reference} rejected. {reason}"),
        }
        let message = format!("Payment {reference} rejected. {reason}");
        let entry = NewTransactionLog::new(LogAction::PaymentRejected, level, message)
            .for_order(&order.order_id)
            .with_amount(record.amount())
            .with_user(order.customer_id)
            .with_metadata(json!({
                "reference": reference,
                "expected_amount": record.amount(),
                "expected_currency": order.currency,
                "gateway_status": verification.status,
                "gateway_amount": verification.amount,
                "gateway_currency": verification.currency,
                "gateway_response": verification.gateway_response,
            }));
        if let Err(e) = self.db.append_log(entry).await {
            error!("✅️ Could not record the rejection of payment {reference}. {e}");
        }
    }
}

/// Checks the gateway's answer against what we expect to be paid. On failure, returns the severity of the mismatch
/// and a description. An unsuccessful charge is a warning; a successful charge for the wrong currency or amount is an
/// error, since someone paid something other than what was asked.
fn check_verification(
    verification: &GatewayVerification,
    record: &PaymentRecord,
    order: &Order,
) -> Result<(), (LogLevel, String)> {
    if verification.status != GatewayPaymentStatus::Success {
        return Err((LogLevel::Warning, format!("The gateway reports the payment as {:?}", verification.status)));
    }
    if !verification.currency.eq_ignore_ascii_case(&order.currency) {
        return Err((
            LogLevel::Error,
            format!(
                "Currency mismatch. Expected {}, but the gateway reports {}",
                order.currency, verification.currency
            ),
        ));
    }
    if verification.amount != record.amount() {
        return Err((
            LogLevel::Error,
            format!("Amount mismatch. Expected {}, but the gateway reports {}", record.amount(), verification.amount),
        ));
    }
    Ok(())
}
