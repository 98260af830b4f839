use cucumber::{then, when};
use market_engine::{
    db_types::{
        InstallmentDuration,
        LogAction,
        Money,
        NewIdentity,
        NewRefund,
        OrderStatusType,
        PaymentStatus,
        Principal,
        RefundDecision,
        RefundStatus,
        Role,
    },
    market_api::{
        order_objects::CheckoutRequest,
        verification_api::{WebhookOutcome, CHARGE_SUCCESS_EVENT},
    },
    CatalogManagement,
    LedgerManagement,
    OrderQueries,
};

use crate::cucumber::MarketWorld;

#[when(expr = "customer {int} puts {int} of product {int} in their cart")]
async fn add_to_cart(world: &mut MarketWorld, customer_id: i64, quantity: i64, product_id: i64) {
    world.system().db.set_cart_quantity(customer_id, product_id, quantity).await.expect("Error filling cart");
}

#[when(expr = "customer {int} checks out")]
async fn checkout(world: &mut MarketWorld, customer_id: i64) {
    match world.system().checkout.checkout(customer_id, CheckoutRequest::default()).await {
        Ok(result) => world.checkout = Some(result),
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[when(expr = "customer {int} checks out over {int} months")]
async fn checkout_installments(world: &mut MarketWorld, customer_id: i64, months: i64) {
    let duration = match months {
        1 => InstallmentDuration::OneMonth,
        3 => InstallmentDuration::ThreeMonths,
        6 => InstallmentDuration::SixMonths,
        12 => InstallmentDuration::OneYear,
        _ => panic!("Unsupported installment duration: {months} months"),
    };
    let result = world
        .system()
        .checkout
        .checkout_installments(customer_id, CheckoutRequest::default(), duration)
        .await
        .expect("Installment checkout failed");
    world.installments = Some(result);
}

#[when(expr = "the gateway reports that {int} NGN was paid")]
async fn gateway_amount(world: &mut MarketWorld, amount: i64) {
    let reference = world.reference();
    world.system().gateway.report_amount(&reference, Money::from_major(amount));
}

#[when("the customer verifies the payment")]
async fn verify_payment(world: &mut MarketWorld) {
    let reference = world.reference();
    let order_id = world.order_id();
    let order = world.system().db.fetch_order(&order_id).await.expect("Error fetching order").expect("No such order");
    let caller = Principal::Customer(order.customer_id);
    if let Err(e) = world.system().verification.verify(&reference, Some(&caller)).await {
        world.last_error = Some(e.to_string());
    }
}

#[when(expr = "the payment webhook is delivered {int} times at once")]
async fn concurrent_webhooks(world: &mut MarketWorld, count: usize) {
    let reference = world.reference();
    let verification = &world.system().verification;
    let calls = (0..count).map(|_| verification.handle_webhook(CHARGE_SUCCESS_EVENT, Some(reference.as_str())));
    let outcomes = futures_util::future::join_all(calls).await;
    world.webhook_outcomes = outcomes;
}

#[when(expr = "admin {int} ships the order")]
async fn ship(world: &mut MarketWorld, admin_id: i64) {
    let order_id = world.checkout().order_id.clone();
    world
        .system()
        .flow
        .transition(&order_id, OrderStatusType::Shipped, Some(admin_id), None)
        .await
        .expect("Could not ship the order");
}

#[when(expr = "agent {int} delivers the order")]
async fn deliver(world: &mut MarketWorld, agent_id: i64) {
    let order_id = world.checkout().order_id.clone();
    world
        .system()
        .flow
        .transition(&order_id, OrderStatusType::Delivered, Some(agent_id), None)
        .await
        .expect("Could not deliver the order");
}

#[when(expr = "vendor {int} is deactivated")]
async fn deactivate_vendor(world: &mut MarketWorld, vendor_id: i64) {
    let identity = NewIdentity::new(vendor_id, format!("vendor{vendor_id}@example.com"), Role::Vendor).inactive();
    world.system().db.upsert_identity(identity).await.expect("Error deactivating vendor");
}

#[when("settlement runs again")]
async fn settle_again(world: &mut MarketWorld) {
    let order_id = world.checkout().order_id.clone();
    let outcome = world.system().flow.settle(&order_id).await.expect("Settlement failed");
    assert!(outcome.already_settled, "The order was settled twice");
}

#[when(expr = "customer {int} asks for a refund because {string}")]
async fn request_refund(world: &mut MarketWorld, customer_id: i64, reason: String) {
    let order_id = world.checkout().order_id.clone();
    let refund = NewRefund { order_id, customer_id, reason, amount: None };
    let refund = world.system().refunds.request_refund(refund).await.expect("Refund request failed");
    world.refund = Some(refund);
}

#[when(expr = "admin {int} approves the refund")]
async fn approve_refund(world: &mut MarketWorld, admin_id: i64) {
    let refund_id = world.refund.as_ref().expect("No refund requested").id;
    let refunds = &world.system().refunds;
    let outcome = refunds.process_refund(refund_id, RefundDecision::Approve, admin_id).await.expect("Approval failed");
    world.refund = Some(outcome.refund);
}

#[then(expr = "the order total is {word} NGN with a delivery fee of {word} NGN")]
async fn order_total(world: &mut MarketWorld, total: String, fee: String) {
    let order_id = world.checkout().order_id.clone();
    let order = world.system().db.fetch_order(&order_id).await.expect("Error fetching order").expect("No such order");
    assert_eq!(order.total_price.to_string(), total, "Total price is incorrect");
    assert_eq!(order.delivery_fee.to_string(), fee, "Delivery fee is incorrect");
}

#[then(expr = "the order has status {word}")]
async fn order_status(world: &mut MarketWorld, status: String) {
    let order_id = world.order_id();
    let order = world.system().db.fetch_order(&order_id).await.expect("Error fetching order").expect("No such order");
    let expected = status.parse::<OrderStatusType>().expect("Not a valid order status");
    assert_eq!(order.status, expected, "Order status is incorrect");
}

#[then(expr = "the installments are {string}")]
async fn installment_amounts(world: &mut MarketWorld, amounts: String) {
    let result = world.installments.as_ref().expect("No installment checkout");
    let actual = result.installments.iter().map(|i| i.amount.to_string()).collect::<Vec<_>>().join(", ");
    assert_eq!(actual, amounts, "Installment amounts are incorrect");
}

#[then("the installments add up to the order total")]
async fn installments_sum(world: &mut MarketWorld) {
    let result = world.installments.as_ref().expect("No installment checkout");
    let order =
        world.system().db.fetch_order(&result.order_id).await.expect("Error fetching order").expect("No such order");
    let sum = result.installments.iter().map(|i| i.amount).sum();
    assert_eq!(order.total_price, sum);
}

#[then(expr = "{int} webhook verified the payment")]
async fn webhooks_verified(world: &mut MarketWorld, count: usize) {
    let verified = world
        .webhook_outcomes
        .iter()
        .filter(|o| matches!(o, WebhookOutcome::Verified(c) if c.newly_verified))
        .count();
    assert_eq!(verified, count, "Outcomes: {:?}", world.webhook_outcomes);
}

#[then(expr = "the payment is {word}")]
async fn payment_status(world: &mut MarketWorld, status: String) {
    let order_id = world.checkout().order_id.clone();
    let payment = world
        .system()
        .db
        .fetch_payment_for_order(&order_id)
        .await
        .expect("Error fetching payment")
        .expect("No payment for the order");
    let expected = status.parse::<PaymentStatus>().expect("Not a valid payment status");
    assert_eq!(payment.status, expected, "Payment status is incorrect");
}

#[then(expr = "the verification error is {string}")]
async fn verification_error(world: &mut MarketWorld, message: String) {
    let error = world.last_error.as_deref().expect("No error was raised");
    assert!(error.contains(&message), "Unexpected error: {error}");
}

#[then(expr = "the wallet of user {int} holds {word} NGN")]
async fn wallet_balance(world: &mut MarketWorld, user_id: i64, balance: String) {
    let db = &world.system().db;
    let wallet = db.fetch_or_create_wallet(user_id).await.expect("Error fetching wallet");
    assert_eq!(wallet.balance.to_string(), balance, "Wallet balance of user #{user_id} is incorrect");
    let txs = db.fetch_wallet_transactions(user_id).await.expect("Error fetching transactions");
    let sum = txs.iter().map(|t| t.signed_amount()).sum();
    assert_eq!(wallet.balance, sum, "Ledger for user #{user_id} does not balance");
}

#[then("the vendors have been credited")]
async fn vendors_credited(world: &mut MarketWorld) {
    let order_id = world.checkout().order_id.clone();
    let order = world.system().db.fetch_order(&order_id).await.expect("Error fetching order").expect("No such order");
    assert!(order.vendors_credited, "vendors_credited is not set");
}

#[then(expr = "a failed credit is logged for vendor {int}")]
async fn failed_credit_logged(world: &mut MarketWorld, vendor_id: i64) {
    let order_id = world.checkout().order_id.clone();
    let logs = world.system().db.fetch_transaction_logs(&order_id).await.expect("Error fetching logs");
    let found =
        logs.iter().any(|l| l.action == LogAction::VendorCreditFailed && l.related_user_id == Some(vendor_id));
    assert!(found, "No failed credit was logged for vendor #{vendor_id}");
}

#[then("the refund is approved with commissions reversed")]
async fn refund_approved(world: &mut MarketWorld) {
    let refund = world.refund.as_ref().expect("No refund requested");
    assert_eq!(refund.status, RefundStatus::Approved);
    assert!(refund.commission_reversed, "Commissions were not reversed");
}
