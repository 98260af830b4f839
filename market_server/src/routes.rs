//! Request handler definitions
//!
//! Define each route and its handler here. Handlers stay thin: they pull the caller and the request data apart,
//! call into the engine API and wrap the result in a [`JsonResponse`]. Anything longer belongs in the engine.
//!
//! Every handler is async. Worker threads process their requests sequentially, so a handler that blocks the thread
//! (e.g. `std::thread::sleep` or blocking I/O) stalls every other request on that worker.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use market_engine::{
    db_types::{NewRefund, OrderId, Role},
    market_api::{
        order_objects::{CheckoutRequest, OrderQueryFilter},
        verification_api::WebhookOutcome,
    },
    CheckoutApi,
    LedgerManagement,
    MarketplaceDatabase,
    OrderFlowApi,
    OrderQueries,
    OrdersApi,
    PaymentGateway,
    RefundApi,
    VerificationApi,
    WalletApi,
};
use paystack_tools::WebhookEvent;
use serde_json::json;

use crate::{
    auth::Caller,
    data_objects::{
        parse_amount,
        AssignAgentParams,
        InstallmentCheckoutParams,
        JsonResponse,
        ProcessRefundParams,
        RefundReport,
        RefundRequestParams,
        SettlementReport,
        StatusUpdateParams,
        StatusUpdateResult,
        VerifyPaymentParams,
        WithdrawalParams,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro.
// Each bound becomes a type parameter of the route (`MarketplaceDatabase` -> `TMarketplaceDatabase`), in the order
// given, and is passed on to the handler in that order.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+) => {
        $crate::route!(@define $name => $method $path impl $($bounds),+ acl []);
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+ where requires [$($roles:expr),+]) => {
        $crate::route!(@define $name => $method $path impl $($bounds),+ acl [$($roles),+]);
    };

    (@define $name:ident => $method:ident $path:literal impl $($bounds:ident),+ acl [$($roles:expr),*]) => {
        paste::paste! {
            pub struct [<$name:camel Route>]< $( [<T $bounds>], )+ >(
                $( core::marker::PhantomData<fn() -> [<T $bounds>]>, )+
            );

            impl< $( [<T $bounds>], )+ > [<$name:camel Route>]< $( [<T $bounds>], )+ > {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self {
                    Self( $( core::marker::PhantomData::<fn() -> [<T $bounds>]>, )+ )
                }
            }

            impl< $( [<T $bounds>], )+ > actix_web::dev::HttpServiceFactory
                for [<$name:camel Route>]< $( [<T $bounds>], )+ >
            where
                $( [<T $bounds>]: $bounds + 'static, )+
            {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let roles: &[market_engine::db_types::Role] = &[$($roles),*];
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name::< $( [<T $bounds>], )+ >);
                    if roles.is_empty() {
                        actix_web::dev::HttpServiceFactory::register(res, config);
                    } else {
                        let res = res.wrap($crate::middleware::AclMiddlewareFactory::new(roles));
                        actix_web::dev::HttpServiceFactory::register(res, config);
                    }
                }
            }
        }
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Webhook  ----------------------------------------------------
route!(paystack_webhook => Post "/" impl MarketplaceDatabase, PaymentGateway);
/// Route handler for the Paystack webhook.
///
/// The signature has already been checked by the webhook middleware by the time the handler runs. Every final
/// outcome gets a 200, or the gateway keeps redelivering the event. When verification could not run at all (gateway
/// timeout or outage, database unavailable) nothing was changed, and a 503 asks the gateway to deliver it again.
pub async fn paystack_webhook<B, G>(
    body: web::Bytes,
    api: web::Data<VerificationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let event = match serde_json::from_slice::<WebhookEvent>(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("💻️ Received a signed webhook that is not a Paystack event. Acknowledging anyway. {e}");
            return Ok(webhook_ack());
        },
    };
    trace!("💻️ Received webhook event '{}'", event.event);
    match api.handle_webhook(&event.event, event.reference()).await {
        WebhookOutcome::Verified(confirmation) => {
            info!("💻️ Webhook confirmed payment {}", confirmation.record.reference());
        },
        WebhookOutcome::Rejected(reason) => warn!("💻️ Webhook payment was rejected. {reason}"),
        WebhookOutcome::Deferred(reason) => {
            warn!("💻️ Webhook processing was deferred. Asking the gateway to redeliver. {reason}");
            return Ok(HttpResponse::ServiceUnavailable().json(json!({ "status": "retry" })));
        },
        WebhookOutcome::UnknownReference | WebhookOutcome::Ignored => {},
    }
    Ok(webhook_ack())
}

fn webhook_ack() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout/" impl MarketplaceDatabase, PaymentGateway where requires [Role::Customer]);
/// Turns the caller's cart into an order and initializes a single payment for the whole amount.
///
/// The body is optional. It may carry delivery coordinates; without them the customer's location on file is used.
pub async fn checkout<B, G>(
    caller: Caller,
    body: Option<web::Json<CheckoutRequest>>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let customer_id = caller.principal().user_id();
    debug!("💻️ POST checkout for customer #{customer_id}");
    let request = body.map(|b| b.into_inner()).unwrap_or_default();
    let result = api.checkout(customer_id, request).await?;
    Ok(HttpResponse::Created().json(JsonResponse::success("Checkout initialized", result)))
}

route!(installment_checkout => Post "/checkout/installment/"
    impl MarketplaceDatabase, PaymentGateway where requires [Role::Customer]);
/// Installment checkout. The body must name the `duration`: one of `1_month`, `3_months`, `6_months` or `1_year`.
pub async fn installment_checkout<B, G>(
    caller: Caller,
    body: web::Json<InstallmentCheckoutParams>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let customer_id = caller.principal().user_id();
    let duration = body.duration()?;
    debug!("💻️ POST installment checkout ({duration}) for customer #{customer_id}");
    let result = api.checkout_installments(customer_id, body.location, duration).await?;
    Ok(HttpResponse::Created().json(JsonResponse::success("Installment checkout initialized", result)))
}

route!(reinitialize_payment => Post "/orders/{order_id}/pay"
    impl MarketplaceDatabase, PaymentGateway where requires [Role::Customer]);
pub async fn reinitialize_payment<B, G>(
    caller: Caller,
    path: web::Path<OrderId>,
    api: web::Data<CheckoutApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let order_id = path.into_inner();
    debug!("💻️ POST re-initialize payment for {order_id} by {}", caller.principal());
    let result = api.reinitialize_payment(caller.principal(), &order_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Payment re-initialized", result)))
}

//----------------------------------------------   Verification  ----------------------------------------------------
route!(verify_payment => Get "/verify-payment/"
    impl MarketplaceDatabase, PaymentGateway where requires [Role::Customer, Role::Admin]);
/// Polls the gateway for the payment with the given `reference` (or `trxref`) query parameter.
pub async fn verify_payment<B, G>(
    caller: Caller,
    query: web::Query<VerifyPaymentParams>,
    api: web::Data<VerificationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    verify(caller, &query, api.as_ref()).await
}

route!(verify_payment_post => Post "/verify-payment/"
    impl MarketplaceDatabase, PaymentGateway where requires [Role::Customer, Role::Admin]);
/// The same as [`verify_payment`], with the reference in the query string or in a JSON body.
pub async fn verify_payment_post<B, G>(
    caller: Caller,
    query: web::Query<VerifyPaymentParams>,
    body: Option<web::Json<VerifyPaymentParams>>,
    api: web::Data<VerificationApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let params = match body {
        Some(body) if body.reference().is_ok() => body.into_inner(),
        _ => query.into_inner(),
    };
    verify(caller, &params, api.as_ref()).await
}

async fn verify<B, G>(
    caller: Caller,
    params: &VerifyPaymentParams,
    api: &VerificationApi<B, G>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let reference = params.reference()?;
    debug!("💻️ Verify payment {reference} for {}", caller.principal());
    let confirmation = api.verify(reference, Some(caller.principal())).await?;
    let message = if confirmation.newly_verified { "Payment verified" } else { "Payment already verified" };
    Ok(HttpResponse::Ok().json(JsonResponse::success(message, confirmation)))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(my_orders => Get "/orders" impl OrderQueries);
/// The caller's orders. Customers see the orders they placed, vendors the orders containing their products, and
/// admins see every order.
pub async fn my_orders<B: OrderQueries>(
    caller: Caller,
    api: web::Data<OrdersApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for {}", caller.principal());
    let orders = api.orders_for(caller.principal()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{} orders", orders.len()), orders)))
}

route!(search_orders => Post "/orders/search" impl OrderQueries where requires [Role::Admin]);
pub async fn search_orders<B: OrderQueries>(
    body: web::Json<OrderQueryFilter>,
    api: web::Data<OrdersApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let filter = body.into_inner();
    debug!("💻️ POST order search with {filter:?}");
    let orders = api.search(filter).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{} orders", orders.len()), orders)))
}

route!(order_details => Get "/orders/{order_id}" impl OrderQueries);
/// An order with its items, payment, installment plan and status history. Only the owner and admins may see it.
///
/// A caller that may not see the order gets the same 404 as for an order that does not exist.
pub async fn order_details<B: OrderQueries>(
    caller: Caller,
    path: web::Path<OrderId>,
    api: web::Data<OrdersApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order {order_id} for {}", caller.principal());
    let details = api
        .order_details(&order_id)
        .await?
        .filter(|d| caller.principal().can_access(d.order.customer_id))
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} not found")))?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Order found", details)))
}

route!(order_logs => Get "/orders/{order_id}/logs" impl OrderQueries where requires [Role::Admin]);
pub async fn order_logs<B: OrderQueries>(
    path: web::Path<OrderId>,
    api: web::Data<OrdersApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET transaction log for {order_id}");
    let logs = api.logs(&order_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{} log entries", logs.len()), logs)))
}

route!(update_order_status => Patch "/orders/{order_id}/status" impl MarketplaceDatabase where requires [Role::Admin]);
/// Moves an order to a new status. Delivering an order settles it, and the settlement report is returned with the
/// order. Vendors that could not be credited are listed under `failed`; they do not fail the request.
pub async fn update_order_status<B: MarketplaceDatabase>(
    caller: Caller,
    path: web::Path<OrderId>,
    body: web::Json<StatusUpdateParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let status = body.status()?;
    let StatusUpdateParams { reason, .. } = body.into_inner();
    debug!("💻️ PATCH order {order_id} → {status} by {}", caller.principal());
    let result = api.transition(&order_id, status, Some(caller.principal().user_id()), reason).await?;
    let message = format!("Order {order_id} moved from {} to {}", result.old_status, result.order.status);
    let result = StatusUpdateResult { order: result.order, settlement: result.settlement.map(SettlementReport::from) };
    Ok(HttpResponse::Ok().json(JsonResponse::success(message, result)))
}

route!(assign_delivery_agent => Post "/orders/{order_id}/assign" impl MarketplaceDatabase where requires [Role::Admin]);
pub async fn assign_delivery_agent<B: MarketplaceDatabase>(
    path: web::Path<OrderId>,
    body: web::Json<AssignAgentParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ POST assign agent #{} to {order_id}", body.agent_id);
    let order = api.assign_delivery_agent(&order_id, body.agent_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Delivery agent assigned", order)))
}

route!(settle_order => Post "/orders/{order_id}/settle" impl MarketplaceDatabase where requires [Role::Admin]);
/// Runs settlement for a delivered order again. Nothing happens if the order was already settled.
pub async fn settle_order<B: MarketplaceDatabase>(
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ POST settle {order_id}");
    let outcome = api.settle(&order_id).await?;
    let order = outcome.order.clone();
    let report = SettlementReport::from(outcome);
    let message = if report.already_settled {
        format!("Order {order_id} was already settled")
    } else if report.refunded {
        format!("Order {order_id} was refunded. No vendors were credited")
    } else {
        format!("{} vendors credited, {} failed", report.credited.len(), report.failed.len())
    };
    Ok(HttpResponse::Ok().json(JsonResponse::success(message, StatusUpdateResult { order, settlement: Some(report) })))
}

//----------------------------------------------   Refunds  ----------------------------------------------------
route!(request_refund => Post "/refunds/" impl MarketplaceDatabase where requires [Role::Customer]);
/// Opens a refund request against a paid order. `amount` is in major units and defaults to the whole payment.
pub async fn request_refund<B: MarketplaceDatabase>(
    caller: Caller,
    body: web::Json<RefundRequestParams>,
    api: web::Data<RefundApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let RefundRequestParams { order_id, reason, amount } = body.into_inner();
    let amount = amount.as_ref().map(parse_amount).transpose()?;
    let customer_id = caller.principal().user_id();
    debug!("💻️ POST refund request for {order_id} by customer #{customer_id}");
    let refund = api.request_refund(NewRefund { order_id, customer_id, reason, amount }).await?;
    Ok(HttpResponse::Created().json(JsonResponse::success("Refund requested", refund)))
}

route!(refunds => Get "/refunds/" impl MarketplaceDatabase where requires [Role::Admin]);
pub async fn refunds<B: MarketplaceDatabase>(api: web::Data<RefundApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET refunds");
    let refunds = api.list_refunds().await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{} refunds", refunds.len()), refunds)))
}

route!(process_refund => Patch "/refunds/{id}/" impl MarketplaceDatabase where requires [Role::Admin]);
/// Approves or rejects a pending refund. The body is `{"action": "approve" | "reject", "reason"?: "..."}`.
pub async fn process_refund<B: MarketplaceDatabase>(
    caller: Caller,
    path: web::Path<i64>,
    body: web::Json<ProcessRefundParams>,
    api: web::Data<RefundApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let refund_id = path.into_inner();
    let decision = body.decision()?;
    debug!("💻️ PATCH refund #{refund_id} with {decision:?} by {}", caller.principal());
    let outcome = api.process_refund(refund_id, decision, caller.principal().user_id()).await?;
    let message = format!("Refund #{refund_id} {}", outcome.refund.status);
    Ok(HttpResponse::Ok().json(JsonResponse::success(message, RefundReport::from(outcome))))
}

//----------------------------------------------   Wallets  ----------------------------------------------------
route!(my_wallet => Get "/wallet" impl LedgerManagement);
pub async fn my_wallet<B: LedgerManagement>(
    caller: Caller,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET wallet for {}", caller.principal());
    let summary = api.wallet(caller.principal().user_id()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Wallet found", summary)))
}

route!(vendor_balances => Get "/vendor/balances" impl LedgerManagement where requires [Role::Vendor]);
/// The vendor's available balance, and the earnings from orders that have shipped but not yet been delivered.
pub async fn vendor_balances<B: LedgerManagement>(
    caller: Caller,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET vendor balances for {}", caller.principal());
    let balances = api.vendor_balances(caller.principal().user_id()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Balances found", balances)))
}

route!(withdraw => Post "/wallet/withdraw" impl LedgerManagement where requires [Role::Vendor, Role::Customer]);
pub async fn withdraw<B: LedgerManagement>(
    caller: Caller,
    body: web::Json<WithdrawalParams>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let amount = parse_amount(&body.amount)?;
    let user_id = caller.principal().user_id();
    debug!("💻️ POST withdrawal of {amount} for {}", caller.principal());
    let (wallet, payout) = api.withdraw(user_id, amount).await?;
    let message = format!("Withdrawal {} for {amount} recorded", payout.reference);
    Ok(HttpResponse::Ok().json(JsonResponse::success(message, json!({ "wallet": wallet, "payout": payout }))))
}
