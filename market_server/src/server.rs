use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use market_engine::{
    events::{notifications::notification_hooks, EventHandlers, EventProducers},
    CheckoutApi,
    OrderFlowApi,
    OrdersApi,
    RefundApi,
    SqliteDatabase,
    VerificationApi,
    WalletApi,
};

use crate::{
    auth::IdentityVerifier,
    config::ServerConfig,
    errors::ServerError,
    integrations::paystack::PaystackGateway,
    middleware::{IdentityMiddlewareFactory, WebhookSignatureFactory},
    overdue_worker::start_overdue_worker,
    routes::{
        health,
        AssignDeliveryAgentRoute,
        CheckoutRoute,
        InstallmentCheckoutRoute,
        MyOrdersRoute,
        MyWalletRoute,
        OrderDetailsRoute,
        OrderLogsRoute,
        PaystackWebhookRoute,
        ProcessRefundRoute,
        RefundsRoute,
        ReinitializePaymentRoute,
        RequestRefundRoute,
        SearchOrdersRoute,
        SettleOrderRoute,
        UpdateOrderStatusRoute,
        VendorBalancesRoute,
        VerifyPaymentPostRoute,
        VerifyPaymentRoute,
        WithdrawRoute,
    },
};

const MAX_DB_CONNECTIONS: u32 = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    SqliteDatabase::create_if_missing(&config.database_url)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let db = SqliteDatabase::new_with_url(&config.database_url, MAX_DB_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Database migration failed. {e}")))?;
    info!("🚀️ Database ready at {}", config.database_url);

    let hooks = notification_hooks(db.clone(), config.notification_policy);
    let handlers = EventHandlers::new(config.notification_buffer, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    info!("🚀️ Notification handlers started");

    let gateway = PaystackGateway::new(config.paystack.clone())?;
    let _worker = start_overdue_worker(
        db.clone(),
        producers.clone(),
        config.settlement,
        config.overdue_delivery_age,
        config.overdue_check_interval,
    );

    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::BackendError(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: PaystackGateway,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    if config.identity_secret.reveal().is_empty() {
        warn!("🚀️ MKT_IDENTITY_SECRET is not set. Every authenticated request will be rejected.");
    }
    if config.paystack.secret_key.reveal().is_empty() {
        warn!("🚀️ MKT_PAYSTACK_SECRET_KEY is not set. Payments cannot be taken and webhooks will be rejected.");
    }
    let srv = HttpServer::new(move || {
        let checkout_api = CheckoutApi::new(db.clone(), gateway.clone(), config.checkout.clone());
        let verification_api = VerificationApi::new(db.clone(), gateway.clone(), producers.clone());
        let order_flow_api = OrderFlowApi::new(db.clone(), producers.clone(), config.settlement);
        let orders_api = OrdersApi::new(db.clone());
        let refund_api = RefundApi::new(db.clone(), producers.clone());
        let wallet_api = WalletApi::new(db.clone(), config.settlement);
        let verifier = IdentityVerifier::new(config.identity_secret.clone());
        // Routes that require an identity
        let api_scope = web::scope("/api")
            .wrap(IdentityMiddlewareFactory::new(verifier))
            .service(CheckoutRoute::<SqliteDatabase, PaystackGateway>::new())
            .service(InstallmentCheckoutRoute::<SqliteDatabase, PaystackGateway>::new())
            .service(ReinitializePaymentRoute::<SqliteDatabase, PaystackGateway>::new())
            .service(VerifyPaymentRoute::<SqliteDatabase, PaystackGateway>::new())
            .service(VerifyPaymentPostRoute::<SqliteDatabase, PaystackGateway>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(SearchOrdersRoute::<SqliteDatabase>::new())
            .service(OrderDetailsRoute::<SqliteDatabase>::new())
            .service(OrderLogsRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(AssignDeliveryAgentRoute::<SqliteDatabase>::new())
            .service(SettleOrderRoute::<SqliteDatabase>::new())
            .service(RequestRefundRoute::<SqliteDatabase>::new())
            .service(RefundsRoute::<SqliteDatabase>::new())
            .service(ProcessRefundRoute::<SqliteDatabase>::new())
            .service(MyWalletRoute::<SqliteDatabase>::new())
            .service(VendorBalancesRoute::<SqliteDatabase>::new())
            .service(WithdrawRoute::<SqliteDatabase>::new());
        // Paystack signs its webhooks with the API secret key
        let webhook_scope = web::scope("/webhook")
            .wrap(WebhookSignatureFactory::new(config.paystack.secret_key.clone()))
            .service(PaystackWebhookRoute::<SqliteDatabase, PaystackGateway>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mkt::access_log"))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(verification_api))
            .app_data(web::Data::new(order_flow_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(refund_api))
            .app_data(web::Data::new(wallet_api))
            .service(health)
            .service(webhook_scope)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
