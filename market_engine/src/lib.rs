//! Marketplace Engine
//!
//! The marketplace engine is the order, payment and wallet ledger core of a multi-vendor e-commerce backend. It turns
//! a customer's cart into an order, collects payment (in one go, or in installments) through a payment gateway,
//! verifies those payments idempotently, moves orders through their lifecycle and settles funds into vendor wallets
//! net of the platform commission.
//!
//! The library is divided into these main sections:
//! 1. Backend traits ([`mod@traits`]) and the SQLite backend ([`SqliteDatabase`]). You should never need to access the
//!    database directly. Instead, use the public API provided by the engine. The exception is the data types used in
//!    the database. These are defined in the [`mod@db_types`] module and are public.
//! 2. The engine public API ([`mod@market_api`]): checkout, payment verification, order flow and settlement, refunds,
//!    wallets and order queries.
//! 3. Events ([`mod@events`]). The APIs emit events when orders are paid, change status, when vendors are credited,
//!    refunds are processed, or deliveries go overdue. Hooks subscribe to these, e.g. to send notifications.
//!
//! The payment gateway is consumed through the [`PaymentGateway`] trait, so that the engine does not depend on any
//! particular provider.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod market_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use market_api::{
    checkout_api::CheckoutApi,
    config::{CheckoutConfig, SettlementConfig},
    errors::{CheckoutError, RefundError, VerificationError},
    order_flow_api::OrderFlowApi,
    orders_api::OrdersApi,
    refund_api::RefundApi,
    verification_api::VerificationApi,
    wallet_api::WalletApi,
};
pub use traits::{
    CatalogError,
    CatalogManagement,
    GatewayError,
    LedgerError,
    LedgerManagement,
    MarketplaceDatabase,
    MarketplaceError,
    NotificationDispatcher,
    NotificationError,
    OrderQueries,
    PaymentGateway,
    QueryError,
};
