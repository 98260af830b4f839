//! # Backend contracts
//!
//! This module defines the interfaces that marketplace *backends* and external collaborators must provide.
//!
//! ## Ledger
//! Every identity owns exactly one wallet. Wallet balances only ever change through [`LedgerManagement`]'s credit and
//! debit calls, which also append the matching wallet transaction, so that a wallet's balance always equals the
//! signed sum of its transactions.
//!
//! ## Traits
//! * [`MarketplaceDatabase`] defines the highest level of behaviour: staging checkouts, confirming payments, moving
//!   orders through their lifecycle, settling vendors and processing refunds.
//! * [`LedgerManagement`] provides the locked wallet primitives.
//! * [`CatalogManagement`] is the local replica of the identity directory, the product catalog and carts.
//! * [`OrderQueries`] provides read-only access to orders, payments, refunds and the audit log.
//! * [`PaymentGateway`] is the external payment processor.
//! * [`NotificationDispatcher`] is the fire-and-forget notification transport.
mod catalog_management;
mod data_objects;
mod ledger_management;
mod marketplace_database;
mod notifications;
mod order_queries;
mod payment_gateway;

pub use catalog_management::{CatalogError, CatalogManagement};
pub use data_objects::{
    BatchOutcome,
    CommissionReversal,
    CommissionReversalFailure,
    NewCheckout,
    NewCheckoutPayment,
    OverdueDelivery,
    PaymentConfirmation,
    PaymentRecord,
    RefundOutcome,
    SettlementOutcome,
    StagedCheckout,
    StagedPayment,
    TransitionResult,
    VendorCredit,
    VendorCreditFailure,
};
pub use ledger_management::{LedgerError, LedgerManagement};
pub use marketplace_database::{MarketplaceDatabase, MarketplaceError};
pub use notifications::{Notification, NotificationDispatcher, NotificationError};
pub use order_queries::{OrderQueries, QueryError};
pub use payment_gateway::{
    GatewayAuthorization,
    GatewayError,
    GatewayInitRequest,
    GatewayPaymentStatus,
    GatewayVerification,
    PaymentGateway,
};
