//! # Marketplace engine public API
//!
//! The `market_api` module exposes the programmatic API for the marketplace engine.
//! The API is modular, so that clients of the API can pick and choose the functionality they want.
//!
//! * [`checkout_api`] turns a customer's cart into an order and a payment intent (single-shot or installments).
//! * [`verification_api`] confirms payments with the gateway, for both customer polls and gateway webhooks.
//! * [`order_flow_api`] moves orders through their lifecycle, and settles vendors when orders are delivered.
//! * [`refund_api`] handles refund requests and their approval, including commission reversal.
//! * [`wallet_api`] exposes wallet balances, histories and withdrawals.
//! * [`orders_api`] provides read-only queries over orders and their audit trail.
//!
//! The other submodules in this module are support and utility functions and types.
//!
//! # API usage
//!
//! The pattern for using all the APIs is the same. An API instance is created by supplying a database backend that
//! implements the specific backend traits required by the API, plus whatever collaborators (gateway, event producers,
//! configuration) the API needs.
//!
//! ```rust,ignore
//! use market_engine::{OrdersApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements OrderQueries
//! let api = OrdersApi::new(db);
//! let details = api.order_details(&order_id).await?;
//! ```
pub mod checkout_api;
pub mod config;
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod orders_api;
pub mod refund_api;
pub mod verification_api;
pub mod wallet_api;
