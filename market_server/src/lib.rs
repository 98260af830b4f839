//! # Marketplace server
//! This crate hosts the HTTP server for the marketplace engine. It is responsible for:
//! * Resolving the caller's identity from the signed identity headers, and checking their role on each route.
//! * Exposing checkout, payment verification, order flow, refund and wallet endpoints.
//! * Receiving Paystack webhooks, after checking their signature.
//! * Running the overdue delivery worker and the notification handlers.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhook/`: The Paystack webhook.
//! * `/api/...`: Everything else. See [routes](routes/index.html).

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod middleware;
pub mod overdue_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
