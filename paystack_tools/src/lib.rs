mod api;
mod config;
mod error;

mod data_objects;
pub mod signature;

pub use api::PaystackApi;
pub use config::PaystackConfig;
pub use data_objects::{InitializeTransactionRequest, InitializedTransaction, TransactionDetails, WebhookEvent};
pub use error::PaystackApiError;
