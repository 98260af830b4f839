use thiserror::Error;

use crate::db_types::{Money, OrderItem, Payout, Wallet, WalletTransaction};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Ledger amounts must be positive. Got {0}")]
    InvalidAmount(Money),
    #[error("Insufficient funds. Requested {requested}, but only {available} is available")]
    InsufficientFunds { requested: Money, available: Money },
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

/// The wallet primitives.
///
/// Implementations must serialize concurrent mutations of the same wallet, so that no credit or debit is ever lost,
/// and must keep `balance == sum(signed transactions)` at all times. Wallets are created lazily and never deleted.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement {
    /// Fetches the wallet for `user_id`, creating an empty one if it does not exist yet.
    async fn fetch_or_create_wallet(&self, user_id: i64) -> Result<Wallet, LedgerError>;

    /// The wallet's transactions, newest first.
    async fn fetch_wallet_transactions(&self, user_id: i64) -> Result<Vec<WalletTransaction>, LedgerError>;

    /// Adds a positive `amount` to the user's wallet and appends a CREDIT transaction.
    async fn credit_wallet(
        &self,
        user_id: i64,
        amount: Money,
        source: &str,
    ) -> Result<(Wallet, WalletTransaction), LedgerError>;

    /// Removes a positive `amount` from the user's wallet and appends a DEBIT transaction. Fails with
    /// [`LedgerError::InsufficientFunds`] if the balance does not cover the amount, in which case nothing changes.
    async fn debit_wallet(
        &self,
        user_id: i64,
        amount: Money,
        source: &str,
    ) -> Result<(Wallet, WalletTransaction), LedgerError>;

    /// Debits the wallet with a `WITHDRAWAL` transaction and records the payout, atomically.
    async fn withdraw(&self, user_id: i64, amount: Money) -> Result<(Wallet, Payout), LedgerError>;

    /// The vendor's order items that are on their way to a customer (the order has shipped but is not delivered
    /// yet). These will be credited to the vendor on delivery.
    async fn fetch_pending_vendor_items(&self, vendor_id: i64) -> Result<Vec<OrderItem>, LedgerError>;
}
