use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Money, Payout, Wallet},
    market_api::{
        config::SettlementConfig,
        order_objects::{VendorBalances, WalletSummary},
    },
    traits::{LedgerError, LedgerManagement},
};

/// Read access to wallets, and withdrawals.
pub struct WalletApi<B> {
    db: B,
    settlement: SettlementConfig,
}

impl<B> Debug for WalletApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi")
    }
}

impl<B> WalletApi<B> {
    pub fn new(db: B, settlement: SettlementConfig) -> Self {
        Self { db, settlement }
    }
}

impl<B> WalletApi<B>
where B: LedgerManagement
{
    pub async fn wallet(&self, user_id: i64) -> Result<WalletSummary, LedgerError> {
        let wallet = self.db.fetch_or_create_wallet(user_id).await?;
        let transactions = self.db.fetch_wallet_transactions(user_id).await?;
        Ok(WalletSummary { wallet, transactions })
    }

    /// The vendor's withdrawable balance, and what they stand to be credited once their shipped orders are delivered.
    /// Pending shares are estimated with the current commission rate.
    pub async fn vendor_balances(&self, vendor_id: i64) -> Result<VendorBalances, LedgerError> {
        let wallet = self.db.fetch_or_create_wallet(vendor_id).await?;
        let items = self.db.fetch_pending_vendor_items(vendor_id).await?;
        let mut pending = Money::default();
        for item in items {
            let split = self
                .settlement
                .commission_rate
                .split(item.item_subtotal())
                .map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
            pending += split.vendor_share;
        }
        trace!("💸️ Vendor #{vendor_id} has {} available and {pending} pending", wallet.balance);
        Ok(VendorBalances { available: wallet.balance, pending })
    }

    pub async fn withdraw(&self, user_id: i64, amount: Money) -> Result<(Wallet, Payout), LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let (wallet, payout) = self.db.withdraw(user_id, amount).await?;
        info!("💸️ User #{user_id} withdrew {amount}. Payout reference {}", payout.reference);
        Ok((wallet, payout))
    }
}
