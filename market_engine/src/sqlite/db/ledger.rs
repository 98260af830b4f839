//! Wallet primitives.
//!
//! A wallet's balance and its transaction history are always written together, on the same connection. When these
//! functions are called inside a transaction, the first statement is always the write to the `wallets` row, which is
//! what serializes concurrent mutations of the same wallet.
use log::*;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
    db_types::{Money, OrderItem, Payout, TransactionType, Wallet, WalletTransaction},
    traits::LedgerError,
};

pub const WITHDRAWAL_SOURCE: &str = "WITHDRAWAL";

pub async fn fetch_or_create_wallet(user_id: i64, conn: &mut SqliteConnection) -> Result<Wallet, sqlx::Error> {
    sqlx::query("INSERT INTO wallets (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    let wallet = sqlx::query_as("SELECT * FROM wallets WHERE user_id = $1").bind(user_id).fetch_one(conn).await?;
    Ok(wallet)
}

pub async fn fetch_wallet_transactions(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<WalletTransaction>, sqlx::Error> {
    let transactions = sqlx::query_as(
        r#"
        SELECT wallet_transactions.* FROM wallet_transactions
        JOIN wallets ON wallets.id = wallet_transactions.wallet_id
        WHERE wallets.user_id = $1
        ORDER BY wallet_transactions.id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(transactions)
}

async fn insert_transaction(
    wallet_id: i64,
    transaction_type: TransactionType,
    amount: Money,
    source: &str,
    conn: &mut SqliteConnection,
) -> Result<WalletTransaction, sqlx::Error> {
    let tx = sqlx::query_as(
        r#"
        INSERT INTO wallet_transactions (wallet_id, transaction_type, amount, source) VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(wallet_id)
    .bind(transaction_type.to_string())
    .bind(amount)
    .bind(source)
    .fetch_one(conn)
    .await?;
    Ok(tx)
}

/// Credits the wallet, creating it if necessary. This is not atomic on its own: run it inside a transaction.
pub async fn credit(
    user_id: i64,
    amount: Money,
    source: &str,
    conn: &mut SqliteConnection,
) -> Result<(Wallet, WalletTransaction), LedgerError> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount(amount));
    }
    let wallet: Wallet = sqlx::query_as(
        r#"
        INSERT INTO wallets (user_id, balance) VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET balance = balance + excluded.balance, updated_at = CURRENT_TIMESTAMP
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .fetch_one(&mut *conn)
    .await?;
    let tx = insert_transaction(wallet.id, TransactionType::Credit, amount, source, conn).await?;
    trace!("💸️ Credited {amount} to wallet of user #{user_id} ({source}). New balance: {}", wallet.balance);
    Ok((wallet, tx))
}

/// Debits the wallet. If the balance does not cover `amount`, nothing is written and
/// [`LedgerError::InsufficientFunds`] is returned. This is not atomic on its own: run it inside a transaction.
pub async fn debit(
    user_id: i64,
    amount: Money,
    source: &str,
    conn: &mut SqliteConnection,
) -> Result<(Wallet, WalletTransaction), LedgerError> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount(amount));
    }
    let wallet: Option<Wallet> = sqlx::query_as(
        r#"
        UPDATE wallets SET balance = balance - $1, updated_at = CURRENT_TIMESTAMP
        WHERE user_id = $2 AND balance >= $1
        RETURNING *
        "#,
    )
    .bind(amount)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    let wallet = match wallet {
        Some(w) => w,
        None => {
            let available = fetch_or_create_wallet(user_id, conn).await?.balance;
            debug!("💸️ Cannot debit {amount} from user #{user_id}. Only {available} is available");
            return Err(LedgerError::InsufficientFunds { requested: amount, available });
        },
    };
    let tx = insert_transaction(wallet.id, TransactionType::Debit, amount, source, conn).await?;
    trace!("💸️ Debited {amount} from wallet of user #{user_id} ({source}). New balance: {}", wallet.balance);
    Ok((wallet, tx))
}

pub async fn insert_payout(user_id: i64, amount: Money, conn: &mut SqliteConnection) -> Result<Payout, sqlx::Error> {
    let payout = sqlx::query_as("INSERT INTO payouts (user_id, amount, reference) VALUES ($1, $2, $3) RETURNING *")
        .bind(user_id)
        .bind(amount)
        .bind(Uuid::new_v4().to_string())
        .fetch_one(conn)
        .await?;
    Ok(payout)
}

pub async fn fetch_pending_vendor_items(
    vendor_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as(
        r#"
        SELECT order_items.* FROM order_items
        JOIN orders ON orders.order_id = order_items.order_id
        WHERE order_items.vendor_id = $1
            AND orders.status = 'SHIPPED'
            AND orders.payment_status != 'REFUNDED'
            AND order_items.credited_at IS NULL
        ORDER BY order_items.id
        "#,
    )
    .bind(vendor_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}
