use market_engine::{
    db_types::{
        InstallmentPayment,
        InstallmentPlan,
        Money,
        Order,
        OrderId,
        OrderItem,
        OrderStatusHistory,
        Payment,
        Payout,
        Refund,
        TransactionLog,
        Wallet,
        WalletTransaction,
    },
    market_api::order_objects::OrderQueryFilter,
    traits::PaymentRecord,
    LedgerError,
    LedgerManagement,
    OrderQueries,
    QueryError,
};
use mockall::mock;

mock! {
    pub OrderQuerier {}
    impl OrderQueries for OrderQuerier {
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, QueryError>;
        async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, QueryError>;
        async fn fetch_payment_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, QueryError>;
        async fn fetch_payment_by_reference(&self, reference: &str) -> Result<Option<PaymentRecord>, QueryError>;
        async fn fetch_plan_for_order(&self, order_id: &OrderId) -> Result<Option<(InstallmentPlan, Vec<InstallmentPayment>)>, QueryError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, QueryError>;
        async fn fetch_status_history(&self, order_id: &OrderId) -> Result<Vec<OrderStatusHistory>, QueryError>;
        async fn fetch_transaction_logs(&self, order_id: &OrderId) -> Result<Vec<TransactionLog>, QueryError>;
        async fn fetch_refund(&self, refund_id: i64) -> Result<Option<Refund>, QueryError>;
        async fn fetch_refunds(&self) -> Result<Vec<Refund>, QueryError>;
    }
}

mock! {
    pub LedgerManager {}
    impl LedgerManagement for LedgerManager {
        async fn fetch_or_create_wallet(&self, user_id: i64) -> Result<Wallet, LedgerError>;
        async fn fetch_wallet_transactions(&self, user_id: i64) -> Result<Vec<WalletTransaction>, LedgerError>;
        async fn credit_wallet(&self, user_id: i64, amount: Money, source: &str) -> Result<(Wallet, WalletTransaction), LedgerError>;
        async fn debit_wallet(&self, user_id: i64, amount: Money, source: &str) -> Result<(Wallet, WalletTransaction), LedgerError>;
        async fn withdraw(&self, user_id: i64, amount: Money) -> Result<(Wallet, Payout), LedgerError>;
        async fn fetch_pending_vendor_items(&self, vendor_id: i64) -> Result<Vec<OrderItem>, LedgerError>;
    }
}
