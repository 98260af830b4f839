#![allow(dead_code)]
//! A small marketplace, seeded into a fresh SQLite database.
use market_engine::{
    db_types::{Money, NewIdentity, NewProduct, OrderId, OrderStatusType, Principal, Role},
    events::EventProducers,
    helpers::{CommissionRate, DeliveryFeeConfig, GeoPoint},
    market_api::order_objects::{CheckoutRequest, CheckoutResult},
    test_utils::{
        fake_gateway::FakeGateway,
        prepare_env::{fresh_database, tear_down},
    },
    CatalogManagement,
    CheckoutApi,
    CheckoutConfig,
    LedgerManagement,
    OrderFlowApi,
    OrdersApi,
    RefundApi,
    SettlementConfig,
    SqliteDatabase,
    VerificationApi,
    WalletApi,
};

pub const CUSTOMER: i64 = 1;
pub const OTHER_CUSTOMER: i64 = 2;
pub const VENDOR_A: i64 = 10;
pub const VENDOR_B: i64 = 11;
pub const ADMIN: i64 = 100;
pub const AGENT: i64 = 200;

/// 10,000 NGN, sold by vendor A
pub const LAMP: i64 = 1;
/// 6,000 NGN, sold by vendor B
pub const RUG: i64 = 2;
/// 15,000 NGN, sold by vendor A
pub const DESK: i64 = 3;

pub fn lagos() -> GeoPoint {
    GeoPoint::new(6.5244, 3.3792)
}

/// A flat 5,000 NGN delivery fee above the free delivery threshold.
pub fn delivery_config() -> DeliveryFeeConfig {
    DeliveryFeeConfig {
        base_fee: Money::from_major(5_000),
        per_km_rate: Money::default(),
        origin: lagos(),
        ..DeliveryFeeConfig::default()
    }
}

pub fn checkout_config() -> CheckoutConfig {
    CheckoutConfig { delivery: delivery_config(), ..CheckoutConfig::default() }
}

pub fn settlement_config() -> SettlementConfig {
    SettlementConfig::new("0.10".parse::<CommissionRate>().expect("valid rate"))
}

pub struct Market {
    pub db: SqliteDatabase,
    pub gateway: FakeGateway,
    pub checkout: CheckoutApi<SqliteDatabase, FakeGateway>,
    pub verification: VerificationApi<SqliteDatabase, FakeGateway>,
    pub flow: OrderFlowApi<SqliteDatabase>,
    pub refunds: RefundApi<SqliteDatabase>,
    pub wallets: WalletApi<SqliteDatabase>,
    pub orders: OrdersApi<SqliteDatabase>,
}

impl Market {
    pub async fn new() -> Self {
        Self::with_config(checkout_config()).await
    }

    pub async fn with_config(config: CheckoutConfig) -> Self {
        let db = fresh_database().await;
        Self::build(db, config, EventProducers::default()).await
    }

    /// Builds the APIs on top of an existing (fresh) database, publishing events to `producers`.
    pub async fn build(db: SqliteDatabase, config: CheckoutConfig, producers: EventProducers) -> Self {
        seed(&db).await;
        let gateway = FakeGateway::new();
        Self {
            checkout: CheckoutApi::new(db.clone(), gateway.clone(), config),
            verification: VerificationApi::new(db.clone(), gateway.clone(), producers.clone()),
            flow: OrderFlowApi::new(db.clone(), producers.clone(), settlement_config()),
            refunds: RefundApi::new(db.clone(), producers),
            wallets: WalletApi::new(db.clone(), settlement_config()),
            orders: OrdersApi::new(db.clone()),
            db,
            gateway,
        }
    }

    pub async fn fill_cart(&self, customer_id: i64, lines: &[(i64, i64)]) {
        for (product_id, quantity) in lines {
            self.db.set_cart_quantity(customer_id, *product_id, *quantity).await.expect("Error filling cart");
        }
    }

    /// Checks out a lamp and a rug for the customer: 16,000 NGN plus 5,000 NGN delivery.
    pub async fn checkout_lamp_and_rug(&self) -> CheckoutResult {
        self.fill_cart(CUSTOMER, &[(LAMP, 1), (RUG, 1)]).await;
        self.checkout.checkout(CUSTOMER, CheckoutRequest::default()).await.expect("Checkout failed")
    }

    pub async fn paid_order(&self) -> CheckoutResult {
        let checkout = self.checkout_lamp_and_rug().await;
        let caller = Principal::Customer(CUSTOMER);
        self.verification.verify(&checkout.reference, Some(&caller)).await.expect("Verification failed");
        checkout
    }

    pub async fn delivered_order(&self) -> CheckoutResult {
        let checkout = self.paid_order().await;
        self.ship(&checkout.order_id).await;
        self.flow
            .transition(&checkout.order_id, OrderStatusType::Delivered, Some(AGENT), None)
            .await
            .expect("Could not deliver order");
        checkout
    }

    pub async fn ship(&self, order_id: &OrderId) {
        self.flow
            .transition(order_id, OrderStatusType::Shipped, Some(ADMIN), None)
            .await
            .expect("Could not ship order");
    }

    pub async fn balance(&self, user_id: i64) -> Money {
        self.db.fetch_or_create_wallet(user_id).await.expect("Error fetching wallet").balance
    }

    /// The wallet balance must always equal the signed sum of its transactions.
    pub async fn assert_ledger_conserved(&self, user_id: i64) {
        let wallet = self.db.fetch_or_create_wallet(user_id).await.expect("Error fetching wallet");
        let txs = self.db.fetch_wallet_transactions(user_id).await.expect("Error fetching transactions");
        let sum = txs.iter().map(|t| t.signed_amount()).sum::<Money>();
        assert_eq!(wallet.balance, sum, "Ledger for user #{user_id} does not balance");
    }

    pub async fn tear_down(self) {
        tear_down(self.db).await;
    }
}

async fn seed(db: &SqliteDatabase) {
    let identities = [
        NewIdentity::new(CUSTOMER, "ada@example.com", Role::Customer).with_location(lagos()),
        NewIdentity::new(OTHER_CUSTOMER, "bayo@example.com", Role::Customer).with_location(lagos()),
        NewIdentity::new(VENDOR_A, "lamps@example.com", Role::Vendor),
        NewIdentity::new(VENDOR_B, "rugs@example.com", Role::Vendor),
        NewIdentity::new(ADMIN, "admin@example.com", Role::Admin),
        NewIdentity::new(AGENT, "rider@example.com", Role::DeliveryAgent),
    ];
    for identity in identities {
        db.upsert_identity(identity).await.expect("Error seeding identity");
    }
    let products = [
        NewProduct::new(LAMP, VENDOR_A, "Brass lamp", Money::from_major(10_000)),
        NewProduct::new(RUG, VENDOR_B, "Aso-oke rug", Money::from_major(6_000)),
        NewProduct::new(DESK, VENDOR_A, "Teak desk", Money::from_major(15_000)),
    ];
    for product in products {
        db.upsert_product(product).await.expect("Error seeding product");
    }
}
