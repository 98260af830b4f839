use cucumber::World;
use log::*;
use market_engine::{
    db_types::{Money, OrderId, Refund},
    events::EventProducers,
    helpers::{CommissionRate, DeliveryFeeConfig, GeoPoint},
    market_api::{
        order_objects::{CheckoutResult, InstallmentCheckoutResult},
        verification_api::WebhookOutcome,
    },
    test_utils::{
        fake_gateway::FakeGateway,
        prepare_env::{prepare_test_env, random_db_path},
    },
    CheckoutApi,
    CheckoutConfig,
    OrderFlowApi,
    RefundApi,
    SettlementConfig,
    SqliteDatabase,
    VerificationApi,
    WalletApi,
};

#[derive(Default, Debug, World)]
pub struct MarketWorld {
    pub system: Option<MarketSystem>,
    pub checkout: Option<CheckoutResult>,
    pub installments: Option<InstallmentCheckoutResult>,
    pub refund: Option<Refund>,
    pub webhook_outcomes: Vec<WebhookOutcome>,
    pub last_error: Option<String>,
}

pub struct MarketSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub gateway: FakeGateway,
    pub checkout: CheckoutApi<SqliteDatabase, FakeGateway>,
    pub verification: VerificationApi<SqliteDatabase, FakeGateway>,
    pub flow: OrderFlowApi<SqliteDatabase>,
    pub refunds: RefundApi<SqliteDatabase>,
    pub wallets: WalletApi<SqliteDatabase>,
}

impl std::fmt::Debug for MarketSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MarketSystem({})", self.db_path)
    }
}

impl MarketWorld {
    pub fn system(&self) -> &MarketSystem {
        self.system.as_ref().expect("Marketplace not initialised")
    }

    pub fn checkout(&self) -> &CheckoutResult {
        self.checkout.as_ref().expect("Nobody has checked out yet")
    }

    pub fn order_id(&self) -> OrderId {
        match (&self.checkout, &self.installments) {
            (Some(c), _) => c.order_id.clone(),
            (None, Some(i)) => i.order_id.clone(),
            (None, None) => panic!("Nobody has checked out yet"),
        }
    }

    /// The payment reference of the most recent checkout, whether it was single-shot or in installments.
    pub fn reference(&self) -> String {
        match (&self.checkout, &self.installments) {
            (Some(c), _) => c.reference.clone(),
            (None, Some(i)) => i.first_installment_reference.clone(),
            (None, None) => panic!("Nobody has checked out yet"),
        }
    }
}

impl MarketSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let gateway = FakeGateway::new();
        let delivery = DeliveryFeeConfig {
            base_fee: Money::from_major(5_000),
            per_km_rate: Money::default(),
            origin: GeoPoint::new(6.5244, 3.3792),
            ..DeliveryFeeConfig::default()
        };
        let config = CheckoutConfig { delivery, ..CheckoutConfig::default() };
        let rate = "0.10".parse::<CommissionRate>().expect("valid rate");
        let settlement = SettlementConfig::new(rate);
        let producers = EventProducers::default();
        Self {
            db_path: url,
            checkout: CheckoutApi::new(db.clone(), gateway.clone(), config),
            verification: VerificationApi::new(db.clone(), gateway.clone(), producers.clone()),
            flow: OrderFlowApi::new(db.clone(), producers.clone(), settlement),
            refunds: RefundApi::new(db.clone(), producers),
            wallets: WalletApi::new(db.clone(), settlement),
            db,
            gateway,
        }
    }
}
