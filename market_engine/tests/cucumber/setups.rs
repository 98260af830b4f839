use cucumber::given;
use market_engine::{
    db_types::{Money, NewIdentity, NewProduct, Role},
    helpers::GeoPoint,
    CatalogManagement,
};

use crate::cucumber::{market_world::MarketSystem, MarketWorld};

#[given("a fresh marketplace")]
async fn fresh_marketplace(world: &mut MarketWorld) {
    let system = MarketSystem::new().await;
    world.system = Some(system);
}

async fn add_identity(world: &mut MarketWorld, identity: NewIdentity) {
    world.system().db.upsert_identity(identity).await.expect("Error adding user");
}

#[given(expr = "customer {int} lives in Lagos")]
async fn customer_in_lagos(world: &mut MarketWorld, id: i64) {
    let lagos = GeoPoint::new(6.6, 3.35);
    let identity = NewIdentity::new(id, format!("customer{id}@example.com"), Role::Customer).with_location(lagos);
    add_identity(world, identity).await;
}

#[given(expr = "vendor {int}")]
async fn vendor(world: &mut MarketWorld, id: i64) {
    add_identity(world, NewIdentity::new(id, format!("vendor{id}@example.com"), Role::Vendor)).await;
}

#[given(expr = "admin {int}")]
async fn admin(world: &mut MarketWorld, id: i64) {
    add_identity(world, NewIdentity::new(id, format!("admin{id}@example.com"), Role::Admin)).await;
}

#[given(expr = "delivery agent {int}")]
async fn delivery_agent(world: &mut MarketWorld, id: i64) {
    add_identity(world, NewIdentity::new(id, format!("rider{id}@example.com"), Role::DeliveryAgent)).await;
}

#[given(expr = "product {int} {string} sold by vendor {int} for {int} NGN")]
async fn product(world: &mut MarketWorld, id: i64, name: String, vendor_id: i64, price: i64) {
    let product = NewProduct::new(id, vendor_id, name, Money::from_major(price));
    world.system().db.upsert_product(product).await.expect("Error adding product");
}
