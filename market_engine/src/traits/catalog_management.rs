use thiserror::Error;

use crate::db_types::{CartItem, Identity, NewIdentity, NewProduct, Product};

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Cart quantities cannot be negative")]
    InvalidQuantity,
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        CatalogError::DatabaseError(e.to_string())
    }
}

/// The local replica of the identity directory, the product catalog and customers' carts.
///
/// The marketplace core only reads from these (except for the cart, which checkout clears). The upsert methods are
/// how the replica is kept in sync with the systems that own that data.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn fetch_identity(&self, user_id: i64) -> Result<Option<Identity>, CatalogError>;

    async fn fetch_active_admins(&self) -> Result<Vec<Identity>, CatalogError>;

    /// The product with its *current* pricing. Inactive products are still returned.
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, CatalogError>;

    async fn fetch_cart(&self, customer_id: i64) -> Result<Vec<CartItem>, CatalogError>;

    async fn upsert_identity(&self, identity: NewIdentity) -> Result<Identity, CatalogError>;

    async fn upsert_product(&self, product: NewProduct) -> Result<Product, CatalogError>;

    async fn set_product_active(&self, product_id: i64, active: bool) -> Result<Product, CatalogError>;

    /// Sets the quantity of a product in the customer's cart. A quantity of zero removes the line.
    async fn set_cart_quantity(&self, customer_id: i64, product_id: i64, quantity: i64) -> Result<(), CatalogError>;
}
