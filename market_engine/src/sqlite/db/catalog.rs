use sqlx::SqliteConnection;

use crate::{
    db_types::{CartItem, Identity, NewIdentity, NewProduct, Product, Role},
    traits::CatalogError,
};

pub async fn fetch_identity(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<Identity>, sqlx::Error> {
    let identity = sqlx::query_as(
        "SELECT id, email, role, is_active, latitude, longitude FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(identity)
}

pub async fn fetch_active_identities_with_role(
    role: Role,
    conn: &mut SqliteConnection,
) -> Result<Vec<Identity>, sqlx::Error> {
    let identities = sqlx::query_as(
        "SELECT id, email, role, is_active, latitude, longitude FROM users WHERE role = $1 AND is_active = 1 ORDER BY \
         id",
    )
    .bind(role.to_string())
    .fetch_all(conn)
    .await?;
    Ok(identities)
}

pub async fn upsert_identity(identity: NewIdentity, conn: &mut SqliteConnection) -> Result<Identity, sqlx::Error> {
    let (latitude, longitude) = match identity.location {
        Some(p) => (Some(p.latitude), Some(p.longitude)),
        None => (None, None),
    };
    let identity = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, role, is_active, latitude, longitude) VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO UPDATE SET
            email = excluded.email,
            role = excluded.role,
            is_active = excluded.is_active,
            latitude = excluded.latitude,
            longitude = excluded.longitude,
            updated_at = CURRENT_TIMESTAMP
        RETURNING id, email, role, is_active, latitude, longitude
        "#,
    )
    .bind(identity.id)
    .bind(identity.email)
    .bind(identity.role.to_string())
    .bind(identity.is_active)
    .bind(latitude)
    .bind(longitude)
    .fetch_one(conn)
    .await?;
    Ok(identity)
}

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as(
        "SELECT id, vendor_id, name, price, discount_price, is_active FROM products WHERE id = $1",
    )
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    Ok(product)
}

pub async fn upsert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let product = sqlx::query_as(
        r#"
        INSERT INTO products (id, vendor_id, name, price, discount_price) VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id) DO UPDATE SET
            vendor_id = excluded.vendor_id,
            name = excluded.name,
            price = excluded.price,
            discount_price = excluded.discount_price,
            updated_at = CURRENT_TIMESTAMP
        RETURNING id, vendor_id, name, price, discount_price, is_active
        "#,
    )
    .bind(product.id)
    .bind(product.vendor_id)
    .bind(product.name)
    .bind(product.price)
    .bind(product.discount_price)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn set_product_active(
    product_id: i64,
    active: bool,
    conn: &mut SqliteConnection,
) -> Result<Product, CatalogError> {
    let product = sqlx::query_as(
        r#"
        UPDATE products SET is_active = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2
        RETURNING id, vendor_id, name, price, discount_price, is_active
        "#,
    )
    .bind(active)
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    product.ok_or(CatalogError::ProductNotFound(product_id))
}

pub async fn fetch_cart(customer_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, sqlx::Error> {
    let items = sqlx::query_as(
        "SELECT customer_id, product_id, quantity FROM cart_items WHERE customer_id = $1 ORDER BY product_id",
    )
    .bind(customer_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

pub async fn set_cart_quantity(
    customer_id: i64,
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), CatalogError> {
    match quantity {
        q if q < 0 => return Err(CatalogError::InvalidQuantity),
        0 => {
            sqlx::query("DELETE FROM cart_items WHERE customer_id = $1 AND product_id = $2")
                .bind(customer_id)
                .bind(product_id)
                .execute(conn)
                .await?;
        },
        q => {
            sqlx::query(
                r#"
                INSERT INTO cart_items (customer_id, product_id, quantity) VALUES ($1, $2, $3)
                ON CONFLICT (customer_id, product_id) DO UPDATE SET quantity = excluded.quantity
                "#,
            )
            .bind(customer_id)
            .bind(product_id)
            .bind(q)
            .execute(conn)
            .await?;
        },
    }
    Ok(())
}

/// Removes the given products from the customer's cart. Anything added to the cart since is left alone.
pub async fn remove_from_cart(
    customer_id: i64,
    product_ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let mut removed = 0;
    for product_id in product_ids {
        let result = sqlx::query("DELETE FROM cart_items WHERE customer_id = $1 AND product_id = $2")
            .bind(customer_id)
            .bind(product_id)
            .execute(&mut *conn)
            .await?;
        removed += result.rows_affected();
    }
    Ok(removed)
}
