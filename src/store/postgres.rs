//! Postgres stores (sqlx)

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;
use crate::domain::aggregates::{Cart, CartItem, Order};
use crate::domain::value_objects::{Money, Quantity};
use super::{CartStore, CatalogStore, OrderRepository, StoreError};

#[derive(Clone)]
pub struct PgOrders { db: PgPool }

impl PgOrders {
    pub fn new(db: PgPool) -> Self { Self { db } }
}

#[async_trait]
impl OrderRepository for PgOrders {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO orders (id, user_id, order_status, document, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(order.id()).bind(order.user_id()).bind(order.status().as_str()).bind(Json(order))
            .bind(order.created_at()).bind(order.updated_at())
            .execute(&self.db).await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Duplicate(order.id()),
                other => StoreError::Database(other),
            })?;
        Ok(())
    }

    async fn save(&self, order: &Order) -> Result<(), StoreError> {
        sqlx::query("UPDATE orders SET order_status = $2, document = $3, updated_at = $4 WHERE id = $1")
            .bind(order.id()).bind(order.status().as_str()).bind(Json(order)).bind(order.updated_at())
            .execute(&self.db).await?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let row: Option<(Json<Order>,)> = sqlx::query_as("SELECT document FROM orders WHERE id = $1")
            .bind(id).fetch_optional(&self.db).await?;
        Ok(row.map(|(Json(order),)| order))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let rows: Vec<(Json<Order>,)> = sqlx::query_as("SELECT document FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
            .bind(user_id).fetch_all(&self.db).await?;
        Ok(rows.into_iter().map(|(Json(order),)| order).collect())
    }

    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        let rows: Vec<(Json<Order>,)> = sqlx::query_as("SELECT document FROM orders ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.db).await?;
        Ok(rows.into_iter().map(|(Json(order),)| order).collect())
    }
}

#[derive(Clone)]
pub struct PgCarts { db: PgPool }

impl PgCarts {
    pub fn new(db: PgPool) -> Self { Self { db } }
}

#[derive(sqlx::FromRow)]
struct CartRow { product_id: Uuid, name: String, image: Option<String>, size: String, color: Option<String>, quantity: i32, price: i64 }

impl CartRow {
    fn into_item(self) -> Result<CartItem, StoreError> {
        let quantity = u32::try_from(self.quantity).ok().and_then(Quantity::new)
            .ok_or_else(|| StoreError::Corrupt(format!("cart quantity {} for product {}", self.quantity, self.product_id)))?;
        Ok(CartItem {
            product_id: self.product_id, name: self.name, image: self.image, size: self.size, color: self.color,
            quantity, unit_price: Money::inr(Decimal::from(self.price)),
        })
    }
}

#[async_trait]
impl CartStore for PgCarts {
    async fn load(&self, user_id: Uuid) -> Result<Cart, StoreError> {
        let rows = sqlx::query_as::<_, CartRow>(
            "SELECT ci.product_id, p.name, p.image, ci.size, ci.color, ci.quantity, p.price \
             FROM cart_items ci JOIN products p ON p.id = ci.product_id \
             WHERE ci.user_id = $1 ORDER BY ci.created_at")
            .bind(user_id).fetch_all(&self.db).await?;
        let items = rows.into_iter().map(CartRow::into_item).collect::<Result<Vec<_>, _>>()?;
        Ok(Cart::with_items(user_id, items))
    }

    async fn clear(&self, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id).execute(&self.db).await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgCatalog { db: PgPool }

impl PgCatalog {
    pub fn new(db: PgPool) -> Self { Self { db } }
}

fn qty_param(qty: u32) -> Result<i32, StoreError> {
    i32::try_from(qty).map_err(|_| StoreError::Corrupt(format!("quantity {qty} out of range")))
}

#[async_trait]
impl CatalogStore for PgCatalog {
    async fn stock_of(&self, product_id: Uuid, size: &str) -> Result<Option<u32>, StoreError> {
        let row: Option<(i32,)> = sqlx::query_as("SELECT stock FROM product_sizes WHERE product_id = $1 AND size = $2")
            .bind(product_id).bind(size).fetch_optional(&self.db).await?;
        Ok(row.map(|(stock,)| u32::try_from(stock).unwrap_or(0)))
    }

    async fn take_stock(&self, product_id: Uuid, size: &str, qty: u32) -> Result<bool, StoreError> {
        let done = sqlx::query(
            "WITH taken AS (UPDATE product_sizes SET stock = stock - $3 WHERE product_id = $1 AND size = $2 AND stock >= $3 RETURNING product_id) \
             UPDATE products SET sold = sold + $3 WHERE id IN (SELECT product_id FROM taken)")
            .bind(product_id).bind(size).bind(qty_param(qty)?)
            .execute(&self.db).await?;
        Ok(done.rows_affected() == 1)
    }

    async fn restore_stock(&self, product_id: Uuid, size: &str, qty: u32) -> Result<bool, StoreError> {
        let done = sqlx::query(
            "WITH restored AS (UPDATE product_sizes SET stock = stock + $3 WHERE product_id = $1 AND size = $2 RETURNING product_id) \
             UPDATE products SET sold = GREATEST(sold - $3, 0) WHERE id IN (SELECT product_id FROM restored)")
            .bind(product_id).bind(size).bind(qty_param(qty)?)
            .execute(&self.db).await?;
        Ok(done.rows_affected() == 1)
    }
}
