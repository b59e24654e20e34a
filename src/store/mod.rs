//! Persistence seams
//!
//! Orders are whole documents: load, mutate in memory, write back. Stock
//! changes are single conditional updates keyed by product and size.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;
use crate::domain::aggregates::{Cart, Order};

pub use memory::{MemoryCarts, MemoryCatalog, MemoryOrders};
pub use postgres::{PgCarts, PgCatalog, PgOrders};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Order {0} already exists")]
    Duplicate(Uuid),
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<(), StoreError>;
    async fn save(&self, order: &Order) -> Result<(), StoreError>;
    async fn find(&self, id: Uuid) -> Result<Option<Order>, StoreError>;
    /// Newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError>;
    async fn list_all(&self) -> Result<Vec<Order>, StoreError>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn load(&self, user_id: Uuid) -> Result<Cart, StoreError>;
    async fn clear(&self, user_id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// `None` when the product or size does not exist.
    async fn stock_of(&self, product_id: Uuid, size: &str) -> Result<Option<u32>, StoreError>;
    /// Decrements stock and bumps `sold` only if enough stock is left.
    /// Returns whether the update applied.
    async fn take_stock(&self, product_id: Uuid, size: &str, qty: u32) -> Result<bool, StoreError>;
    /// Puts stock back and lowers `sold`. Returns whether the row existed.
    async fn restore_stock(&self, product_id: Uuid, size: &str, qty: u32) -> Result<bool, StoreError>;
}
