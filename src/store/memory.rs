//! In-memory stores for tests and local runs

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;
use crate::domain::aggregates::{Cart, Order, Product};
use super::{CartStore, CatalogStore, OrderRepository, StoreError};

#[derive(Default)]
pub struct MemoryOrders {
    orders: RwLock<HashMap<Uuid, Order>>,
}

impl MemoryOrders {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl OrderRepository for MemoryOrders {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id()) { return Err(StoreError::Duplicate(order.id())); }
        orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn save(&self, order: &Order) -> Result<(), StoreError> {
        self.orders.write().await.insert(order.id(), order.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let mut list: Vec<Order> = self.orders.read().await.values().filter(|o| o.user_id() == user_id).cloned().collect();
        list.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(b.id().cmp(&a.id())));
        Ok(list)
    }

    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        let mut list: Vec<Order> = self.orders.read().await.values().cloned().collect();
        list.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(b.id().cmp(&a.id())));
        Ok(list)
    }
}

#[derive(Default)]
pub struct MemoryCarts {
    carts: RwLock<HashMap<Uuid, Cart>>,
}

impl MemoryCarts {
    pub fn new() -> Self { Self::default() }
    pub async fn put(&self, cart: Cart) { self.carts.write().await.insert(cart.user_id(), cart); }
}

#[async_trait]
impl CartStore for MemoryCarts {
    async fn load(&self, user_id: Uuid) -> Result<Cart, StoreError> {
        Ok(self.carts.read().await.get(&user_id).cloned().unwrap_or_else(|| Cart::for_user(user_id)))
    }

    async fn clear(&self, user_id: Uuid) -> Result<(), StoreError> {
        if let Some(cart) = self.carts.write().await.get_mut(&user_id) { cart.clear(); }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCatalog {
    products: RwLock<HashMap<Uuid, Product>>,
}

impl MemoryCatalog {
    pub fn new() -> Self { Self::default() }
    pub async fn put(&self, product: Product) { self.products.write().await.insert(product.id(), product); }
    pub async fn get(&self, id: Uuid) -> Option<Product> { self.products.read().await.get(&id).cloned() }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn stock_of(&self, product_id: Uuid, size: &str) -> Result<Option<u32>, StoreError> {
        Ok(self.products.read().await.get(&product_id).and_then(|p| p.stock_of(size)))
    }

    async fn take_stock(&self, product_id: Uuid, size: &str, qty: u32) -> Result<bool, StoreError> {
        let mut products = self.products.write().await;
        Ok(products.get_mut(&product_id).map(|p| p.take_stock(size, qty).is_ok()).unwrap_or(false))
    }

    async fn restore_stock(&self, product_id: Uuid, size: &str, qty: u32) -> Result<bool, StoreError> {
        let mut products = self.products.write().await;
        Ok(products.get_mut(&product_id).map(|p| p.restore_stock(size, qty).is_ok()).unwrap_or(false))
    }
}
