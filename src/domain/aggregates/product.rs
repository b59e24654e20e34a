//! Product Aggregate
//!
//! Only the parts of a catalog product the order lifecycle touches: per-size
//! stock and the `sold` counter.

use uuid::Uuid;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::domain::aggregates::cart::CartItem;
use crate::domain::value_objects::{Money, Quantity};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    id: Uuid,
    name: String,
    image: Option<String>,
    price: Money,
    sizes: Vec<SizeStock>,
    sold: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeStock { pub size: String, pub stock: u32 }

impl Product {
    pub fn create(name: impl Into<String>, price: Money) -> Self {
        Self { id: Uuid::now_v7(), name: name.into(), image: None, price, sizes: vec![], sold: 0 }
    }

    pub fn with_size(mut self, size: impl Into<String>, stock: u32) -> Self {
        self.sizes.push(SizeStock { size: size.into(), stock });
        self
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn sold(&self) -> u32 { self.sold }
    pub fn stock_of(&self, size: &str) -> Option<u32> { self.sizes.iter().find(|s| s.size == size).map(|s| s.stock) }

    /// Conditional decrement: applies only when the size exists with enough stock.
    pub fn take_stock(&mut self, size: &str, qty: u32) -> Result<(), ProductError> {
        let entry = self.sizes.iter_mut().find(|s| s.size == size).ok_or(ProductError::UnknownSize)?;
        if entry.stock < qty { return Err(ProductError::InsufficientInventory); }
        entry.stock -= qty;
        self.sold = self.sold.saturating_add(qty);
        Ok(())
    }

    pub fn restore_stock(&mut self, size: &str, qty: u32) -> Result<(), ProductError> {
        let entry = self.sizes.iter_mut().find(|s| s.size == size).ok_or(ProductError::UnknownSize)?;
        entry.stock = entry.stock.saturating_add(qty);
        self.sold = self.sold.saturating_sub(qty);
        Ok(())
    }

    pub fn cart_item(&self, size: &str, color: Option<&str>, quantity: Quantity) -> CartItem {
        CartItem {
            product_id: self.id, name: self.name.clone(), image: self.image.clone(), size: size.to_string(),
            color: color.map(str::to_string), quantity, unit_price: self.price.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("Size not offered")]
    UnknownSize,
    #[error("Insufficient inventory")]
    InsufficientInventory,
}
