//! Cart Aggregate
//!
//! The order lifecycle only reads a cart once, at checkout, and then clears it.

use uuid::Uuid;
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{Money, Quantity};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Cart {
    user_id: Uuid,
    items: Vec<CartItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub size: String,
    pub color: Option<String>,
    pub quantity: Quantity,
    pub unit_price: Money,
}

impl CartItem {
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity.value()) }
}

impl Cart {
    pub fn for_user(user_id: Uuid) -> Self { Self { user_id, items: vec![] } }

    pub fn with_items(user_id: Uuid, items: Vec<CartItem>) -> Self {
        let mut cart = Self::for_user(user_id);
        for item in items { cart.add_item(item); }
        cart
    }

    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Lines for the same product, size and colour are merged.
    pub fn add_item(&mut self, item: CartItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id && i.size == item.size && i.color == item.color) {
            let merged = existing.quantity.value().saturating_add(item.quantity.value());
            existing.quantity = Quantity::new(merged).unwrap_or(existing.quantity);
        } else {
            self.items.push(item);
        }
    }

    pub fn clear(&mut self) { self.items.clear(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn kurta(size: &str, quantity: u32) -> CartItem {
        CartItem {
            product_id: Uuid::nil(), name: "Chikankari Kurta".into(), image: None, size: size.into(),
            color: None, quantity: Quantity::new(quantity).unwrap(), unit_price: Money::rupees(750),
        }
    }
    #[test]
    fn test_cart_operations() {
        let mut cart = Cart::for_user(Uuid::new_v4());
        cart.add_item(kurta("M", 2));
        assert_eq!(cart.items()[0].line_total(), Money::rupees(1500));
        cart.add_item(kurta("M", 1));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity.value(), 3); // Merged
        cart.add_item(kurta("L", 1));
        assert_eq!(cart.items().len(), 2);
        cart.clear();
        assert!(cart.is_empty());
    }
}
