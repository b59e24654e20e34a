//! Kurta Orders
//!
//! Order lifecycle service for an ethnic-fashion storefront.
//!
//! ## Features
//! - Checkout from cart (cash on delivery or Razorpay)
//! - Payment signature verification
//! - Shipping, delivery and courier tracking
//! - Customer cancellation with automatic refund
//! - Admin-gated returns with pickup and refund
//! - Manual refund recovery for failed automatic refunds

pub mod api;
pub mod config;
pub mod domain;
pub mod gateway;
pub mod notify;
pub mod service;
pub mod store;

use thiserror::Error;
use uuid::Uuid;

pub use domain::aggregates::{Order, OrderError, OrderStatus};
pub use service::OrderLifecycleManager;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Order not found")]
    OrderNotFound(Uuid),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Insufficient stock for {product} in size {size}")]
    InsufficientStock { product: String, size: String },

    #[error("Payment verification failed")]
    InvalidSignature,

    #[error("Admin access required")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Gateway(#[from] gateway::GatewayError),

    #[error("Storage error: {0}")]
    Storage(#[from] store::StoreError),
}

impl From<validator::ValidationErrors> for LifecycleError {
    fn from(errors: validator::ValidationErrors) -> Self {
        LifecycleError::Validation(errors.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
