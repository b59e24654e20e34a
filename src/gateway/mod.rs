//! Payment gateway seam
//!
//! The lifecycle manager only needs two calls from a gateway: open a payment
//! order for a checkout and refund a captured payment. Signature checks for
//! completed payments live in [`signature`].

pub mod razorpay;
pub mod signature;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::domain::value_objects::Money;

pub use razorpay::RazorpayClient;
pub use signature::SignatureVerifier;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    /// In minor units (paise).
    pub amount: i64,
    pub currency: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GatewayRefund {
    pub id: String,
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Amount {0} cannot be charged")]
    InvalidAmount(Money),

    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, amount: &Money, receipt: &str) -> Result<GatewayOrder, GatewayError>;
    async fn refund(&self, payment_id: &str, amount: &Money) -> Result<GatewayRefund, GatewayError>;
}
