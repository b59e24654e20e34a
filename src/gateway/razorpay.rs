//! Razorpay REST client (no SDK dependency)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use crate::config::RazorpayConfig;
use crate::domain::value_objects::Money;
use super::{GatewayError, GatewayOrder, GatewayRefund, PaymentGateway};

#[derive(Clone)]
pub struct RazorpayClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

#[derive(Serialize)]
struct CreateOrderBody<'a> { amount: i64, currency: &'a str, receipt: &'a str }

#[derive(Serialize)]
struct RefundBody { amount: i64 }

#[derive(Deserialize)]
struct RefundResponse { id: String }

#[derive(Deserialize)]
struct ErrorEnvelope { error: ErrorBody }

#[derive(Deserialize)]
struct ErrorBody { description: String }

impl RazorpayClient {
    pub fn new(config: &RazorpayConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        }
    }

    pub fn key_id(&self) -> &str { &self.key_id }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(&self, path: &str, body: &B) -> Result<R, GatewayError> {
        let resp = self.http
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let message = match resp.json::<ErrorEnvelope>().await {
                Ok(envelope) => envelope.error.description,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(GatewayError::Rejected { status: status.as_u16(), message });
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    #[instrument(skip(self, amount), fields(amount = %amount))]
    async fn create_order(&self, amount: &Money, receipt: &str) -> Result<GatewayOrder, GatewayError> {
        let paise = amount.minor_units().ok_or_else(|| GatewayError::InvalidAmount(amount.clone()))?;
        let order: GatewayOrder = self
            .post("/v1/orders", &CreateOrderBody { amount: paise, currency: amount.currency(), receipt })
            .await?;
        info!(gateway_order_id = %order.id, "Razorpay order created");
        Ok(order)
    }

    #[instrument(skip(self, amount), fields(amount = %amount))]
    async fn refund(&self, payment_id: &str, amount: &Money) -> Result<GatewayRefund, GatewayError> {
        let paise = amount.minor_units().ok_or_else(|| GatewayError::InvalidAmount(amount.clone()))?;
        let refund: RefundResponse = self
            .post(&format!("/v1/payments/{payment_id}/refund"), &RefundBody { amount: paise })
            .await?;
        info!(refund_id = %refund.id, "Razorpay refund issued");
        Ok(GatewayRefund { id: refund.id })
    }
}
