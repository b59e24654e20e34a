//! Domain events
//!
//! Every change an order goes through is appended to its history as one of
//! these. The history is append-only and travels with the order document.
use crate::domain::aggregates::order::{OrderStatus, ShippingStatus};
use crate::domain::value_objects::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { total: Money },
    GatewayOrderCreated { gateway_order_id: String },
    Paid { payment_id: String },
    StatusChanged { from: OrderStatus, to: OrderStatus },
    ShippingUpdated { status: ShippingStatus },
    TrackingNumberSet { awb_number: String },
    CancellationRequested { reason: String },
    ReturnRequested { reason: String },
    ReturnDecided { approved: bool },
    PickupCompleted,
    RefundInitiated { amount: Money },
    Refunded { amount: Money, refund_id: String },
    /// A per-line stock adjustment that did not apply and needs an operator.
    StockReconciliation { product_id: Uuid, size: String, quantity: u32, direction: StockDirection },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockDirection { Take, Restore }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub event: OrderEvent,
}
