//! Customer notifications
//!
//! Notifications are fire-and-forget: [`dispatch`] spawns the send and only
//! logs a failure. Nothing in the order lifecycle waits on an email.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;
use crate::domain::aggregates::{Order, RefundStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind { OrderConfirmed, Shipped, Cancelled, Refunded }

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderConfirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub order_id: Uuid,
    pub email: String,
    pub name: String,
    pub refund_status: RefundStatus,
    pub order: Order,
}

impl Notification {
    pub fn for_order(kind: NotificationKind, order: &Order) -> Self {
        Self {
            kind,
            order_id: order.id(),
            email: order.customer().email.clone(),
            name: order.customer().name.clone(),
            refund_status: order.refund().status,
            order: order.clone(),
        }
    }
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Failed to publish notification: {0}")]
    Publish(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Publishes notifications to NATS for the mail worker.
#[derive(Clone)]
pub struct NatsNotifier {
    client: async_nats::Client,
    subject_prefix: String,
}

impl NatsNotifier {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client, subject_prefix: "notifications.order".to_string() }
    }
}

#[async_trait]
impl Notifier for NatsNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        let subject = format!("{}.{}", self.subject_prefix, notification.kind.as_str());
        let payload = serde_json::to_vec(&notification)?;
        self.client
            .publish(subject, payload.into())
            .await
            .map_err(|e| NotifyError::Publish(e.to_string()))
    }
}

/// Used when no message bus is configured.
#[derive(Clone, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        info!(order_id = %notification.order_id, kind = notification.kind.as_str(), email = %notification.email, "Notification");
        Ok(())
    }
}

pub fn dispatch(notifier: &Arc<dyn Notifier>, kind: NotificationKind, order: &Order) {
    let notifier = Arc::clone(notifier);
    let notification = Notification::for_order(kind, order);
    tokio::spawn(async move {
        let order_id = notification.order_id;
        if let Err(e) = notifier.send(notification).await {
            warn!(%order_id, kind = kind.as_str(), error = %e, "Notification failed");
        }
    });
}
