//! Order lifecycle service

mod commands;
mod lifecycle;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::config::Config;
use crate::domain::aggregates::CustomerContact;

pub use commands::{
    CancelOrderCommand, CheckoutCommand, ReturnDecisionCommand, ReturnOrderCommand, ShippingStatusCommand,
    TrackingCommand, UpdateStatusCommand, VerifyPaymentCommand,
};
pub use lifecycle::{CheckoutOutcome, OrderLifecycleManager};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> { Utc::now() }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { Customer, Admin }

/// The authenticated caller of an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Actor {
    pub fn customer(user_id: Uuid, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self { user_id, name: name.into(), email: email.into(), role: Role::Customer }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self { user_id, name: "admin".into(), email: String::new(), role: Role::Admin }
    }

    pub fn is_admin(&self) -> bool { self.role == Role::Admin }

    pub fn contact(&self) -> CustomerContact {
        CustomerContact { name: self.name.clone(), email: self.email.clone() }
    }
}

#[derive(Clone, Debug)]
pub struct LifecyclePolicy {
    pub return_window: Duration,
    pub tracking_url_template: String,
    pub default_courier: String,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            return_window: Duration::days(2),
            tracking_url_template: "https://shiprocket.co/tracking/{awb}".to_string(),
            default_courier: "Shiprocket".to_string(),
        }
    }
}

impl From<&Config> for LifecyclePolicy {
    fn from(config: &Config) -> Self {
        Self {
            return_window: Duration::days(config.return_window_days),
            tracking_url_template: config.tracking_url_template.clone(),
            default_courier: config.default_courier.clone(),
        }
    }
}
