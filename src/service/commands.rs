//! Typed request bodies, validated before an operation touches any state.

use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::domain::aggregates::{OrderStatus, PaymentMethod, ShippingAddress, ShippingStatus};

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct CheckoutCommand {
    #[validate]
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct VerifyPaymentCommand {
    #[validate(length(min = 1, max = 64))]
    pub razorpay_order_id: String,
    #[validate(length(min = 1, max = 64))]
    pub razorpay_payment_id: String,
    #[validate(length(min = 1, max = 128))]
    pub razorpay_signature: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct CancelOrderCommand {
    #[validate(length(min = 3, max = 500))]
    pub reason: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct ReturnOrderCommand {
    #[validate(length(min = 3, max = 500))]
    pub reason: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct UpdateStatusCommand {
    pub status: OrderStatus,
    #[serde(default)]
    #[validate(length(min = 1, max = 40))]
    pub awb_number: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 60))]
    pub courier: Option<String>,
}

impl UpdateStatusCommand {
    pub fn to(status: OrderStatus) -> Self { Self { status, awb_number: None, courier: None } }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct ShippingStatusCommand {
    pub status: ShippingStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct TrackingCommand {
    #[validate(length(min = 1, max = 40))]
    pub awb_number: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct ReturnDecisionCommand {
    pub approved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_validates_nested_address() {
        let cmd: CheckoutCommand = serde_json::from_value(serde_json::json!({
            "shipping_address": {
                "full_name": "", "phone": "9876543210", "address": "12 MG Road",
                "city": "Jaipur", "state": "Rajasthan", "postal_code": "302001"
            },
            "payment_method": "cod"
        })).unwrap();
        assert!(cmd.validate().is_err());
        assert_eq!(cmd.shipping_address.country, "India");
    }

    #[test]
    fn test_unknown_payment_method_rejected() {
        let parsed = serde_json::from_value::<CheckoutCommand>(serde_json::json!({
            "shipping_address": {
                "full_name": "Asha", "phone": "9876543210", "address": "12 MG Road",
                "city": "Jaipur", "state": "Rajasthan", "postal_code": "302001"
            },
            "payment_method": "paypal"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_blank_reason_rejected() {
        assert!(CancelOrderCommand { reason: "".into() }.validate().is_err());
        assert!(CancelOrderCommand { reason: "Changed my mind".into() }.validate().is_ok());
    }
}
