//! Order Aggregate
//!
//! The order document is the system of record for a purchase. Money fields
//! are derived once when the order is placed and never touched again; every
//! status change goes through [`OrderStatus::apply`], and every change of any
//! kind is appended to the order's history.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;
use crate::domain::aggregates::cart::CartItem;
use crate::domain::events::{HistoryEntry, OrderEvent, StockDirection};
use crate::domain::value_objects::{Money, OrderTotals, Quantity};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    id: Uuid,
    user_id: Uuid,
    customer: CustomerContact,
    order_items: Vec<OrderItem>,
    shipping_address: ShippingAddress,
    payment_method: PaymentMethod,
    payment_result: Option<PaymentResult>,
    totals: OrderTotals,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    order_status: OrderStatus,
    tracking_number: Option<String>,
    shipping: Option<Shipping>,
    delivered_at: Option<DateTime<Utc>>,
    cancellation: Option<Cancellation>,
    return_request: Option<ReturnRequest>,
    refund: Refund,
    history: Vec<HistoryEntry>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Line item copied from the cart when the order is placed. Later catalog
/// edits never reach it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub size: String,
    pub color: Option<String>,
    pub quantity: Quantity,
    pub price: Money,
}

impl OrderItem {
    pub fn snapshot(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.name.clone(),
            image: item.image.clone(),
            size: item.size.clone(),
            color: item.color.clone(),
            quantity: item.quantity,
            price: item.unit_price.clone(),
        }
    }
    pub fn line_total(&self) -> Money { self.price.multiply(self.quantity.value()) }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    #[validate(length(min = 10, max = 15))]
    pub phone: String,
    #[validate(length(min = 1, max = 300))]
    pub address: String,
    #[validate(length(min = 1, max = 80))]
    pub city: String,
    #[validate(length(min = 1, max = 80))]
    pub state: String,
    #[validate(length(min = 6, max = 6))]
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String { "India".to_string() }

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContact { pub name: String, pub email: String }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod { Razorpay, Cod }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Processing, Confirmed, Shipped, Delivered, Cancelled, Returned }

/// Events that move an order between statuses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition { Confirm, Ship, Deliver, CustomerCancel, AdminCancel, CompleteReturn }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Returned => "returned",
        }
    }

    /// The transition table. Pairs not listed here are rejected.
    pub fn apply(self, transition: Transition) -> Option<OrderStatus> {
        use OrderStatus::*;
        use Transition::*;
        match (self, transition) {
            (Processing, Confirm) => Some(Confirmed),
            (Confirmed, Ship) => Some(Shipped),
            (Shipped, Deliver) => Some(Delivered),
            (Processing | Confirmed, CustomerCancel) => Some(Cancelled),
            (Processing | Confirmed | Shipped, AdminCancel) => Some(Cancelled),
            (Delivered, CompleteReturn) => Some(Returned),
            _ => None,
        }
    }

    /// Customers may cancel until the parcel leaves the warehouse.
    pub fn accepts_cancellation(self) -> bool {
        !matches!(self, Self::Shipped | Self::Delivered | Self::Cancelled | Self::Returned)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Confirm => "confirm",
            Self::Ship => "ship",
            Self::Deliver => "deliver",
            Self::CustomerCancel => "cancel",
            Self::AdminCancel => "cancel (admin)",
            Self::CompleteReturn => "complete return",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingStatus { #[default] Pending, Shipped, InTransit, OutForDelivery, Delivered }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shipping {
    pub courier: String,
    pub awb_number: String,
    pub status: ShippingStatus,
    pub shipped_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub tracking_url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cancellation {
    pub requested: bool,
    pub reason: String,
    pub requested_at: DateTime<Utc>,
    /// `None` while pending.
    pub approved: Option<bool>,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub requested: bool,
    pub reason: String,
    pub requested_at: DateTime<Utc>,
    pub approved: Option<bool>,
    pub decided_at: Option<DateTime<Utc>>,
    pub pickup_completed: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    #[default]
    #[serde(rename = "none")]
    NotIssued,
    Initiated,
    Completed,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Refund {
    pub status: RefundStatus,
    pub amount: Option<Money>,
    pub external_refund_id: Option<String>,
    pub refunded_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentResultStatus { Created, Paid, Refunded }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub gateway_order_id: String,
    pub payment_id: Option<String>,
    pub status: PaymentResultStatus,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn place(
        user_id: Uuid,
        customer: CustomerContact,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        let first = items.first().ok_or(OrderError::NoItems)?;
        let items_price = items
            .iter()
            .try_fold(Money::zero(first.price.currency()), |acc, i| acc.add(&i.line_total()))
            .map_err(|_| OrderError::MixedCurrency)?;
        let totals = OrderTotals::from_items_price(items_price);
        let order_status = match payment_method {
            PaymentMethod::Cod => OrderStatus::Confirmed,
            PaymentMethod::Razorpay => OrderStatus::Processing,
        };
        let mut order = Self {
            id: Uuid::now_v7(), user_id, customer, order_items: items, shipping_address, payment_method,
            payment_result: None, is_paid: false, paid_at: None, order_status, tracking_number: None,
            shipping: None, delivered_at: None, cancellation: None, return_request: None,
            refund: Refund::default(), history: vec![], created_at: now, updated_at: now,
            totals,
        };
        order.record(OrderEvent::Placed { total: order.totals.total_price.clone() }, now);
        Ok(order)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn customer(&self) -> &CustomerContact { &self.customer }
    pub fn items(&self) -> &[OrderItem] { &self.order_items }
    pub fn shipping_address(&self) -> &ShippingAddress { &self.shipping_address }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn payment_result(&self) -> Option<&PaymentResult> { self.payment_result.as_ref() }
    pub fn totals(&self) -> &OrderTotals { &self.totals }
    pub fn total_price(&self) -> &Money { &self.totals.total_price }
    pub fn is_paid(&self) -> bool { self.is_paid }
    pub fn paid_at(&self) -> Option<DateTime<Utc>> { self.paid_at }
    pub fn status(&self) -> OrderStatus { self.order_status }
    pub fn tracking_number(&self) -> Option<&str> { self.tracking_number.as_deref() }
    pub fn shipping(&self) -> Option<&Shipping> { self.shipping.as_ref() }
    pub fn delivered_at(&self) -> Option<DateTime<Utc>> { self.delivered_at }
    pub fn cancellation(&self) -> Option<&Cancellation> { self.cancellation.as_ref() }
    pub fn return_request(&self) -> Option<&ReturnRequest> { self.return_request.as_ref() }
    pub fn refund(&self) -> &Refund { &self.refund }
    pub fn history(&self) -> &[HistoryEntry] { &self.history }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn gateway_payment_id(&self) -> Option<&str> {
        self.payment_result.as_ref().and_then(|p| p.payment_id.as_deref())
    }

    pub fn ensure_owned_by(&self, user_id: Uuid) -> Result<(), OrderError> {
        if self.user_id == user_id { Ok(()) } else { Err(OrderError::NotOwner) }
    }

    pub fn attach_gateway_order(&mut self, gateway_order_id: impl Into<String>, now: DateTime<Utc>) -> Result<(), OrderError> {
        if self.payment_method != PaymentMethod::Razorpay { return Err(OrderError::NotGatewayPayment); }
        let gateway_order_id = gateway_order_id.into();
        self.payment_result = Some(PaymentResult {
            gateway_order_id: gateway_order_id.clone(), payment_id: None,
            status: PaymentResultStatus::Created, updated_at: now,
        });
        self.record(OrderEvent::GatewayOrderCreated { gateway_order_id }, now);
        Ok(())
    }

    /// Marks a gateway order paid. The caller has already checked the
    /// gateway signature.
    ///
    /// A payment that lands after the customer cancelled is still recorded,
    /// but the order stays cancelled and its stock untouched; the caller
    /// owes the customer a refund (see [`Order::paid_after_cancellation`]).
    pub fn confirm_payment(&mut self, gateway_order_id: &str, payment_id: &str, now: DateTime<Utc>) -> Result<(), OrderError> {
        if self.payment_method != PaymentMethod::Razorpay { return Err(OrderError::NotGatewayPayment); }
        if self.is_paid { return Err(OrderError::AlreadyPaid); }
        match &self.payment_result {
            Some(p) if p.gateway_order_id == gateway_order_id => {}
            _ => return Err(OrderError::GatewayOrderMismatch),
        }
        if self.order_status != OrderStatus::Cancelled {
            self.transition(Transition::Confirm, now)?;
        }
        self.is_paid = true;
        self.paid_at = Some(now);
        if let Some(p) = self.payment_result.as_mut() {
            p.payment_id = Some(payment_id.to_string());
            p.status = PaymentResultStatus::Paid;
            p.updated_at = now;
        }
        self.record(OrderEvent::Paid { payment_id: payment_id.to_string() }, now);
        Ok(())
    }

    pub fn confirm(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.transition(Transition::Confirm, now).map(|_| ())
    }

    pub fn set_tracking_number(&mut self, awb: impl Into<String>, now: DateTime<Utc>) {
        let awb_number = awb.into();
        self.tracking_number = Some(awb_number.clone());
        self.record(OrderEvent::TrackingNumberSet { awb_number }, now);
    }

    /// Hands the parcel to a courier. Without an explicit AWB the stored
    /// tracking number is used.
    pub fn ship(&mut self, awb: Option<String>, courier: impl Into<String>, tracking_url_template: &str, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.check(Transition::Ship)?;
        let awb = awb
            .filter(|a| !a.trim().is_empty())
            .or_else(|| self.tracking_number.clone())
            .or_else(|| self.shipping.as_ref().map(|s| s.awb_number.clone()))
            .ok_or(OrderError::MissingAwb)?;
        self.transition(Transition::Ship, now)?;
        self.shipping = Some(Shipping {
            courier: courier.into(),
            tracking_url: tracking_url_template.replace("{awb}", &awb),
            awb_number: awb.clone(),
            status: ShippingStatus::Shipped,
            shipped_at: now,
            delivered_at: None,
        });
        self.tracking_number = Some(awb);
        Ok(())
    }

    pub fn mark_delivered(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        if self.order_status == OrderStatus::Delivered { return Err(OrderError::AlreadyDelivered); }
        self.transition(Transition::Deliver, now)?;
        self.delivered_at = Some(now);
        if let Some(shipping) = self.shipping.as_mut() {
            shipping.delivered_at = Some(now);
            shipping.status = ShippingStatus::Delivered;
        }
        Ok(())
    }

    /// Courier-side progress. Returns true when the update delivered the order.
    pub fn update_shipping_status(&mut self, status: ShippingStatus, now: DateTime<Utc>) -> Result<bool, OrderError> {
        if self.order_status == OrderStatus::Delivered { return Err(OrderError::AlreadyDelivered); }
        if self.order_status != OrderStatus::Shipped || self.shipping.is_none() {
            return Err(OrderError::NotShipped(self.order_status));
        }
        if status == ShippingStatus::Delivered {
            self.mark_delivered(now)?;
            return Ok(true);
        }
        if let Some(shipping) = self.shipping.as_mut() { shipping.status = status; }
        self.record(OrderEvent::ShippingUpdated { status }, now);
        Ok(false)
    }

    pub fn admin_cancel(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.transition(Transition::AdminCancel, now).map(|_| ())
    }

    /// Customer cancellation. Requests are approved on the spot.
    pub fn request_cancellation(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<(), OrderError> {
        if !self.order_status.accepts_cancellation() { return Err(OrderError::CancellationClosed(self.order_status)); }
        if self.cancellation.is_some() { return Err(OrderError::CancellationAlreadyRequested); }
        self.transition(Transition::CustomerCancel, now)?;
        let reason = reason.into();
        self.cancellation = Some(Cancellation {
            requested: true, reason: reason.clone(), requested_at: now,
            approved: Some(true), decided_at: Some(now),
        });
        self.record(OrderEvent::CancellationRequested { reason }, now);
        Ok(())
    }

    pub fn request_return(&mut self, reason: impl Into<String>, window: Duration, now: DateTime<Utc>) -> Result<(), OrderError> {
        if self.order_status != OrderStatus::Delivered { return Err(OrderError::ReturnNotDelivered(self.order_status)); }
        if self.return_request.is_some() { return Err(OrderError::ReturnAlreadyRequested); }
        let delivered_at = self.delivered_at
            .or_else(|| self.shipping.as_ref().and_then(|s| s.delivered_at))
            .ok_or(OrderError::ReturnNotDelivered(self.order_status))?;
        if now - delivered_at > window { return Err(OrderError::ReturnWindowExpired); }
        let reason = reason.into();
        self.return_request = Some(ReturnRequest {
            requested: true, reason: reason.clone(), requested_at: now,
            approved: None, decided_at: None, pickup_completed: false,
        });
        self.record(OrderEvent::ReturnRequested { reason }, now);
        Ok(())
    }

    pub fn decide_return(&mut self, approved: bool, now: DateTime<Utc>) -> Result<(), OrderError> {
        let request = self.return_request.as_mut().ok_or(OrderError::NoReturnRequest)?;
        if request.approved.is_some() { return Err(OrderError::ReturnAlreadyDecided); }
        request.approved = Some(approved);
        request.decided_at = Some(now);
        self.record(OrderEvent::ReturnDecided { approved }, now);
        Ok(())
    }

    pub fn complete_pickup(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        let request = self.return_request.as_ref().ok_or(OrderError::NoReturnRequest)?;
        if request.approved != Some(true) { return Err(OrderError::ReturnNotApproved); }
        self.check(Transition::CompleteReturn)?;
        if let Some(request) = self.return_request.as_mut() { request.pickup_completed = true; }
        self.record(OrderEvent::PickupCompleted, now);
        self.transition(Transition::CompleteReturn, now).map(|_| ())
    }

    /// Stock is taken at placement for COD and at payment for gateway orders.
    /// A payment captured after cancellation never took stock.
    pub fn stock_committed(&self) -> bool {
        self.payment_method == PaymentMethod::Cod || (self.is_paid && !self.paid_after_cancellation())
    }

    /// True when the gateway reported the payment only after the customer cancelled.
    pub fn paid_after_cancellation(&self) -> bool {
        let position = |wanted: fn(&OrderEvent) -> bool| self.history.iter().position(|h| wanted(&h.event));
        let cancelled = position(|e| matches!(e, OrderEvent::CancellationRequested { .. }));
        let paid = position(|e| matches!(e, OrderEvent::Paid { .. }));
        matches!((cancelled, paid), (Some(c), Some(p)) if p > c)
    }

    /// True when money was captured online and has not been returned yet.
    pub fn refund_due(&self) -> bool {
        self.is_paid && self.payment_method == PaymentMethod::Razorpay && self.refund.status != RefundStatus::Completed
    }

    /// Checks an operator refund can go ahead and returns the payment to refund.
    pub fn manual_refund_target(&self) -> Result<String, OrderError> {
        if self.refund.status == RefundStatus::Completed { return Err(OrderError::RefundAlreadyCompleted); }
        if !self.is_paid { return Err(OrderError::NotRefundable("order is not paid")); }
        if self.payment_method != PaymentMethod::Razorpay { return Err(OrderError::NotRefundable("order was not paid online")); }
        self.gateway_payment_id()
            .map(str::to_string)
            .ok_or(OrderError::NotRefundable("no gateway payment on record"))
    }

    pub fn mark_refund_initiated(&mut self, now: DateTime<Utc>) {
        let amount = self.totals.total_price.clone();
        self.refund.status = RefundStatus::Initiated;
        self.refund.amount = Some(amount.clone());
        self.record(OrderEvent::RefundInitiated { amount }, now);
    }

    pub fn record_refund(&mut self, refund_id: impl Into<String>, now: DateTime<Utc>) {
        let amount = self.totals.total_price.clone();
        let refund_id = refund_id.into();
        self.refund = Refund {
            status: RefundStatus::Completed, amount: Some(amount.clone()),
            external_refund_id: Some(refund_id.clone()), refunded_at: Some(now),
        };
        if let Some(p) = self.payment_result.as_mut() {
            p.status = PaymentResultStatus::Refunded;
            p.updated_at = now;
        }
        self.record(OrderEvent::Refunded { amount, refund_id }, now);
    }

    pub fn record_stock_reconciliation(&mut self, item: &OrderItem, direction: StockDirection, now: DateTime<Utc>) {
        self.record(OrderEvent::StockReconciliation {
            product_id: item.product_id, size: item.size.clone(),
            quantity: item.quantity.value(), direction,
        }, now);
    }

    fn check(&self, transition: Transition) -> Result<OrderStatus, OrderError> {
        self.order_status
            .apply(transition)
            .ok_or(OrderError::InvalidTransition { from: self.order_status, transition })
    }

    fn transition(&mut self, transition: Transition, now: DateTime<Utc>) -> Result<OrderStatus, OrderError> {
        let next = self.check(transition)?;
        let from = std::mem::replace(&mut self.order_status, next);
        self.record(OrderEvent::StatusChanged { from, to: next }, now);
        Ok(from)
    }

    fn record(&mut self, event: OrderEvent, now: DateTime<Utc>) {
        self.history.push(HistoryEntry { at: now, event });
        self.touch(now);
    }

    fn touch(&mut self, now: DateTime<Utc>) { self.updated_at = now; }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Order has no items")]
    NoItems,
    #[error("Order items use different currencies")]
    MixedCurrency,
    #[error("Order belongs to another customer")]
    NotOwner,
    #[error("Cannot {transition} an order that is {from}")]
    InvalidTransition { from: OrderStatus, transition: Transition },
    #[error("Order is already delivered")]
    AlreadyDelivered,
    #[error("Order is already paid")]
    AlreadyPaid,
    #[error("Order is not an online payment order")]
    NotGatewayPayment,
    #[error("Payment does not belong to this order")]
    GatewayOrderMismatch,
    #[error("Order can no longer be cancelled (status: {0})")]
    CancellationClosed(OrderStatus),
    #[error("Cancellation already requested")]
    CancellationAlreadyRequested,
    #[error("Only delivered orders can be returned (status: {0})")]
    ReturnNotDelivered(OrderStatus),
    #[error("Return already requested")]
    ReturnAlreadyRequested,
    #[error("Return window has expired")]
    ReturnWindowExpired,
    #[error("No return request on this order")]
    NoReturnRequest,
    #[error("Return request already decided")]
    ReturnAlreadyDecided,
    #[error("Return request is not approved")]
    ReturnNotApproved,
    #[error("AWB number is required to ship")]
    MissingAwb,
    #[error("Order is not in transit (status: {0})")]
    NotShipped(OrderStatus),
    #[error("Refund already completed")]
    RefundAlreadyCompleted,
    #[error("Order cannot be refunded: {0}")]
    NotRefundable(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(price: i64, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: Uuid::new_v4(), name: "Anarkali Kurta".into(), image: None, size: "M".into(),
            color: Some("Maroon".into()), quantity: Quantity::new(quantity).unwrap(), price: Money::rupees(price),
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap() }

    fn place(method: PaymentMethod, items: Vec<OrderItem>) -> Order {
        Order::place(Uuid::new_v4(), CustomerContact::default(), items, ShippingAddress::default(), method, at(1, 9)).unwrap()
    }

    fn delivered_cod() -> Order {
        let mut order = place(PaymentMethod::Cod, vec![item(600, 2)]);
        order.ship(Some("AWB1".into()), "Delhivery", "https://t/{awb}", at(2, 9)).unwrap();
        order.mark_delivered(at(4, 12)).unwrap();
        order
    }

    #[test]
    fn test_place_derives_totals() {
        let order = place(PaymentMethod::Cod, vec![item(600, 2)]);
        assert_eq!(order.status(), OrderStatus::Confirmed);
        assert_eq!(order.totals().items_price, Money::rupees(1200));
        assert_eq!(order.total_price(), &Money::rupees(1260));
        assert!(order.totals().is_consistent());

        let order = place(PaymentMethod::Razorpay, vec![item(400, 2)]);
        assert_eq!(order.status(), OrderStatus::Processing);
        assert_eq!(order.totals().shipping_price, Money::rupees(99));
        assert!(!order.is_paid());
    }

    #[test]
    fn test_place_rejects_empty() {
        let err = Order::place(Uuid::new_v4(), CustomerContact::default(), vec![], ShippingAddress::default(), PaymentMethod::Cod, at(1, 9));
        assert_eq!(err.unwrap_err(), OrderError::NoItems);
    }

    #[test]
    fn test_transition_table() {
        use OrderStatus::*;
        use Transition::*;
        assert_eq!(Processing.apply(Confirm), Some(Confirmed));
        assert_eq!(Confirmed.apply(Ship), Some(Shipped));
        assert_eq!(Shipped.apply(Deliver), Some(Delivered));
        assert_eq!(Delivered.apply(CompleteReturn), Some(Returned));
        assert_eq!(Shipped.apply(AdminCancel), Some(Cancelled));
        assert_eq!(Shipped.apply(CustomerCancel), None);
        assert_eq!(Processing.apply(Ship), None);
        assert_eq!(Cancelled.apply(Confirm), None);
        assert_eq!(Returned.apply(Deliver), None);
    }

    #[test]
    fn test_confirm_payment_requires_matching_gateway_order() {
        let mut order = place(PaymentMethod::Razorpay, vec![item(800, 1)]);
        order.attach_gateway_order("order_abc", at(1, 9)).unwrap();
        assert_eq!(order.confirm_payment("order_other", "pay_1", at(1, 10)), Err(OrderError::GatewayOrderMismatch));
        assert!(!order.is_paid());
        order.confirm_payment("order_abc", "pay_1", at(1, 10)).unwrap();
        assert!(order.is_paid());
        assert_eq!(order.paid_at(), Some(at(1, 10)));
        assert_eq!(order.status(), OrderStatus::Confirmed);
        assert_eq!(order.confirm_payment("order_abc", "pay_1", at(1, 11)), Err(OrderError::AlreadyPaid));
        assert_eq!(order.paid_at(), Some(at(1, 10)));
    }

    #[test]
    fn test_ship_falls_back_to_stored_tracking_number() {
        let mut order = place(PaymentMethod::Cod, vec![item(500, 1)]);
        assert_eq!(order.ship(None, "Delhivery", "https://t/{awb}", at(2, 9)), Err(OrderError::MissingAwb));
        assert_eq!(order.status(), OrderStatus::Confirmed);
        order.set_tracking_number("AWB42", at(2, 8));
        order.ship(None, "Delhivery", "https://t/{awb}", at(2, 9)).unwrap();
        let shipping = order.shipping().unwrap();
        assert_eq!(shipping.awb_number, "AWB42");
        assert_eq!(shipping.tracking_url, "https://t/AWB42");
        assert_eq!(shipping.status, ShippingStatus::Shipped);
    }

    #[test]
    fn test_payment_after_cancellation_is_recorded_without_reopening() {
        let mut order = place(PaymentMethod::Razorpay, vec![item(800, 1)]);
        order.attach_gateway_order("order_abc", at(1, 9)).unwrap();
        order.request_cancellation("Found it cheaper", at(1, 10)).unwrap();
        assert!(!order.refund_due());

        order.confirm_payment("order_abc", "pay_late", at(1, 11)).unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert!(order.is_paid());
        assert_eq!(order.gateway_payment_id(), Some("pay_late"));
        assert_eq!(order.payment_result().unwrap().status, PaymentResultStatus::Paid);
        assert!(order.paid_after_cancellation());
        assert!(!order.stock_committed());
        assert!(order.refund_due());
        assert_eq!(order.confirm_payment("order_abc", "pay_late", at(1, 12)), Err(OrderError::AlreadyPaid));
    }

    #[test]
    fn test_tracking_number_is_in_history() {
        let mut order = place(PaymentMethod::Cod, vec![item(500, 1)]);
        order.set_tracking_number("SR42", at(2, 8));
        assert_eq!(order.tracking_number(), Some("SR42"));
        assert_eq!(order.history().last().unwrap().event, OrderEvent::TrackingNumberSet { awb_number: "SR42".into() });
        assert_eq!(order.updated_at(), at(2, 8));
    }

    #[test]
    fn test_mark_delivered_twice() {
        let mut order = delivered_cod();
        assert_eq!(order.delivered_at(), Some(at(4, 12)));
        assert_eq!(order.shipping().unwrap().status, ShippingStatus::Delivered);
        assert_eq!(order.mark_delivered(at(5, 9)), Err(OrderError::AlreadyDelivered));
        assert_eq!(order.delivered_at(), Some(at(4, 12)));
    }

    #[test]
    fn test_shipping_status_delivered_forces_order_status() {
        let mut order = place(PaymentMethod::Cod, vec![item(500, 1)]);
        assert_eq!(order.update_shipping_status(ShippingStatus::InTransit, at(2, 9)), Err(OrderError::NotShipped(OrderStatus::Confirmed)));
        order.ship(Some("AWB1".into()), "Delhivery", "https://t/{awb}", at(2, 9)).unwrap();
        assert!(!order.update_shipping_status(ShippingStatus::OutForDelivery, at(3, 9)).unwrap());
        assert_eq!(order.status(), OrderStatus::Shipped);
        assert!(order.update_shipping_status(ShippingStatus::Delivered, at(3, 15)).unwrap());
        assert_eq!(order.status(), OrderStatus::Delivered);
        assert_eq!(order.shipping().unwrap().delivered_at, Some(at(3, 15)));
    }

    #[test]
    fn test_cancellation_window() {
        let mut order = place(PaymentMethod::Razorpay, vec![item(500, 1)]);
        order.request_cancellation("Ordered wrong size", at(1, 10)).unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.cancellation().unwrap().approved, Some(true));

        let mut shipped = place(PaymentMethod::Cod, vec![item(500, 1)]);
        shipped.ship(Some("AWB1".into()), "Delhivery", "https://t/{awb}", at(2, 9)).unwrap();
        assert_eq!(shipped.request_cancellation("late", at(2, 10)), Err(OrderError::CancellationClosed(OrderStatus::Shipped)));
        assert!(shipped.cancellation().is_none());
    }

    #[test]
    fn test_return_window_boundary() {
        let window = Duration::days(2);
        let mut order = delivered_cod();
        // delivered at 4th 12:00; 2.1 days later is 6th 14:24
        let late = at(6, 12) + Duration::minutes(144);
        assert_eq!(order.request_return("Colour differs", window, late), Err(OrderError::ReturnWindowExpired));
        order.request_return("Colour differs", window, at(6, 12)).unwrap();
        assert_eq!(order.return_request().unwrap().approved, None);
        assert_eq!(order.request_return("again", window, at(6, 12)), Err(OrderError::ReturnAlreadyRequested));
    }

    #[test]
    fn test_return_pickup_requires_approval() {
        let mut order = delivered_cod();
        assert_eq!(order.complete_pickup(at(5, 9)), Err(OrderError::NoReturnRequest));
        order.request_return("Too long", Duration::days(2), at(5, 9)).unwrap();
        assert_eq!(order.complete_pickup(at(5, 10)), Err(OrderError::ReturnNotApproved));
        order.decide_return(false, at(5, 10)).unwrap();
        assert_eq!(order.decide_return(true, at(5, 11)), Err(OrderError::ReturnAlreadyDecided));
        assert_eq!(order.complete_pickup(at(5, 12)), Err(OrderError::ReturnNotApproved));
        assert_eq!(order.status(), OrderStatus::Delivered);
    }

    #[test]
    fn test_refund_bookkeeping() {
        let mut order = place(PaymentMethod::Razorpay, vec![item(800, 1)]);
        assert_eq!(order.manual_refund_target(), Err(OrderError::NotRefundable("order is not paid")));
        order.attach_gateway_order("order_abc", at(1, 9)).unwrap();
        order.confirm_payment("order_abc", "pay_1", at(1, 10)).unwrap();
        assert!(order.refund_due());
        order.mark_refund_initiated(at(1, 11));
        assert_eq!(order.refund().status, RefundStatus::Initiated);
        assert_eq!(order.manual_refund_target().unwrap(), "pay_1");
        order.record_refund("rfnd_1", at(1, 12));
        assert_eq!(order.refund().status, RefundStatus::Completed);
        assert_eq!(order.payment_result().unwrap().status, PaymentResultStatus::Refunded);
        assert_eq!(order.total_price(), &Money::rupees(939));
        assert!(!order.refund_due());
        assert_eq!(order.manual_refund_target(), Err(OrderError::RefundAlreadyCompleted));
    }

    #[test]
    fn test_history_is_appended() {
        let mut order = place(PaymentMethod::Cod, vec![item(500, 1)]);
        order.admin_cancel(at(1, 10)).unwrap();
        let last = &order.history().last().unwrap().event;
        assert_eq!(last, &OrderEvent::StatusChanged { from: OrderStatus::Confirmed, to: OrderStatus::Cancelled });
    }

    #[test]
    fn test_document_round_trip_keeps_status() {
        let order = delivered_cod();
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["order_status"], "delivered");
        assert_eq!(json["refund"]["status"], "none");
        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back.status(), OrderStatus::Delivered);
    }
}
