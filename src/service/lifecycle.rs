use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{Order, OrderItem, OrderStatus, PaymentMethod, RefundStatus};
use crate::domain::events::StockDirection;
use crate::gateway::{GatewayOrder, PaymentGateway, SignatureVerifier};
use crate::notify::{self, NotificationKind, Notifier};
use crate::store::{CartStore, CatalogStore, OrderRepository};
use crate::{LifecycleError, Result};

use super::{
    Actor, CancelOrderCommand, CheckoutCommand, Clock, LifecyclePolicy, ReturnDecisionCommand, ReturnOrderCommand,
    ShippingStatusCommand, SystemClock, TrackingCommand, UpdateStatusCommand, VerifyPaymentCommand,
};

#[derive(Debug, Serialize)]
pub struct CheckoutOutcome {
    pub order: Order,
    /// Present for gateway checkouts; the client completes payment against it.
    pub gateway_order: Option<GatewayOrder>,
}

/// Owns every state change of an order after it leaves the cart.
///
/// Each operation loads the order document, mutates it in memory and writes
/// it back. Stock adjustments run after the status write, one conditional
/// update per line; lines that fail are recorded on the order for
/// reconciliation instead of being rolled back.
pub struct OrderLifecycleManager {
    orders: Arc<dyn OrderRepository>,
    carts: Arc<dyn CartStore>,
    catalog: Arc<dyn CatalogStore>,
    gateway: Arc<dyn PaymentGateway>,
    signatures: SignatureVerifier,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    policy: LifecyclePolicy,
}

impl OrderLifecycleManager {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        carts: Arc<dyn CartStore>,
        catalog: Arc<dyn CatalogStore>,
        gateway: Arc<dyn PaymentGateway>,
        signatures: SignatureVerifier,
        notifier: Arc<dyn Notifier>,
        policy: LifecyclePolicy,
    ) -> Self {
        Self { orders, carts, catalog, gateway, signatures, notifier, clock: Arc::new(SystemClock), policy }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Turns the caller's cart into an order.
    #[instrument(skip(self, actor, cmd), fields(user_id = %actor.user_id, method = ?cmd.payment_method))]
    pub async fn checkout(&self, actor: &Actor, cmd: CheckoutCommand) -> Result<CheckoutOutcome> {
        cmd.validate()?;
        let cart = self.carts.load(actor.user_id).await?;
        if cart.is_empty() {
            return Err(LifecycleError::EmptyCart);
        }
        let items = cart.items().iter().map(OrderItem::snapshot).collect();
        let now = self.clock.now();
        let mut order = Order::place(actor.user_id, actor.contact(), items, cmd.shipping_address, cmd.payment_method, now)?;

        let gateway_order = match order.payment_method() {
            PaymentMethod::Cod => {
                self.ensure_stock(&order).await?;
                self.orders.insert(&order).await?;
                self.adjust_stock(&mut order, StockDirection::Take).await?;
                None
            }
            PaymentMethod::Razorpay => {
                let gateway_order = self.gateway.create_order(order.total_price(), &order.id().to_string()).await?;
                order.attach_gateway_order(gateway_order.id.clone(), now)?;
                self.orders.insert(&order).await?;
                Some(gateway_order)
            }
        };

        // Gateway carts are cleared before payment completes; an abandoned
        // payment leaves the customer with an empty cart and a processing order.
        if let Err(e) = self.carts.clear(actor.user_id).await {
            error!(order_id = %order.id(), error = %e, "Failed to clear cart after checkout");
        }
        if order.payment_method() == PaymentMethod::Cod {
            notify::dispatch(&self.notifier, NotificationKind::OrderConfirmed, &order);
        }
        info!(order_id = %order.id(), total = %order.total_price(), status = %order.status(), "Order placed");
        Ok(CheckoutOutcome { order, gateway_order })
    }

    /// Confirms a gateway payment from the signature the client got back.
    #[instrument(skip(self, actor, cmd), fields(order_id = %order_id))]
    pub async fn verify_payment(&self, actor: &Actor, order_id: Uuid, cmd: VerifyPaymentCommand) -> Result<Order> {
        cmd.validate()?;
        let mut order = self.load(order_id).await?;
        order.ensure_owned_by(actor.user_id)?;
        if !self.signatures.verify(&cmd.razorpay_order_id, &cmd.razorpay_payment_id, &cmd.razorpay_signature) {
            warn!("Payment signature mismatch");
            return Err(LifecycleError::InvalidSignature);
        }
        order.confirm_payment(&cmd.razorpay_order_id, &cmd.razorpay_payment_id, self.clock.now())?;
        self.orders.save(&order).await?;
        if order.paid_after_cancellation() {
            warn!(payment_id = %cmd.razorpay_payment_id, "Payment captured on a cancelled order, refunding");
            self.settle_refund(&mut order).await?;
            if order.refund().status == RefundStatus::Completed {
                notify::dispatch(&self.notifier, NotificationKind::Refunded, &order);
            }
            return Ok(order);
        }
        self.adjust_stock(&mut order, StockDirection::Take).await?;
        notify::dispatch(&self.notifier, NotificationKind::OrderConfirmed, &order);
        info!(payment_id = %cmd.razorpay_payment_id, "Payment verified");
        Ok(order)
    }

    /// Operator status change. Side effects depend on the target status.
    #[instrument(skip(self, actor, cmd), fields(order_id = %order_id, status = %cmd.status))]
    pub async fn update_status(&self, actor: &Actor, order_id: Uuid, cmd: UpdateStatusCommand) -> Result<Order> {
        self.require_admin(actor)?;
        cmd.validate()?;
        let mut order = self.load(order_id).await?;
        let now = self.clock.now();
        match cmd.status {
            OrderStatus::Confirmed => order.confirm(now)?,
            OrderStatus::Shipped => {
                let courier = cmd.courier.unwrap_or_else(|| self.policy.default_courier.clone());
                order.ship(cmd.awb_number, courier, &self.policy.tracking_url_template, now)?;
            }
            OrderStatus::Delivered => order.mark_delivered(now)?,
            OrderStatus::Cancelled => order.admin_cancel(now)?,
            OrderStatus::Processing | OrderStatus::Returned => {
                return Err(LifecycleError::Validation(format!("Status '{}' cannot be set directly", cmd.status)));
            }
        }
        self.orders.save(&order).await?;
        if cmd.status == OrderStatus::Shipped {
            notify::dispatch(&self.notifier, NotificationKind::Shipped, &order);
        }
        info!("Order status updated");
        Ok(order)
    }

    #[instrument(skip(self, actor, cmd), fields(order_id = %order_id))]
    pub async fn set_tracking_number(&self, actor: &Actor, order_id: Uuid, cmd: TrackingCommand) -> Result<Order> {
        self.require_admin(actor)?;
        cmd.validate()?;
        let mut order = self.load(order_id).await?;
        order.set_tracking_number(cmd.awb_number, self.clock.now());
        self.orders.save(&order).await?;
        Ok(order)
    }

    /// Courier progress, independent of the order status until it reaches delivered.
    #[instrument(skip(self, actor, cmd), fields(order_id = %order_id, status = ?cmd.status))]
    pub async fn update_shipping_status(&self, actor: &Actor, order_id: Uuid, cmd: ShippingStatusCommand) -> Result<Order> {
        self.require_admin(actor)?;
        let mut order = self.load(order_id).await?;
        let delivered = order.update_shipping_status(cmd.status, self.clock.now())?;
        self.orders.save(&order).await?;
        if delivered {
            info!("Order delivered via courier update");
        }
        Ok(order)
    }

    /// Customer cancellation: approved immediately, stock restored, paid
    /// orders refunded. A failed refund leaves the refund initiated.
    #[instrument(skip(self, actor, cmd), fields(order_id = %order_id))]
    pub async fn cancel_order(&self, actor: &Actor, order_id: Uuid, cmd: CancelOrderCommand) -> Result<Order> {
        cmd.validate()?;
        let mut order = self.load(order_id).await?;
        order.ensure_owned_by(actor.user_id)?;
        order.request_cancellation(cmd.reason, self.clock.now())?;
        self.orders.save(&order).await?;
        if order.stock_committed() {
            self.adjust_stock(&mut order, StockDirection::Restore).await?;
        }
        self.settle_refund(&mut order).await?;
        notify::dispatch(&self.notifier, NotificationKind::Cancelled, &order);
        info!(refund = ?order.refund().status, "Order cancelled by customer");
        Ok(order)
    }

    #[instrument(skip(self, actor, cmd), fields(order_id = %order_id))]
    pub async fn request_return(&self, actor: &Actor, order_id: Uuid, cmd: ReturnOrderCommand) -> Result<Order> {
        cmd.validate()?;
        let mut order = self.load(order_id).await?;
        order.ensure_owned_by(actor.user_id)?;
        order.request_return(cmd.reason, self.policy.return_window, self.clock.now())?;
        self.orders.save(&order).await?;
        info!("Return requested");
        Ok(order)
    }

    #[instrument(skip(self, actor, cmd), fields(order_id = %order_id, approved = cmd.approved))]
    pub async fn decide_return(&self, actor: &Actor, order_id: Uuid, cmd: ReturnDecisionCommand) -> Result<Order> {
        self.require_admin(actor)?;
        let mut order = self.load(order_id).await?;
        order.decide_return(cmd.approved, self.clock.now())?;
        self.orders.save(&order).await?;
        Ok(order)
    }

    /// The courier collected an approved return: stock goes back and paid
    /// orders are refunded with the same failure policy as cancellation.
    #[instrument(skip(self, actor), fields(order_id = %order_id))]
    pub async fn complete_return_pickup(&self, actor: &Actor, order_id: Uuid) -> Result<Order> {
        self.require_admin(actor)?;
        let mut order = self.load(order_id).await?;
        order.complete_pickup(self.clock.now())?;
        self.orders.save(&order).await?;
        if order.stock_committed() {
            self.adjust_stock(&mut order, StockDirection::Restore).await?;
        }
        self.settle_refund(&mut order).await?;
        if order.refund().status == RefundStatus::Completed {
            notify::dispatch(&self.notifier, NotificationKind::Refunded, &order);
        }
        info!(refund = ?order.refund().status, "Return completed");
        Ok(order)
    }

    /// Operator retry for a refund the automatic path could not issue.
    /// Gateway failures are returned to the caller and nothing is recorded.
    #[instrument(skip(self, actor), fields(order_id = %order_id))]
    pub async fn refund_order(&self, actor: &Actor, order_id: Uuid) -> Result<Order> {
        self.require_admin(actor)?;
        let mut order = self.load(order_id).await?;
        let payment_id = order.manual_refund_target()?;
        let refund = self.gateway.refund(&payment_id, order.total_price()).await?;
        order.record_refund(refund.id, self.clock.now());
        self.orders.save(&order).await?;
        notify::dispatch(&self.notifier, NotificationKind::Refunded, &order);
        info!("Manual refund completed");
        Ok(order)
    }

    pub async fn get_order(&self, actor: &Actor, order_id: Uuid) -> Result<Order> {
        let order = self.load(order_id).await?;
        if !actor.is_admin() {
            order.ensure_owned_by(actor.user_id)?;
        }
        Ok(order)
    }

    pub async fn list_orders_for(&self, actor: &Actor) -> Result<Vec<Order>> {
        Ok(self.orders.list_for_user(actor.user_id).await?)
    }

    pub async fn list_all_orders(&self, actor: &Actor) -> Result<Vec<Order>> {
        self.require_admin(actor)?;
        Ok(self.orders.list_all().await?)
    }

    fn require_admin(&self, actor: &Actor) -> Result<()> {
        if actor.is_admin() { Ok(()) } else { Err(LifecycleError::Forbidden) }
    }

    async fn load(&self, order_id: Uuid) -> Result<Order> {
        self.orders.find(order_id).await?.ok_or(LifecycleError::OrderNotFound(order_id))
    }

    /// Lines for the same product and size share one stock row.
    async fn ensure_stock(&self, order: &Order) -> Result<()> {
        let mut wanted: HashMap<(Uuid, &str), (u32, &str)> = HashMap::new();
        for item in order.items() {
            let entry = wanted.entry((item.product_id, item.size.as_str())).or_insert((0, item.name.as_str()));
            entry.0 += item.quantity.value();
        }
        for ((product_id, size), (qty, name)) in wanted {
            let available = self.catalog.stock_of(product_id, size).await?.unwrap_or(0);
            if available < qty {
                return Err(LifecycleError::InsufficientStock { product: name.to_string(), size: size.to_string() });
            }
        }
        Ok(())
    }

    async fn adjust_stock(&self, order: &mut Order, direction: StockDirection) -> Result<()> {
        let mut missed = Vec::new();
        for item in order.items() {
            let qty = item.quantity.value();
            let applied = match direction {
                StockDirection::Take => self.catalog.take_stock(item.product_id, &item.size, qty).await,
                StockDirection::Restore => self.catalog.restore_stock(item.product_id, &item.size, qty).await,
            };
            match applied {
                Ok(true) => {}
                Ok(false) => missed.push(item.clone()),
                Err(e) => {
                    error!(product_id = %item.product_id, size = %item.size, error = %e, "Stock update failed");
                    missed.push(item.clone());
                }
            }
        }
        if missed.is_empty() {
            return Ok(());
        }
        let now = self.clock.now();
        for item in &missed {
            error!(
                order_id = %order.id(), product_id = %item.product_id, size = %item.size,
                quantity = item.quantity.value(), ?direction, "Stock needs reconciliation"
            );
            order.record_stock_reconciliation(item, direction, now);
        }
        self.orders.save(order).await?;
        Ok(())
    }

    /// Refunds a paid gateway order. Gateway failures are absorbed: the
    /// refund is left initiated for an operator to finish.
    async fn settle_refund(&self, order: &mut Order) -> Result<()> {
        if !order.refund_due() {
            return Ok(());
        }
        let now = self.clock.now();
        let outcome = match order.gateway_payment_id() {
            Some(payment_id) => self.gateway.refund(payment_id, order.total_price()).await.map_err(|e| e.to_string()),
            None => Err("no gateway payment on record".to_string()),
        };
        match outcome {
            Ok(refund) => {
                info!(order_id = %order.id(), refund_id = %refund.id, "Refund issued");
                order.record_refund(refund.id, now);
            }
            Err(reason) => {
                warn!(order_id = %order.id(), %reason, "Refund failed, left for manual completion");
                order.mark_refund_initiated(now);
            }
        }
        self.orders.save(order).await?;
        Ok(())
    }
}
