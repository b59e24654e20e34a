//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{Product, ProductError, SizeStock};
pub use order::{
    Cancellation, CustomerContact, Order, OrderError, OrderItem, OrderStatus, PaymentMethod, PaymentResult,
    PaymentResultStatus, Refund, RefundStatus, ReturnRequest, Shipping, ShippingAddress, ShippingStatus, Transition,
};
pub use cart::{Cart, CartItem};
