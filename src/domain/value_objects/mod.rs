//! Value Objects for the order lifecycle

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_CURRENCY: &str = "INR";

/// Orders with an items total strictly above this ship free.
pub const FREE_SHIPPING_ABOVE: i64 = 999;
pub const FLAT_SHIPPING: i64 = 99;
/// Tax rate in hundredths (5%).
pub const TAX_RATE_PERCENT: i64 = 5;

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn inr(amount: Decimal) -> Self { Self::new(amount, DEFAULT_CURRENCY) }
    pub fn rupees(amount: i64) -> Self { Self::inr(Decimal::from(amount)) }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }

    /// Amount in the smallest currency unit (paise), as gateways expect it.
    pub fn minor_units(&self) -> Option<i64> {
        use rust_decimal::prelude::ToPrimitive;
        (self.amount * Decimal::from(100)).round().to_i64()
    }
}

impl Default for Money { fn default() -> Self { Self::zero(DEFAULT_CURRENCY) } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}", self.currency, self.amount) }
}

#[derive(Debug, Clone)] pub enum MoneyError { CurrencyMismatch }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Currency mismatch") }
}

/// Line quantity; never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Option<Self> { (value >= 1).then_some(Self(value)) }
    pub fn value(&self) -> u32 { self.0 }
}

impl TryFrom<u32> for Quantity {
    type Error = String;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "quantity must be at least 1".to_string())
    }
}

impl From<Quantity> for u32 { fn from(q: Quantity) -> Self { q.0 } }

/// The four money fields of an order, derived once from the items total.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub items_price: Money,
    pub shipping_price: Money,
    pub tax_price: Money,
    pub total_price: Money,
}

impl OrderTotals {
    pub fn from_items_price(items_price: Money) -> Self {
        let currency = items_price.currency().to_string();
        let shipping = if items_price.amount() > Decimal::from(FREE_SHIPPING_ABOVE) {
            Decimal::ZERO
        } else {
            Decimal::from(FLAT_SHIPPING)
        };
        let tax = (items_price.amount() * Decimal::new(TAX_RATE_PERCENT, 2))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        let total = items_price.amount() + shipping + tax;
        Self {
            shipping_price: Money::new(shipping, &currency),
            tax_price: Money::new(tax, &currency),
            total_price: Money::new(total, &currency),
            items_price,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.items_price.amount() + self.shipping_price.amount() + self.tax_price.amount()
            == self.total_price.amount()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_money_add() {
        let a = Money::rupees(100);
        let b = Money::rupees(50);
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
        assert!(a.add(&Money::zero("USD")).is_err());
    }
    #[test]
    fn test_quantity_rejects_zero() {
        assert!(Quantity::new(0).is_none());
        assert_eq!(Quantity::new(3).unwrap().value(), 3);
        assert!(serde_json::from_str::<Quantity>("0").is_err());
    }
    #[test]
    fn test_totals_free_shipping_above_threshold() {
        let t = OrderTotals::from_items_price(Money::rupees(1200));
        assert_eq!(t.shipping_price, Money::rupees(0));
        assert_eq!(t.tax_price, Money::rupees(60));
        assert_eq!(t.total_price, Money::rupees(1260));
        assert!(t.is_consistent());
    }
    #[test]
    fn test_totals_threshold_is_exclusive() {
        let t = OrderTotals::from_items_price(Money::rupees(999));
        assert_eq!(t.shipping_price, Money::rupees(99));
        assert_eq!(t.tax_price, Money::rupees(50)); // 49.95 rounds up
        assert_eq!(t.total_price, Money::rupees(1148));
    }
    #[test]
    fn test_totals_flat_shipping() {
        let t = OrderTotals::from_items_price(Money::rupees(800));
        assert_eq!(t.shipping_price, Money::rupees(99));
        assert_eq!(t.tax_price, Money::rupees(40));
        assert_eq!(t.total_price, Money::rupees(939));
    }
    #[test]
    fn test_minor_units() {
        assert_eq!(Money::rupees(939).minor_units(), Some(93900));
    }
}
