//! Cart pricing.

use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::coupon::{Coupon, DiscountValue};
use crate::ids::{CartItemId, ProductId};
use crate::money::{Currency, Money};
use crate::CommerceError;

/// Totals for a set of lines and an optional discount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CartPricing {
    pub subtotal: Money,
    /// Uncapped discount amount.
    pub discount: Money,
    /// `max(subtotal - discount, 0)`.
    pub grand_total: Money,
}

impl CartPricing {
    /// Price lines given their totals.
    pub fn compute(
        line_totals: &[Money],
        discount: Option<&DiscountValue>,
        currency: Currency,
    ) -> Result<Self, CommerceError> {
        if let Some(mismatch) = line_totals.iter().find(|m| m.currency != currency) {
            return Err(CommerceError::CurrencyMismatch {
                expected: currency.to_string(),
                got: mismatch.currency.to_string(),
            });
        }
        let subtotal = Money::try_sum(line_totals, currency).ok_or(CommerceError::Overflow)?;
        let discount = match discount {
            Some(value) => value.amount_for(&subtotal)?,
            None => Money::zero(currency),
        };
        let grand_total = subtotal
            .try_subtract(&discount)
            .ok_or(CommerceError::Overflow)?
            .floor_zero();

        Ok(Self {
            subtotal,
            discount,
            grand_total,
        })
    }

    pub fn has_discount(&self) -> bool {
        self.discount.amount_cents > 0
    }
}

/// A cart line joined with its product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
    /// Units currently in stock.
    pub available: i64,
}

/// What a shopper sees: the cart, its priced lines and the coupon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartView {
    pub cart: Cart,
    pub lines: Vec<CartLine>,
    pub coupon: Option<Coupon>,
    /// Why the attached coupon currently gives no discount, if it doesn't.
    pub coupon_issue: Option<String>,
    pub pricing: CartPricing,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    #[test]
    fn test_fixed_coupon_totals() {
        // 10 x 2 + 5 x 1 with 5 off
        let lines = [usd(1000).try_multiply(2).unwrap(), usd(500)];
        let pricing = CartPricing::compute(
            &lines,
            Some(&DiscountValue::Fixed(usd(500))),
            Currency::USD,
        )
        .unwrap();
        assert_eq!(pricing.subtotal, usd(2500));
        assert_eq!(pricing.discount, usd(500));
        assert_eq!(pricing.grand_total, usd(2000));
    }

    #[test]
    fn test_total_never_negative() {
        let pricing = CartPricing::compute(
            &[usd(300)],
            Some(&DiscountValue::Fixed(usd(1000))),
            Currency::USD,
        )
        .unwrap();
        assert_eq!(pricing.discount, usd(1000));
        assert_eq!(pricing.grand_total, usd(0));
    }

    #[test]
    fn test_total_matches_formula_for_many_carts() {
        let discounts = [
            None,
            Some(DiscountValue::Fixed(usd(1))),
            Some(DiscountValue::Fixed(usd(99_999))),
            Some(DiscountValue::Percentage(12.5)),
            Some(DiscountValue::Percentage(100.0)),
        ];
        for subtotal in [0_i64, 1, 333, 2500, 1_000_000] {
            for discount in &discounts {
                let pricing =
                    CartPricing::compute(&[usd(subtotal)], discount.as_ref(), Currency::USD)
                        .unwrap();
                let expected = (pricing.subtotal.amount_cents - pricing.discount.amount_cents).max(0);
                assert_eq!(pricing.grand_total.amount_cents, expected);
                assert!(pricing.grand_total.amount_cents >= 0);
            }
        }
    }

    #[test]
    fn test_empty_lines() {
        let pricing = CartPricing::compute(&[], None, Currency::USD).unwrap();
        assert_eq!(pricing.grand_total, usd(0));
        assert!(!pricing.has_discount());
    }

    #[test]
    fn test_mixed_currency_rejected() {
        let lines = [usd(100), Money::new(100, Currency::EUR)];
        assert!(matches!(
            CartPricing::compute(&lines, None, Currency::USD),
            Err(CommerceError::CurrencyMismatch { .. })
        ));
    }
}
