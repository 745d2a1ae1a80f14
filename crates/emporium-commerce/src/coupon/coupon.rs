//! Coupon types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::CouponId;
use crate::money::{Currency, Money};
use crate::CommerceError;

/// What a coupon takes off a subtotal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DiscountValue {
    /// A fixed amount.
    Fixed(Money),
    /// A percentage of the subtotal, `0 < p <= 100`.
    Percentage(f64),
}

impl DiscountValue {
    pub fn kind(&self) -> &'static str {
        match self {
            DiscountValue::Fixed(_) => "fixed",
            DiscountValue::Percentage(_) => "percentage",
        }
    }

    /// Discount against `subtotal`.
    ///
    /// A fixed amount is returned as is, even when it exceeds the subtotal;
    /// callers clamp the grand total, not the discount.
    pub fn amount_for(&self, subtotal: &Money) -> Result<Money, CommerceError> {
        match self {
            DiscountValue::Fixed(amount) => {
                if amount.currency != subtotal.currency {
                    return Err(CommerceError::CurrencyMismatch {
                        expected: subtotal.currency.to_string(),
                        got: amount.currency.to_string(),
                    });
                }
                Ok(*amount)
            }
            DiscountValue::Percentage(percent) => {
                subtotal.percentage(*percent).ok_or(CommerceError::Overflow)
            }
        }
    }

    fn validate(&self, currency: Currency) -> Result<(), CommerceError> {
        match self {
            DiscountValue::Fixed(amount) => {
                if amount.currency != currency {
                    return Err(CommerceError::CurrencyMismatch {
                        expected: currency.to_string(),
                        got: amount.currency.to_string(),
                    });
                }
                if amount.amount_cents <= 0 {
                    return Err(CommerceError::validation("discount value must be positive"));
                }
            }
            DiscountValue::Percentage(percent) => {
                if !percent.is_finite() || *percent <= 0.0 {
                    return Err(CommerceError::validation("discount value must be positive"));
                }
                if *percent > 100.0 {
                    return Err(CommerceError::validation(
                        "percentage discount cannot exceed 100",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// A discount coupon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    pub id: CouponId,
    /// Upper-case code shoppers type in; unique among live coupons.
    pub code: String,
    pub discount: DiscountValue,
    pub expires_at: DateTime<Utc>,
    pub usage_limit: i64,
    /// Always `<= usage_limit`.
    pub usage_count: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Coupon {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_exhausted(&self) -> bool {
        self.usage_count >= self.usage_limit
    }

    pub fn remaining_uses(&self) -> i64 {
        (self.usage_limit - self.usage_count).max(0)
    }
}

/// Input for creating a coupon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCoupon {
    pub code: String,
    pub discount: DiscountValue,
    pub expires_at: DateTime<Utc>,
    pub usage_limit: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl NewCoupon {
    pub fn validate(&self, currency: Currency) -> Result<(), CommerceError> {
        validate_code(&self.code)?;
        self.discount.validate(currency)?;
        validate_usage_limit(self.usage_limit)?;
        Ok(())
    }

    pub fn into_coupon(self, now: DateTime<Utc>) -> Coupon {
        Coupon {
            id: CouponId::generate(),
            code: normalize_code(&self.code),
            discount: self.discount,
            expires_at: self.expires_at,
            usage_limit: self.usage_limit,
            usage_count: 0,
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Editable coupon fields. The code and usage count are fixed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CouponPatch {
    pub discount: Option<DiscountValue>,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i64>,
    pub is_active: Option<bool>,
}

impl CouponPatch {
    /// Patch that only flips the active flag.
    pub fn active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.discount.is_none()
            && self.expires_at.is_none()
            && self.usage_limit.is_none()
            && self.is_active.is_none()
    }

    /// Validate against the coupon it will be applied to.
    pub fn validate(&self, coupon: &Coupon, currency: Currency) -> Result<(), CommerceError> {
        if self.is_empty() {
            return Err(CommerceError::validation("patch has no fields to update"));
        }
        if let Some(discount) = &self.discount {
            discount.validate(currency)?;
        }
        if let Some(limit) = self.usage_limit {
            validate_usage_limit(limit)?;
            if limit < coupon.usage_count {
                return Err(CommerceError::validation(format!(
                    "usage limit {} is below current usage {}",
                    limit, coupon.usage_count
                )));
            }
        }
        Ok(())
    }

    pub fn apply(self, coupon: &mut Coupon, now: DateTime<Utc>) {
        if let Some(discount) = self.discount {
            coupon.discount = discount;
        }
        if let Some(expires_at) = self.expires_at {
            coupon.expires_at = expires_at;
        }
        if let Some(limit) = self.usage_limit {
            coupon.usage_limit = limit;
        }
        if let Some(active) = self.is_active {
            coupon.is_active = active;
        }
        coupon.updated_at = now;
    }
}

/// Canonical form of a user-typed code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn validate_code(code: &str) -> Result<(), CommerceError> {
    let code = code.trim();
    if code.len() < 4 {
        return Err(CommerceError::validation(
            "coupon code must be at least 4 characters",
        ));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(CommerceError::validation(
            "coupon code may only contain upper-case letters and digits",
        ));
    }
    Ok(())
}

fn validate_usage_limit(limit: i64) -> Result<(), CommerceError> {
    if limit < 1 {
        return Err(CommerceError::validation("usage limit must be at least 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    fn new_coupon(code: &str, discount: DiscountValue) -> NewCoupon {
        NewCoupon {
            code: code.into(),
            discount,
            expires_at: Utc::now() + Duration::days(30),
            usage_limit: 10,
            is_active: true,
        }
    }

    #[test]
    fn test_code_rules() {
        let fixed = DiscountValue::Fixed(usd(500));
        assert!(new_coupon("SAVE5", fixed).validate(Currency::USD).is_ok());
        assert!(new_coupon("AB1", fixed).validate(Currency::USD).is_err());
        assert!(new_coupon("save5", fixed).validate(Currency::USD).is_err());
        assert!(new_coupon("SAVE-5", fixed).validate(Currency::USD).is_err());
    }

    #[test]
    fn test_value_rules() {
        assert!(new_coupon("ZERO", DiscountValue::Fixed(usd(0)))
            .validate(Currency::USD)
            .is_err());
        assert!(new_coupon("HALF", DiscountValue::Percentage(50.0))
            .validate(Currency::USD)
            .is_ok());
        assert!(new_coupon("MORE", DiscountValue::Percentage(150.0))
            .validate(Currency::USD)
            .is_err());
        let mut limited = new_coupon("NONE", DiscountValue::Percentage(5.0));
        limited.usage_limit = 0;
        assert!(limited.validate(Currency::USD).is_err());
    }

    #[test]
    fn test_fixed_discount_not_clamped() {
        let discount = DiscountValue::Fixed(usd(5000));
        assert_eq!(discount.amount_for(&usd(2500)).unwrap(), usd(5000));
    }

    #[test]
    fn test_percentage_discount() {
        let discount = DiscountValue::Percentage(10.0);
        assert_eq!(discount.amount_for(&usd(2500)).unwrap(), usd(250));
    }

    #[test]
    fn test_patch_cannot_drop_limit_below_usage() {
        let mut coupon =
            new_coupon("SAVE10", DiscountValue::Percentage(10.0)).into_coupon(Utc::now());
        coupon.usage_count = 4;
        let patch = CouponPatch {
            usage_limit: Some(3),
            ..CouponPatch::default()
        };
        assert!(patch.validate(&coupon, Currency::USD).is_err());

        let patch = CouponPatch::active(false);
        patch.validate(&coupon, Currency::USD).unwrap();
        patch.apply(&mut coupon, Utc::now());
        assert!(!coupon.is_active);
        assert_eq!(coupon.usage_count, 4);
    }

    #[test]
    fn test_discount_serde_shape() {
        let json = serde_json::to_value(DiscountValue::Percentage(15.0)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "percentage", "value": 15.0}));
    }
}
