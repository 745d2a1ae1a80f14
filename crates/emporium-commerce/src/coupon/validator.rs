//! The coupon validator.
//!
//! Checks run in a fixed order and the first failure wins:
//! not found, then inactive or expired, then exhausted.

use chrono::{DateTime, Utc};

use crate::coupon::{normalize_code, Coupon};
use crate::ids::CouponId;
use crate::money::Money;
use crate::store::CouponRepository;
use crate::CommerceError;

/// Decides whether a coupon applies and what it is worth.
pub struct CouponValidator;

impl CouponValidator {
    /// Eligibility of an already-loaded coupon at `now`.
    pub fn check(coupon: &Coupon, now: DateTime<Utc>) -> Result<(), CommerceError> {
        if coupon.deleted_at.is_some() {
            return Err(CommerceError::CouponNotFound(coupon.code.clone()));
        }
        if !coupon.is_active || coupon.is_expired(now) {
            return Err(CommerceError::CouponExpired(coupon.code.clone()));
        }
        if coupon.is_exhausted() {
            return Err(CommerceError::CouponUsageLimitReached(coupon.code.clone()));
        }
        Ok(())
    }

    /// Look a coupon up by the code a shopper typed and check it.
    pub async fn validate_code(
        coupons: &mut dyn CouponRepository,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Coupon, CommerceError> {
        let code = normalize_code(code);
        let coupon = coupons
            .find_by_code(&code)
            .await?
            .ok_or(CommerceError::CouponNotFound(code))?;
        Self::check(&coupon, now)?;
        Ok(coupon)
    }

    /// Re-check a coupon already attached to a cart.
    pub async fn validate_id(
        coupons: &mut dyn CouponRepository,
        id: CouponId,
        now: DateTime<Utc>,
    ) -> Result<Coupon, CommerceError> {
        let coupon = coupons
            .find_by_id(id)
            .await?
            .ok_or_else(|| CommerceError::coupon_not_found(&id))?;
        Self::check(&coupon, now)?;
        Ok(coupon)
    }

    /// Discount the coupon grants against `subtotal`.
    pub fn discount(coupon: &Coupon, subtotal: &Money) -> Result<Money, CommerceError> {
        coupon.discount.amount_for(subtotal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupon::{DiscountValue, NewCoupon};
    use crate::money::Currency;
    use chrono::Duration;

    fn coupon() -> Coupon {
        NewCoupon {
            code: "SAVE5".into(),
            discount: DiscountValue::Fixed(Money::new(500, Currency::USD)),
            expires_at: Utc::now() + Duration::days(1),
            usage_limit: 2,
            is_active: true,
        }
        .into_coupon(Utc::now())
    }

    #[test]
    fn test_valid_coupon() {
        assert!(CouponValidator::check(&coupon(), Utc::now()).is_ok());
    }

    #[test]
    fn test_inactive_is_expired() {
        let mut c = coupon();
        c.is_active = false;
        assert!(matches!(
            CouponValidator::check(&c, Utc::now()),
            Err(CommerceError::CouponExpired(_))
        ));
    }

    #[test]
    fn test_past_expiry() {
        let c = coupon();
        let later = c.expires_at + Duration::seconds(1);
        assert!(matches!(
            CouponValidator::check(&c, later),
            Err(CommerceError::CouponExpired(_))
        ));
        // Valid through the expiry instant itself.
        assert!(CouponValidator::check(&c, c.expires_at).is_ok());
    }

    #[test]
    fn test_expiry_checked_before_usage() {
        let mut c = coupon();
        c.usage_count = c.usage_limit;
        assert!(matches!(
            CouponValidator::check(&c, Utc::now()),
            Err(CommerceError::CouponUsageLimitReached(_))
        ));
        c.is_active = false;
        assert!(matches!(
            CouponValidator::check(&c, Utc::now()),
            Err(CommerceError::CouponExpired(_))
        ));
    }

    #[test]
    fn test_discount() {
        let c = coupon();
        let subtotal = Money::new(2500, Currency::USD);
        assert_eq!(
            CouponValidator::discount(&c, &subtotal).unwrap(),
            Money::new(500, Currency::USD)
        );
    }
}
