//! Coupons and the coupon validator.

mod coupon;
mod validator;

pub use coupon::{normalize_code, Coupon, CouponPatch, DiscountValue, NewCoupon};
pub use validator::CouponValidator;
