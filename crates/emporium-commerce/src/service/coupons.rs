//! Coupon administration. Staff only.

use crate::auth::Actor;
use crate::coupon::{Coupon, CouponPatch, NewCoupon};
use crate::ids::CouponId;
use crate::service::ServiceContext;
use crate::CommerceError;

#[derive(Clone)]
pub struct CouponService {
    ctx: ServiceContext,
}

impl CouponService {
    pub(crate) fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    #[tracing::instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_coupon(&self, actor: &Actor, input: NewCoupon) -> Result<Coupon, CommerceError> {
        actor.require_staff("creating coupons")?;
        input.validate(self.ctx.config.currency)?;

        let coupon = input.into_coupon(self.ctx.clock.now());
        let row = coupon.clone();
        self.ctx
            .uow
            .execute(move |repos| Box::pin(async move { repos.coupons().insert(&row).await }))
            .await?;

        tracing::info!(coupon_id = %coupon.id, "coupon created");
        Ok(coupon)
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_coupon(
        &self,
        actor: &Actor,
        coupon_id: CouponId,
        patch: CouponPatch,
    ) -> Result<Coupon, CommerceError> {
        actor.require_staff("updating coupons")?;

        let now = self.ctx.clock.now();
        let currency = self.ctx.config.currency;
        self.ctx
            .uow
            .execute(move |repos| {
                Box::pin(async move {
                    let mut coupon = repos
                        .coupons()
                        .find_by_id(coupon_id)
                        .await?
                        .ok_or_else(|| CommerceError::coupon_not_found(&coupon_id))?;
                    patch.validate(&coupon, currency)?;
                    patch.apply(&mut coupon, now);
                    repos.coupons().update(&coupon).await?;
                    Ok(coupon)
                })
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_coupon(&self, actor: &Actor, coupon_id: CouponId) -> Result<(), CommerceError> {
        actor.require_staff("deleting coupons")?;

        let now = self.ctx.clock.now();
        let deleted = self
            .ctx
            .uow
            .execute(move |repos| {
                Box::pin(async move { repos.coupons().soft_delete(coupon_id, now).await })
            })
            .await?;

        if !deleted {
            return Err(CommerceError::coupon_not_found(&coupon_id));
        }
        tracing::info!(%coupon_id, "coupon deleted");
        Ok(())
    }

    pub async fn coupon(&self, actor: &Actor, coupon_id: CouponId) -> Result<Coupon, CommerceError> {
        actor.require_staff("viewing coupons")?;
        self.ctx
            .uow
            .reader()
            .coupon(coupon_id)
            .await?
            .ok_or_else(|| CommerceError::coupon_not_found(&coupon_id))
    }

    pub async fn coupons(&self, actor: &Actor) -> Result<Vec<Coupon>, CommerceError> {
        actor.require_staff("listing coupons")?;
        self.ctx.uow.reader().coupons().await
    }
}
