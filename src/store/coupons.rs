use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::{CouponRepository, PgStore, StoreResult};
use crate::{
    models::{CouponEntity, CreateCouponEntity, UpdateCouponEntity},
    schema::coupons,
};

#[async_trait]
impl CouponRepository for PgStore {
    async fn create(&self, coupon: CreateCouponEntity) -> StoreResult<CouponEntity> {
        let conn = &mut self.conn().await?;
        let coupon = diesel::insert_into(coupons::table)
            .values(coupon)
            .returning(CouponEntity::as_returning())
            .get_result(conn)
            .await?;
        Ok(coupon)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<CouponEntity>> {
        let conn = &mut self.conn().await?;
        let coupon = coupons::table
            .find(id)
            .select(CouponEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(coupon)
    }

    async fn find_by_code(&self, creator_id: Uuid, code: &str) -> StoreResult<Option<CouponEntity>> {
        let conn = &mut self.conn().await?;
        let coupon = coupons::table
            .filter(coupons::creator_id.eq(creator_id))
            .filter(coupons::code.eq(code))
            .select(CouponEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(coupon)
    }

    async fn find_all_by_creator_id(&self, creator_id: Uuid) -> StoreResult<Vec<CouponEntity>> {
        let conn = &mut self.conn().await?;
        let coupons = coupons::table
            .filter(coupons::creator_id.eq(creator_id))
            .order_by(coupons::created_at.desc())
            .select(CouponEntity::as_select())
            .get_results(conn)
            .await?;
        Ok(coupons)
    }

    async fn update(&self, id: Uuid, changes: UpdateCouponEntity) -> StoreResult<CouponEntity> {
        let conn = &mut self.conn().await?;
        let coupon = diesel::update(coupons::table.find(id))
            .set((&changes, coupons::updated_at.eq(diesel::dsl::now)))
            .returning(CouponEntity::as_returning())
            .get_result(conn)
            .await?;
        Ok(coupon)
    }

    async fn increment_usage(&self, id: Uuid) -> StoreResult<()> {
        let conn = &mut self.conn().await?;
        diesel::update(coupons::table.find(id))
            .set((
                coupons::times_used.eq(coupons::times_used + 1),
                coupons::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await?;
        Ok(())
    }
}
