use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::{PayoutRepository, PgStore, StoreResult};
use crate::{
    models::{CreatePayoutEntity, PayoutEntity, PayoutStatus},
    schema::payouts,
};

#[async_trait]
impl PayoutRepository for PgStore {
    async fn reserve(&self, payout: CreatePayoutEntity) -> StoreResult<PayoutEntity> {
        let conn = &mut self.conn().await?;
        // `payouts_one_processing_per_creator` turns a concurrent second reservation into a
        // unique violation.
        let payout = diesel::insert_into(payouts::table)
            .values(payout)
            .returning(PayoutEntity::as_returning())
            .get_result(conn)
            .await?;
        Ok(payout)
    }

    async fn attach_gateway_id(
        &self,
        id: Uuid,
        gateway_payout_id: &str,
    ) -> StoreResult<PayoutEntity> {
        let conn = &mut self.conn().await?;
        let payout = diesel::update(payouts::table.find(id))
            .set(payouts::gateway_payout_id.eq(gateway_payout_id))
            .returning(PayoutEntity::as_returning())
            .get_result(conn)
            .await?;
        Ok(payout)
    }

    async fn find_processing_by_creator_id(
        &self,
        creator_id: Uuid,
    ) -> StoreResult<Option<PayoutEntity>> {
        let conn = &mut self.conn().await?;
        let payout = payouts::table
            .filter(payouts::creator_id.eq(creator_id))
            .filter(payouts::status.eq(PayoutStatus::Processing))
            .select(PayoutEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(payout)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<PayoutEntity>> {
        let conn = &mut self.conn().await?;
        let payout = payouts::table
            .find(id)
            .select(PayoutEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(payout)
    }

    async fn find_by_gateway_id(
        &self,
        gateway_payout_id: &str,
    ) -> StoreResult<Option<PayoutEntity>> {
        let conn = &mut self.conn().await?;
        let payout = payouts::table
            .filter(payouts::gateway_payout_id.eq(gateway_payout_id))
            .select(PayoutEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(payout)
    }

    async fn find_all_by_creator_id(&self, creator_id: Uuid) -> StoreResult<Vec<PayoutEntity>> {
        let conn = &mut self.conn().await?;
        let payouts = payouts::table
            .filter(payouts::creator_id.eq(creator_id))
            .order_by(payouts::created_at.desc())
            .select(PayoutEntity::as_select())
            .get_results(conn)
            .await?;
        Ok(payouts)
    }

    async fn finish(&self, id: Uuid, status: PayoutStatus) -> StoreResult<Option<PayoutEntity>> {
        let conn = &mut self.conn().await?;
        let payout = diesel::update(
            payouts::table
                .find(id)
                .filter(payouts::status.eq(PayoutStatus::Processing)),
        )
        .set((
            payouts::status.eq(status),
            payouts::completed_at.eq(diesel::dsl::now),
        ))
        .returning(PayoutEntity::as_returning())
        .get_result(conn)
        .await
        .optional()?;
        Ok(payout)
    }

    async fn complete_released(
        &self,
        id: Uuid,
        gateway_payout_id: &str,
    ) -> StoreResult<Option<PayoutEntity>> {
        let conn = &mut self.conn().await?;
        let payout = diesel::update(
            payouts::table
                .find(id)
                .filter(payouts::status.eq(PayoutStatus::Failed))
                .filter(payouts::gateway_payout_id.is_null()),
        )
        .set((
            payouts::status.eq(PayoutStatus::Completed),
            payouts::gateway_payout_id.eq(gateway_payout_id),
            payouts::completed_at.eq(diesel::dsl::now),
        ))
        .returning(PayoutEntity::as_returning())
        .get_result(conn)
        .await
        .optional()?;
        Ok(payout)
    }
}
