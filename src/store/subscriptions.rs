use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::{PgStore, StoreResult, SubscriptionRepository};
use crate::{
    models::{CreateSubscriptionEntity, SubscriptionEntity, SubscriptionStatus, SubscriptionSync},
    schema::subscriptions,
};

#[async_trait]
impl SubscriptionRepository for PgStore {
    async fn create(&self, sub: CreateSubscriptionEntity) -> StoreResult<SubscriptionEntity> {
        let conn = &mut self.conn().await?;
        let sub = diesel::insert_into(subscriptions::table)
            .values(sub)
            .returning(SubscriptionEntity::as_returning())
            .get_result(conn)
            .await?;
        Ok(sub)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<SubscriptionEntity>> {
        let conn = &mut self.conn().await?;
        let sub = subscriptions::table
            .find(id)
            .select(SubscriptionEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(sub)
    }

    async fn find_by_gateway_id(
        &self,
        gateway_subscription_id: &str,
    ) -> StoreResult<Option<SubscriptionEntity>> {
        let conn = &mut self.conn().await?;
        let sub = subscriptions::table
            .filter(subscriptions::gateway_subscription_id.eq(gateway_subscription_id))
            .select(SubscriptionEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(sub)
    }

    async fn find_all_by_customer_email(
        &self,
        email: &str,
    ) -> StoreResult<Vec<SubscriptionEntity>> {
        let conn = &mut self.conn().await?;
        let subs = subscriptions::table
            .filter(subscriptions::customer_email.eq(email))
            .order_by(subscriptions::created_at.desc())
            .select(SubscriptionEntity::as_select())
            .get_results(conn)
            .await?;
        Ok(subs)
    }

    async fn sync(&self, id: Uuid, sync: SubscriptionSync) -> StoreResult<SubscriptionEntity> {
        let conn = &mut self.conn().await?;
        let sub = diesel::update(subscriptions::table.find(id))
            .set((&sync, subscriptions::updated_at.eq(diesel::dsl::now)))
            .returning(SubscriptionEntity::as_returning())
            .get_result(conn)
            .await?;
        Ok(sub)
    }

    async fn update_status(&self, id: Uuid, status: SubscriptionStatus) -> StoreResult<()> {
        let conn = &mut self.conn().await?;
        diesel::update(subscriptions::table.find(id))
            .set((
                subscriptions::status.eq(status),
                subscriptions::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await?;
        Ok(())
    }
}
