use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::{PgStore, ProfileRepository, StoreError, StoreResult};
use crate::{
    models::{CreatorProfileEntity, PayoutConfig},
    schema::creator_profiles,
};

#[async_trait]
impl ProfileRepository for PgStore {
    async fn find_by_creator_id(
        &self,
        creator_id: Uuid,
    ) -> StoreResult<Option<CreatorProfileEntity>> {
        let conn = &mut self.conn().await?;
        let profile = creator_profiles::table
            .find(creator_id)
            .select(CreatorProfileEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(profile)
    }

    async fn save_payout_config(&self, creator_id: Uuid, config: PayoutConfig) -> StoreResult<()> {
        let conn = &mut self.conn().await?;
        let updated = diesel::update(creator_profiles::table.find(creator_id))
            .set((&config, creator_profiles::updated_at.eq(diesel::dsl::now)))
            .execute(conn)
            .await?;
        if updated == 0 {
            return Err(StoreError::Database(diesel::result::Error::NotFound));
        }
        Ok(())
    }
}
