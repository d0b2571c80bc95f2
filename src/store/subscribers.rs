use async_trait::async_trait;
use diesel::{ExpressionMethods, upsert::excluded};
use diesel_async::RunQueryDsl;

use super::{PgStore, StoreResult, SubscriberRepository};
use crate::{models::CreateEmailSubscriberEntity, schema::email_subscribers};

#[async_trait]
impl SubscriberRepository for PgStore {
    async fn upsert(&self, subscriber: CreateEmailSubscriberEntity) -> StoreResult<()> {
        let conn = &mut self.conn().await?;
        diesel::insert_into(email_subscribers::table)
            .values(subscriber)
            .on_conflict((email_subscribers::creator_id, email_subscribers::email))
            .do_update()
            .set((
                email_subscribers::name.eq(excluded(email_subscribers::name)),
                email_subscribers::consent_given.eq(excluded(email_subscribers::consent_given)),
            ))
            .execute(conn)
            .await?;
        Ok(())
    }
}
