use async_trait::async_trait;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper, dsl::sql, sql_types::BigInt};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::{LedgerRepository, PgStore, StoreResult};
use crate::{
    models::{CreateLedgerEntryEntity, LedgerEntryEntity},
    schema::ledger_entries,
};

#[async_trait]
impl LedgerRepository for PgStore {
    async fn append(&self, entry: CreateLedgerEntryEntity) -> StoreResult<LedgerEntryEntity> {
        let conn = &mut self.conn().await?;
        let entry = diesel::insert_into(ledger_entries::table)
            .values(entry)
            .returning(LedgerEntryEntity::as_returning())
            .get_result(conn)
            .await?;
        Ok(entry)
    }

    async fn find_all_by_creator_id(
        &self,
        creator_id: Uuid,
    ) -> StoreResult<Vec<LedgerEntryEntity>> {
        let conn = &mut self.conn().await?;
        let entries = ledger_entries::table
            .filter(ledger_entries::creator_id.eq(creator_id))
            .order_by(ledger_entries::created_at.desc())
            .select(LedgerEntryEntity::as_select())
            .get_results(conn)
            .await?;
        Ok(entries)
    }

    async fn balance(&self, creator_id: Uuid) -> StoreResult<i64> {
        let conn = &mut self.conn().await?;
        let balance = ledger_entries::table
            .filter(ledger_entries::creator_id.eq(creator_id))
            .select(sql::<BigInt>(
                "COALESCE(SUM(CASE WHEN entry_type = 'credit' THEN amount ELSE -amount END), 0)::int8",
            ))
            .get_result::<i64>(conn)
            .await?;
        Ok(balance)
    }
}
