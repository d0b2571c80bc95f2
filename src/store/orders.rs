use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::{OrderRepository, PgStore, StoreResult};
use crate::{
    models::{CreateOrderEntity, OrderEntity, OrderStatus},
    schema::orders,
};

#[async_trait]
impl OrderRepository for PgStore {
    async fn create(&self, order: CreateOrderEntity) -> StoreResult<OrderEntity> {
        let conn = &mut self.conn().await?;
        let order = diesel::insert_into(orders::table)
            .values(order)
            .returning(OrderEntity::as_returning())
            .get_result(conn)
            .await?;
        Ok(order)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<OrderEntity>> {
        let conn = &mut self.conn().await?;
        let order = orders::table
            .find(id)
            .select(OrderEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(order)
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> StoreResult<Option<OrderEntity>> {
        let conn = &mut self.conn().await?;
        let order = orders::table
            .filter(orders::gateway_order_id.eq(gateway_order_id))
            .select(OrderEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(order)
    }

    async fn mark_paid(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
    ) -> StoreResult<Option<OrderEntity>> {
        let conn = &mut self.conn().await?;
        let order = diesel::update(
            orders::table
                .filter(orders::gateway_order_id.eq(gateway_order_id))
                .filter(orders::status.ne(OrderStatus::Paid)),
        )
        .set((
            orders::status.eq(OrderStatus::Paid),
            orders::gateway_payment_id.eq(gateway_payment_id),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await
        .optional()?;
        Ok(order)
    }

    async fn update_platform_fee(&self, id: Uuid, fee: i64) -> StoreResult<()> {
        let conn = &mut self.conn().await?;
        diesel::update(orders::table.find(id))
            .set((
                orders::platform_fee.eq(fee),
                orders::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await?;
        Ok(())
    }

    async fn find_all_by_creator_id(&self, creator_id: Uuid) -> StoreResult<Vec<OrderEntity>> {
        let conn = &mut self.conn().await?;
        let orders = orders::table
            .filter(orders::creator_id.eq(creator_id))
            .order_by(orders::created_at.desc())
            .select(OrderEntity::as_select())
            .get_results(conn)
            .await?;
        Ok(orders)
    }

    async fn find_paid_by_customer_email(&self, email: &str) -> StoreResult<Vec<OrderEntity>> {
        let conn = &mut self.conn().await?;
        let orders = orders::table
            .filter(orders::customer_email.eq(email))
            .filter(orders::status.eq(OrderStatus::Paid))
            .order_by(orders::created_at.desc())
            .select(OrderEntity::as_select())
            .get_results(conn)
            .await?;
        Ok(orders)
    }
}
