use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::{BookingRepository, PgStore, StoreResult};
use crate::{
    models::{BookingEntity, BookingStatus, CreateBookingEntity},
    schema::bookings,
};

#[async_trait]
impl BookingRepository for PgStore {
    async fn create(&self, booking: CreateBookingEntity) -> StoreResult<BookingEntity> {
        let conn = &mut self.conn().await?;
        let booking = diesel::insert_into(bookings::table)
            .values(booking)
            .returning(BookingEntity::as_returning())
            .get_result(conn)
            .await?;
        Ok(booking)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<BookingEntity>> {
        let conn = &mut self.conn().await?;
        let booking = bookings::table
            .find(id)
            .select(BookingEntity::as_select())
            .first(conn)
            .await
            .optional()?;
        Ok(booking)
    }

    async fn find_overlapping(
        &self,
        product_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> StoreResult<Vec<BookingEntity>> {
        let conn = &mut self.conn().await?;
        let bookings = bookings::table
            .filter(bookings::product_id.eq(product_id))
            .filter(bookings::status.eq(BookingStatus::Confirmed))
            .filter(bookings::slot_start.lt(end_at))
            .filter(bookings::slot_end.gt(start_at))
            .select(BookingEntity::as_select())
            .get_results(conn)
            .await?;
        Ok(bookings)
    }

    async fn find_confirmed_starting_between(
        &self,
        product_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<BookingEntity>> {
        let conn = &mut self.conn().await?;
        let bookings = bookings::table
            .filter(bookings::product_id.eq(product_id))
            .filter(bookings::status.eq(BookingStatus::Confirmed))
            .filter(bookings::slot_start.ge(from))
            .filter(bookings::slot_start.lt(to))
            .order_by(bookings::slot_start.asc())
            .select(BookingEntity::as_select())
            .get_results(conn)
            .await?;
        Ok(bookings)
    }

    async fn find_all_by_creator_id(&self, creator_id: Uuid) -> StoreResult<Vec<BookingEntity>> {
        let conn = &mut self.conn().await?;
        let bookings = bookings::table
            .filter(bookings::creator_id.eq(creator_id))
            .order_by(bookings::slot_start.desc())
            .select(BookingEntity::as_select())
            .get_results(conn)
            .await?;
        Ok(bookings)
    }

    async fn find_all_by_buyer_email(&self, email: &str) -> StoreResult<Vec<BookingEntity>> {
        let conn = &mut self.conn().await?;
        let bookings = bookings::table
            .filter(bookings::buyer_email.eq(email))
            .order_by(bookings::slot_start.desc())
            .select(BookingEntity::as_select())
            .get_results(conn)
            .await?;
        Ok(bookings)
    }

    async fn update_status(&self, id: Uuid, status: BookingStatus) -> StoreResult<()> {
        let conn = &mut self.conn().await?;
        diesel::update(bookings::table.find(id))
            .set((
                bookings::status.eq(status),
                bookings::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await?;
        Ok(())
    }
}
