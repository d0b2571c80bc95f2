//! Typed data access for the settlement engine.
//!
//! Each entity gets its own repository trait so that the invariants the services rely on
//! (compare-and-set settlement, single processing payout, non-overlapping bookings) are part of
//! the interface instead of being re-implemented by callers. [`PgStore`] implements all of them
//! on top of diesel-async.

mod bookings;
mod coupons;
mod ledger;
mod orders;
mod payouts;
mod profiles;
mod subscribers;
mod subscriptions;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::{AsyncPgConnection, pooled_connection::bb8::Pool};
use uuid::Uuid;

use crate::models::{
    BookingEntity, BookingStatus, CouponEntity, CreateBookingEntity, CreateCouponEntity,
    CreateEmailSubscriberEntity, CreateLedgerEntryEntity, CreateOrderEntity, CreatePayoutEntity,
    CreateSubscriptionEntity, CreatorProfileEntity, LedgerEntryEntity, OrderEntity, PayoutConfig,
    PayoutEntity, PayoutStatus, SubscriptionEntity, SubscriptionStatus, SubscriptionSync,
    UpdateCouponEntity,
};

pub type DbPool = Pool<AsyncPgConnection>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness or exclusion constraint rejected the write.
    #[error("constraint violated: {0}")]
    Conflict(String),

    #[error("failed to obtain a DB connection: {0}")]
    Pool(String),

    #[error(transparent)]
    Database(DieselError),
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::Conflict(info.constraint_name().unwrap_or("unique").to_string())
            }
            // Exclusion constraints (SQLSTATE 23P01) are recognised by the `_excl` naming convention.
            DieselError::DatabaseError(_, info)
                if info.constraint_name().is_some_and(|name| name.ends_with("_excl")) =>
            {
                Self::Conflict(info.constraint_name().unwrap_or("exclusion").to_string())
            }
            other => Self::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, order: CreateOrderEntity) -> StoreResult<OrderEntity>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<OrderEntity>>;

    async fn find_by_gateway_order_id(&self, gateway_order_id: &str)
    -> StoreResult<Option<OrderEntity>>;

    /// Compare-and-set to `paid`. Returns `None` when the order is already paid, which makes the
    /// caller that receives `Some` the only one allowed to run settlement side effects.
    async fn mark_paid(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
    ) -> StoreResult<Option<OrderEntity>>;

    async fn update_platform_fee(&self, id: Uuid, fee: i64) -> StoreResult<()>;

    async fn find_all_by_creator_id(&self, creator_id: Uuid) -> StoreResult<Vec<OrderEntity>>;

    async fn find_paid_by_customer_email(&self, email: &str) -> StoreResult<Vec<OrderEntity>>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn create(&self, sub: CreateSubscriptionEntity) -> StoreResult<SubscriptionEntity>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<SubscriptionEntity>>;

    async fn find_by_gateway_id(&self, gateway_subscription_id: &str)
    -> StoreResult<Option<SubscriptionEntity>>;

    async fn find_all_by_customer_email(&self, email: &str)
    -> StoreResult<Vec<SubscriptionEntity>>;

    async fn sync(&self, id: Uuid, sync: SubscriptionSync) -> StoreResult<SubscriptionEntity>;

    async fn update_status(&self, id: Uuid, status: SubscriptionStatus) -> StoreResult<()>;
}

/// Append-only ledger: entries are only ever inserted.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn append(&self, entry: CreateLedgerEntryEntity) -> StoreResult<LedgerEntryEntity>;

    /// Newest first.
    async fn find_all_by_creator_id(&self, creator_id: Uuid)
    -> StoreResult<Vec<LedgerEntryEntity>>;

    /// Σ credits − Σ debits, aggregated on every call.
    async fn balance(&self, creator_id: Uuid) -> StoreResult<i64>;
}

#[async_trait]
pub trait PayoutRepository: Send + Sync {
    /// Inserts a `processing` payout. Fails with [`StoreError::Conflict`] when the creator already
    /// has one in flight.
    async fn reserve(&self, payout: CreatePayoutEntity) -> StoreResult<PayoutEntity>;

    async fn attach_gateway_id(&self, id: Uuid, gateway_payout_id: &str) -> StoreResult<PayoutEntity>;

    async fn find_processing_by_creator_id(&self, creator_id: Uuid)
    -> StoreResult<Option<PayoutEntity>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<PayoutEntity>>;

    async fn find_by_gateway_id(&self, gateway_payout_id: &str) -> StoreResult<Option<PayoutEntity>>;

    async fn find_all_by_creator_id(&self, creator_id: Uuid) -> StoreResult<Vec<PayoutEntity>>;

    /// Moves a `processing` payout to a terminal state and stamps `completed_at`. Returns `None`
    /// when the payout was already terminal.
    async fn finish(&self, id: Uuid, status: PayoutStatus) -> StoreResult<Option<PayoutEntity>>;

    /// Marks a payout released as `failed` at submission (no gateway id was ever recorded) as
    /// `completed` under the gateway's id. Returns `None` unless this call made the change.
    async fn complete_released(
        &self,
        id: Uuid,
        gateway_payout_id: &str,
    ) -> StoreResult<Option<PayoutEntity>>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Inserts a confirmed booking. Fails with [`StoreError::Conflict`] when a confirmed booking
    /// for the same product already covers part of the interval.
    async fn create(&self, booking: CreateBookingEntity) -> StoreResult<BookingEntity>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<BookingEntity>>;

    /// Confirmed bookings with `start < end_at AND end > start_at`.
    async fn find_overlapping(
        &self,
        product_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> StoreResult<Vec<BookingEntity>>;

    /// Confirmed bookings whose start falls in `[from, to)`.
    async fn find_confirmed_starting_between(
        &self,
        product_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<BookingEntity>>;

    async fn find_all_by_creator_id(&self, creator_id: Uuid) -> StoreResult<Vec<BookingEntity>>;

    async fn find_all_by_buyer_email(&self, email: &str) -> StoreResult<Vec<BookingEntity>>;

    async fn update_status(&self, id: Uuid, status: BookingStatus) -> StoreResult<()>;
}

#[async_trait]
pub trait CouponRepository: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the creator already has the code.
    async fn create(&self, coupon: CreateCouponEntity) -> StoreResult<CouponEntity>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<CouponEntity>>;

    async fn find_by_code(&self, creator_id: Uuid, code: &str) -> StoreResult<Option<CouponEntity>>;

    async fn find_all_by_creator_id(&self, creator_id: Uuid) -> StoreResult<Vec<CouponEntity>>;

    async fn update(&self, id: Uuid, changes: UpdateCouponEntity) -> StoreResult<CouponEntity>;

    async fn increment_usage(&self, id: Uuid) -> StoreResult<()>;
}

/// Projection of the identity store: fee rates and payout destinations.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_creator_id(&self, creator_id: Uuid)
    -> StoreResult<Option<CreatorProfileEntity>>;

    async fn save_payout_config(&self, creator_id: Uuid, config: PayoutConfig) -> StoreResult<()>;
}

#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    /// Creates or refreshes the subscriber, unique on `(creator_id, email)`.
    async fn upsert(&self, subscriber: CreateEmailSubscriberEntity) -> StoreResult<()>;
}

/// Postgres-backed implementation of every repository trait.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
    ) -> StoreResult<diesel_async::pooled_connection::bb8::PooledConnection<'_, AsyncPgConnection>>
    {
        self.pool
            .get()
            .await
            .map_err(|err| StoreError::Pool(err.to_string()))
    }
}
