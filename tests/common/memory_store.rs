use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use creator_settlement::{
    models::{
        BookingEntity, BookingStatus, CouponEntity, CreateBookingEntity, CreateCouponEntity,
        CreateEmailSubscriberEntity, CreateLedgerEntryEntity, CreateOrderEntity,
        CreatePayoutEntity, CreateSubscriptionEntity, CreatorProfileEntity, LedgerEntryEntity,
        OrderEntity, OrderStatus, PayoutConfig, PayoutEntity, PayoutStatus, SubscriptionEntity,
        SubscriptionStatus, SubscriptionSync, UpdateCouponEntity,
    },
    store::{
        BookingRepository, CouponRepository, LedgerRepository, OrderRepository, PayoutRepository,
        ProfileRepository, StoreError, StoreResult, SubscriberRepository, SubscriptionRepository,
    },
};
use diesel::result::Error as DieselError;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    orders: Vec<OrderEntity>,
    subscriptions: Vec<SubscriptionEntity>,
    ledger: Vec<LedgerEntryEntity>,
    payouts: Vec<PayoutEntity>,
    bookings: Vec<BookingEntity>,
    coupons: Vec<CouponEntity>,
    profiles: Vec<CreatorProfileEntity>,
    subscribers: Vec<CreateEmailSubscriberEntity>,
}

/// Every repository over plain vectors. Uniqueness and exclusion constraints of the schema are
/// enforced under the same lock as the write, so races resolve the way they do in Postgres.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

fn not_found() -> StoreError {
    StoreError::Database(DieselError::NotFound)
}

impl InMemoryStore {
    fn with<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        let mut tables = self.tables.lock().unwrap();
        f(&mut tables)
    }

    pub fn insert_profile(&self, profile: CreatorProfileEntity) {
        self.with(|t| t.profiles.push(profile));
    }

    pub fn orders(&self) -> Vec<OrderEntity> {
        self.with(|t| t.orders.clone())
    }

    pub fn ledger(&self, creator_id: Uuid) -> Vec<LedgerEntryEntity> {
        self.with(|t| {
            t.ledger
                .iter()
                .filter(|e| e.creator_id == creator_id)
                .cloned()
                .collect()
        })
    }

    pub fn payouts(&self) -> Vec<PayoutEntity> {
        self.with(|t| t.payouts.clone())
    }

    pub fn bookings(&self) -> Vec<BookingEntity> {
        self.with(|t| t.bookings.clone())
    }

    pub fn subscribers(&self) -> Vec<CreateEmailSubscriberEntity> {
        self.with(|t| t.subscribers.clone())
    }

    pub fn coupon(&self, id: Uuid) -> Option<CouponEntity> {
        self.with(|t| t.coupons.iter().find(|c| c.id == id).cloned())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn create(&self, order: CreateOrderEntity) -> StoreResult<OrderEntity> {
        self.with(|t| {
            if t.orders
                .iter()
                .any(|o| o.gateway_order_id == order.gateway_order_id)
            {
                return Err(StoreError::Conflict("orders_gateway_order_id_key".into()));
            }
            let now = Utc::now();
            let entity = OrderEntity {
                id: order.id,
                line_items: order.line_items,
                booking_slot_start: order.booking_slot_start,
                booking_slot_end: order.booking_slot_end,
                creator_id: order.creator_id,
                customer_name: order.customer_name,
                customer_email: order.customer_email,
                amount: order.amount,
                currency: order.currency,
                coupon_code: order.coupon_code,
                coupon_id: order.coupon_id,
                discount_amount: order.discount_amount,
                platform_fee: 0,
                gateway_order_id: order.gateway_order_id,
                gateway_payment_id: None,
                status: order.status,
                created_at: now,
                updated_at: now,
            };
            t.orders.push(entity.clone());
            Ok(entity)
        })
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<OrderEntity>> {
        Ok(self.with(|t| t.orders.iter().find(|o| o.id == id).cloned()))
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> StoreResult<Option<OrderEntity>> {
        Ok(self.with(|t| {
            t.orders
                .iter()
                .find(|o| o.gateway_order_id == gateway_order_id)
                .cloned()
        }))
    }

    async fn mark_paid(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
    ) -> StoreResult<Option<OrderEntity>> {
        Ok(self.with(|t| {
            let order = t.orders.iter_mut().find(|o| {
                o.gateway_order_id == gateway_order_id && o.status != OrderStatus::Paid
            })?;
            order.status = OrderStatus::Paid;
            order.gateway_payment_id = Some(gateway_payment_id.to_string());
            order.updated_at = Utc::now();
            Some(order.clone())
        }))
    }

    async fn update_platform_fee(&self, id: Uuid, fee: i64) -> StoreResult<()> {
        self.with(|t| {
            let order = t.orders.iter_mut().find(|o| o.id == id).ok_or_else(not_found)?;
            order.platform_fee = fee;
            Ok(())
        })
    }

    async fn find_all_by_creator_id(&self, creator_id: Uuid) -> StoreResult<Vec<OrderEntity>> {
        Ok(self.with(|t| {
            t.orders
                .iter()
                .rev()
                .filter(|o| o.creator_id == creator_id)
                .cloned()
                .collect()
        }))
    }

    async fn find_paid_by_customer_email(&self, email: &str) -> StoreResult<Vec<OrderEntity>> {
        Ok(self.with(|t| {
            t.orders
                .iter()
                .rev()
                .filter(|o| {
                    o.status == OrderStatus::Paid && o.customer_email == email
                })
                .cloned()
                .collect()
        }))
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryStore {
    async fn create(&self, sub: CreateSubscriptionEntity) -> StoreResult<SubscriptionEntity> {
        let now = Utc::now();
        let entity = SubscriptionEntity {
            id: sub.id,
            product_id: sub.product_id,
            creator_id: sub.creator_id,
            customer_email: sub.customer_email,
            customer_name: sub.customer_name,
            amount: sub.amount,
            currency: sub.currency,
            interval: sub.interval,
            gateway_plan_id: sub.gateway_plan_id,
            gateway_subscription_id: sub.gateway_subscription_id,
            status: sub.status,
            current_start: None,
            current_end: None,
            cancel_at_period_end: false,
            paid_count: 0,
            total_count: sub.total_count,
            created_at: now,
            updated_at: now,
        };
        self.with(|t| t.subscriptions.push(entity.clone()));
        Ok(entity)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<SubscriptionEntity>> {
        Ok(self.with(|t| t.subscriptions.iter().find(|s| s.id == id).cloned()))
    }

    async fn find_by_gateway_id(
        &self,
        gateway_subscription_id: &str,
    ) -> StoreResult<Option<SubscriptionEntity>> {
        Ok(self.with(|t| {
            t.subscriptions
                .iter()
                .find(|s| s.gateway_subscription_id == gateway_subscription_id)
                .cloned()
        }))
    }

    async fn find_all_by_customer_email(
        &self,
        email: &str,
    ) -> StoreResult<Vec<SubscriptionEntity>> {
        Ok(self.with(|t| {
            t.subscriptions
                .iter()
                .filter(|s| s.customer_email == email)
                .cloned()
                .collect()
        }))
    }

    async fn sync(&self, id: Uuid, sync: SubscriptionSync) -> StoreResult<SubscriptionEntity> {
        self.with(|t| {
            let sub = t
                .subscriptions
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(not_found)?;
            sub.status = sync.status;
            sub.paid_count = sync.paid_count;
            // `None` fields are skipped by the changeset.
            if sync.current_start.is_some() {
                sub.current_start = sync.current_start;
            }
            if sync.current_end.is_some() {
                sub.current_end = sync.current_end;
            }
            sub.updated_at = Utc::now();
            Ok(sub.clone())
        })
    }

    async fn update_status(&self, id: Uuid, status: SubscriptionStatus) -> StoreResult<()> {
        self.with(|t| {
            let sub = t
                .subscriptions
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(not_found)?;
            sub.status = status;
            Ok(())
        })
    }
}

#[async_trait]
impl LedgerRepository for InMemoryStore {
    async fn append(&self, entry: CreateLedgerEntryEntity) -> StoreResult<LedgerEntryEntity> {
        let entity = LedgerEntryEntity {
            id: entry.id,
            creator_id: entry.creator_id,
            amount: entry.amount,
            entry_type: entry.entry_type,
            source: entry.source,
            reference_id: entry.reference_id,
            description: entry.description,
            created_at: Utc::now(),
        };
        self.with(|t| t.ledger.push(entity.clone()));
        Ok(entity)
    }

    async fn find_all_by_creator_id(
        &self,
        creator_id: Uuid,
    ) -> StoreResult<Vec<LedgerEntryEntity>> {
        let mut entries = self.ledger(creator_id);
        entries.reverse();
        Ok(entries)
    }

    async fn balance(&self, creator_id: Uuid) -> StoreResult<i64> {
        Ok(self
            .ledger(creator_id)
            .iter()
            .map(LedgerEntryEntity::signed_amount)
            .sum())
    }
}

#[async_trait]
impl PayoutRepository for InMemoryStore {
    async fn reserve(&self, payout: CreatePayoutEntity) -> StoreResult<PayoutEntity> {
        self.with(|t| {
            if t.payouts.iter().any(|p| {
                p.creator_id == payout.creator_id && p.status == PayoutStatus::Processing
            }) {
                return Err(StoreError::Conflict("payouts_one_processing_per_creator".into()));
            }
            let entity = PayoutEntity {
                id: payout.id,
                creator_id: payout.creator_id,
                amount: payout.amount,
                platform_fee: payout.platform_fee,
                net_amount: payout.net_amount,
                gateway_payout_id: None,
                status: payout.status,
                created_at: Utc::now(),
                completed_at: None,
            };
            t.payouts.push(entity.clone());
            Ok(entity)
        })
    }

    async fn attach_gateway_id(
        &self,
        id: Uuid,
        gateway_payout_id: &str,
    ) -> StoreResult<PayoutEntity> {
        self.with(|t| {
            let payout = t.payouts.iter_mut().find(|p| p.id == id).ok_or_else(not_found)?;
            payout.gateway_payout_id = Some(gateway_payout_id.to_string());
            Ok(payout.clone())
        })
    }

    async fn find_processing_by_creator_id(
        &self,
        creator_id: Uuid,
    ) -> StoreResult<Option<PayoutEntity>> {
        Ok(self.with(|t| {
            t.payouts
                .iter()
                .find(|p| p.creator_id == creator_id && p.status == PayoutStatus::Processing)
                .cloned()
        }))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<PayoutEntity>> {
        Ok(self.with(|t| t.payouts.iter().find(|p| p.id == id).cloned()))
    }

    async fn find_by_gateway_id(&self, gateway_payout_id: &str) -> StoreResult<Option<PayoutEntity>> {
        Ok(self.with(|t| {
            t.payouts
                .iter()
                .find(|p| p.gateway_payout_id.as_deref() == Some(gateway_payout_id))
                .cloned()
        }))
    }

    async fn find_all_by_creator_id(&self, creator_id: Uuid) -> StoreResult<Vec<PayoutEntity>> {
        Ok(self.with(|t| {
            t.payouts
                .iter()
                .rev()
                .filter(|p| p.creator_id == creator_id)
                .cloned()
                .collect()
        }))
    }

    async fn finish(&self, id: Uuid, status: PayoutStatus) -> StoreResult<Option<PayoutEntity>> {
        Ok(self.with(|t| {
            let payout = t
                .payouts
                .iter_mut()
                .find(|p| p.id == id && p.status == PayoutStatus::Processing)?;
            payout.status = status;
            payout.completed_at = Some(Utc::now());
            Some(payout.clone())
        }))
    }

    async fn complete_released(
        &self,
        id: Uuid,
        gateway_payout_id: &str,
    ) -> StoreResult<Option<PayoutEntity>> {
        Ok(self.with(|t| {
            let payout = t.payouts.iter_mut().find(|p| {
                p.id == id && p.status == PayoutStatus::Failed && p.gateway_payout_id.is_none()
            })?;
            payout.status = PayoutStatus::Completed;
            payout.gateway_payout_id = Some(gateway_payout_id.to_string());
            payout.completed_at = Some(Utc::now());
            Some(payout.clone())
        }))
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn create(&self, booking: CreateBookingEntity) -> StoreResult<BookingEntity> {
        self.with(|t| {
            if t.bookings.iter().any(|b| {
                b.product_id == booking.product_id
                    && b.status == BookingStatus::Confirmed
                    && b.slot_start < booking.slot_end
                    && b.slot_end > booking.slot_start
            }) {
                return Err(StoreError::Conflict("bookings_no_overlap_excl".into()));
            }
            let now = Utc::now();
            let entity = BookingEntity {
                id: booking.id,
                product_id: booking.product_id,
                creator_id: booking.creator_id,
                order_id: booking.order_id,
                buyer_email: booking.buyer_email,
                buyer_name: booking.buyer_name,
                slot_start: booking.slot_start,
                slot_end: booking.slot_end,
                meeting_link: booking.meeting_link,
                status: booking.status,
                created_at: now,
                updated_at: now,
            };
            t.bookings.push(entity.clone());
            Ok(entity)
        })
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<BookingEntity>> {
        Ok(self.with(|t| t.bookings.iter().find(|b| b.id == id).cloned()))
    }

    async fn find_overlapping(
        &self,
        product_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> StoreResult<Vec<BookingEntity>> {
        Ok(self.with(|t| {
            t.bookings
                .iter()
                .filter(|b| {
                    b.product_id == product_id
                        && b.status == BookingStatus::Confirmed
                        && b.slot_start < end_at
                        && b.slot_end > start_at
                })
                .cloned()
                .collect()
        }))
    }

    async fn find_confirmed_starting_between(
        &self,
        product_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<BookingEntity>> {
        Ok(self.with(|t| {
            t.bookings
                .iter()
                .filter(|b| {
                    b.product_id == product_id
                        && b.status == BookingStatus::Confirmed
                        && b.slot_start >= from
                        && b.slot_start < to
                })
                .cloned()
                .collect()
        }))
    }

    async fn find_all_by_creator_id(&self, creator_id: Uuid) -> StoreResult<Vec<BookingEntity>> {
        Ok(self.with(|t| {
            t.bookings
                .iter()
                .filter(|b| b.creator_id == creator_id)
                .cloned()
                .collect()
        }))
    }

    async fn find_all_by_buyer_email(&self, email: &str) -> StoreResult<Vec<BookingEntity>> {
        Ok(self.with(|t| {
            t.bookings
                .iter()
                .filter(|b| b.buyer_email == email)
                .cloned()
                .collect()
        }))
    }

    async fn update_status(&self, id: Uuid, status: BookingStatus) -> StoreResult<()> {
        self.with(|t| {
            let booking = t.bookings.iter_mut().find(|b| b.id == id).ok_or_else(not_found)?;
            booking.status = status;
            Ok(())
        })
    }
}

#[async_trait]
impl CouponRepository for InMemoryStore {
    async fn create(&self, coupon: CreateCouponEntity) -> StoreResult<CouponEntity> {
        self.with(|t| {
            if t.coupons
                .iter()
                .any(|c| c.creator_id == coupon.creator_id && c.code == coupon.code)
            {
                return Err(StoreError::Conflict("coupons_creator_id_code_key".into()));
            }
            let now = Utc::now();
            let entity = CouponEntity {
                id: coupon.id,
                creator_id: coupon.creator_id,
                code: coupon.code,
                discount_type: coupon.discount_type,
                discount_value: coupon.discount_value,
                min_order_amount: coupon.min_order_amount,
                max_uses: coupon.max_uses,
                times_used: 0,
                applicable_product_ids: coupon.applicable_product_ids,
                is_active: coupon.is_active,
                expires_at: coupon.expires_at,
                created_at: now,
                updated_at: now,
            };
            t.coupons.push(entity.clone());
            Ok(entity)
        })
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<CouponEntity>> {
        Ok(self.coupon(id))
    }

    async fn find_by_code(&self, creator_id: Uuid, code: &str) -> StoreResult<Option<CouponEntity>> {
        Ok(self.with(|t| {
            t.coupons
                .iter()
                .find(|c| c.creator_id == creator_id && c.code == code)
                .cloned()
        }))
    }

    async fn find_all_by_creator_id(&self, creator_id: Uuid) -> StoreResult<Vec<CouponEntity>> {
        Ok(self.with(|t| {
            t.coupons
                .iter()
                .filter(|c| c.creator_id == creator_id)
                .cloned()
                .collect()
        }))
    }

    async fn update(&self, id: Uuid, changes: UpdateCouponEntity) -> StoreResult<CouponEntity> {
        self.with(|t| {
            let coupon = t.coupons.iter_mut().find(|c| c.id == id).ok_or_else(not_found)?;
            if let Some(is_active) = changes.is_active {
                coupon.is_active = is_active;
            }
            if let Some(max_uses) = changes.max_uses {
                coupon.max_uses = max_uses;
            }
            if changes.expires_at.is_some() {
                coupon.expires_at = changes.expires_at;
            }
            coupon.updated_at = Utc::now();
            Ok(coupon.clone())
        })
    }

    async fn increment_usage(&self, id: Uuid) -> StoreResult<()> {
        self.with(|t| {
            let coupon = t.coupons.iter_mut().find(|c| c.id == id).ok_or_else(not_found)?;
            coupon.times_used += 1;
            Ok(())
        })
    }
}

#[async_trait]
impl ProfileRepository for InMemoryStore {
    async fn find_by_creator_id(
        &self,
        creator_id: Uuid,
    ) -> StoreResult<Option<CreatorProfileEntity>> {
        Ok(self.with(|t| {
            t.profiles
                .iter()
                .find(|p| p.creator_id == creator_id)
                .cloned()
        }))
    }

    async fn save_payout_config(&self, creator_id: Uuid, config: PayoutConfig) -> StoreResult<()> {
        self.with(|t| {
            let profile = t
                .profiles
                .iter_mut()
                .find(|p| p.creator_id == creator_id)
                .ok_or_else(not_found)?;
            profile.payout_holder_name = Some(config.account_holder_name);
            profile.payout_account_masked = Some(config.account_number_masked);
            profile.payout_ifsc = Some(config.ifsc);
            profile.gateway_contact_id = Some(config.gateway_contact_id);
            profile.gateway_fund_account_id = Some(config.gateway_fund_account_id);
            profile.payout_verified = config.is_verified;
            profile.updated_at = Utc::now();
            Ok(())
        })
    }
}

#[async_trait]
impl SubscriberRepository for InMemoryStore {
    async fn upsert(&self, subscriber: CreateEmailSubscriberEntity) -> StoreResult<()> {
        self.with(|t| {
            match t.subscribers.iter_mut().find(|s| {
                s.creator_id == subscriber.creator_id && s.email == subscriber.email
            }) {
                Some(existing) => {
                    existing.name = subscriber.name;
                    existing.consent_given = subscriber.consent_given;
                }
                None => t.subscribers.push(subscriber),
            }
            Ok(())
        })
    }
}
