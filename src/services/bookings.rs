use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use super::normalize_email;
use crate::{
    api::catalog::ProductCatalog,
    app_error::AppError,
    models::{BookingEntity, BookingStatus, CreateBookingEntity, Product, ProductType},
    store::{BookingRepository, StoreError},
};

pub const DEFAULT_SLOT_MINUTES: i64 = 30;
pub const DEFAULT_CANCELLATION_HOURS: i64 = 24;

/// Who is asking to cancel a booking.
#[derive(Debug, Clone)]
pub enum Requester {
    Buyer { email: String },
    Creator { creator_id: Uuid },
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub product_id: Uuid,
    pub creator_id: Uuid,
    pub order_id: Uuid,
    pub buyer_email: String,
    pub buyer_name: String,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
    pub meeting_link: Option<String>,
}

pub fn slot_duration(product: &Product) -> Duration {
    Duration::minutes(
        product
            .duration_minutes
            .filter(|minutes| *minutes > 0)
            .unwrap_or(DEFAULT_SLOT_MINUTES),
    )
}

fn product_timezone(product: &Product) -> Tz {
    let Some(name) = product.timezone.as_deref().filter(|name| !name.is_empty()) else {
        return Tz::UTC;
    };
    name.parse::<Tz>().unwrap_or_else(|_| {
        tracing::warn!(
            timezone = name,
            product_id = %product.id,
            "Invalid timezone configured on product, falling back to UTC"
        );
        Tz::UTC
    })
}

fn local_to_utc(tz: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

/// Expands the product's weekly windows into candidate slot starts (UTC) for `date`, interpreted
/// in the product's timezone. Windows are walked in configured order and are not de-duplicated.
pub fn generate_slots(product: &Product, date: NaiveDate) -> Vec<DateTime<Utc>> {
    let tz = product_timezone(product);
    let duration = slot_duration(product);
    let weekday = date.weekday().num_days_from_sunday();

    let mut slots = Vec::new();
    for window in product.availability.iter().filter(|w| w.day_of_week == weekday) {
        let (Ok(start), Ok(end)) = (
            NaiveTime::parse_from_str(&window.start_time, "%H:%M"),
            NaiveTime::parse_from_str(&window.end_time, "%H:%M"),
        ) else {
            tracing::error!(
                product_id = %product.id,
                start_time = %window.start_time,
                end_time = %window.end_time,
                "Invalid availability window"
            );
            continue;
        };

        let (Some(window_start), Some(window_end)) =
            (local_to_utc(tz, date, start), local_to_utc(tz, date, end))
        else {
            continue;
        };

        let mut current = window_start;
        while current + duration <= window_end {
            slots.push(current);
            current += duration;
        }
    }
    slots
}

/// Start of `date` in the product's timezone, as a UTC instant.
fn start_of_day(product: &Product, date: NaiveDate) -> DateTime<Utc> {
    local_to_utc(product_timezone(product), date, NaiveTime::MIN)
        .unwrap_or_else(|| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

#[derive(Clone)]
pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    catalog: Arc<dyn ProductCatalog>,
}

impl BookingService {
    pub fn new(bookings: Arc<dyn BookingRepository>, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { bookings, catalog }
    }

    /// Free slot starts (UTC) for `date` (`YYYY-MM-DD`). Slots already taken or not strictly after
    /// `now` are left out.
    pub async fn get_available_slots(
        &self,
        product_id: Uuid,
        date: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, AppError> {
        let product = self
            .catalog
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("product".into()))?;
        if product.product_type != ProductType::Booking {
            return Err(AppError::InvalidProductType);
        }
        if product.availability.is_empty() {
            return Ok(vec![]);
        }

        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
            AppError::BadRequest("invalid date format (expected YYYY-MM-DD)".into())
        })?;

        let candidates = generate_slots(&product, date);
        if candidates.is_empty() {
            return Ok(vec![]);
        }

        let day_start = start_of_day(&product, date);
        let taken: HashSet<DateTime<Utc>> = self
            .bookings
            .find_confirmed_starting_between(product_id, day_start, day_start + Duration::hours(24))
            .await?
            .into_iter()
            .map(|booking| booking.slot_start)
            .collect();

        Ok(candidates
            .into_iter()
            .filter(|slot| !taken.contains(slot) && *slot > now)
            .collect())
    }

    /// Inserts a confirmed booking after re-checking the interval against confirmed bookings.
    pub async fn create_booking(&self, booking: NewBooking) -> Result<BookingEntity, AppError> {
        if booking.slot_end <= booking.slot_start {
            return Err(AppError::BadRequest("slot end must be after slot start".into()));
        }

        let overlapping = self
            .bookings
            .find_overlapping(booking.product_id, booking.slot_start, booking.slot_end)
            .await?;
        if !overlapping.is_empty() {
            return Err(AppError::SlotUnavailable);
        }

        let id = Uuid::new_v4();
        let meeting_link = booking
            .meeting_link
            .filter(|link| !link.is_empty())
            .unwrap_or_else(|| {
                format!("https://meet.google.com/placeholder-{}", &id.simple().to_string()[..6])
            });

        let created = self
            .bookings
            .create(CreateBookingEntity {
                id,
                product_id: booking.product_id,
                creator_id: booking.creator_id,
                order_id: booking.order_id,
                buyer_email: normalize_email(&booking.buyer_email),
                buyer_name: booking.buyer_name,
                slot_start: booking.slot_start,
                slot_end: booking.slot_end,
                meeting_link,
                status: BookingStatus::Confirmed,
            })
            .await;

        match created {
            Ok(booking) => {
                tracing::info!(booking_id = %booking.id, product_id = %booking.product_id, "Booking confirmed");
                Ok(booking)
            }
            // Lost the race to a concurrent booking between the check and the insert.
            Err(StoreError::Conflict(_)) => Err(AppError::SlotUnavailable),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        requester: Requester,
        now: DateTime<Utc>,
    ) -> Result<BookingEntity, AppError> {
        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("booking".into()))?;

        let is_creator = match &requester {
            Requester::Creator { creator_id } => {
                if booking.creator_id != *creator_id {
                    return Err(AppError::Unauthorized(
                        "unauthorized to cancel this booking".into(),
                    ));
                }
                true
            }
            Requester::Buyer { email } => {
                if !booking.buyer_email.eq_ignore_ascii_case(email) {
                    return Err(AppError::Unauthorized(
                        "unauthorized to cancel this booking".into(),
                    ));
                }
                false
            }
        };

        if booking.status == BookingStatus::Cancelled {
            return Err(AppError::AlreadyCancelled("booking"));
        }

        if !is_creator {
            let window_hours = self
                .catalog
                .find_by_id(booking.product_id)
                .await?
                .and_then(|product| product.cancellation_window_hours)
                .filter(|hours| *hours > 0)
                .unwrap_or(DEFAULT_CANCELLATION_HOURS);

            let cutoff = booking.slot_start - Duration::hours(window_hours);
            if now > cutoff {
                return Err(AppError::PolicyViolation(format!(
                    "cancellation period has expired (requires {window_hours} hours notice)"
                )));
            }
        }

        self.bookings
            .update_status(booking_id, BookingStatus::Cancelled)
            .await?;
        tracing::info!(%booking_id, by_creator = is_creator, "Booking cancelled");
        Ok(BookingEntity {
            status: BookingStatus::Cancelled,
            ..booking
        })
    }

    pub async fn get_creator_bookings(&self, creator_id: Uuid) -> Result<Vec<BookingEntity>, AppError> {
        Ok(self.bookings.find_all_by_creator_id(creator_id).await?)
    }

    pub async fn get_buyer_bookings(&self, email: &str) -> Result<Vec<BookingEntity>, AppError> {
        Ok(self
            .bookings
            .find_all_by_buyer_email(&normalize_email(email))
            .await?)
    }
}
