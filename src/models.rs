use std::io::Write;

use chrono::{DateTime, Utc};
use diesel::{
    AsExpression, FromSqlRow, Selectable,
    deserialize::{self, FromSql},
    pg::{Pg, PgValue},
    prelude::{AsChangeset, Identifiable, Insertable, Queryable},
    serialize::{self, IsNull, Output, ToSql},
    sql_types::{Jsonb, Text},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Declares a status-like enum persisted as its text label.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
            AsExpression, FromSqlRow,
        )]
        #[diesel(sql_type = Text)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("unknown {} '{}'", stringify!($name), other)),
                }
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let raw = std::str::from_utf8(bytes.as_bytes())?;
                raw.parse::<Self>().map_err(Into::into)
            }
        }
    };
}

// Catalog

text_enum! {
    ProductType {
        Download => "download",
        Course => "course",
        Booking => "booking",
        LeadMagnet => "lead_magnet",
        Membership => "membership",
    }
}

/// Order bump offered alongside a product at checkout.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct BumpConfig {
    pub bump_product_id: Uuid,
    /// Discount in minor units applied to the bump product's price.
    #[serde(default)]
    pub bump_discount: i64,
}

/// Recurring weekly window during which a coaching product can be booked.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct AvailabilityWindow {
    /// 0 = Sunday, 1 = Monday, ...
    pub day_of_week: u32,
    /// Local wall-clock time, `HH:MM`.
    pub start_time: String,
    pub end_time: String,
}

/// Product as served by the catalog service. Read-only from this service's point of view.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub price: i64,
    pub product_type: ProductType,
    #[serde(default)]
    pub is_visible: bool,
    #[serde(default)]
    pub file_key: Option<String>,
    #[serde(default)]
    pub bump: Option<BumpConfig>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub availability: Vec<AvailabilityWindow>,
    #[serde(default)]
    pub cancellation_window_hours: Option<i64>,
    #[serde(default)]
    pub subscription_interval: Option<String>,
}

// Orders

text_enum! {
    OrderStatus {
        Created => "created",
        Paid => "paid",
        Failed => "failed",
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct LineItem {
    pub product_id: Uuid,
    pub title: String,
    pub amount: i64,
    pub product_type: ProductType,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, AsExpression, FromSqlRow)]
#[diesel(sql_type = Jsonb)]
#[serde(transparent)]
pub struct LineItems(pub Vec<LineItem>);

impl ToSql<Jsonb, Pg> for LineItems {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        let value = serde_json::to_value(&self.0)?;
        <serde_json::Value as ToSql<Jsonb, Pg>>::to_sql(&value, &mut out.reborrow())
    }
}

impl FromSql<Jsonb, Pg> for LineItems {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let value = <serde_json::Value as FromSql<Jsonb, Pg>>::from_sql(bytes)?;
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: Uuid,
    #[schema(value_type = Vec<LineItem>)]
    pub line_items: LineItems,
    pub booking_slot_start: Option<DateTime<Utc>>,
    pub booking_slot_end: Option<DateTime<Utc>>,
    pub creator_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub amount: i64,
    pub currency: String,
    pub coupon_code: Option<String>,
    pub coupon_id: Option<Uuid>,
    pub discount_amount: i64,
    pub platform_fee: i64,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderEntity {
    /// The product the order was opened for; bumps follow it.
    pub fn primary_product_id(&self) -> Option<Uuid> {
        self.line_items.0.first().map(|item| item.product_id)
    }

    pub fn contains_product(&self, product_id: Uuid) -> bool {
        self.line_items.0.iter().any(|item| item.product_id == product_id)
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateOrderEntity {
    pub id: Uuid,
    pub line_items: LineItems,
    pub booking_slot_start: Option<DateTime<Utc>>,
    pub booking_slot_end: Option<DateTime<Utc>>,
    pub creator_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub amount: i64,
    pub currency: String,
    pub coupon_code: Option<String>,
    pub coupon_id: Option<Uuid>,
    pub discount_amount: i64,
    pub gateway_order_id: String,
    pub status: OrderStatus,
}

// Subscriptions

text_enum! {
    SubscriptionStatus {
        Created => "created",
        Active => "active",
        PastDue => "past_due",
        Halted => "halted",
        Cancelled => "cancelled",
        Completed => "completed",
    }
}

impl SubscriptionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub product_id: Uuid,
    pub creator_id: Uuid,
    pub customer_email: String,
    pub customer_name: String,
    pub amount: i64,
    pub currency: String,
    pub interval: String,
    pub gateway_plan_id: String,
    pub gateway_subscription_id: String,
    pub status: SubscriptionStatus,
    pub current_start: Option<DateTime<Utc>>,
    pub current_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub paid_count: i32,
    pub total_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateSubscriptionEntity {
    pub id: Uuid,
    pub product_id: Uuid,
    pub creator_id: Uuid,
    pub customer_email: String,
    pub customer_name: String,
    pub amount: i64,
    pub currency: String,
    pub interval: String,
    pub gateway_plan_id: String,
    pub gateway_subscription_id: String,
    pub status: SubscriptionStatus,
    pub total_count: i32,
}

/// Gateway-reported subscription state applied by webhook sync.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::subscriptions)]
pub struct SubscriptionSync {
    pub status: SubscriptionStatus,
    pub paid_count: i32,
    pub current_start: Option<DateTime<Utc>>,
    pub current_end: Option<DateTime<Utc>>,
}

// Ledger

text_enum! {
    EntryType {
        Credit => "credit",
        Debit => "debit",
    }
}

text_enum! {
    EntrySource {
        Order => "order",
        Payout => "payout",
    }
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::ledger_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LedgerEntryEntity {
    pub id: Uuid,
    pub creator_id: Uuid,
    /// Always positive; the direction is carried by `entry_type`.
    pub amount: i64,
    pub entry_type: EntryType,
    pub source: EntrySource,
    pub reference_id: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntryEntity {
    pub fn signed_amount(&self) -> i64 {
        match self.entry_type {
            EntryType::Credit => self.amount,
            EntryType::Debit => -self.amount,
        }
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::ledger_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateLedgerEntryEntity {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub amount: i64,
    pub entry_type: EntryType,
    pub source: EntrySource,
    pub reference_id: String,
    pub description: String,
}

// Payouts

text_enum! {
    PayoutStatus {
        Processing => "processing",
        Completed => "completed",
        Failed => "failed",
        Reversed => "reversed",
    }
}

impl PayoutStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }

    /// Terminal states that hand the withdrawn amount back to the creator.
    pub fn restores_balance(&self) -> bool {
        matches!(self, Self::Failed | Self::Reversed)
    }
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::payouts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PayoutEntity {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub amount: i64,
    pub platform_fee: i64,
    pub net_amount: i64,
    pub gateway_payout_id: Option<String>,
    pub status: PayoutStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::payouts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreatePayoutEntity {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub amount: i64,
    pub platform_fee: i64,
    pub net_amount: i64,
    pub status: PayoutStatus,
}

// Bookings

text_enum! {
    BookingStatus {
        Confirmed => "confirmed",
        Cancelled => "cancelled",
        Completed => "completed",
    }
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BookingEntity {
    pub id: Uuid,
    pub product_id: Uuid,
    pub creator_id: Uuid,
    pub order_id: Uuid,
    pub buyer_email: String,
    pub buyer_name: String,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
    pub meeting_link: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateBookingEntity {
    pub id: Uuid,
    pub product_id: Uuid,
    pub creator_id: Uuid,
    pub order_id: Uuid,
    pub buyer_email: String,
    pub buyer_name: String,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
    pub meeting_link: String,
    pub status: BookingStatus,
}

// Coupons

text_enum! {
    DiscountType {
        Percentage => "percentage",
        Fixed => "fixed",
    }
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::coupons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CouponEntity {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    /// Percentage (1-100) or a fixed amount in minor units.
    pub discount_value: i64,
    pub min_order_amount: i64,
    /// 0 means unlimited.
    pub max_uses: i64,
    pub times_used: i64,
    /// Empty means the coupon applies to every product of the creator.
    pub applicable_product_ids: Vec<Uuid>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::coupons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateCouponEntity {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_order_amount: i64,
    pub max_uses: i64,
    pub applicable_product_ids: Vec<Uuid>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(AsChangeset, Deserialize, Debug, Clone, Default, ToSchema)]
#[diesel(table_name = crate::schema::coupons)]
pub struct UpdateCouponEntity {
    pub is_active: Option<bool>,
    pub max_uses: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
}

// Creator profiles

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::creator_profiles)]
#[diesel(primary_key(creator_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreatorProfileEntity {
    pub creator_id: Uuid,
    pub display_name: String,
    pub email: String,
    pub platform_fee_rate: Option<f64>,
    pub payout_holder_name: Option<String>,
    pub payout_account_masked: Option<String>,
    pub payout_ifsc: Option<String>,
    pub gateway_contact_id: Option<String>,
    pub gateway_fund_account_id: Option<String>,
    pub payout_verified: bool,
    pub updated_at: DateTime<Utc>,
}

impl CreatorProfileEntity {
    pub fn payout_config(&self) -> Option<PayoutConfig> {
        Some(PayoutConfig {
            account_holder_name: self.payout_holder_name.clone()?,
            account_number_masked: self.payout_account_masked.clone()?,
            ifsc: self.payout_ifsc.clone()?,
            gateway_contact_id: self.gateway_contact_id.clone()?,
            gateway_fund_account_id: self.gateway_fund_account_id.clone()?,
            is_verified: self.payout_verified,
        })
    }
}

/// Bank destination for withdrawals. Only the last four account digits are ever stored.
#[derive(AsChangeset, Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::creator_profiles)]
pub struct PayoutConfig {
    #[diesel(column_name = payout_holder_name)]
    pub account_holder_name: String,
    #[diesel(column_name = payout_account_masked)]
    pub account_number_masked: String,
    #[diesel(column_name = payout_ifsc)]
    pub ifsc: String,
    pub gateway_contact_id: String,
    pub gateway_fund_account_id: String,
    #[diesel(column_name = payout_verified)]
    pub is_verified: bool,
}

/// Raw bank details as submitted by the creator. Never persisted as-is.
#[derive(Deserialize, Clone, ToSchema)]
pub struct BankDetails {
    pub account_holder_name: String,
    pub account_number: String,
    pub ifsc: String,
}

impl std::fmt::Debug for BankDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BankDetails")
            .field("account_holder_name", &self.account_holder_name)
            .field("ifsc", &self.ifsc)
            .finish_non_exhaustive()
    }
}

// Email subscribers

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::email_subscribers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateEmailSubscriberEntity {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub email: String,
    pub name: String,
    pub source_product_id: Uuid,
    pub consent_given: bool,
}
