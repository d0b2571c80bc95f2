//! Razorpay webhook payloads normalised into typed events.
//!
//! Signature verification happens before anything here runs; this module only interprets a body
//! that is already known to come from the gateway.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use crate::models::{PayoutStatus, SubscriptionStatus};

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("malformed webhook body: {0}")]
    Malformed(String),

    #[error("webhook payload has no {0} entity")]
    MissingEntity(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionEventKind {
    Charged,
    Halted,
    Cancelled,
    Completed,
}

impl SubscriptionEventKind {
    /// Status implied by the event when the entity carries none we recognise.
    fn implied_status(self) -> SubscriptionStatus {
        match self {
            Self::Charged => SubscriptionStatus::Active,
            Self::Halted => SubscriptionStatus::Halted,
            Self::Cancelled => SubscriptionStatus::Cancelled,
            Self::Completed => SubscriptionStatus::Completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionEvent {
    pub kind: SubscriptionEventKind,
    pub gateway_subscription_id: String,
    pub status: SubscriptionStatus,
    pub paid_count: i32,
    pub current_start: Option<DateTime<Utc>>,
    pub current_end: Option<DateTime<Utc>>,
    /// Present on `subscription.charged`.
    pub gateway_payment_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PayoutEvent {
    pub gateway_payout_id: String,
    /// Our payout id as submitted with the transfer.
    pub reference_id: Option<String>,
    pub status: PayoutStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    OrderPaid {
        gateway_order_id: String,
        gateway_payment_id: String,
    },
    Subscription(SubscriptionEvent),
    Payout(PayoutEvent),
    Unknown(String),
}

#[derive(Deserialize)]
struct RawEvent {
    event: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize)]
struct RawPayment {
    id: String,
    #[serde(default)]
    order_id: Option<String>,
}

#[derive(Deserialize)]
struct RawSubscription {
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    paid_count: i32,
    #[serde(default)]
    current_start: Option<i64>,
    #[serde(default)]
    current_end: Option<i64>,
    #[serde(default)]
    start_at: Option<i64>,
    #[serde(default)]
    end_at: Option<i64>,
}

#[derive(Deserialize)]
struct RawPayout {
    id: String,
    #[serde(default)]
    reference_id: Option<String>,
}

pub fn parse_event(body: &[u8]) -> Result<GatewayEvent, WebhookError> {
    let raw: RawEvent =
        serde_json::from_slice(body).map_err(|err| WebhookError::Malformed(err.to_string()))?;

    let event = match raw.event.as_str() {
        "order.paid" => {
            let payment: RawPayment = entity(&raw.payload, "payment")?;
            let gateway_order_id = payment
                .order_id
                .filter(|id| !id.is_empty())
                .ok_or_else(|| WebhookError::Malformed("payment has no order_id".into()))?;
            GatewayEvent::OrderPaid {
                gateway_order_id,
                gateway_payment_id: payment.id,
            }
        }
        "subscription.charged" => subscription(&raw.payload, SubscriptionEventKind::Charged)?,
        "subscription.halted" => subscription(&raw.payload, SubscriptionEventKind::Halted)?,
        "subscription.cancelled" => subscription(&raw.payload, SubscriptionEventKind::Cancelled)?,
        "subscription.completed" => subscription(&raw.payload, SubscriptionEventKind::Completed)?,
        "payout.processed" => payout(&raw.payload, PayoutStatus::Completed)?,
        "payout.failed" | "payout.rejected" => payout(&raw.payload, PayoutStatus::Failed)?,
        "payout.reversed" => payout(&raw.payload, PayoutStatus::Reversed)?,
        _ => GatewayEvent::Unknown(raw.event),
    };
    Ok(event)
}

fn entity<T: DeserializeOwned>(payload: &Value, key: &'static str) -> Result<T, WebhookError> {
    let raw = payload
        .get(key)
        .and_then(|wrapper| wrapper.get("entity"))
        .ok_or(WebhookError::MissingEntity(key))?;
    serde_json::from_value(raw.clone())
        .map_err(|err| WebhookError::Malformed(format!("{key} entity: {err}")))
}

fn subscription(payload: &Value, kind: SubscriptionEventKind) -> Result<GatewayEvent, WebhookError> {
    let sub: RawSubscription = entity(payload, "subscription")?;
    let gateway_payment_id = entity::<RawPayment>(payload, "payment").ok().map(|p| p.id);

    let status = match sub.status.as_deref() {
        Some("active") => SubscriptionStatus::Active,
        Some("pending") => SubscriptionStatus::PastDue,
        Some("halted") => SubscriptionStatus::Halted,
        Some("cancelled") => SubscriptionStatus::Cancelled,
        Some("completed" | "expired") => SubscriptionStatus::Completed,
        _ => kind.implied_status(),
    };

    Ok(GatewayEvent::Subscription(SubscriptionEvent {
        kind,
        gateway_subscription_id: sub.id,
        status,
        paid_count: sub.paid_count,
        current_start: unix(sub.current_start.or(sub.start_at)),
        current_end: unix(sub.current_end.or(sub.end_at)),
        gateway_payment_id,
    }))
}

fn payout(payload: &Value, status: PayoutStatus) -> Result<GatewayEvent, WebhookError> {
    let payout: RawPayout = entity(payload, "payout")?;
    Ok(GatewayEvent::Payout(PayoutEvent {
        gateway_payout_id: payout.id,
        reference_id: payout.reference_id.filter(|id| !id.is_empty()),
        status,
    }))
}

fn unix(seconds: Option<i64>) -> Option<DateTime<Utc>> {
    seconds
        .filter(|seconds| *seconds > 0)
        .and_then(|seconds| Utc.timestamp_opt(seconds, 0).single())
}
