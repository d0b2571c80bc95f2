//! Razorpay (and RazorpayX payouts) over plain HTTP.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use sha2::Sha256;

use crate::{config::RazorpayConfig, models::BankDetails};

/// Order, plan and subscription calls.
pub const GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);
/// Bank transfers are slower to acknowledge.
pub const PAYOUT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("{operation} could not reach the gateway: {reason}")]
    Connect {
        operation: &'static str,
        reason: String,
    },

    /// The request left but the exchange broke before a status came back.
    #[error("{operation} failed in transit: {reason}")]
    Transport {
        operation: &'static str,
        reason: String,
    },

    #[error("{operation} rejected with status {status}: {body}")]
    Rejected {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("{operation} returned an unexpected response: {reason}")]
    Decode {
        operation: &'static str,
        reason: String,
    },
}

impl GatewayError {
    /// The request may have been applied by the gateway even though no usable answer came back.
    /// Only a refused connection or a 4xx answer proves nothing was executed.
    pub fn outcome_unknown(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } | Self::Decode { .. } => true,
            Self::Rejected { status, .. } => *status >= 500,
            Self::Connect { .. } => false,
        }
    }

    fn from_reqwest(operation: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { operation }
        } else if err.is_decode() || err.is_body() {
            Self::Decode {
                operation,
                reason: err.to_string(),
            }
        } else if err.is_connect() || err.is_builder() {
            Self::Connect {
                operation,
                reason: err.to_string(),
            }
        } else {
            Self::Transport {
                operation,
                reason: err.to_string(),
            }
        }
    }
}

/// Bank transfer submitted against a verified fund account.
#[derive(Debug, Clone)]
pub struct PayoutRequest {
    pub fund_account_id: String,
    pub amount: i64,
    pub currency: String,
    /// Our payout id. Sent as the reference and as the idempotency key so a resubmission can never
    /// create a second transfer.
    pub reference_id: String,
    pub narration: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<String, GatewayError>;

    async fn create_plan(
        &self,
        name: &str,
        amount: i64,
        currency: &str,
        interval: &str,
    ) -> Result<String, GatewayError>;

    async fn create_subscription(
        &self,
        plan_id: &str,
        total_count: i32,
    ) -> Result<String, GatewayError>;

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), GatewayError>;

    async fn create_contact(
        &self,
        name: &str,
        email: &str,
        reference_id: &str,
    ) -> Result<String, GatewayError>;

    async fn create_fund_account(
        &self,
        contact_id: &str,
        bank: &BankDetails,
    ) -> Result<String, GatewayError>;

    async fn create_payout(&self, request: &PayoutRequest) -> Result<String, GatewayError>;

    /// Checks the signature the checkout widget hands to the client after a successful payment.
    fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> bool;
}

#[derive(Deserialize)]
struct IdRes {
    id: String,
}

#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
    account_number: String,
}

impl RazorpayClient {
    pub fn new(client: Client, config: &RazorpayConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            account_number: config.account_number.clone(),
        }
    }

    fn post(&self, path: &str, timeout: Duration) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .timeout(timeout)
    }

    async fn send<T: DeserializeOwned>(
        operation: &'static str,
        req: RequestBuilder,
    ) -> Result<T, GatewayError> {
        let res = req
            .send()
            .await
            .map_err(|err| GatewayError::from_reqwest(operation, err))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        res.json()
            .await
            .map_err(|err| GatewayError::from_reqwest(operation, err))
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<String, GatewayError> {
        let req = self.post("/orders", GATEWAY_TIMEOUT).json(&json!({
            "amount": amount,
            "currency": currency,
            "receipt": receipt,
        }));
        let order: IdRes = Self::send("create_order", req).await?;
        Ok(order.id)
    }

    async fn create_plan(
        &self,
        name: &str,
        amount: i64,
        currency: &str,
        interval: &str,
    ) -> Result<String, GatewayError> {
        let period = match interval {
            "daily" | "weekly" | "yearly" => interval,
            _ => "monthly",
        };
        let req = self.post("/plans", GATEWAY_TIMEOUT).json(&json!({
            "period": period,
            "interval": 1,
            "item": {
                "name": name,
                "amount": amount,
                "currency": currency,
            },
        }));
        let plan: IdRes = Self::send("create_plan", req).await?;
        Ok(plan.id)
    }

    async fn create_subscription(
        &self,
        plan_id: &str,
        total_count: i32,
    ) -> Result<String, GatewayError> {
        let req = self.post("/subscriptions", GATEWAY_TIMEOUT).json(&json!({
            "plan_id": plan_id,
            "total_count": total_count,
            "customer_notify": 1,
        }));
        let sub: IdRes = Self::send("create_subscription", req).await?;
        Ok(sub.id)
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), GatewayError> {
        let req = self
            .post(
                &format!("/subscriptions/{}/cancel", subscription_id),
                GATEWAY_TIMEOUT,
            )
            .json(&json!({ "cancel_at_cycle_end": 0 }));
        let _: Value = Self::send("cancel_subscription", req).await?;
        Ok(())
    }

    async fn create_contact(
        &self,
        name: &str,
        email: &str,
        reference_id: &str,
    ) -> Result<String, GatewayError> {
        let req = self.post("/contacts", GATEWAY_TIMEOUT).json(&json!({
            "name": name,
            "email": email,
            "type": "vendor",
            "reference_id": reference_id,
        }));
        let contact: IdRes = Self::send("create_contact", req).await?;
        Ok(contact.id)
    }

    async fn create_fund_account(
        &self,
        contact_id: &str,
        bank: &BankDetails,
    ) -> Result<String, GatewayError> {
        let req = self.post("/fund_accounts", GATEWAY_TIMEOUT).json(&json!({
            "contact_id": contact_id,
            "account_type": "bank_account",
            "bank_account": {
                "name": bank.account_holder_name,
                "ifsc": bank.ifsc,
                "account_number": bank.account_number,
            },
        }));
        let fund_account: IdRes = Self::send("create_fund_account", req).await?;
        Ok(fund_account.id)
    }

    async fn create_payout(&self, request: &PayoutRequest) -> Result<String, GatewayError> {
        let req = self
            .post("/payouts", PAYOUT_TIMEOUT)
            .header("X-Payout-Idempotency", &request.reference_id)
            .json(&json!({
                "account_number": self.account_number,
                "fund_account_id": request.fund_account_id,
                "amount": request.amount,
                "currency": request.currency,
                "mode": "IMPS",
                "purpose": "payout",
                "queue_if_low_balance": true,
                "reference_id": request.reference_id,
                "narration": request.narration,
            }));
        let payout: IdRes = Self::send("create_payout", req).await?;
        Ok(payout.id)
    }

    fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> bool {
        let payload = format!("{}|{}", gateway_order_id, gateway_payment_id);
        verify_hmac(payload.as_bytes(), signature, &self.key_secret)
    }
}

/// Verifies `X-Razorpay-Signature`: hex HMAC-SHA256 of the raw body keyed with the webhook secret.
pub fn verify_webhook_signature(body: &[u8], signature: &str, secret: &str) -> bool {
    verify_hmac(body, signature, secret)
}

pub fn sign(payload: &[u8], secret: &str) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

fn verify_hmac(payload: &[u8], signature: &str, secret: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}
