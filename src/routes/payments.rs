use axum::{Json, body::Bytes, extract::State, http::HeaderMap, response::IntoResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    api::razorpay::verify_webhook_signature,
    app_error::{AppError, StdResponse},
    app_state::AppState,
    webhooks::{GatewayEvent, parse_event},
};

pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Defines routes with OpenAPI specs.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/payments",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(webhook))
            .routes(utoipa_axum::routes!(verify_payment)),
    )
}

#[derive(Serialize, ToSchema)]
pub struct AckRes {
    status: &'static str,
}

fn ack(status: &'static str) -> StdResponse<AckRes, String> {
    StdResponse {
        data: Some(AckRes { status }),
        message: None,
    }
}

/// Errors worth a redelivery: the gateway retries non-2xx answers, and settlement is idempotent.
fn should_retry(err: &AppError) -> bool {
    matches!(err, AppError::Store(_) | AppError::Other(_))
}

/// Razorpay webhook receiver.
///
/// The signature covers the raw body, so the body is taken as bytes and only parsed once it
/// verifies. Anything that is not worth a retry is acknowledged with 200.
#[utoipa::path(
    post,
    path = "/webhook",
    tags = ["Payments"],
    request_body(content = String, content_type = "application/json", description = "Raw gateway event"),
    params(
        ("X-Razorpay-Signature" = String, Header, description = "Hex HMAC-SHA256 of the raw body")
    ),
    responses(
        (status = 200, description = "Event received", body = StdResponse<AckRes, String>),
        (status = 401, description = "Missing or invalid signature")
    )
)]
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        tracing::warn!("Webhook without signature header");
        return Err(AppError::InvalidSignature);
    };
    if !verify_webhook_signature(&body, signature, &state.webhook_secret) {
        tracing::warn!("Webhook signature mismatch");
        return Err(AppError::InvalidSignature);
    }

    let event = match parse_event(&body) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(error = %err, "Ignoring unreadable webhook");
            return Ok(ack("received"));
        }
    };

    let services = &state.services;
    let result = match event {
        GatewayEvent::OrderPaid {
            gateway_order_id,
            gateway_payment_id,
        } => services
            .orders
            .handle_payment_success(&gateway_order_id, &gateway_payment_id)
            .await
            .map(|_| ()),
        GatewayEvent::Subscription(event) => services
            .orders
            .handle_subscription_event(event)
            .await
            .map(|_| ()),
        GatewayEvent::Payout(event) => services
            .payouts
            .handle_payout_webhook(event)
            .await
            .map(|_| ()),
        GatewayEvent::Unknown(name) => {
            tracing::debug!(event = %name, "Ignoring unhandled webhook event");
            Ok(())
        }
    };

    match result {
        Ok(()) => Ok(ack("received")),
        Err(err) if should_retry(&err) => Err(err),
        Err(err) => {
            tracing::warn!(error = %err, "Webhook acknowledged without effect");
            Ok(ack("received"))
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct VerifyPaymentReq {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

/// Settles an order from the signature the checkout widget hands to the browser.
#[utoipa::path(
    post,
    path = "/verify",
    tags = ["Payments"],
    request_body = VerifyPaymentReq,
    responses(
        (status = 200, description = "Payment verified", body = StdResponse<AckRes, String>),
        (status = 401, description = "Invalid payment signature")
    )
)]
async fn verify_payment(
    State(state): State<AppState>,
    Json(body): Json<VerifyPaymentReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.gateway_order_id.is_empty() || body.gateway_payment_id.is_empty() {
        return Err(AppError::BadRequest("missing required fields".into()));
    }
    if !state.gateway.verify_payment_signature(
        &body.gateway_order_id,
        &body.gateway_payment_id,
        &body.signature,
    ) {
        return Err(AppError::InvalidSignature);
    }

    state
        .services
        .orders
        .handle_payment_success(&body.gateway_order_id, &body.gateway_payment_id)
        .await?;

    Ok(ack("verified"))
}
