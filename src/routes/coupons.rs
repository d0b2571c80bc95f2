use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    services::coupons::CouponValidation,
};

/// Defines routes with OpenAPI specs.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/coupons",
        OpenApiRouter::new().routes(utoipa_axum::routes!(validate_coupon)),
    )
}

#[derive(Deserialize, ToSchema)]
pub struct ValidateCouponReq {
    pub creator_id: Uuid,
    pub code: String,
    pub product_id: Uuid,
    pub order_amount: i64,
}

/// Checks a code at checkout. Ineligible coupons come back as `valid: false`, not as errors.
#[utoipa::path(
    post,
    path = "/validate",
    tags = ["Coupons"],
    request_body = ValidateCouponReq,
    responses(
        (status = 200, description = "Validation result", body = StdResponse<CouponValidation, String>)
    )
)]
async fn validate_coupon(
    State(state): State<AppState>,
    Json(body): Json<ValidateCouponReq>,
) -> Result<impl IntoResponse, AppError> {
    let validation = state
        .services
        .coupons
        .validate(body.creator_id, &body.code, body.product_id, body.order_amount)
        .await?;

    Ok(StdResponse {
        data: Some(validation),
        message: Some("Coupon checked"),
    })
}
