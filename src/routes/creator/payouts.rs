use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::{self, CreatorId},
    models::{BankDetails, PayoutConfig, PayoutEntity},
    services::payouts::BalanceSummary,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/creator",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_payout_settings, save_payout_settings))
            .routes(utoipa_axum::routes!(withdraw))
            .routes(utoipa_axum::routes!(get_payouts))
            .routes(utoipa_axum::routes!(get_balance))
            .route_layer(axum::middleware::from_fn(middleware::creators_authorization)),
    )
}

#[utoipa::path(
    get,
    path = "/payout-settings",
    tags = ["Payouts"],
    security(("creatorId" = [])),
    responses(
        (status = 200, description = "Current payout settings, if any", body = StdResponse<PayoutConfig, String>)
    )
)]
async fn get_payout_settings(
    State(state): State<AppState>,
    Extension(CreatorId(creator_id)): Extension<CreatorId>,
) -> Result<impl IntoResponse, AppError> {
    let config = state.services.payouts.get_payout_config(creator_id).await?;

    Ok(StdResponse {
        data: config,
        message: Some("Get payout settings successfully"),
    })
}

/// Registers the bank account withdrawals are sent to. Only the last four digits are kept.
#[utoipa::path(
    post,
    path = "/payout-settings",
    tags = ["Payouts"],
    security(("creatorId" = [])),
    request_body = BankDetails,
    responses(
        (status = 200, description = "Payout settings saved", body = StdResponse<PayoutConfig, String>),
        (status = 400, description = "Invalid bank details")
    )
)]
async fn save_payout_settings(
    State(state): State<AppState>,
    Extension(CreatorId(creator_id)): Extension<CreatorId>,
    Json(body): Json<BankDetails>,
) -> Result<impl IntoResponse, AppError> {
    let config = state
        .services
        .payouts
        .save_payout_config(creator_id, body)
        .await?;

    Ok(StdResponse {
        data: Some(config),
        message: Some("Payout settings saved successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
pub struct WithdrawReq {
    /// Paise.
    pub amount: i64,
}

#[utoipa::path(
    post,
    path = "/payouts/withdraw",
    tags = ["Payouts"],
    security(("creatorId" = [])),
    request_body = WithdrawReq,
    responses(
        (status = 200, description = "Payout submitted", body = StdResponse<PayoutEntity, String>),
        (status = 409, description = "A payout is already in progress"),
        (status = 422, description = "Below minimum or above balance")
    )
)]
async fn withdraw(
    State(state): State<AppState>,
    Extension(CreatorId(creator_id)): Extension<CreatorId>,
    Json(body): Json<WithdrawReq>,
) -> Result<impl IntoResponse, AppError> {
    let payout = state
        .services
        .payouts
        .withdraw_funds(creator_id, body.amount)
        .await?;

    Ok(StdResponse {
        data: Some(payout),
        message: Some("Payout submitted successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/payouts",
    tags = ["Payouts"],
    security(("creatorId" = [])),
    responses(
        (status = 200, description = "Payout history", body = StdResponse<Vec<PayoutEntity>, String>)
    )
)]
async fn get_payouts(
    State(state): State<AppState>,
    Extension(CreatorId(creator_id)): Extension<CreatorId>,
) -> Result<impl IntoResponse, AppError> {
    let payouts = state.services.payouts.payout_history(creator_id).await?;

    Ok(StdResponse {
        data: Some(payouts),
        message: Some("Get payouts successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/payouts/balance",
    tags = ["Payouts"],
    security(("creatorId" = [])),
    responses(
        (status = 200, description = "Balance summary", body = StdResponse<BalanceSummary, String>)
    )
)]
async fn get_balance(
    State(state): State<AppState>,
    Extension(CreatorId(creator_id)): Extension<CreatorId>,
) -> Result<impl IntoResponse, AppError> {
    let summary = state.services.payouts.balance_summary(creator_id).await?;

    Ok(StdResponse {
        data: Some(summary),
        message: Some("Get balance successfully"),
    })
}
