use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::{self, BuyerEmail},
    models::SubscriptionEntity,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/buyer/subscriptions",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_my_subscriptions))
            .routes(utoipa_axum::routes!(cancel_subscription))
            .route_layer(axum::middleware::from_fn(middleware::buyers_authorization)),
    )
}

#[utoipa::path(
    get,
    path = "/",
    tags = ["Buyer"],
    security(("buyerEmail" = [])),
    responses(
        (status = 200, description = "List my subscriptions", body = StdResponse<Vec<SubscriptionEntity>, String>)
    )
)]
async fn get_my_subscriptions(
    State(state): State<AppState>,
    Extension(BuyerEmail(email)): Extension<BuyerEmail>,
) -> Result<impl IntoResponse, AppError> {
    let subscriptions = state
        .services
        .orders
        .get_buyer_subscriptions(&email)
        .await?;

    Ok(StdResponse {
        data: Some(subscriptions),
        message: Some("Get my subscriptions successfully"),
    })
}

/// Cancels at the gateway first, then locally.
#[utoipa::path(
    post,
    path = "/{id}/cancel",
    tags = ["Buyer"],
    security(("buyerEmail" = [])),
    params(
        ("id" = Uuid, Path, description = "Subscription ID to cancel")
    ),
    responses(
        (status = 200, description = "Subscription cancelled", body = StdResponse<SubscriptionEntity, String>),
        (status = 409, description = "Already cancelled")
    )
)]
async fn cancel_subscription(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(BuyerEmail(email)): Extension<BuyerEmail>,
) -> Result<impl IntoResponse, AppError> {
    let subscription = state
        .services
        .orders
        .cancel_subscription(id, &email)
        .await?;

    Ok(StdResponse {
        data: Some(subscription),
        message: Some("Subscription cancelled successfully"),
    })
}
