use axum::{Extension, extract::State, response::IntoResponse};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::{self, BuyerEmail},
    models::OrderEntity,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/buyer/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_my_orders))
            .route_layer(axum::middleware::from_fn(middleware::buyers_authorization)),
    )
}

/// Paid orders of the authenticated buyer.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Buyer"],
    security(("buyerEmail" = [])),
    responses(
        (status = 200, description = "List my orders", body = StdResponse<Vec<OrderEntity>, String>)
    )
)]
async fn get_my_orders(
    State(state): State<AppState>,
    Extension(BuyerEmail(email)): Extension<BuyerEmail>,
) -> Result<impl IntoResponse, AppError> {
    let orders = state.services.orders.get_buyer_orders(&email).await?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get my orders successfully"),
    })
}
