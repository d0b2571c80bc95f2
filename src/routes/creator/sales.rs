use axum::{Extension, extract::State, response::IntoResponse};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::{self, CreatorId},
    models::OrderEntity,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/creator/sales",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_sales))
            .route_layer(axum::middleware::from_fn(middleware::creators_authorization)),
    )
}

/// Sales history, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Creator"],
    security(("creatorId" = [])),
    responses(
        (status = 200, description = "List sales", body = StdResponse<Vec<OrderEntity>, String>)
    )
)]
async fn get_sales(
    State(state): State<AppState>,
    Extension(CreatorId(creator_id)): Extension<CreatorId>,
) -> Result<impl IntoResponse, AppError> {
    let orders = state.services.orders.get_creator_orders(creator_id).await?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get sales successfully"),
    })
}
