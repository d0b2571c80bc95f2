use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::OrderEntity,
    services::orders::NewOrder,
};

/// Defines routes with OpenAPI specs.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_order))
            .routes(utoipa_axum::routes!(get_order))
            .routes(utoipa_axum::routes!(get_download_url)),
    )
}

/// Price a checkout and open it with the payment gateway.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    request_body = NewOrder,
    responses(
        (status = 200, description = "Order created", body = StdResponse<OrderEntity, String>),
        (status = 404, description = "Product not found")
    )
)]
async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<NewOrder>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.services.orders.create_order(body).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Order created successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    params(
        ("id" = Uuid, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<OrderEntity, String>)
    )
)]
async fn get_order(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.services.orders.get_order(id).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Get order successfully"),
    })
}

#[derive(Deserialize, IntoParams)]
pub struct DownloadQuery {
    /// Line item to download; defaults to the order's main product.
    pub product_id: Option<Uuid>,
}

#[derive(Serialize, ToSchema)]
pub struct DownloadRes {
    pub download_url: String,
}

/// Short-lived download link for a product of a paid order.
#[utoipa::path(
    get,
    path = "/{id}/download",
    tags = ["Orders"],
    params(
        ("id" = Uuid, Path, description = "Paid order ID"),
        DownloadQuery
    ),
    responses(
        (status = 200, description = "Download link minted", body = StdResponse<DownloadRes, String>),
        (status = 403, description = "Order not paid or product not in order")
    )
)]
async fn get_download_url(
    Path(id): Path<Uuid>,
    Query(query): Query<DownloadQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let download_url = state
        .services
        .orders
        .get_order_download_url(id, query.product_id)
        .await?;

    Ok(StdResponse {
        data: Some(DownloadRes { download_url }),
        message: Some("Download link generated"),
    })
}
