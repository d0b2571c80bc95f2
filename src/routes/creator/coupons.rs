use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::{self, CreatorId},
    models::{CouponEntity, UpdateCouponEntity},
    services::coupons::NewCoupon,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/creator/coupons",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_coupons, create_coupon))
            .routes(utoipa_axum::routes!(update_coupon, deactivate_coupon))
            .route_layer(axum::middleware::from_fn(middleware::creators_authorization)),
    )
}

#[utoipa::path(
    get,
    path = "/",
    tags = ["Coupons"],
    security(("creatorId" = [])),
    responses(
        (status = 200, description = "List coupons", body = StdResponse<Vec<CouponEntity>, String>)
    )
)]
async fn get_coupons(
    State(state): State<AppState>,
    Extension(CreatorId(creator_id)): Extension<CreatorId>,
) -> Result<impl IntoResponse, AppError> {
    let coupons = state.services.coupons.list(creator_id).await?;

    Ok(StdResponse {
        data: Some(coupons),
        message: Some("Get coupons successfully"),
    })
}

#[utoipa::path(
    post,
    path = "/",
    tags = ["Coupons"],
    security(("creatorId" = [])),
    request_body = NewCoupon,
    responses(
        (status = 200, description = "Coupon created", body = StdResponse<CouponEntity, String>),
        (status = 409, description = "Code already exists")
    )
)]
async fn create_coupon(
    State(state): State<AppState>,
    Extension(CreatorId(creator_id)): Extension<CreatorId>,
    Json(body): Json<NewCoupon>,
) -> Result<impl IntoResponse, AppError> {
    let coupon = state.services.coupons.create(creator_id, body).await?;

    Ok(StdResponse {
        data: Some(coupon),
        message: Some("Coupon created successfully"),
    })
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Coupons"],
    security(("creatorId" = [])),
    params(
        ("id" = Uuid, Path, description = "Coupon ID to update")
    ),
    request_body = UpdateCouponEntity,
    responses(
        (status = 200, description = "Coupon updated", body = StdResponse<CouponEntity, String>)
    )
)]
async fn update_coupon(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(CreatorId(creator_id)): Extension<CreatorId>,
    Json(body): Json<UpdateCouponEntity>,
) -> Result<impl IntoResponse, AppError> {
    let coupon = state.services.coupons.update(id, creator_id, body).await?;

    Ok(StdResponse {
        data: Some(coupon),
        message: Some("Coupon updated successfully"),
    })
}

/// Soft delete: the coupon stops validating but stays on past orders.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Coupons"],
    security(("creatorId" = [])),
    params(
        ("id" = Uuid, Path, description = "Coupon ID to deactivate")
    ),
    responses(
        (status = 200, description = "Coupon deactivated", body = StdResponse<CouponEntity, String>)
    )
)]
async fn deactivate_coupon(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(CreatorId(creator_id)): Extension<CreatorId>,
) -> Result<impl IntoResponse, AppError> {
    let coupon = state.services.coupons.deactivate(id, creator_id).await?;

    Ok(StdResponse {
        data: Some(coupon),
        message: Some("Coupon deactivated successfully"),
    })
}
