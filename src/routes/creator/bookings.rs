use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::{self, CreatorId},
    models::BookingEntity,
    services::bookings::Requester,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/creator/bookings",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_bookings))
            .routes(utoipa_axum::routes!(cancel_booking))
            .route_layer(axum::middleware::from_fn(middleware::creators_authorization)),
    )
}

#[utoipa::path(
    get,
    path = "/",
    tags = ["Creator"],
    security(("creatorId" = [])),
    responses(
        (status = 200, description = "List bookings", body = StdResponse<Vec<BookingEntity>, String>)
    )
)]
async fn get_bookings(
    State(state): State<AppState>,
    Extension(CreatorId(creator_id)): Extension<CreatorId>,
) -> Result<impl IntoResponse, AppError> {
    let bookings = state
        .services
        .bookings
        .get_creator_bookings(creator_id)
        .await?;

    Ok(StdResponse {
        data: Some(bookings),
        message: Some("Get bookings successfully"),
    })
}

/// Creators may cancel any of their bookings, regardless of the cancellation window.
#[utoipa::path(
    post,
    path = "/{id}/cancel",
    tags = ["Creator"],
    security(("creatorId" = [])),
    params(
        ("id" = Uuid, Path, description = "Booking ID to cancel")
    ),
    responses(
        (status = 200, description = "Booking cancelled", body = StdResponse<BookingEntity, String>)
    )
)]
async fn cancel_booking(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(CreatorId(creator_id)): Extension<CreatorId>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state
        .services
        .bookings
        .cancel_booking(id, Requester::Creator { creator_id }, Utc::now())
        .await?;

    Ok(StdResponse {
        data: Some(booking),
        message: Some("Booking cancelled successfully"),
    })
}
