use axum::{
    Extension,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::{self, BuyerEmail},
    models::BookingEntity,
    services::bookings::Requester,
};

/// Defines routes with OpenAPI specs. Slot lookup is public; cancelling needs a buyer.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/bookings",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_available_slots))
            .merge(
                OpenApiRouter::new()
                    .routes(utoipa_axum::routes!(cancel_booking))
                    .route_layer(axum::middleware::from_fn(middleware::buyers_authorization)),
            ),
    )
}

#[derive(Deserialize, IntoParams)]
pub struct SlotsQuery {
    /// Day to list, `YYYY-MM-DD` in the product's timezone.
    pub date: String,
}

#[derive(Serialize, ToSchema)]
pub struct SlotsRes {
    pub date: String,
    pub slots: Vec<DateTime<Utc>>,
}

/// Free slot starts (UTC) for a booking product on a given day.
#[utoipa::path(
    get,
    path = "/products/{id}/slots",
    tags = ["Bookings"],
    params(
        ("id" = Uuid, Path, description = "Booking product ID"),
        SlotsQuery
    ),
    responses(
        (status = 200, description = "Available slots", body = StdResponse<SlotsRes, String>),
        (status = 422, description = "Not a booking product")
    )
)]
async fn get_available_slots(
    Path(id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let slots = state
        .services
        .bookings
        .get_available_slots(id, &query.date, Utc::now())
        .await?;

    Ok(StdResponse {
        data: Some(SlotsRes {
            date: query.date,
            slots,
        }),
        message: Some("Get available slots successfully"),
    })
}

/// Cancel one of the caller's bookings, subject to the product's cancellation window.
#[utoipa::path(
    post,
    path = "/{id}/cancel",
    tags = ["Bookings"],
    security(("buyerEmail" = [])),
    params(
        ("id" = Uuid, Path, description = "Booking ID to cancel")
    ),
    responses(
        (status = 200, description = "Booking cancelled", body = StdResponse<BookingEntity, String>),
        (status = 422, description = "Cancellation window has passed")
    )
)]
async fn cancel_booking(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(BuyerEmail(email)): Extension<BuyerEmail>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state
        .services
        .bookings
        .cancel_booking(id, Requester::Buyer { email }, Utc::now())
        .await?;

    Ok(StdResponse {
        data: Some(booking),
        message: Some("Booking cancelled successfully"),
    })
}
