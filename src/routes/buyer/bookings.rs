use axum::{Extension, extract::State, response::IntoResponse};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::{self, BuyerEmail},
    models::BookingEntity,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/buyer/bookings",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_my_bookings))
            .route_layer(axum::middleware::from_fn(middleware::buyers_authorization)),
    )
}

#[utoipa::path(
    get,
    path = "/",
    tags = ["Buyer"],
    security(("buyerEmail" = [])),
    responses(
        (status = 200, description = "List my bookings", body = StdResponse<Vec<BookingEntity>, String>)
    )
)]
async fn get_my_bookings(
    State(state): State<AppState>,
    Extension(BuyerEmail(email)): Extension<BuyerEmail>,
) -> Result<impl IntoResponse, AppError> {
    let bookings = state.services.bookings.get_buyer_bookings(&email).await?;

    Ok(StdResponse {
        data: Some(bookings),
        message: Some("Get my bookings successfully"),
    })
}
