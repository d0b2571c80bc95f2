//! Buyer-facing routes. Every route here requires `X-User-Email`.

pub mod bookings;
pub mod orders;
pub mod subscriptions;

use utoipa_axum::router::OpenApiRouter;

use crate::app_state::AppState;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    orders::routes_with_openapi()
        .merge(subscriptions::routes_with_openapi())
        .merge(bookings::routes_with_openapi())
}
