//! Creator dashboard routes. Every route here requires `X-Creator-Id`.

pub mod bookings;
pub mod coupons;
pub mod payouts;
pub mod sales;
pub mod wallet;

use utoipa_axum::router::OpenApiRouter;

use crate::app_state::AppState;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    sales::routes_with_openapi()
        .merge(bookings::routes_with_openapi())
        .merge(payouts::routes_with_openapi())
        .merge(wallet::routes_with_openapi())
        .merge(coupons::routes_with_openapi())
}
