pub mod api;
pub mod app_error;
pub mod app_state;
pub mod bootstrap;
pub mod config;
pub mod consumers;
pub mod db;
pub mod middleware;
pub mod models;
pub mod queue;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;
pub mod swagger;
pub mod webhooks;

use axum::Router;
use tower_http::trace::TraceLayer;
use utoipa_axum::router::OpenApiRouter;

use crate::app_state::AppState;

/// Every route of the service, with its OpenAPI document.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    routes::payments::routes_with_openapi()
        .merge(routes::orders::routes_with_openapi())
        .merge(routes::bookings::routes_with_openapi())
        .merge(routes::coupons::routes_with_openapi())
        .merge(routes::creator::routes_with_openapi())
        .merge(routes::buyer::routes_with_openapi())
}

/// Builds the HTTP application: routes, Swagger UI and request tracing.
pub fn app(state: AppState) -> Router {
    let (router, mut openapi) = routes_with_openapi().split_for_parts();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Creator Settlement API")
        .version(env!("CARGO_PKG_VERSION"))
        .build();

    router
        .merge(swagger::create_swagger_ui(openapi))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
