use axum::{Extension, extract::State, response::IntoResponse};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::{self, CreatorId},
    services::wallet::WalletDetails,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/creator/wallet",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_wallet))
            .route_layer(axum::middleware::from_fn(middleware::creators_authorization)),
    )
}

/// Ledger-derived balance and every transaction, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Wallet"],
    security(("creatorId" = [])),
    responses(
        (status = 200, description = "Wallet details", body = StdResponse<WalletDetails, String>)
    )
)]
async fn get_wallet(
    State(state): State<AppState>,
    Extension(CreatorId(creator_id)): Extension<CreatorId>,
) -> Result<impl IntoResponse, AppError> {
    let details = state.services.wallet.details(creator_id).await?;

    Ok(StdResponse {
        data: Some(details),
        message: Some("Get wallet successfully"),
    })
}
