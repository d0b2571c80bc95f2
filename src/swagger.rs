use utoipa::openapi::{
    OpenApi,
    security::{ApiKey, ApiKeyValue, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{CREATOR_ID_HEADER, USER_EMAIL_HEADER};

/// Serves the generated document at `/swagger-ui`, with the identity headers as auth schemes.
pub fn create_swagger_ui(mut openapi: OpenApi) -> SwaggerUi {
    let components = openapi.components.get_or_insert_with(Default::default);
    components.add_security_scheme(
        "creatorId",
        SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(CREATOR_ID_HEADER))),
    );
    components.add_security_scheme(
        "buyerEmail",
        SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(USER_EMAIL_HEADER))),
    );

    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi)
}
