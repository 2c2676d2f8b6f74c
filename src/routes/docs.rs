use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Where the Swagger UI is mounted.
pub const DOCS_PATH: &str = "/docs";
/// Where the raw OpenAPI document is served.
pub const OPENAPI_PATH: &str = "/api-doc/openapi.json";

/// Swagger UI for the controller and display endpoints.
pub fn router() -> Router<SharedState> {
    SwaggerUi::new(DOCS_PATH)
        .url(OPENAPI_PATH, ApiDoc::openapi())
        .into()
}
