/// Game operations issued by the controller role.
pub mod controller_service;
/// Projection of the game records for the display role.
pub mod display_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
