use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::State,
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    dto::display::DisplayView,
    services::{display_service, sse_service},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/display",
    tag = "display",
    responses((status = 200, description = "Current display view", body = DisplayView))
)]
/// Project the display context's replicas.
pub async fn display_view(State(state): State<SharedState>) -> Json<DisplayView> {
    Json(display_service::current_view(&state))
}

#[utoipa::path(
    get,
    path = "/display/stream",
    tag = "display",
    responses((status = 200, description = "`display` events carrying a DisplayView on every change", content_type = "text/event-stream", body = String))
)]
/// Stream the display view, starting with the current one.
pub async fn display_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (initial, receiver) = sse_service::subscribe_display(&state);
    info!("New display SSE connection");
    sse_service::to_sse_stream(initial, receiver)
}

/// Configure the display endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/display", get(display_view))
        .route("/display/stream", get(display_stream))
}
