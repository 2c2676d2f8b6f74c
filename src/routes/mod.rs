use axum::Router;

use crate::state::SharedState;

pub mod controller;
pub mod display;
pub mod docs;
pub mod health;

/// Compose the health, display, controller and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(display::router())
        .merge(controller::router())
        .merge(docs::router())
        .with_state(state)
}
