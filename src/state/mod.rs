pub mod board;
pub mod cell;
pub mod channel;
pub mod game;
pub mod round;
mod sse;
pub mod state_machine;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    config::AppConfig,
    dao::kv_store::KeyValueStore,
    dto::sse::ServerEvent,
    error::ServiceError,
    services::display_service,
    state::{
        cell::Subscription,
        game::{GameQuestion, GameState},
    },
};

pub use self::board::Board;
pub use self::channel::BroadcastBus;
pub use self::sse::{DISPLAY_STREAM_CAPACITY, SseHub};

pub type SharedState = Arc<AppState>;

/// Central application state: configuration, the store, the device bus, and
/// the controller and display contexts with their own replicas.
pub struct AppState {
    config: Arc<AppConfig>,
    store: Arc<dyn KeyValueStore>,
    bus: BroadcastBus,
    controller: Board,
    display: Board,
    display_sse: SseHub,
    _display_feed: (Subscription<GameState>, Subscription<GameQuestion>),
    operation_gate: Mutex<()>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// Both contexts join the configured channel on a fresh bus. Must be called
    /// inside a Tokio runtime.
    pub fn new(config: AppConfig, store: Arc<dyn KeyValueStore>) -> SharedState {
        Self::with_bus(config, store, BroadcastBus::default())
    }

    /// Same as [`AppState::new`] on a caller-provided bus.
    pub fn with_bus(
        config: AppConfig,
        store: Arc<dyn KeyValueStore>,
        bus: BroadcastBus,
    ) -> SharedState {
        let channel = bus.channel(config.channel_name());
        let controller = Board::open(store.clone(), channel.clone());
        let display = Board::open(store.clone(), channel);
        let display_sse = SseHub::new(DISPLAY_STREAM_CAPACITY);
        let display_feed = feed_display_stream(&display, &display_sse);

        Arc::new(Self {
            config: Arc::new(config),
            store,
            bus,
            controller,
            display,
            display_sse,
            _display_feed: display_feed,
            operation_gate: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn bus(&self) -> &BroadcastBus {
        &self.bus
    }

    /// Replicas owned by the controller context. Only controller operations write here.
    pub fn controller(&self) -> &Board {
        &self.controller
    }

    /// Replicas owned by the display context. Read-only by convention.
    pub fn display(&self) -> &Board {
        &self.display
    }

    /// Broadcast hub used for the display SSE stream.
    pub fn display_sse(&self) -> &SseHub {
        &self.display_sse
    }

    /// Degraded when the store is unusable or a controller write was not fully committed.
    pub fn is_degraded(&self) -> bool {
        if let Err(err) = self.store.health_check() {
            debug!(error = %err, "store health check failed");
            return true;
        }
        self.controller.is_degraded()
    }

    /// Run a controller operation with exclusive access to the controller cells.
    pub async fn run_operation<F, T>(&self, work: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&Board, &AppConfig) -> Result<T, ServiceError>,
    {
        let _gate = self.operation_gate.lock().await;
        work(&self.controller, &self.config)
    }
}

/// Push a fresh projection to the display stream whenever a display cell changes.
fn feed_display_stream(
    display: &Board,
    hub: &SseHub,
) -> (Subscription<GameState>, Subscription<GameQuestion>) {
    let question = display.game_question().watch();
    let state_hub = hub.clone();
    let on_state = display.game_state().subscribe(move |state: &GameState| {
        publish_view(&state_hub, state, &question.borrow());
    });

    let state = display.game_state().watch();
    let question_hub = hub.clone();
    let on_question = display
        .game_question()
        .subscribe(move |question: &GameQuestion| {
            publish_view(&question_hub, &state.borrow(), question);
        });

    (on_state, on_question)
}

fn publish_view(hub: &SseHub, state: &GameState, question: &GameQuestion) {
    if hub.receiver_count() == 0 {
        return;
    }
    let view = display_service::project(state, question);
    match ServerEvent::json(Some(display_service::DISPLAY_EVENT.to_string()), &view) {
        Ok(event) => hub.broadcast(event),
        Err(err) => warn!(error = %err, "failed to encode display view"),
    }
}
