//! The pair of cells a context opens to take part in a game.

use std::sync::Arc;

use crate::{
    dao::kv_store::KeyValueStore,
    state::{
        cell::SharedCell,
        channel::Transport,
        game::{GameQuestion, GameState},
    },
};

/// Storage and channel key of the team/score/stage record.
pub const GAME_STATE_KEY: &str = "gameState";
/// Storage and channel key of the per-round board.
pub const GAME_QUESTION_KEY: &str = "gameQuestion";

/// One context's replicas of `gameState` and `gameQuestion`.
///
/// The two cells are independent: a reader may observe one updated and the
/// other not yet.
pub struct Board {
    game_state: SharedCell<GameState>,
    game_question: SharedCell<GameQuestion>,
}

impl Board {
    /// Open both cells on `transport`, restoring whatever `store` holds.
    pub fn open(store: Arc<dyn KeyValueStore>, transport: Arc<dyn Transport>) -> Self {
        Self {
            game_state: SharedCell::open(
                GAME_STATE_KEY,
                GameState::default(),
                store.clone(),
                transport.clone(),
            ),
            game_question: SharedCell::open(
                GAME_QUESTION_KEY,
                GameQuestion::default(),
                store,
                transport,
            ),
        }
    }

    pub fn game_state(&self) -> &SharedCell<GameState> {
        &self.game_state
    }

    pub fn game_question(&self) -> &SharedCell<GameQuestion> {
        &self.game_question
    }

    /// Current local values of both cells.
    pub fn snapshot(&self) -> (GameState, GameQuestion) {
        (self.game_state.read(), self.game_question.read())
    }

    /// Whether either cell has a write that did not reach the store or the channel.
    pub fn is_degraded(&self) -> bool {
        self.game_state.is_degraded() || self.game_question.is_degraded()
    }

    /// Stop applying remote writes to both cells.
    pub fn close(&self) {
        self.game_state.close();
        self.game_question.close();
    }
}
