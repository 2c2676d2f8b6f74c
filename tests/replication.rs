use std::{sync::Arc, time::Duration};

use tokio::time::timeout;
use trivia_board::{
    config::AppConfig,
    dao::kv_store::{FileStore, KeyValueStore, MemoryStore},
    services::controller_service,
    state::{
        AppState, Board, BroadcastBus,
        game::{GameQuestion, GameState, Team},
        state_machine::Stage,
    },
};

#[tokio::test]
async fn boards_on_separate_stores_converge_over_the_bus() {
    let bus = BroadcastBus::default();
    let channel = bus.channel("app-state");
    let controller = Board::open(Arc::new(MemoryStore::new()), channel.clone());
    let display = Board::open(Arc::new(MemoryStore::new()), channel);

    let mut rx = display.game_state().watch();
    controller
        .game_state()
        .write(GameState::default().with_name(Team::One, "Foxes").with_stage(Stage::StageOne))
        .unwrap();

    timeout(
        Duration::from_secs(2),
        rx.wait_for(|state| state.team1_name == "Foxes" && state.stage == Stage::StageOne),
    )
    .await
    .expect("display board did not converge")
    .unwrap();
    assert_eq!(display.game_question().read(), GameQuestion::default());
    assert!(!controller.is_degraded());
}

#[tokio::test]
async fn remote_values_are_not_persisted_by_the_receiver() {
    let bus = BroadcastBus::default();
    let channel = bus.channel("app-state");
    let writer_store = Arc::new(MemoryStore::new());
    let reader_store = Arc::new(MemoryStore::new());
    let writer = Board::open(writer_store.clone(), channel.clone());
    let reader = Board::open(reader_store.clone(), channel);

    let mut rx = reader.game_state().watch();
    writer
        .game_state()
        .write(GameState::default().with_score(Team::Two, 70))
        .unwrap();
    timeout(Duration::from_secs(2), rx.wait_for(|state| state.team2_score == 70))
        .await
        .unwrap()
        .unwrap();

    assert!(writer_store.get("gameState").unwrap().is_some());
    assert!(reader_store.get("gameState").unwrap().is_none());
}

#[tokio::test]
async fn file_store_restores_the_game_after_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        let state = AppState::new(AppConfig::default(), store);
        let first = state.config().questions()[0].id;
        controller_service::start_stage_one(&state, first)
            .await
            .unwrap();
        controller_service::update_team(&state, Team::One, Some("Foxes".into()), Some(900))
            .await
            .unwrap();
        state.controller().close();
        state.display().close();
    }

    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let state = AppState::new(AppConfig::default(), store);
    let view = controller_service::view(&state);

    assert_eq!(view.game_state.team1_name, "Foxes");
    assert_eq!(view.game_state.team1_score, 900);
    assert_eq!(view.game_state.stage, Stage::StageOne);
    assert!(view.game_question.active_question_text.is_some());
    assert_eq!(view.active_question_id, Some(state.config().questions()[0].id));
    assert_eq!(state.display().snapshot(), state.controller().snapshot());
}
