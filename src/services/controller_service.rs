//! Controller operations: every mutation of the game goes through here.
//!
//! Each operation runs under the controller gate, computes the next values with
//! the pure round functions and writes them to the controller's cells. The two
//! cells are written independently; both writes are always attempted and the
//! first failure is reported.

use rand::Rng;
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    dto::controller::{ActionResponse, ControllerView, RankedWord},
    error::ServiceError,
    state::{
        Board, SharedState,
        game::{GameQuestion, GameState, Question, Team, TeamWord},
        round::{self, RevealRequest},
        state_machine::{StageAction, StageEvent},
    },
};

/// Select `question_id` from the bank and open a fresh board.
pub async fn start_stage_one(
    state: &SharedState,
    question_id: u32,
) -> Result<ControllerView, ServiceError> {
    state
        .run_operation(|board, config| {
            let question = find_question(config, question_id)?;
            let game_state = board.game_state().read();
            let stage = config
                .stage_policy()
                .transition(game_state.stage, StageEvent::StartStageOne)?;

            info!(question_id, from = ?game_state.stage, "starting stage one");
            commit(
                board,
                Some(game_state.with_stage(stage)),
                Some(round::start_stage_one(question)),
            )
        })
        .await?;
    Ok(view(state))
}

/// Deal bonus words and move to stage two.
///
/// `question_id`, when given, must name the active question.
pub async fn start_stage_two(
    state: &SharedState,
    question_id: Option<u32>,
) -> Result<ControllerView, ServiceError> {
    state
        .run_operation(|board, config| {
            let mut rng = rand::rng();
            start_stage_two_with(board, config, question_id, &mut rng)
        })
        .await?;
    Ok(view(state))
}

fn start_stage_two_with<R>(
    board: &Board,
    config: &AppConfig,
    question_id: Option<u32>,
    rng: &mut R,
) -> Result<(), ServiceError>
where
    R: Rng + ?Sized,
{
    let (game_state, game_question) = board.snapshot();
    let stage = config
        .stage_policy()
        .transition(game_state.stage, StageEvent::StartStageTwo)?;
    let Some(active) = game_question.active_question_text.as_deref() else {
        return Err(ServiceError::NoActiveQuestion);
    };
    if let Some(id) = question_id {
        let question = find_question(config, id)?;
        if question.text != active {
            return Err(ServiceError::InvalidInput(format!(
                "question `{id}` is not the active question"
            )));
        }
    }

    let dealt = round::deal_bonus_words(&game_question, rng);
    info!(
        team1_dealt = dealt.team1_words.len() - game_question.team1_words.len(),
        team2_dealt = dealt.team2_words.len() - game_question.team2_words.len(),
        "starting stage two"
    );
    commit(board, Some(game_state.with_stage(stage)), Some(dealt))
}

/// Place `text` for `team` on the first empty slot.
pub async fn attempt_guess(
    state: &SharedState,
    team: Team,
    text: &str,
) -> Result<ActionResponse, ServiceError> {
    let (points, slot) = state
        .run_operation(|board, config| {
            let (game_state, game_question) = board.snapshot();
            ensure_allowed(config, &game_state, &game_question, StageAction::Guess)?;

            let outcome = round::attempt_guess(&game_question, team, text)?;
            match outcome.slot {
                Some(slot) => info!(%team, slot, points = outcome.points, "guess placed"),
                None => info!(%team, "board full; guess recorded without points"),
            }
            let next_state = if outcome.points != 0 {
                Some(round::credit(&game_state, team, outcome.points)?)
            } else {
                None
            };
            commit(board, next_state, Some(outcome.question))?;
            Ok((outcome.points, outcome.slot))
        })
        .await?;

    Ok(ActionResponse {
        points: Some(points),
        slot,
        view: view(state),
    })
}

/// Reveal an answer and credit its multiplied score.
pub async fn reveal(
    state: &SharedState,
    request: RevealRequest,
) -> Result<ActionResponse, ServiceError> {
    let points = state
        .run_operation(|board, config| {
            let (game_state, game_question) = board.snapshot();
            ensure_allowed(config, &game_state, &game_question, StageAction::Reveal)?;

            let outcome = round::reveal(&game_question, &request)?;
            let next_state = round::credit(&game_state, request.score_team, outcome.points)?;
            info!(
                answer = %request.answer,
                owner = %request.owner,
                score_team = %request.score_team,
                steal_from = ?request.steal_from,
                points = outcome.points,
                "answer revealed"
            );
            commit(board, Some(next_state), Some(outcome.question))?;
            Ok(outcome.points)
        })
        .await?;

    Ok(ActionResponse {
        points: Some(points),
        slot: None,
        view: view(state),
    })
}

/// Add `delta` to the multiplier of `answer` in `team`'s list.
pub async fn adjust_multiplier(
    state: &SharedState,
    team: Team,
    answer: &str,
    delta: i64,
) -> Result<ControllerView, ServiceError> {
    state
        .run_operation(|board, config| {
            let (game_state, game_question) = board.snapshot();
            ensure_allowed(
                config,
                &game_state,
                &game_question,
                StageAction::AdjustMultiplier,
            )?;

            let next = round::adjust_multiplier(&game_question, team, answer, delta)?;
            info!(%team, answer, delta, "multiplier adjusted");
            commit(board, None, Some(next))
        })
        .await?;
    Ok(view(state))
}

/// Add `delta` to `team`'s attempts.
pub async fn adjust_attempts(
    state: &SharedState,
    team: Team,
    delta: i32,
) -> Result<ControllerView, ServiceError> {
    state
        .run_operation(|board, config| {
            let (game_state, game_question) = board.snapshot();
            ensure_allowed(
                config,
                &game_state,
                &game_question,
                StageAction::AdjustAttempts,
            )?;

            let next = round::adjust_attempts(&game_question, team, delta)?;
            info!(%team, delta, attempts = next.attempts(team), "attempts adjusted");
            commit(board, None, Some(next))
        })
        .await?;
    Ok(view(state))
}

/// Abandon the round. Team names and scores stay.
pub async fn reset(state: &SharedState) -> Result<ControllerView, ServiceError> {
    state
        .run_operation(|board, config| {
            let game_state = board.game_state().read();
            let stage = config
                .stage_policy()
                .transition(game_state.stage, StageEvent::Reset)?;

            info!(from = ?game_state.stage, "round reset");
            commit(
                board,
                Some(game_state.with_stage(stage)),
                Some(round::cleared()),
            )
        })
        .await?;
    Ok(view(state))
}

/// Restore default team names, zero both scores and return to idle.
///
/// The board is left as it is.
pub async fn reset_scores_and_names(state: &SharedState) -> Result<ControllerView, ServiceError> {
    state
        .run_operation(|board, _| {
            info!("scores and names reset");
            commit(board, Some(GameState::default()), None)
        })
        .await?;
    Ok(view(state))
}

/// Rename `team` and/or override its score.
pub async fn update_team(
    state: &SharedState,
    team: Team,
    name: Option<String>,
    score: Option<i64>,
) -> Result<ControllerView, ServiceError> {
    if name.is_none() && score.is_none() {
        return Err(ServiceError::InvalidInput(
            "provide a name, a score, or both".into(),
        ));
    }

    state
        .run_operation(|board, _| {
            let mut next = board.game_state().read();
            if let Some(name) = name {
                let name = name.trim();
                if name.is_empty() {
                    return Err(ServiceError::InvalidInput(
                        "team name must not be empty".into(),
                    ));
                }
                next = next.with_name(team, name);
            }
            if let Some(score) = score {
                next = next.with_score(team, score);
            }
            info!(%team, name = next.name(team), score = next.score(team), "team updated");
            commit(board, Some(next), None)
        })
        .await?;
    Ok(view(state))
}

/// Persist and publish the controller's current values again.
pub async fn resync(state: &SharedState) -> Result<ControllerView, ServiceError> {
    state
        .run_operation(|board, _| {
            let state_result = board.game_state().resync();
            let question_result = board.game_question().resync();
            state_result?;
            question_result?;
            info!("controller cells resynchronised");
            Ok(())
        })
        .await?;
    Ok(view(state))
}

/// The question bank in display order.
pub fn list_questions(state: &SharedState) -> Vec<Question> {
    state.config().questions().to_vec()
}

/// What the controller currently sees.
pub fn view(state: &SharedState) -> ControllerView {
    let (game_state, game_question) = state.controller().snapshot();
    build_view(
        state.config(),
        game_state,
        game_question,
        state.is_degraded(),
    )
}

fn build_view(
    config: &AppConfig,
    game_state: GameState,
    game_question: GameQuestion,
    degraded: bool,
) -> ControllerView {
    let active = game_question.active_question_text.as_deref().and_then(|text| {
        config
            .questions()
            .iter()
            .find(|question| question.text == text)
    });
    let ranks = active.map(Question::rank_map).unwrap_or_default();
    let ranked = |words: &[TeamWord]| -> Vec<RankedWord> {
        words
            .iter()
            .map(|word| RankedWord {
                name: word.name.clone(),
                multiplier: word.multiplier,
                highlighted: word.highlighted,
                rank: ranks.get(&word.name).copied(),
            })
            .collect()
    };

    ControllerView {
        active_question_id: active.map(|question| question.id),
        team1_words: ranked(&game_question.team1_words),
        team2_words: ranked(&game_question.team2_words),
        unclaimed: round::unguessed(&game_question),
        game_state,
        game_question,
        degraded,
    }
}

fn find_question(config: &AppConfig, id: u32) -> Result<&Question, ServiceError> {
    config
        .question(id)
        .ok_or_else(|| ServiceError::NotFound(format!("question `{id}` not found")))
}

fn ensure_allowed(
    config: &AppConfig,
    game_state: &GameState,
    game_question: &GameQuestion,
    action: StageAction,
) -> Result<(), ServiceError> {
    config.stage_policy().check(game_state.stage, action)?;
    if game_question.active_question_text.is_none() {
        return Err(ServiceError::NoActiveQuestion);
    }
    Ok(())
}

/// Write whichever values changed. Both writes run even if the first fails.
fn commit(
    board: &Board,
    game_state: Option<GameState>,
    game_question: Option<GameQuestion>,
) -> Result<(), ServiceError> {
    let question_result = game_question
        .map(|next| board.game_question().write(next))
        .transpose();
    let state_result = game_state
        .map(|next| board.game_state().write(next))
        .transpose();

    if let (Err(question_err), Err(state_err)) = (&question_result, &state_result) {
        warn!(
            question_key = board.game_question().key(),
            question_error = %question_err,
            state_key = board.game_state().key(),
            state_error = %state_err,
            "both controller writes failed"
        );
    }
    question_result?;
    state_result?;
    Ok(())
}
