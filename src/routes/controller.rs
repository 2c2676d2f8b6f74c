use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::controller::{
        ActionResponse, AttemptsRequest, ControllerView, GuessRequest, MultiplierRequest,
        RevealAnswerRequest, StartStageOneRequest, StartStageTwoRequest, UpdateTeamRequest,
    },
    error::AppError,
    services::controller_service,
    state::{SharedState, game::{Question, Team}},
};

/// Commands and reads used by the controller role.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/controller/state", get(controller_state))
        .route("/controller/questions", get(list_questions))
        .route("/controller/stage-one", post(start_stage_one))
        .route("/controller/stage-two", post(start_stage_two))
        .route("/controller/guess", post(attempt_guess))
        .route("/controller/reveal", post(reveal))
        .route("/controller/multiplier", post(adjust_multiplier))
        .route("/controller/attempts", post(adjust_attempts))
        .route("/controller/reset", post(reset))
        .route("/controller/reset-all", post(reset_all))
        .route("/controller/teams/{team}", put(update_team))
        .route("/controller/resync", post(resync))
}

/// Both records as the controller sees them, with rank annotations.
#[utoipa::path(
    get,
    path = "/controller/state",
    tag = "controller",
    responses((status = 200, description = "Controller view", body = ControllerView))
)]
pub async fn controller_state(State(state): State<SharedState>) -> Json<ControllerView> {
    Json(controller_service::view(&state))
}

/// The question bank.
#[utoipa::path(
    get,
    path = "/controller/questions",
    tag = "controller",
    responses((status = 200, description = "Question bank", body = [Question]))
)]
pub async fn list_questions(State(state): State<SharedState>) -> Json<Vec<Question>> {
    Json(controller_service::list_questions(&state))
}

/// Select a question and open the guessing board.
#[utoipa::path(
    post,
    path = "/controller/stage-one",
    tag = "controller",
    request_body = StartStageOneRequest,
    responses(
        (status = 200, description = "Stage one started", body = ControllerView),
        (status = 404, description = "Unknown question"),
        (status = 409, description = "Not allowed in the current stage"),
        (status = 503, description = "Applied locally but not fully committed")
    )
)]
pub async fn start_stage_one(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<StartStageOneRequest>>,
) -> Result<Json<ControllerView>, AppError> {
    let view = controller_service::start_stage_one(&state, payload.question_id).await?;
    Ok(Json(view))
}

/// Deal bonus words and start revealing.
#[utoipa::path(
    post,
    path = "/controller/stage-two",
    tag = "controller",
    request_body = StartStageTwoRequest,
    responses(
        (status = 200, description = "Stage two started", body = ControllerView),
        (status = 409, description = "No active question or not allowed in the current stage")
    )
)]
pub async fn start_stage_two(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<StartStageTwoRequest>>,
) -> Result<Json<ControllerView>, AppError> {
    let view = controller_service::start_stage_two(&state, payload.question_id).await?;
    Ok(Json(view))
}

/// Place a team's guess on the first empty slot.
#[utoipa::path(
    post,
    path = "/controller/guess",
    tag = "controller",
    request_body = GuessRequest,
    responses(
        (status = 200, description = "Guess recorded", body = ActionResponse),
        (status = 409, description = "Already claimed, no active question, or wrong stage")
    )
)]
pub async fn attempt_guess(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<GuessRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = controller_service::attempt_guess(&state, payload.team, &payload.text).await?;
    Ok(Json(response))
}

/// Reveal an answer, crediting its multiplied score.
#[utoipa::path(
    post,
    path = "/controller/reveal",
    tag = "controller",
    request_body = RevealAnswerRequest,
    responses(
        (status = 200, description = "Answer revealed", body = ActionResponse),
        (status = 404, description = "Unknown answer or word not held"),
        (status = 409, description = "Already revealed, no active question, or wrong stage")
    )
)]
pub async fn reveal(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RevealAnswerRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = controller_service::reveal(&state, payload.into()).await?;
    Ok(Json(response))
}

/// Adjust the multiplier of a held word.
#[utoipa::path(
    post,
    path = "/controller/multiplier",
    tag = "controller",
    request_body = MultiplierRequest,
    responses(
        (status = 200, description = "Multiplier adjusted", body = ControllerView),
        (status = 404, description = "Word not held by the team")
    )
)]
pub async fn adjust_multiplier(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<MultiplierRequest>>,
) -> Result<Json<ControllerView>, AppError> {
    let view = controller_service::adjust_multiplier(
        &state,
        payload.team,
        &payload.answer,
        payload.delta,
    )
    .await?;
    Ok(Json(view))
}

/// Adjust a team's remaining attempts.
#[utoipa::path(
    post,
    path = "/controller/attempts",
    tag = "controller",
    request_body = AttemptsRequest,
    responses((status = 200, description = "Attempts adjusted", body = ControllerView))
)]
pub async fn adjust_attempts(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<AttemptsRequest>>,
) -> Result<Json<ControllerView>, AppError> {
    let view = controller_service::adjust_attempts(&state, payload.team, payload.delta).await?;
    Ok(Json(view))
}

/// Abandon the round, keeping names and scores.
#[utoipa::path(
    post,
    path = "/controller/reset",
    tag = "controller",
    responses((status = 200, description = "Round reset", body = ControllerView))
)]
pub async fn reset(State(state): State<SharedState>) -> Result<Json<ControllerView>, AppError> {
    Ok(Json(controller_service::reset(&state).await?))
}

/// Restore default names and zero both scores.
#[utoipa::path(
    post,
    path = "/controller/reset-all",
    tag = "controller",
    responses((status = 200, description = "Scores and names reset", body = ControllerView))
)]
pub async fn reset_all(State(state): State<SharedState>) -> Result<Json<ControllerView>, AppError> {
    Ok(Json(controller_service::reset_scores_and_names(&state).await?))
}

/// Rename a team or override its score.
#[utoipa::path(
    put,
    path = "/controller/teams/{team}",
    tag = "controller",
    params(("team" = Team, Path, description = "`team1` or `team2`")),
    request_body = UpdateTeamRequest,
    responses(
        (status = 200, description = "Team updated", body = ControllerView),
        (status = 400, description = "Nothing to update")
    )
)]
pub async fn update_team(
    State(state): State<SharedState>,
    Path(team): Path<Team>,
    Valid(Json(payload)): Valid<Json<UpdateTeamRequest>>,
) -> Result<Json<ControllerView>, AppError> {
    let view =
        controller_service::update_team(&state, team, payload.name, payload.score).await?;
    Ok(Json(view))
}

/// Persist and publish the controller's values again after a failed write.
#[utoipa::path(
    post,
    path = "/controller/resync",
    tag = "controller",
    responses(
        (status = 200, description = "Cells resynchronised", body = ControllerView),
        (status = 503, description = "Store or channel still failing")
    )
)]
pub async fn resync(State(state): State<SharedState>) -> Result<Json<ControllerView>, AppError> {
    Ok(Json(controller_service::resync(&state).await?))
}
