use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the trivia board.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::display::display_view,
        crate::routes::display::display_stream,
        crate::routes::controller::controller_state,
        crate::routes::controller::list_questions,
        crate::routes::controller::start_stage_one,
        crate::routes::controller::start_stage_two,
        crate::routes::controller::attempt_guess,
        crate::routes::controller::reveal,
        crate::routes::controller::adjust_multiplier,
        crate::routes::controller::adjust_attempts,
        crate::routes::controller::reset,
        crate::routes::controller::reset_all,
        crate::routes::controller::update_team,
        crate::routes::controller::resync,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::display::DisplayView,
            crate::dto::controller::ControllerView,
            crate::dto::controller::ActionResponse,
            crate::dto::controller::StartStageOneRequest,
            crate::dto::controller::StartStageTwoRequest,
            crate::dto::controller::GuessRequest,
            crate::dto::controller::RevealAnswerRequest,
            crate::dto::controller::MultiplierRequest,
            crate::dto::controller::AttemptsRequest,
            crate::dto::controller::UpdateTeamRequest,
            crate::state::game::Question,
            crate::state::game::Team,
            crate::state::state_machine::Stage,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "display", description = "Read-only view rendered by the display role"),
        (name = "controller", description = "Commands driving the game"),
    )
)]
pub struct ApiDoc;
