use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::state::{
    game::{GameQuestion, GameState, Team},
    round::RevealRequest,
};

const MAX_TEXT_LENGTH: u64 = 200;
const MAX_TEAM_NAME_LENGTH: u64 = 64;
const MIN_MULTIPLIER: i64 = -1_000;
const MAX_MULTIPLIER: i64 = 1_000;
const MIN_ATTEMPTS_DELTA: i32 = -100;
const MAX_ATTEMPTS_DELTA: i32 = 100;
const MIN_SCORE: i64 = -1_000_000_000;
const MAX_SCORE: i64 = 1_000_000_000;

fn minus_one_i64() -> i64 {
    -1
}

fn minus_one_i32() -> i32 {
    -1
}

/// Rejects text that is empty once surrounding whitespace is removed.
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must contain visible characters".into());
        return Err(err);
    }
    Ok(())
}

/// Select a bank question and open the guessing board.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct StartStageOneRequest {
    pub question_id: u32,
}

/// Deal bonus words and start revealing.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct StartStageTwoRequest {
    /// When given, must be the active question.
    #[serde(default)]
    pub question_id: Option<u32>,
}

/// A team's guess during stage one.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GuessRequest {
    pub team: Team,
    #[validate(length(min = 1, max = MAX_TEXT_LENGTH), custom(function = "not_blank"))]
    pub text: String,
}

/// Reveal an answer, crediting `score_team` and removing the word from
/// `steal_from` (or from `owner` when nothing is stolen).
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RevealAnswerRequest {
    pub owner: Team,
    #[validate(length(min = 1, max = MAX_TEXT_LENGTH))]
    pub answer: String,
    #[validate(range(min = MIN_MULTIPLIER, max = MAX_MULTIPLIER))]
    pub multiplier: i64,
    pub score_team: Team,
    #[serde(default)]
    pub steal_from: Option<Team>,
}

impl From<RevealAnswerRequest> for RevealRequest {
    fn from(value: RevealAnswerRequest) -> Self {
        Self {
            owner: value.owner,
            answer: value.answer,
            multiplier: value.multiplier,
            score_team: value.score_team,
            steal_from: value.steal_from,
        }
    }
}

/// Change the multiplier of a held word; defaults to a decrement.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct MultiplierRequest {
    pub team: Team,
    #[validate(length(min = 1, max = MAX_TEXT_LENGTH))]
    pub answer: String,
    #[serde(default = "minus_one_i64")]
    #[validate(range(min = MIN_MULTIPLIER, max = MAX_MULTIPLIER))]
    pub delta: i64,
}

/// Change a team's attempts counter; defaults to a decrement.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AttemptsRequest {
    pub team: Team,
    #[serde(default = "minus_one_i32")]
    #[validate(range(min = MIN_ATTEMPTS_DELTA, max = MAX_ATTEMPTS_DELTA))]
    pub delta: i32,
}

/// Edit a team's name, score, or both.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateTeamRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = MAX_TEAM_NAME_LENGTH), custom(function = "not_blank"))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(range(min = MIN_SCORE, max = MAX_SCORE))]
    pub score: Option<i64>,
}

/// A held word annotated with its answer rank.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RankedWord {
    pub name: String,
    pub multiplier: i64,
    pub highlighted: bool,
    /// Position in the active question; absent for words that are not answers.
    pub rank: Option<u8>,
}

/// What the controller sees: both records plus derived annotations.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ControllerView {
    pub game_state: GameState,
    pub game_question: GameQuestion,
    /// Bank id of the active question, when it can be matched.
    pub active_question_id: Option<u32>,
    pub team1_words: Vec<RankedWord>,
    pub team2_words: Vec<RankedWord>,
    /// Answers nobody guessed or holds yet.
    pub unclaimed: Vec<String>,
    /// A write did not reach the store or the channel; `POST /controller/resync` retries.
    pub degraded: bool,
}

/// Result of an operation that may award points.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Points credited by this operation.
    pub points: Option<i64>,
    /// Board slot filled by a guess.
    pub slot: Option<usize>,
    pub view: ControllerView,
}
