//! Replicated game records and the static question bank types.
//!
//! [`GameState`] and [`GameQuestion`] are what the two cells persist and
//! broadcast. Their decoders also accept the field names and encodings written
//! by earlier releases, so a device that still holds an old document keeps its
//! scores after an upgrade.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::state::state_machine::Stage;

/// Number of slots on the open-guess board.
pub const SLOT_COUNT: usize = 10;
/// Attempts each team starts a round with.
pub const DEFAULT_ATTEMPTS: i32 = 5;
/// Size each team's word list is topped up to by the bonus deal.
pub const WORD_LIST_TARGET: usize = 5;
/// Multiplier given to every newly added word.
pub const DEFAULT_MULTIPLIER: i64 = 3;
/// Points per answer position when a round starts.
pub const RANK_POINTS: i64 = 100;
/// Upper bound on the answers a question may carry.
pub const MAX_ANSWERS: usize = SLOT_COUNT;

/// Text earlier releases stored in an empty slot.
const LEGACY_EMPTY_MARKER: &str = "⚡⚡⚡";

/// Default display name of the first team.
pub const DEFAULT_TEAM1_NAME: &str = "Team 1";
/// Default display name of the second team.
pub const DEFAULT_TEAM2_NAME: &str = "Team 2";

/// One of the two competing teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Team {
    /// First team, shown on the left.
    #[serde(rename = "team1")]
    One,
    /// Second team, shown on the right.
    #[serde(rename = "team2")]
    Two,
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::One => f.write_str("team1"),
            Team::Two => f.write_str("team2"),
        }
    }
}

/// Team names, scores and the current stage (key `gameState`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", from = "GameStateRecord")]
pub struct GameState {
    /// Display name of the first team.
    pub team1_name: String,
    /// Display name of the second team.
    pub team2_name: String,
    /// Running score of the first team.
    pub team1_score: i64,
    /// Running score of the second team.
    pub team2_score: i64,
    /// Current stage of the game.
    pub stage: Stage,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            team1_name: DEFAULT_TEAM1_NAME.into(),
            team2_name: DEFAULT_TEAM2_NAME.into(),
            team1_score: 0,
            team2_score: 0,
            stage: Stage::Idle,
        }
    }
}

impl GameState {
    /// Display name of `team`.
    pub fn name(&self, team: Team) -> &str {
        match team {
            Team::One => &self.team1_name,
            Team::Two => &self.team2_name,
        }
    }

    /// Running score of `team`.
    pub fn score(&self, team: Team) -> i64 {
        match team {
            Team::One => self.team1_score,
            Team::Two => self.team2_score,
        }
    }

    /// Copy of this state with `team`'s score replaced.
    pub fn with_score(&self, team: Team, score: i64) -> Self {
        let mut next = self.clone();
        match team {
            Team::One => next.team1_score = score,
            Team::Two => next.team2_score = score,
        }
        next
    }

    /// Copy of this state with `team` renamed.
    pub fn with_name(&self, team: Team, name: impl Into<String>) -> Self {
        let mut next = self.clone();
        match team {
            Team::One => next.team1_name = name.into(),
            Team::Two => next.team2_name = name.into(),
        }
        next
    }

    /// Copy of this state in `stage`.
    pub fn with_stage(&self, stage: Stage) -> Self {
        Self {
            stage,
            ..self.clone()
        }
    }
}

/// Everything a stored `gameState` document may contain, current or legacy.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameStateRecord {
    #[serde(default)]
    team1_name: Option<String>,
    #[serde(default)]
    team2_name: Option<String>,
    #[serde(default)]
    team1_score: i64,
    #[serde(default)]
    team2_score: i64,
    #[serde(default)]
    stage: Option<Stage>,
    #[serde(default)]
    stage_one: Option<bool>,
    #[serde(default)]
    stage_two: Option<bool>,
}

impl From<GameStateRecord> for GameState {
    fn from(record: GameStateRecord) -> Self {
        let stage = record.stage.unwrap_or(match (record.stage_one, record.stage_two) {
            (_, Some(true)) => Stage::StageTwo,
            (Some(true), _) => Stage::StageOne,
            _ => Stage::Idle,
        });
        Self {
            team1_name: non_empty_or(record.team1_name, DEFAULT_TEAM1_NAME),
            team2_name: non_empty_or(record.team2_name, DEFAULT_TEAM2_NAME),
            team1_score: record.team1_score,
            team2_score: record.team2_score,
            stage,
        }
    }
}

fn non_empty_or(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(name) if !name.trim().is_empty() => name,
        _ => fallback.to_string(),
    }
}

/// One position on the open-guess board; `text` is `None` while empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub struct Slot {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub score: i64,
}

impl Slot {
    /// Whether no guess has landed here yet.
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
    }
}

/// An answer of the active question as tracked during the round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HiddenAnswer {
    pub text: String,
    pub hidden: bool,
    pub score: i64,
}

/// A word held by a team, worth its answer's score times `multiplier` when revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TeamWord {
    pub name: String,
    #[serde(default = "default_multiplier")]
    pub multiplier: i64,
    /// Guessed by the team itself rather than dealt as a bonus.
    #[serde(default)]
    pub highlighted: bool,
}

fn default_multiplier() -> i64 {
    DEFAULT_MULTIPLIER
}

fn default_attempts() -> i32 {
    DEFAULT_ATTEMPTS
}

/// Per-round board (key `gameQuestion`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", from = "GameQuestionRecord")]
pub struct GameQuestion {
    pub active_question_text: Option<String>,
    pub open_slots: Vec<Slot>,
    pub hidden_answers: Vec<HiddenAnswer>,
    pub team1_words: Vec<TeamWord>,
    pub team2_words: Vec<TeamWord>,
    pub team1_attempts: i32,
    pub team2_attempts: i32,
}

impl Default for GameQuestion {
    fn default() -> Self {
        Self {
            active_question_text: None,
            open_slots: empty_board(),
            hidden_answers: Vec::new(),
            team1_words: Vec::new(),
            team2_words: Vec::new(),
            team1_attempts: DEFAULT_ATTEMPTS,
            team2_attempts: DEFAULT_ATTEMPTS,
        }
    }
}

impl GameQuestion {
    /// Word list of `team`.
    pub fn words(&self, team: Team) -> &[TeamWord] {
        match team {
            Team::One => &self.team1_words,
            Team::Two => &self.team2_words,
        }
    }

    pub(crate) fn words_mut(&mut self, team: Team) -> &mut Vec<TeamWord> {
        match team {
            Team::One => &mut self.team1_words,
            Team::Two => &mut self.team2_words,
        }
    }

    /// Remaining attempts of `team`.
    pub fn attempts(&self, team: Team) -> i32 {
        match team {
            Team::One => self.team1_attempts,
            Team::Two => self.team2_attempts,
        }
    }

    pub(crate) fn attempts_mut(&mut self, team: Team) -> &mut i32 {
        match team {
            Team::One => &mut self.team1_attempts,
            Team::Two => &mut self.team2_attempts,
        }
    }

    /// Whether `text` already sits on the board.
    pub fn on_board(&self, text: &str) -> bool {
        self.open_slots
            .iter()
            .any(|slot| slot.text.as_deref() == Some(text))
    }

    /// Team currently holding `name`, if any.
    pub fn holder_of(&self, name: &str) -> Option<Team> {
        [Team::One, Team::Two]
            .into_iter()
            .find(|team| self.words(*team).iter().any(|word| word.name == name))
    }
}

/// Ten empty slots.
pub fn empty_board() -> Vec<Slot> {
    vec![Slot::default(); SLOT_COUNT]
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameQuestionRecord {
    #[serde(default, alias = "name")]
    active_question_text: Option<String>,
    #[serde(default, alias = "openWords")]
    open_slots: Vec<Slot>,
    #[serde(default, alias = "hiddenWords")]
    hidden_answers: Vec<HiddenAnswer>,
    #[serde(default, alias = "team1words")]
    team1_words: Vec<TeamWord>,
    #[serde(default, alias = "team2words")]
    team2_words: Vec<TeamWord>,
    #[serde(default = "default_attempts", alias = "team1attempts")]
    team1_attempts: i32,
    #[serde(default = "default_attempts", alias = "team2attempts")]
    team2_attempts: i32,
}

impl From<GameQuestionRecord> for GameQuestion {
    fn from(record: GameQuestionRecord) -> Self {
        let mut open_slots: Vec<Slot> = record
            .open_slots
            .into_iter()
            .map(|slot| match slot.text {
                Some(text) if text == LEGACY_EMPTY_MARKER => Slot::default(),
                Some(text) => Slot {
                    text: Some(text),
                    score: slot.score,
                },
                None => Slot::default(),
            })
            .collect();
        open_slots.resize(SLOT_COUNT, Slot::default());

        Self {
            active_question_text: record
                .active_question_text
                .filter(|text| !text.is_empty()),
            open_slots,
            hidden_answers: record.hidden_answers,
            team1_words: record.team1_words,
            team2_words: record.team2_words,
            team1_attempts: record.team1_attempts,
            team2_attempts: record.team2_attempts,
        }
    }
}

/// A ranked answer of a bank question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Answer {
    /// Rank, `1..=10`.
    pub position: u8,
    pub text: String,
}

/// A question of the bank together with its ranked answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Question {
    pub id: u32,
    pub text: String,
    pub answers: Vec<Answer>,
}

/// Reasons a bank entry is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestionError {
    #[error("question {id} has no text")]
    EmptyText { id: u32 },
    #[error("question {id} has {count} answers; at most 10 are allowed")]
    TooManyAnswers { id: u32, count: usize },
    #[error("question {id} has an answer at position {position}, outside 1..=10")]
    PositionOutOfRange { id: u32, position: u8 },
    #[error("question {id} has more than one answer at position {position}")]
    DuplicatePosition { id: u32, position: u8 },
    #[error("question {id} lists `{text}` more than once")]
    DuplicateAnswer { id: u32, text: String },
}

impl Question {
    /// Check the bank rules: non-empty text, at most ten answers with unique
    /// positions in `1..=10` and unique texts.
    pub fn validate(&self) -> Result<(), QuestionError> {
        let id = self.id;
        if self.text.trim().is_empty() {
            return Err(QuestionError::EmptyText { id });
        }
        if self.answers.len() > MAX_ANSWERS {
            return Err(QuestionError::TooManyAnswers {
                id,
                count: self.answers.len(),
            });
        }

        let mut positions = [false; MAX_ANSWERS + 1];
        let mut texts: IndexMap<&str, ()> = IndexMap::new();
        for answer in &self.answers {
            let position = answer.position;
            if position == 0 || usize::from(position) > MAX_ANSWERS {
                return Err(QuestionError::PositionOutOfRange { id, position });
            }
            if std::mem::replace(&mut positions[usize::from(position)], true) {
                return Err(QuestionError::DuplicatePosition { id, position });
            }
            if texts.insert(answer.text.as_str(), ()).is_some() {
                return Err(QuestionError::DuplicateAnswer {
                    id,
                    text: answer.text.clone(),
                });
            }
        }
        Ok(())
    }

    /// Answers sorted by position.
    pub fn ranked_answers(&self) -> Vec<&Answer> {
        let mut answers: Vec<&Answer> = self.answers.iter().collect();
        answers.sort_by_key(|answer| answer.position);
        answers
    }

    /// Answer text to position, built fresh from the answer list.
    pub fn rank_map(&self) -> IndexMap<String, u8> {
        self.ranked_answers()
            .into_iter()
            .map(|answer| (answer.text.clone(), answer.position))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn legacy_boolean_stage_decodes_to_enum() {
        let state: GameState = serde_json::from_value(json!({
            "team1Name": "Owls",
            "team2Name": "Foxes",
            "team1Score": 300,
            "team2Score": -100,
            "stageOne": false,
            "stageTwo": true
        }))
        .unwrap();

        assert_eq!(state.stage, Stage::StageTwo);
        assert_eq!(state.team2_score, -100);
    }

    #[test]
    fn reset_record_without_stage_fields_is_idle_with_default_names() {
        let state: GameState = serde_json::from_value(json!({
            "team1Name": "",
            "team1Score": 0,
            "team2Score": 0
        }))
        .unwrap();

        assert_eq!(state, GameState::default());
    }

    #[test]
    fn game_state_round_trips_in_current_shape() {
        let state = GameState::default().with_stage(Stage::StageOne);
        let encoded = serde_json::to_value(&state).unwrap();

        assert_eq!(encoded["stage"], json!("stageOne"));
        assert_eq!(serde_json::from_value::<GameState>(encoded).unwrap(), state);
    }

    #[test]
    fn legacy_question_fields_and_marker_are_normalised() {
        let question: GameQuestion = serde_json::from_value(json!({
            "name": "IMDb Top 10 Movies",
            "openWords": [
                {"text": "Fight Club", "score": 100},
                {"text": "⚡⚡⚡", "score": 0}
            ],
            "hiddenWords": [{"text": "Fight Club", "hidden": true, "score": 1000}],
            "team1words": [{"name": "Fight Club", "multiplier": 3, "highlighted": true}],
            "team2words": [],
            "team1attempts": 4,
            "team2attempts": 5
        }))
        .unwrap();

        assert_eq!(question.active_question_text.as_deref(), Some("IMDb Top 10 Movies"));
        assert_eq!(question.open_slots.len(), SLOT_COUNT);
        assert_eq!(question.open_slots[0].text.as_deref(), Some("Fight Club"));
        assert!(question.open_slots[1..].iter().all(Slot::is_empty));
        assert_eq!(question.team1_attempts, 4);
        assert_eq!(question.holder_of("Fight Club"), Some(Team::One));
    }

    #[test]
    fn legacy_reset_shape_decodes_to_empty_board() {
        let question: GameQuestion = serde_json::from_value(json!({
            "name": null,
            "openWords": [],
            "team1words": [],
            "team2words": [],
            "team1attempts": 5,
            "team2attempts": 5
        }))
        .unwrap();

        assert_eq!(question, GameQuestion::default());
    }

    #[test]
    fn question_validation_rejects_duplicate_positions() {
        let question = Question {
            id: 9,
            text: "Colours".into(),
            answers: vec![
                Answer {
                    position: 1,
                    text: "Red".into(),
                },
                Answer {
                    position: 1,
                    text: "Blue".into(),
                },
            ],
        };

        assert_eq!(
            question.validate(),
            Err(QuestionError::DuplicatePosition { id: 9, position: 1 })
        );
    }

    #[test]
    fn rank_map_follows_positions_not_list_order() {
        let question = Question {
            id: 1,
            text: "Colours".into(),
            answers: vec![
                Answer {
                    position: 2,
                    text: "Blue".into(),
                },
                Answer {
                    position: 1,
                    text: "Red".into(),
                },
            ],
        };

        let ranks = question.rank_map();
        assert_eq!(ranks.get_index(0), Some((&"Red".to_string(), &1)));
        assert_eq!(ranks.get("Blue"), Some(&2));
    }
}
