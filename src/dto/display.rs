//! Read model rendered by the display role.

use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use crate::state::state_machine::Stage;

/// Name and score shown in a team's corner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TeamBanner {
    pub name: String,
    pub score: i64,
}

/// One line of the open-guess board.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BoardRow {
    /// Guess text, or the mask while the slot is empty.
    pub text: String,
    /// Absent while the slot is empty.
    pub score: Option<i64>,
    pub filled: bool,
}

/// One ranked answer of the active question.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AnswerRow {
    /// 1-based position in the answer list.
    pub rank: usize,
    /// Answer text, or the mask while hidden.
    pub text: String,
    /// Absent while hidden.
    pub score: Option<i64>,
    pub hidden: bool,
}

/// A word chip beside a team's column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct WordChip {
    pub name: String,
    pub multiplier: i64,
    pub highlighted: bool,
}

/// Attempts left for each team during stage one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct AttemptsView {
    pub team1: i32,
    pub team2: i32,
}

/// Everything the display renders, derived from the two replicated records.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DisplayView {
    pub stage: Stage,
    pub team1: TeamBanner,
    pub team2: TeamBanner,
    /// Active question text or the waiting placeholder.
    pub title: String,
    pub has_question: bool,
    /// Stage one only.
    pub board: Option<Vec<BoardRow>>,
    /// Stage one only.
    pub attempts: Option<AttemptsView>,
    /// Stage two only.
    pub answers: Option<Vec<AnswerRow>>,
    pub team1_words: Vec<WordChip>,
    pub team2_words: Vec<WordChip>,
}
