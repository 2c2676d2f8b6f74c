use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Phases a round can be in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    /// No active question.
    #[default]
    Idle,
    /// Teams guess against the ten-slot board.
    StageOne,
    /// Hidden answers are revealed, claimed or stolen.
    StageTwo,
}

/// Events moving the round between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    /// A question is selected and the board rebuilt.
    StartStageOne,
    /// Bonus words are dealt and reveals begin.
    StartStageTwo,
    /// The round is abandoned.
    Reset,
}

/// Operations that mutate a round without changing its stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageAction {
    /// A team places a guess on the board.
    Guess,
    /// A team's attempts counter is adjusted.
    AdjustAttempts,
    /// A hidden answer is revealed.
    Reveal,
    /// The multiplier of a held word is adjusted.
    AdjustMultiplier,
}

/// How strictly operations are tied to stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StagePolicy {
    /// Any operation is accepted once a question is active.
    #[default]
    Permissive,
    /// Operations are only accepted in the stage they belong to.
    Strict,
}

/// Rejections produced by the stage rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// Nothing to act on while idle.
    #[error("no active question")]
    NoActiveQuestion,
    /// The event is not a legal transition from the current stage.
    #[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
    InvalidTransition { from: Stage, event: StageEvent },
    /// The action is not accepted in the current stage.
    #[error("{action:?} is not allowed while in {stage:?}")]
    WrongStage { stage: Stage, action: StageAction },
}

impl StagePolicy {
    /// Compute the stage reached by applying `event` from `from`.
    pub fn transition(self, from: Stage, event: StageEvent) -> Result<Stage, StageError> {
        let next = match (self, from, event) {
            (_, _, StageEvent::Reset) => Stage::Idle,
            (StagePolicy::Permissive, _, StageEvent::StartStageOne) => Stage::StageOne,
            (StagePolicy::Strict, Stage::Idle | Stage::StageTwo, StageEvent::StartStageOne) => {
                Stage::StageOne
            }
            (_, Stage::Idle, StageEvent::StartStageTwo) => {
                return Err(StageError::NoActiveQuestion);
            }
            (StagePolicy::Permissive, _, StageEvent::StartStageTwo) => Stage::StageTwo,
            (StagePolicy::Strict, Stage::StageOne, StageEvent::StartStageTwo) => Stage::StageTwo,
            (_, from, event) => return Err(StageError::InvalidTransition { from, event }),
        };

        Ok(next)
    }

    /// Check that `action` may run while in `stage`.
    pub fn check(self, stage: Stage, action: StageAction) -> Result<(), StageError> {
        match (self, stage, action) {
            (_, Stage::Idle, _) => Err(StageError::NoActiveQuestion),
            (StagePolicy::Permissive, _, _) => Ok(()),
            (
                StagePolicy::Strict,
                Stage::StageOne,
                StageAction::Guess | StageAction::AdjustAttempts,
            )
            | (
                StagePolicy::Strict,
                Stage::StageTwo,
                StageAction::Reveal | StageAction::AdjustMultiplier,
            ) => Ok(()),
            (StagePolicy::Strict, stage, action) => Err(StageError::WrongStage { stage, action }),
        }
    }
}
