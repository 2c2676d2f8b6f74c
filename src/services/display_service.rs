//! Projection of the replicated records into what the display shows.
//!
//! The projection is a pure function of `(GameState, GameQuestion)`; it never
//! fails, whatever state it is handed.

use crate::{
    dto::display::{AnswerRow, AttemptsView, BoardRow, DisplayView, TeamBanner, WordChip},
    state::{
        SharedState,
        game::{GameQuestion, GameState, TeamWord},
        state_machine::Stage,
    },
};

/// SSE event name carrying a [`DisplayView`].
pub const DISPLAY_EVENT: &str = "display";
/// Title shown while no question is active.
pub const WAITING_PLACEHOLDER: &str = "Waiting for the game to start...";
/// Text shown in place of anything not revealed yet.
pub const MASK: &str = "⚡⚡⚡";

/// Current view as seen by the display context's replicas.
pub fn current_view(state: &SharedState) -> DisplayView {
    let (game_state, game_question) = state.display().snapshot();
    project(&game_state, &game_question)
}

/// Derive the display view.
pub fn project(state: &GameState, question: &GameQuestion) -> DisplayView {
    let (title, has_question) = match question.active_question_text.as_deref() {
        Some(text) if !text.is_empty() => (text.to_string(), true),
        _ => (WAITING_PLACEHOLDER.to_string(), false),
    };

    let (board, attempts) = if state.stage == Stage::StageOne {
        let rows = question
            .open_slots
            .iter()
            .map(|slot| match &slot.text {
                Some(text) => BoardRow {
                    text: text.clone(),
                    score: Some(slot.score),
                    filled: true,
                },
                None => BoardRow {
                    text: MASK.to_string(),
                    score: None,
                    filled: false,
                },
            })
            .collect();
        let attempts = AttemptsView {
            team1: question.team1_attempts,
            team2: question.team2_attempts,
        };
        (Some(rows), Some(attempts))
    } else {
        (None, None)
    };

    let answers = (state.stage == Stage::StageTwo).then(|| {
        question
            .hidden_answers
            .iter()
            .enumerate()
            .map(|(index, answer)| AnswerRow {
                rank: index + 1,
                text: if answer.hidden {
                    MASK.to_string()
                } else {
                    answer.text.clone()
                },
                score: (!answer.hidden).then_some(answer.score),
                hidden: answer.hidden,
            })
            .collect()
    });

    DisplayView {
        stage: state.stage,
        team1: TeamBanner {
            name: state.team1_name.clone(),
            score: state.team1_score,
        },
        team2: TeamBanner {
            name: state.team2_name.clone(),
            score: state.team2_score,
        },
        title,
        has_question,
        board,
        attempts,
        answers,
        team1_words: chips(&question.team1_words),
        team2_words: chips(&question.team2_words),
    }
}

fn chips(words: &[TeamWord]) -> Vec<WordChip> {
    words
        .iter()
        .map(|word| WordChip {
            name: word.name.clone(),
            multiplier: word.multiplier,
            highlighted: word.highlighted,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        game::{Answer, Question, Team},
        round,
    };

    fn colours() -> Question {
        Question {
            id: 1,
            text: "Colours".into(),
            answers: vec![
                Answer {
                    position: 1,
                    text: "Red".into(),
                },
                Answer {
                    position: 2,
                    text: "Blue".into(),
                },
            ],
        }
    }

    #[test]
    fn idle_view_shows_placeholder_and_no_board() {
        let view = project(&GameState::default(), &GameQuestion::default());

        assert_eq!(view.title, WAITING_PLACEHOLDER);
        assert!(!view.has_question);
        assert!(view.board.is_none() && view.answers.is_none() && view.attempts.is_none());
        assert_eq!(view.team1.name, "Team 1");
    }

    #[test]
    fn stage_one_masks_empty_slots_and_shows_attempts() {
        let question = round::start_stage_one(&colours());
        let question = round::attempt_guess(&question, Team::Two, "Blue")
            .unwrap()
            .question;
        let state = GameState::default().with_stage(Stage::StageOne);

        let view = project(&state, &question);
        let board = view.board.unwrap();

        assert_eq!(board.len(), 10);
        assert_eq!(board[0].text, "Blue");
        assert_eq!(board[0].score, Some(100));
        assert_eq!(board[1].text, MASK);
        assert_eq!(board[1].score, None);
        assert_eq!(view.attempts, Some(AttemptsView { team1: 5, team2: 4 }));
        assert!(view.answers.is_none());
        assert_eq!(view.team2_words[0].name, "Blue");
        assert!(view.team2_words[0].highlighted);
    }

    #[test]
    fn stage_two_ranks_answers_and_masks_hidden_ones() {
        let mut question = round::start_stage_one(&colours());
        question.hidden_answers[1].hidden = false;
        let state = GameState::default().with_stage(Stage::StageTwo);

        let view = project(&state, &question);
        let answers = view.answers.unwrap();

        assert_eq!(answers[0].rank, 1);
        assert_eq!(answers[0].text, MASK);
        assert_eq!(answers[0].score, None);
        assert_eq!(answers[1].rank, 2);
        assert_eq!(answers[1].text, "Blue");
        assert_eq!(answers[1].score, Some(200));
        assert!(view.board.is_none());
    }

    #[test]
    fn projection_does_not_touch_its_inputs() {
        let question = round::start_stage_one(&colours());
        let state = GameState::default().with_stage(Stage::StageOne);
        let before = (state.clone(), question.clone());

        let _ = project(&state, &question);

        assert_eq!((state, question), before);
    }
}
