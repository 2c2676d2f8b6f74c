//! Pure round transformations.
//!
//! Every function takes the current [`GameQuestion`] by reference and returns a
//! fully formed successor, so a cell write always commits a complete value.
//! Errors leave the input untouched.

use rand::{Rng, seq::SliceRandom};
use thiserror::Error;

use crate::state::game::{
    DEFAULT_MULTIPLIER, GameQuestion, GameState, HiddenAnswer, Question, RANK_POINTS, Slot, Team, TeamWord,
    WORD_LIST_TARGET,
};

/// Rejections of a round operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundError {
    /// The active question has no answer with this text.
    #[error("`{name}` is not an answer of the active question")]
    UnknownAnswer { name: String },
    /// The team's word list does not hold this word.
    #[error("{team} does not hold `{name}`")]
    WordNotHeld { team: Team, name: String },
    /// The answer was revealed earlier in the round.
    #[error("`{name}` has already been revealed")]
    AlreadyRevealed { name: String },
    /// The guess is already on the board or held by a team.
    #[error("`{name}` has already been claimed")]
    AlreadyClaimed { name: String },
    /// Guesses need visible text.
    #[error("guess text must not be empty")]
    EmptyGuess,
    /// The result does not fit the stored integer width.
    #[error("{quantity} out of range")]
    Overflow { quantity: &'static str },
}

/// Result of placing a guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessOutcome {
    pub question: GameQuestion,
    /// Points earned by the guessing team; zero when the board was full.
    pub points: i64,
    /// Index of the filled slot, `None` when the board was full.
    pub slot: Option<usize>,
}

/// Parameters of a reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealRequest {
    /// Team whose list the word is removed from when nothing is stolen.
    pub owner: Team,
    pub answer: String,
    pub multiplier: i64,
    /// Team credited with the points.
    pub score_team: Team,
    /// Team the word is taken from instead of `owner`.
    pub steal_from: Option<Team>,
}

/// Result of a reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealOutcome {
    pub question: GameQuestion,
    /// Points to add to the credited team: the answer's score after multiplying.
    pub points: i64,
}

/// Points for filling the slot at `index`: 100 for the first pair, 500 for the last.
pub fn slot_score(index: usize) -> i64 {
    (index as i64 / 2 + 1) * 100
}

/// Board for a fresh round of `question`, every answer hidden.
pub fn start_stage_one(question: &Question) -> GameQuestion {
    let hidden_answers = question
        .ranked_answers()
        .into_iter()
        .map(|answer| HiddenAnswer {
            text: answer.text.clone(),
            hidden: true,
            score: i64::from(answer.position) * RANK_POINTS,
        })
        .collect();

    GameQuestion {
        active_question_text: Some(question.text.clone()),
        hidden_answers,
        ..GameQuestion::default()
    }
}

/// Place `text` for `team` in the first empty slot.
///
/// With a full board no slot is filled and no points are earned, but the word
/// is still added to the team's list and an attempt is still spent.
pub fn attempt_guess(
    current: &GameQuestion,
    team: Team,
    text: &str,
) -> Result<GuessOutcome, RoundError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(RoundError::EmptyGuess);
    }
    if current.on_board(text) || current.holder_of(text).is_some() {
        return Err(RoundError::AlreadyClaimed { name: text.into() });
    }

    let attempts = current
        .attempts(team)
        .checked_sub(1)
        .ok_or(RoundError::Overflow {
            quantity: "attempts",
        })?;

    let mut question = current.clone();
    let slot = question.open_slots.iter().position(Slot::is_empty);
    let points = match slot {
        Some(index) => {
            let score = slot_score(index);
            question.open_slots[index] = Slot {
                text: Some(text.into()),
                score,
            };
            score
        }
        None => 0,
    };
    question.words_mut(team).push(TeamWord {
        name: text.into(),
        multiplier: DEFAULT_MULTIPLIER,
        highlighted: true,
    });
    *question.attempts_mut(team) = attempts;

    Ok(GuessOutcome {
        question,
        points,
        slot,
    })
}

/// Answers nobody guessed or holds, in their ranked order.
pub fn unguessed(current: &GameQuestion) -> Vec<String> {
    current
        .hidden_answers
        .iter()
        .filter(|answer| !current.on_board(&answer.text) && current.holder_of(&answer.text).is_none())
        .map(|answer| answer.text.clone())
        .collect()
}

/// Top both word lists up to five from a single shuffled pool of unguessed
/// answers, serving team 1 first. Dealt words are not highlighted.
pub fn deal_bonus_words<R>(current: &GameQuestion, rng: &mut R) -> GameQuestion
where
    R: Rng + ?Sized,
{
    let mut pool = unguessed(current);
    pool.shuffle(rng);
    let mut pool = pool.into_iter();

    let mut question = current.clone();
    for team in [Team::One, Team::Two] {
        let wanted = WORD_LIST_TARGET.saturating_sub(question.words(team).len());
        let dealt: Vec<TeamWord> = pool
            .by_ref()
            .take(wanted)
            .map(|name| TeamWord {
                name,
                multiplier: DEFAULT_MULTIPLIER,
                highlighted: false,
            })
            .collect();
        question.words_mut(team).extend(dealt);
    }
    question
}

/// Reveal an answer, multiply its score and take the word off a team's list.
///
/// A second reveal of the same answer is rejected so the score is only ever
/// credited once.
pub fn reveal(current: &GameQuestion, request: &RevealRequest) -> Result<RevealOutcome, RoundError> {
    let name = request.answer.as_str();
    let answer_index = current
        .hidden_answers
        .iter()
        .position(|answer| answer.text == name)
        .ok_or_else(|| RoundError::UnknownAnswer { name: name.into() })?;
    if !current.hidden_answers[answer_index].hidden {
        return Err(RoundError::AlreadyRevealed { name: name.into() });
    }

    let removal_team = request.steal_from.unwrap_or(request.owner);
    let word_index = current
        .words(removal_team)
        .iter()
        .position(|word| word.name == name)
        .ok_or_else(|| RoundError::WordNotHeld {
            team: removal_team,
            name: name.into(),
        })?;

    let points = current.hidden_answers[answer_index]
        .score
        .checked_mul(request.multiplier)
        .ok_or(RoundError::Overflow {
            quantity: "answer score",
        })?;

    let mut question = current.clone();
    let answer = &mut question.hidden_answers[answer_index];
    answer.hidden = false;
    answer.score = points;
    question.words_mut(removal_team).remove(word_index);

    Ok(RevealOutcome { question, points })
}

/// Add `delta` to the multiplier of `name` in `team`'s list. No floor.
pub fn adjust_multiplier(
    current: &GameQuestion,
    team: Team,
    name: &str,
    delta: i64,
) -> Result<GameQuestion, RoundError> {
    let index = current
        .words(team)
        .iter()
        .position(|word| word.name == name)
        .ok_or_else(|| RoundError::WordNotHeld {
            team,
            name: name.into(),
        })?;

    let multiplier = current.words(team)[index]
        .multiplier
        .checked_add(delta)
        .ok_or(RoundError::Overflow {
            quantity: "multiplier",
        })?;

    let mut question = current.clone();
    question.words_mut(team)[index].multiplier = multiplier;
    Ok(question)
}

/// Add `delta` to `team`'s attempts. No floor.
pub fn adjust_attempts(
    current: &GameQuestion,
    team: Team,
    delta: i32,
) -> Result<GameQuestion, RoundError> {
    let attempts = current
        .attempts(team)
        .checked_add(delta)
        .ok_or(RoundError::Overflow {
            quantity: "attempts",
        })?;

    let mut question = current.clone();
    *question.attempts_mut(team) = attempts;
    Ok(question)
}

/// `state` with `points` added to `team`'s score.
pub fn credit(state: &GameState, team: Team, points: i64) -> Result<GameState, RoundError> {
    state
        .score(team)
        .checked_add(points)
        .map(|score| state.with_score(team, score))
        .ok_or(RoundError::Overflow { quantity: "score" })
}

/// Board with no active question.
pub fn cleared() -> GameQuestion {
    GameQuestion::default()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::state::game::{Answer, DEFAULT_ATTEMPTS, SLOT_COUNT};

    fn question(answers: &[&str]) -> Question {
        Question {
            id: 1,
            text: "Colours".into(),
            answers: answers
                .iter()
                .enumerate()
                .map(|(index, text)| Answer {
                    position: index as u8 + 1,
                    text: (*text).into(),
                })
                .collect(),
        }
    }

    fn ten_answers() -> Question {
        question(&[
            "Red", "Blue", "Green", "Yellow", "Black", "White", "Pink", "Grey", "Brown", "Orange",
        ])
    }

    fn word(name: &str) -> TeamWord {
        TeamWord {
            name: name.into(),
            multiplier: DEFAULT_MULTIPLIER,
            highlighted: false,
        }
    }

    #[test]
    fn stage_one_builds_hidden_answers_from_positions() {
        let board = start_stage_one(&question(&["A", "B"]));

        assert_eq!(
            board.hidden_answers,
            vec![
                HiddenAnswer {
                    text: "A".into(),
                    hidden: true,
                    score: 100
                },
                HiddenAnswer {
                    text: "B".into(),
                    hidden: true,
                    score: 200
                },
            ]
        );
        assert_eq!(board.open_slots.len(), SLOT_COUNT);
        assert!(board.open_slots.iter().all(Slot::is_empty));
        assert_eq!((board.team1_attempts, board.team2_attempts), (5, 5));
        assert!(board.team1_words.is_empty() && board.team2_words.is_empty());
    }

    #[test]
    fn first_guess_fills_slot_zero_for_one_hundred() {
        let board = start_stage_one(&question(&["A", "B"]));
        let outcome = attempt_guess(&board, Team::One, "A").unwrap();

        assert_eq!(outcome.slot, Some(0));
        assert_eq!(outcome.points, 100);
        assert_eq!(outcome.question.open_slots[0].text.as_deref(), Some("A"));
        assert_eq!(outcome.question.team1_attempts, 4);
        assert_eq!(
            outcome.question.team1_words,
            vec![TeamWord {
                name: "A".into(),
                multiplier: 3,
                highlighted: true
            }]
        );
        assert_eq!(board.team1_attempts, DEFAULT_ATTEMPTS);
    }

    #[test]
    fn slot_bands_sum_to_three_thousand() {
        let bank = ten_answers();
        let mut board = start_stage_one(&bank);
        let mut scores = Vec::new();
        for (turn, answer) in bank.answers.iter().enumerate() {
            let team = if turn % 2 == 0 { Team::One } else { Team::Two };
            let outcome = attempt_guess(&board, team, &answer.text).unwrap();
            scores.push(outcome.points);
            board = outcome.question;
        }

        assert_eq!(scores, vec![100, 100, 200, 200, 300, 300, 400, 400, 500, 500]);
        assert_eq!(scores.iter().sum::<i64>(), 3000);
    }

    #[test]
    fn guess_on_full_board_still_costs_an_attempt() {
        let bank = ten_answers();
        let mut board = start_stage_one(&bank);
        for answer in &bank.answers {
            board = attempt_guess(&board, Team::One, &answer.text)
                .unwrap()
                .question;
        }

        let outcome = attempt_guess(&board, Team::Two, "Violet").unwrap();

        assert_eq!(outcome.slot, None);
        assert_eq!(outcome.points, 0);
        assert_eq!(outcome.question.open_slots, board.open_slots);
        assert_eq!(outcome.question.team2_words.len(), 1);
        assert_eq!(outcome.question.team2_attempts, 4);
    }

    #[test]
    fn attempts_have_no_floor() {
        let board = start_stage_one(&ten_answers());
        let board = adjust_attempts(&board, Team::One, -7).unwrap();
        assert_eq!(board.team1_attempts, -2);
    }

    #[test]
    fn attempts_overflow_is_rejected() {
        let board = start_stage_one(&ten_answers());
        let board = adjust_attempts(&board, Team::Two, -10).unwrap();

        assert_eq!(
            adjust_attempts(&board, Team::Two, i32::MIN),
            Err(RoundError::Overflow {
                quantity: "attempts"
            })
        );
        assert_eq!(
            adjust_attempts(&board, Team::One, i32::MAX),
            Err(RoundError::Overflow {
                quantity: "attempts"
            })
        );
    }

    #[test]
    fn guess_at_minimum_attempts_is_rejected() {
        let mut board = start_stage_one(&question(&["A", "B"]));
        board.team1_attempts = i32::MIN;

        assert_eq!(
            attempt_guess(&board, Team::One, "A"),
            Err(RoundError::Overflow {
                quantity: "attempts"
            })
        );
    }

    #[test]
    fn duplicate_or_blank_guesses_are_rejected() {
        let board = start_stage_one(&question(&["A", "B"]));
        let board = attempt_guess(&board, Team::One, "A").unwrap().question;

        assert_eq!(
            attempt_guess(&board, Team::Two, "A"),
            Err(RoundError::AlreadyClaimed { name: "A".into() })
        );
        assert_eq!(
            attempt_guess(&board, Team::Two, "   "),
            Err(RoundError::EmptyGuess)
        );
    }

    #[test]
    fn bonus_deal_never_overlaps_and_respects_list_sizes() {
        let bank = ten_answers();
        for seed in 0..32 {
            let mut board = start_stage_one(&bank);
            board = attempt_guess(&board, Team::One, "Red").unwrap().question;
            board = attempt_guess(&board, Team::One, "Blue").unwrap().question;
            board = attempt_guess(&board, Team::Two, "Green").unwrap().question;

            let mut rng = StdRng::seed_from_u64(seed);
            let dealt = deal_bonus_words(&board, &mut rng);

            assert_eq!(dealt.team1_words.len(), 5);
            assert_eq!(dealt.team2_words.len(), 5);
            let bonus1: Vec<&str> = dealt.team1_words[2..].iter().map(|w| w.name.as_str()).collect();
            let bonus2: Vec<&str> = dealt.team2_words[1..].iter().map(|w| w.name.as_str()).collect();
            assert!(bonus1.iter().all(|name| !bonus2.contains(name)));
            assert!(bonus1.iter().chain(&bonus2).all(|name| !board.on_board(name)));
            assert!(dealt.team1_words[2..].iter().all(|w| !w.highlighted));
        }
    }

    #[test]
    fn bonus_deal_serves_team_one_first_from_a_short_pool() {
        let board = start_stage_one(&question(&["A", "B", "C"]));
        let mut rng = StdRng::seed_from_u64(7);

        let dealt = deal_bonus_words(&board, &mut rng);

        assert_eq!(dealt.team1_words.len(), 3);
        assert!(dealt.team2_words.is_empty());
    }

    #[test]
    fn bonus_deal_leaves_full_lists_alone() {
        let mut board = start_stage_one(&ten_answers());
        board.team1_words = ["x1", "x2", "x3", "x4", "x5", "x6"].map(word).to_vec();
        let mut rng = StdRng::seed_from_u64(1);

        let dealt = deal_bonus_words(&board, &mut rng);

        assert_eq!(dealt.team1_words.len(), 6);
        assert_eq!(dealt.team2_words.len(), 5);
    }

    #[test]
    fn reveal_multiplies_and_removes_from_owner() {
        let mut board = start_stage_one(&question(&["A", "B"]));
        board.team1_words.push(word("B"));

        let outcome = reveal(
            &board,
            &RevealRequest {
                owner: Team::One,
                answer: "B".into(),
                multiplier: 2,
                score_team: Team::One,
                steal_from: None,
            },
        )
        .unwrap();

        assert_eq!(outcome.points, 400);
        assert_eq!(outcome.question.hidden_answers[1].score, 400);
        assert!(!outcome.question.hidden_answers[1].hidden);
        assert!(outcome.question.team1_words.is_empty());
    }

    #[test]
    fn steal_removes_from_the_other_list() {
        let mut board = start_stage_one(&question(&["A", "B"]));
        board.team1_words.push(word("A"));
        board.team2_words.push(word("A"));

        let outcome = reveal(
            &board,
            &RevealRequest {
                owner: Team::Two,
                answer: "A".into(),
                multiplier: 3,
                score_team: Team::Two,
                steal_from: Some(Team::One),
            },
        )
        .unwrap();

        assert_eq!(outcome.points, 300);
        assert!(outcome.question.team1_words.is_empty());
        assert_eq!(outcome.question.team2_words.len(), 1);
    }

    #[test]
    fn second_reveal_is_rejected() {
        let mut board = start_stage_one(&question(&["A", "B"]));
        board.team1_words.push(word("A"));
        board.team2_words.push(word("A"));
        let request = RevealRequest {
            owner: Team::One,
            answer: "A".into(),
            multiplier: 2,
            score_team: Team::One,
            steal_from: None,
        };
        let once = reveal(&board, &request).unwrap().question;

        let again = RevealRequest {
            owner: Team::Two,
            ..request
        };
        assert_eq!(
            reveal(&once, &again),
            Err(RoundError::AlreadyRevealed { name: "A".into() })
        );
    }

    #[test]
    fn reveal_lookups_fail_without_partial_changes() {
        let board = start_stage_one(&question(&["A", "B"]));

        assert_eq!(
            reveal(
                &board,
                &RevealRequest {
                    owner: Team::One,
                    answer: "Z".into(),
                    multiplier: 1,
                    score_team: Team::One,
                    steal_from: None,
                }
            ),
            Err(RoundError::UnknownAnswer { name: "Z".into() })
        );
        assert_eq!(
            reveal(
                &board,
                &RevealRequest {
                    owner: Team::One,
                    answer: "A".into(),
                    multiplier: 1,
                    score_team: Team::One,
                    steal_from: None,
                }
            ),
            Err(RoundError::WordNotHeld {
                team: Team::One,
                name: "A".into()
            })
        );
    }

    #[test]
    fn multiplier_can_drop_below_zero() {
        let mut board = start_stage_one(&question(&["A"]));
        board.team2_words.push(word("A"));

        let board = adjust_multiplier(&board, Team::Two, "A", -4).unwrap();
        assert_eq!(board.team2_words[0].multiplier, -1);
        assert_eq!(
            adjust_multiplier(&board, Team::One, "A", -1),
            Err(RoundError::WordNotHeld {
                team: Team::One,
                name: "A".into()
            })
        );
    }

    #[test]
    fn zero_and_negative_multipliers_still_reveal() {
        let mut board = start_stage_one(&question(&["A", "B"]));
        board.team1_words.push(word("A"));
        board.team2_words.push(word("B"));

        let zero = reveal(
            &board,
            &RevealRequest {
                owner: Team::One,
                answer: "A".into(),
                multiplier: 0,
                score_team: Team::One,
                steal_from: None,
            },
        )
        .unwrap();
        assert_eq!(zero.points, 0);
        assert!(!zero.question.hidden_answers[0].hidden);
        assert_eq!(zero.question.hidden_answers[0].score, 0);

        let negative = reveal(
            &board,
            &RevealRequest {
                owner: Team::Two,
                answer: "B".into(),
                multiplier: -1,
                score_team: Team::Two,
                steal_from: None,
            },
        )
        .unwrap();
        assert_eq!(negative.points, -200);
        assert!(!negative.question.hidden_answers[1].hidden);
        assert!(negative.question.team2_words.is_empty());
    }

    #[test]
    fn overflowing_reveal_changes_nothing() {
        let mut board = start_stage_one(&question(&["A", "B"]));
        board.team1_words.push(word("B"));

        let result = reveal(
            &board,
            &RevealRequest {
                owner: Team::One,
                answer: "B".into(),
                multiplier: i64::MAX,
                score_team: Team::One,
                steal_from: None,
            },
        );

        assert_eq!(
            result,
            Err(RoundError::Overflow {
                quantity: "answer score"
            })
        );
        assert!(board.hidden_answers[1].hidden);
        assert_eq!(board.team1_words.len(), 1);
    }

    #[test]
    fn multiplier_overflow_is_rejected() {
        let mut board = start_stage_one(&question(&["A"]));
        board.team1_words.push(word("A"));

        assert_eq!(
            adjust_multiplier(&board, Team::One, "A", i64::MAX),
            Err(RoundError::Overflow {
                quantity: "multiplier"
            })
        );
    }

    #[test]
    fn credit_adds_points_and_rejects_overflow() {
        let state = GameState::default().with_score(Team::Two, 50);

        let credited = credit(&state, Team::Two, -80).unwrap();
        assert_eq!(credited.team2_score, -30);
        assert_eq!(credited.team1_score, 0);

        let near_max = state.with_score(Team::One, i64::MAX - 1);
        assert_eq!(
            credit(&near_max, Team::One, 2),
            Err(RoundError::Overflow { quantity: "score" })
        );
    }

    #[test]
    fn cleared_board_has_no_question() {
        let board = cleared();
        assert_eq!(board.active_question_text, None);
        assert_eq!(board.open_slots.len(), SLOT_COUNT);
        assert!(board.hidden_answers.is_empty());
        assert_eq!((board.team1_attempts, board.team2_attempts), (5, 5));
    }
}
