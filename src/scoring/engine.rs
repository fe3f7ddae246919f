use thiserror::Error;

use crate::scoring::visit::{
    DARTS_PER_VISIT, Dart, DartError, MAX_VISIT_SCORE, total_is_reachable,
};
use crate::state::match_state::{FinishMode, MatchState, Side, StartMode, Visit};
use crate::state::progression::{self, ProgressKind};

/// A completed visit handed to the engine, either dart by dart or as the
/// aggregate total some entry forms produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitInput {
    /// Structured entry: every dart of the visit, in throw order.
    Darts(Vec<Dart>),
    /// Aggregate entry: only the visit total and how many darts it took.
    /// Double-in and double-out legality cannot be verified in this form.
    Total {
        /// Total scored across the visit.
        total: u16,
        /// Number of darts thrown (1-3).
        darts: u8,
    },
}

/// What committing a visit did to the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitOutcome {
    /// Ordinary visit: score reduced, turn passed.
    Scored {
        /// Points the thrower has left.
        remaining: u16,
    },
    /// Visit would have left less than 0 or exactly 1 (or finished without
    /// the required double): score untouched, turn still passed.
    Bust,
    /// Visit checked out and won the leg; progression says how far that
    /// leg carried the match.
    LegWon {
        /// Leg, set, or match level the win advanced to.
        progress: ProgressKind,
    },
}

/// A committed visit together with the side that threw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitResult {
    /// Side that threw the visit.
    pub side: Side,
    /// Total the visit attempted.
    pub attempted: u16,
    /// Outcome the engine decided on.
    pub outcome: VisitOutcome,
}

/// Invalid input reported back to the caller. Distinct from a bust: the
/// visit is discarded without touching any state and the turn stays put.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    /// The match has already been decided or abandoned.
    #[error("match is no longer in progress")]
    MatchOver,
    /// A visit holds between one and three darts.
    #[error("a visit contains between 1 and {DARTS_PER_VISIT} darts (got {0})")]
    BadDartCount(usize),
    /// Aggregate total outside the 0-180 window.
    #[error("visit total {0} is outside 0..={MAX_VISIT_SCORE}")]
    TotalOutOfRange(u16),
    /// Aggregate total that no combination of the given darts can score.
    #[error("total {total} cannot be scored with {darts} darts")]
    UnreachableTotal {
        /// The rejected total.
        total: u16,
        /// Claimed dart count.
        darts: u8,
    },
    /// A structured dart was not a legal board entry.
    #[error(transparent)]
    InvalidDart(#[from] DartError),
}

/// Validated view of a visit after input checking.
struct CheckedVisit {
    /// Full total the player attempted.
    attempted: u16,
    /// Portion of the total that counts, once double-in gating is applied.
    scoring: u16,
    /// Dart count, for the thrown counters.
    darts_thrown: u32,
    /// Structured darts when available.
    darts: Vec<Dart>,
    /// Whether the double-in requirement is satisfied after this visit.
    opened: bool,
    /// Whether the last dart was a double (None for aggregate entry).
    finished_on_double: Option<bool>,
}

/// Apply a completed visit to the active player.
///
/// Implements the full bust/checkout decision: validate input, subtract
/// the scoring total, bust on a candidate below 0 or exactly 1 (or an
/// illegal double-out finish when dart-level data is present), win the leg
/// at exactly 0, otherwise bank the score and pass the turn. Statistics
/// and milestone counters only ever move on non-busted visits.
pub fn commit_visit(
    state: &mut MatchState,
    input: VisitInput,
) -> Result<VisitResult, ScoreError> {
    if !state.phase.is_live() {
        return Err(ScoreError::MatchOver);
    }

    let side = state.active;
    let checked = check_input(state, side, input)?;

    // The leg opener's visits number the leg.
    if side == state.leg_opener {
        state.visit_number += 1;
    }

    let finish_mode = state.config.finish_mode;
    let player = &mut state[side];
    let remaining = player.remaining_score;
    let candidate = i32::from(remaining) - i32::from(checked.scoring);

    let illegal_finish = candidate == 0
        && finish_mode == FinishMode::DoubleOut
        && checked.finished_on_double == Some(false);

    if candidate < 0 || candidate == 1 || illegal_finish {
        // Bust: attempted total goes into the history, nothing else moves.
        player.visit_history.push(Visit {
            darts: checked.darts,
            total: checked.attempted,
            scored: 0,
            bust: true,
        });
        player.darts_thrown_in_leg += checked.darts_thrown;
        player.darts_thrown_in_match += checked.darts_thrown;
        state.pass_turn();
        return Ok(VisitResult {
            side,
            attempted: checked.attempted,
            outcome: VisitOutcome::Bust,
        });
    }

    player.opened = checked.opened;
    player.remaining_score = candidate as u16;
    player.darts_thrown_in_leg += checked.darts_thrown;
    player.darts_thrown_in_match += checked.darts_thrown;
    player.points_scored_in_leg += u32::from(checked.scoring);
    player.points_scored_in_match += u32::from(checked.scoring);
    player.achievements.record(checked.scoring);
    player.visit_history.push(Visit {
        darts: checked.darts,
        total: checked.attempted,
        scored: checked.scoring,
        bust: false,
    });

    if candidate == 0 {
        // Leg over: no turn switch, progression takes it from here.
        let progress =
            progression::after_leg_won(state, side).map_err(|_| ScoreError::MatchOver)?;
        return Ok(VisitResult {
            side,
            attempted: checked.attempted,
            outcome: VisitOutcome::LegWon { progress },
        });
    }

    state.pass_turn();
    Ok(VisitResult {
        side,
        attempted: checked.attempted,
        outcome: VisitOutcome::Scored {
            remaining: candidate as u16,
        },
    })
}

/// Validate the raw input and fold in the double-in gate.
fn check_input(
    state: &MatchState,
    side: Side,
    input: VisitInput,
) -> Result<CheckedVisit, ScoreError> {
    let player = &state[side];
    let double_in_pending =
        state.config.start_mode == StartMode::DoubleIn && !player.opened;

    match input {
        VisitInput::Darts(darts) => {
            if darts.is_empty() || darts.len() > DARTS_PER_VISIT {
                return Err(ScoreError::BadDartCount(darts.len()));
            }

            let attempted: u16 = darts.iter().map(Dart::value).sum();

            // Darts thrown before the opening double score nothing.
            let mut opened = !double_in_pending;
            let mut scoring = 0u16;
            for dart in &darts {
                if !opened && dart.is_double() {
                    opened = true;
                }
                if opened {
                    scoring += dart.value();
                }
            }

            let finished_on_double = darts.last().map(Dart::is_double);

            Ok(CheckedVisit {
                attempted,
                scoring,
                darts_thrown: darts.len() as u32,
                darts,
                opened,
                finished_on_double,
            })
        }
        VisitInput::Total { total, darts } => {
            if total > MAX_VISIT_SCORE {
                return Err(ScoreError::TotalOutOfRange(total));
            }
            if !(1..=DARTS_PER_VISIT as u8).contains(&darts) {
                return Err(ScoreError::BadDartCount(usize::from(darts)));
            }
            if !total_is_reachable(total, darts) {
                return Err(ScoreError::UnreachableTotal { total, darts });
            }

            // Aggregate entry cannot see individual darts, so the double-in
            // and double-out gates are waived: the whole total counts and
            // reaching zero checks out.
            Ok(CheckedVisit {
                attempted: total,
                scoring: total,
                darts_thrown: u32::from(darts),
                darts: Vec::new(),
                opened: true,
                finished_on_double: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::visit::Multiplier;
    use crate::state::match_state::{
        FinishMode, MatchConfig, RaceFormat, RaceTarget, StartMode,
    };
    use crate::state::progression::MatchPhase;

    fn config() -> MatchConfig {
        MatchConfig {
            start_score: 501,
            start_mode: StartMode::StraightIn,
            finish_mode: FinishMode::StraightOut,
            legs_target: RaceTarget {
                format: RaceFormat::BestOf,
                count: 3,
            },
            sets_target: None,
        }
    }

    fn fresh(config: MatchConfig) -> MatchState {
        MatchState::new(config, "Anna".into(), "Bert".into())
    }

    fn total(total: u16, darts: u8) -> VisitInput {
        VisitInput::Total { total, darts }
    }

    fn dart(segment: u8, multiplier: Multiplier) -> Dart {
        Dart::new(segment, multiplier).unwrap()
    }

    #[test]
    fn ordinary_visit_scores_and_passes_the_turn() {
        let mut state = fresh(config());

        let result = commit_visit(&mut state, total(180, 3)).unwrap();
        assert_eq!(
            result.outcome,
            VisitOutcome::Scored { remaining: 321 }
        );
        assert_eq!(result.side, Side::Home);
        assert_eq!(state[Side::Home].remaining_score, 321);
        assert_eq!(state[Side::Home].darts_thrown_in_leg, 3);
        assert_eq!(state.active, Side::Away);
        assert_eq!(state.visit_number, 1);
    }

    #[test]
    fn turn_strictly_alternates_over_non_terminal_commits() {
        let mut state = fresh(config());

        for round in 0..6 {
            let expected = if round % 2 == 0 { Side::Home } else { Side::Away };
            assert_eq!(state.active, expected);
            commit_visit(&mut state, total(41, 3)).unwrap();
        }
        assert_eq!(state.visit_number, 3);
    }

    #[test]
    fn overshoot_busts_and_leaves_score_untouched() {
        let mut state = fresh(config());
        state[Side::Home].remaining_score = 40;

        let result = commit_visit(&mut state, total(41, 3)).unwrap();
        assert_eq!(result.outcome, VisitOutcome::Bust);
        assert_eq!(state[Side::Home].remaining_score, 40);
        // Darts still count, the turn still passes.
        assert_eq!(state[Side::Home].darts_thrown_in_leg, 3);
        assert_eq!(state.active, Side::Away);

        let visit = state[Side::Home].visit_history.last().unwrap();
        assert!(visit.bust);
        assert_eq!(visit.total, 41);
        assert_eq!(visit.scored, 0);
    }

    #[test]
    fn leaving_exactly_one_is_a_bust() {
        let mut state = fresh(config());
        state[Side::Home].remaining_score = 3;

        let result = commit_visit(&mut state, total(2, 1)).unwrap();
        assert_eq!(result.outcome, VisitOutcome::Bust);
        assert_eq!(state[Side::Home].remaining_score, 3);
    }

    #[test]
    fn reaching_zero_wins_the_leg_under_straight_out() {
        let mut state = fresh(config());
        state[Side::Home].remaining_score = 2;

        let result = commit_visit(&mut state, total(2, 1)).unwrap();
        assert_eq!(
            result.outcome,
            VisitOutcome::LegWon {
                progress: ProgressKind::LegWon
            }
        );
        assert_eq!(state[Side::Home].legs_won, 1);
        // New leg racked up, away side opens it.
        assert_eq!(state[Side::Home].remaining_score, 501);
        assert_eq!(state.active, Side::Away);
    }

    #[test]
    fn checkout_on_the_deciding_leg_wins_the_match() {
        let mut state = fresh(MatchConfig {
            legs_target: RaceTarget {
                format: RaceFormat::BestOf,
                count: 1,
            },
            ..config()
        });
        state[Side::Home].remaining_score = 50;

        let result = commit_visit(&mut state, total(50, 1)).unwrap();
        assert_eq!(
            result.outcome,
            VisitOutcome::LegWon {
                progress: ProgressKind::MatchWon
            }
        );
        assert_eq!(state.phase, MatchPhase::Complete { winner: Side::Home });
        assert_eq!(commit_visit(&mut state, total(26, 3)), Err(ScoreError::MatchOver));
    }

    #[test]
    fn double_out_requires_the_last_dart_to_be_a_double() {
        let mut base = config();
        base.finish_mode = FinishMode::DoubleOut;

        // D20 from 40 checks out.
        let mut state = fresh(base.clone());
        state[Side::Home].remaining_score = 40;
        let result =
            commit_visit(&mut state, VisitInput::Darts(vec![dart(20, Multiplier::Double)]))
                .unwrap();
        assert!(matches!(result.outcome, VisitOutcome::LegWon { .. }));

        // S20 S20 from 40 reaches zero without a double: bust.
        let mut state = fresh(base);
        state[Side::Home].remaining_score = 40;
        let result = commit_visit(
            &mut state,
            VisitInput::Darts(vec![
                dart(20, Multiplier::Single),
                dart(20, Multiplier::Single),
            ]),
        )
        .unwrap();
        assert_eq!(result.outcome, VisitOutcome::Bust);
        assert_eq!(state[Side::Home].remaining_score, 40);
    }

    #[test]
    fn aggregate_entry_checks_out_at_zero_even_under_double_out() {
        // Without dart-level data the double-out gate is waived.
        let mut base = config();
        base.finish_mode = FinishMode::DoubleOut;
        let mut state = fresh(base);
        state[Side::Home].remaining_score = 40;

        let result = commit_visit(&mut state, total(40, 2)).unwrap();
        assert!(matches!(result.outcome, VisitOutcome::LegWon { .. }));
    }

    #[test]
    fn double_in_ignores_darts_before_the_opening_double() {
        let mut base = config();
        base.start_mode = StartMode::DoubleIn;
        let mut state = fresh(base);

        // T20 before the opening double scores nothing; D20 then T20 do.
        let result = commit_visit(
            &mut state,
            VisitInput::Darts(vec![
                dart(20, Multiplier::Treble),
                dart(20, Multiplier::Double),
                dart(20, Multiplier::Treble),
            ]),
        )
        .unwrap();

        assert_eq!(result.outcome, VisitOutcome::Scored { remaining: 401 });
        assert_eq!(result.attempted, 160);
        assert!(state[Side::Home].opened);

        // Once opened, the full visit counts.
        commit_visit(&mut state, total(60, 3)).unwrap(); // away visit
        let result = commit_visit(
            &mut state,
            VisitInput::Darts(vec![dart(20, Multiplier::Treble)]),
        )
        .unwrap();
        assert_eq!(result.outcome, VisitOutcome::Scored { remaining: 341 });
    }

    #[test]
    fn double_in_whiff_scores_zero_but_still_counts_darts() {
        let mut base = config();
        base.start_mode = StartMode::DoubleIn;
        let mut state = fresh(base);

        let result = commit_visit(
            &mut state,
            VisitInput::Darts(vec![
                dart(20, Multiplier::Treble),
                dart(20, Multiplier::Treble),
                dart(20, Multiplier::Treble),
            ]),
        )
        .unwrap();

        assert_eq!(result.outcome, VisitOutcome::Scored { remaining: 501 });
        assert!(!state[Side::Home].opened);
        assert_eq!(state[Side::Home].darts_thrown_in_leg, 3);
        assert_eq!(state[Side::Home].leg_average(), 0.0);
    }

    #[test]
    fn invalid_input_mutates_nothing() {
        let mut state = fresh(config());
        let before = state.clone();

        assert_eq!(
            commit_visit(&mut state, total(181, 3)),
            Err(ScoreError::TotalOutOfRange(181))
        );
        assert_eq!(
            commit_visit(&mut state, total(60, 0)),
            Err(ScoreError::BadDartCount(0))
        );
        assert_eq!(
            commit_visit(&mut state, total(179, 3)),
            Err(ScoreError::UnreachableTotal { total: 179, darts: 3 })
        );
        assert_eq!(
            commit_visit(&mut state, VisitInput::Darts(Vec::new())),
            Err(ScoreError::BadDartCount(0))
        );

        assert_eq!(state, before);
    }

    #[test]
    fn busted_totals_stay_out_of_the_average() {
        let mut state = fresh(config());
        state[Side::Home].remaining_score = 100;

        commit_visit(&mut state, total(60, 3)).unwrap(); // 100 -> 40
        commit_visit(&mut state, total(26, 3)).unwrap(); // away
        commit_visit(&mut state, total(60, 3)).unwrap(); // bust at 40

        let home = &state[Side::Home];
        assert_eq!(home.darts_thrown_in_leg, 6);
        assert_eq!(home.points_scored_in_leg, 60);
        assert_eq!(home.leg_average(), 30.0);
    }

    #[test]
    fn leg_average_matches_the_reference_formula() {
        let mut state = fresh(config());

        // Three home visits of 40 in 9 darts: 501 -> 381.
        for _ in 0..3 {
            commit_visit(&mut state, total(40, 3)).unwrap();
            commit_visit(&mut state, total(26, 3)).unwrap(); // away
        }

        let home = &state[Side::Home];
        assert_eq!(home.remaining_score, 381);
        assert_eq!(home.darts_thrown_in_leg, 9);
        assert_eq!(home.leg_average(), 40.0);
    }

    #[test]
    fn achievement_brackets_are_not_mutually_exclusive() {
        let mut state = fresh(config());

        commit_visit(&mut state, total(180, 3)).unwrap();
        let home = &state[Side::Home];
        assert_eq!(home.achievements.ton_eighties, 1);
        assert_eq!(home.achievements.over_160, 1);
        assert_eq!(home.achievements.over_140, 1);
        assert_eq!(home.achievements.over_120, 1);
        assert_eq!(home.achievements.over_100, 1);
        assert_eq!(home.achievements.over_95, 1);
        assert_eq!(home.achievements.ton_seventy_ones, 0);

        commit_visit(&mut state, total(171, 3)).unwrap();
        assert_eq!(state[Side::Away].achievements.ton_seventy_ones, 1);
        assert_eq!(state[Side::Away].achievements.ton_eighties, 0);
    }

    #[test]
    fn busted_visit_earns_no_achievements() {
        let mut state = fresh(config());
        state[Side::Home].remaining_score = 100;

        commit_visit(&mut state, total(140, 3)).unwrap();
        assert_eq!(state[Side::Home].achievements.over_140, 0);
        assert_eq!(state[Side::Home].achievements.over_100, 0);
    }
}
