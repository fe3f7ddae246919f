use thiserror::Error;

use crate::state::match_state::{MatchState, RaceFormat, RaceTarget, Side};

/// Progression phase of a match. `Complete` and `Abandoned` are terminal;
/// the winner is set exactly once and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Legs are being played.
    InProgress,
    /// A side has met the match target.
    Complete {
        /// The winning side.
        winner: Side,
    },
    /// The room was abandoned before a winner emerged.
    Abandoned,
}

impl MatchPhase {
    /// Whether the match can still accept visits.
    pub fn is_live(&self) -> bool {
        matches!(self, MatchPhase::InProgress)
    }
}

/// What a won leg advanced the match to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressKind {
    /// The leg is banked; the next leg of the same set has been racked up.
    LegWon,
    /// The leg decided the set; leg counters were reset for the next set.
    SetWon,
    /// The leg decided the whole match.
    MatchWon,
}

/// Error raised when progression is driven on a finished match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("match is no longer in progress")]
pub struct MatchOver;

/// Whether `wins` settles a race, given how many legs/sets were played.
///
/// Best-of resolves as soon as one side holds the majority; first-to at the
/// exact target; play-all only once every scheduled leg/set has been
/// played, whoever is ahead.
fn race_decided(target: RaceTarget, wins: u8, played: u8) -> bool {
    match target.format {
        RaceFormat::BestOf | RaceFormat::FirstTo => wins >= target.required_wins(),
        RaceFormat::PlayAll => played >= target.count,
    }
}

/// Pick the winner of a settled play-all race. `last_winner` breaks a tie:
/// the side that took the final leg/set takes the race.
fn play_all_winner(home_wins: u8, away_wins: u8, last_winner: Side) -> Side {
    match home_wins.cmp(&away_wins) {
        std::cmp::Ordering::Greater => Side::Home,
        std::cmp::Ordering::Less => Side::Away,
        std::cmp::Ordering::Equal => last_winner,
    }
}

/// Bank a won leg and advance the match: credit the leg, settle the set
/// and match races, and rack up the next leg when more play is scheduled.
///
/// The caller (the score engine) has already zeroed the winner's score;
/// this function owns every counter beyond the leg itself.
pub fn after_leg_won(state: &mut MatchState, winner: Side) -> Result<ProgressKind, MatchOver> {
    if !state.phase.is_live() {
        return Err(MatchOver);
    }

    state[winner].legs_won += 1;
    state.legs_played_in_set += 1;

    let legs_target = state.config.legs_target;
    if !race_decided(legs_target, state[winner].legs_won, state.legs_played_in_set) {
        start_new_leg(state);
        return Ok(ProgressKind::LegWon);
    }

    let set_winner = match legs_target.format {
        RaceFormat::PlayAll => {
            play_all_winner(state[Side::Home].legs_won, state[Side::Away].legs_won, winner)
        }
        _ => winner,
    };

    state[set_winner].sets_won += 1;
    state.sets_played += 1;

    let Some(sets_target) = state.config.sets_target else {
        // Single-set match: meeting the legs target is the match.
        state.phase = MatchPhase::Complete { winner: set_winner };
        return Ok(ProgressKind::MatchWon);
    };

    if race_decided(sets_target, state[set_winner].sets_won, state.sets_played) {
        let match_winner = match sets_target.format {
            RaceFormat::PlayAll => play_all_winner(
                state[Side::Home].sets_won,
                state[Side::Away].sets_won,
                set_winner,
            ),
            _ => set_winner,
        };
        state.phase = MatchPhase::Complete {
            winner: match_winner,
        };
        return Ok(ProgressKind::MatchWon);
    }

    // Next set: leg tallies restart, set counter moves on.
    state[Side::Home].legs_won = 0;
    state[Side::Away].legs_won = 0;
    state.legs_played_in_set = 0;
    state.set_number += 1;
    state.leg_number = 0;
    start_new_leg(state);
    Ok(ProgressKind::SetWon)
}

/// Reset both sides for a fresh leg and alternate the opening thrower.
pub fn start_new_leg(state: &mut MatchState) {
    let config = state.config.clone();
    state[Side::Home].reset_for_leg(&config);
    state[Side::Away].reset_for_leg(&config);
    state.leg_opener = state.leg_opener.opponent();
    state.active = state.leg_opener;
    state.visit_number = 0;
    state.leg_number += 1;
}

/// Flag the match as abandoned. Terminal and distinct from completion;
/// idempotent so a late external signal cannot flip a decided match.
pub fn abandon(state: &mut MatchState) -> Result<(), MatchOver> {
    if !state.phase.is_live() {
        return Err(MatchOver);
    }
    state.phase = MatchPhase::Abandoned;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::match_state::{FinishMode, MatchConfig, StartMode};

    fn config(legs: RaceTarget, sets: Option<RaceTarget>) -> MatchConfig {
        MatchConfig {
            start_score: 501,
            start_mode: StartMode::StraightIn,
            finish_mode: FinishMode::StraightOut,
            legs_target: legs,
            sets_target: sets,
        }
    }

    fn fresh(legs: RaceTarget, sets: Option<RaceTarget>) -> MatchState {
        MatchState::new(config(legs, sets), "Anna".into(), "Bert".into())
    }

    fn target(format: RaceFormat, count: u8) -> RaceTarget {
        RaceTarget { format, count }
    }

    #[test]
    fn best_of_three_resolves_at_two_legs() {
        let mut state = fresh(target(RaceFormat::BestOf, 3), None);

        assert_eq!(after_leg_won(&mut state, Side::Home), Ok(ProgressKind::LegWon));
        assert_eq!(state.phase, MatchPhase::InProgress);
        assert_eq!(state.leg_number, 2);

        assert_eq!(
            after_leg_won(&mut state, Side::Home),
            Ok(ProgressKind::MatchWon)
        );
        assert_eq!(state.phase, MatchPhase::Complete { winner: Side::Home });
    }

    #[test]
    fn best_of_four_needs_a_strict_majority() {
        let mut state = fresh(target(RaceFormat::BestOf, 4), None);

        // Alternating wins to 2-2: neither side holds a majority yet.
        for winner in [Side::Home, Side::Away, Side::Home, Side::Away] {
            assert_eq!(after_leg_won(&mut state, winner), Ok(ProgressKind::LegWon));
        }
        assert_eq!(state.phase, MatchPhase::InProgress);

        assert_eq!(
            after_leg_won(&mut state, Side::Home),
            Ok(ProgressKind::MatchWon)
        );
        assert_eq!(state.phase, MatchPhase::Complete { winner: Side::Home });
    }

    #[test]
    fn first_to_requires_exact_target() {
        let mut state = fresh(target(RaceFormat::FirstTo, 3), None);

        for _ in 0..2 {
            assert_eq!(after_leg_won(&mut state, Side::Away), Ok(ProgressKind::LegWon));
        }
        assert_eq!(
            after_leg_won(&mut state, Side::Away),
            Ok(ProgressKind::MatchWon)
        );
        assert_eq!(state.phase, MatchPhase::Complete { winner: Side::Away });
    }

    #[test]
    fn play_all_keeps_going_after_a_clinch() {
        let mut state = fresh(target(RaceFormat::PlayAll, 4), None);

        // Home takes three straight; a best-of-4 would already be over.
        for _ in 0..3 {
            assert_eq!(after_leg_won(&mut state, Side::Home), Ok(ProgressKind::LegWon));
        }
        assert_eq!(state.phase, MatchPhase::InProgress);

        assert_eq!(
            after_leg_won(&mut state, Side::Away),
            Ok(ProgressKind::MatchWon)
        );
        assert_eq!(state.phase, MatchPhase::Complete { winner: Side::Home });
    }

    #[test]
    fn play_all_tie_goes_to_the_last_leg_winner() {
        let mut state = fresh(target(RaceFormat::PlayAll, 2), None);

        after_leg_won(&mut state, Side::Home).unwrap();
        assert_eq!(
            after_leg_won(&mut state, Side::Away),
            Ok(ProgressKind::MatchWon)
        );
        assert_eq!(state.phase, MatchPhase::Complete { winner: Side::Away });
    }

    #[test]
    fn set_win_resets_legs_and_advances_set_number() {
        let mut state = fresh(
            target(RaceFormat::FirstTo, 2),
            Some(target(RaceFormat::FirstTo, 2)),
        );

        after_leg_won(&mut state, Side::Home).unwrap();
        assert_eq!(after_leg_won(&mut state, Side::Home), Ok(ProgressKind::SetWon));

        assert_eq!(state[Side::Home].sets_won, 1);
        assert_eq!(state[Side::Home].legs_won, 0);
        assert_eq!(state[Side::Away].legs_won, 0);
        assert_eq!(state.set_number, 2);
        assert_eq!(state.leg_number, 1);
        assert_eq!(state.phase, MatchPhase::InProgress);

        // Second set decides the match.
        after_leg_won(&mut state, Side::Home).unwrap();
        assert_eq!(
            after_leg_won(&mut state, Side::Home),
            Ok(ProgressKind::MatchWon)
        );
        assert_eq!(state.phase, MatchPhase::Complete { winner: Side::Home });
    }

    #[test]
    fn new_leg_alternates_the_opener_and_resets_scores() {
        let mut state = fresh(target(RaceFormat::BestOf, 5), None);
        state[Side::Home].remaining_score = 40;
        state[Side::Home].darts_thrown_in_leg = 9;

        assert_eq!(state.leg_opener, Side::Home);
        after_leg_won(&mut state, Side::Home).unwrap();

        assert_eq!(state.leg_opener, Side::Away);
        assert_eq!(state.active, Side::Away);
        assert_eq!(state[Side::Home].remaining_score, 501);
        assert_eq!(state[Side::Home].darts_thrown_in_leg, 0);
        assert_eq!(state.visit_number, 0);
    }

    #[test]
    fn terminal_phases_reject_further_progression() {
        let mut state = fresh(target(RaceFormat::BestOf, 1), None);
        after_leg_won(&mut state, Side::Home).unwrap();

        assert_eq!(after_leg_won(&mut state, Side::Away), Err(MatchOver));
        assert_eq!(abandon(&mut state), Err(MatchOver));
        // Winner remains untouched.
        assert_eq!(state.phase, MatchPhase::Complete { winner: Side::Home });
    }

    #[test]
    fn abandonment_is_terminal_and_distinct_from_completion() {
        let mut state = fresh(target(RaceFormat::BestOf, 3), None);
        abandon(&mut state).unwrap();
        assert_eq!(state.phase, MatchPhase::Abandoned);
        assert_eq!(after_leg_won(&mut state, Side::Home), Err(MatchOver));
    }
}
