use std::ops::{Index, IndexMut};
use std::time::SystemTime;

use uuid::Uuid;

use crate::dao::models::{
    AchievementsEntity, DartEntity, MatchConfigEntity, MatchEntity, MatchPhaseEntity,
    MultiplierEntity, PlayerEntity, RaceFormatEntity, RaceTargetEntity, SideEntity, VisitEntity,
};
use crate::scoring::visit::{Dart, Multiplier};
use crate::state::progression::MatchPhase;

/// One of the two sides of a match. Also doubles as the online role tag:
/// the match creator throws as [`Side::Home`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Side of the player who created the match; throws first in leg one.
    Home,
    /// Side of the opponent (the joining player in online matches).
    Away,
}

impl Side {
    /// The other side.
    pub fn opponent(self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

/// How the first scoring dart of a leg is constrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Any dart opens the scoring.
    StraightIn,
    /// Scoring starts only once a double has been hit.
    DoubleIn,
}

/// How the checkout dart of a leg is constrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishMode {
    /// Any dart may take the score to zero.
    StraightOut,
    /// The checkout dart must land in a double.
    DoubleOut,
}

/// Format of a legs-per-set or sets-per-match race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceFormat {
    /// First side to a majority of `count` wins.
    BestOf,
    /// Every scheduled leg/set is played, even after a side has clinched.
    PlayAll,
    /// First side to exactly `count` wins.
    FirstTo,
}

/// A race target: format plus scheduled count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceTarget {
    /// Race format deciding when the target is met.
    pub format: RaceFormat,
    /// Number of legs/sets scheduled (or raced to).
    pub count: u8,
}

impl RaceTarget {
    /// Wins a side needs before this race can resolve in its favour.
    ///
    /// Best-of requires a strict majority, so an even count behaves like
    /// the next odd one (best-of-4 resolves at 3, not 2). Play-all races
    /// never resolve early; they are settled by comparing win counts once
    /// every scheduled leg/set has been played.
    pub fn required_wins(&self) -> u8 {
        match self.format {
            RaceFormat::BestOf => self.count / 2 + 1,
            RaceFormat::PlayAll | RaceFormat::FirstTo => self.count,
        }
    }
}

/// Immutable settings resolved before a match starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchConfig {
    /// Score each player starts a leg from (301, 501, or a custom value).
    pub start_score: u16,
    /// Opening constraint for each leg.
    pub start_mode: StartMode,
    /// Checkout constraint for each leg.
    pub finish_mode: FinishMode,
    /// Legs race within a set.
    pub legs_target: RaceTarget,
    /// Optional sets race; absent means a single-set match.
    pub sets_target: Option<RaceTarget>,
}

/// Counters for scoring milestones, incremented once per qualifying
/// non-busted visit. Thresholds are not mutually exclusive: a 180 also
/// counts towards every lower bracket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Achievements {
    /// Maximum visits (exactly 180).
    pub ton_eighties: u32,
    /// Visits of exactly 171.
    pub ton_seventy_ones: u32,
    /// Visits of 160 or more.
    pub over_160: u32,
    /// Visits of 140 or more.
    pub over_140: u32,
    /// Visits of 120 or more.
    pub over_120: u32,
    /// Visits of 100 or more.
    pub over_100: u32,
    /// Visits of 95 or more.
    pub over_95: u32,
}

impl Achievements {
    /// Record a committed, non-busted visit total against every bracket it
    /// qualifies for.
    pub fn record(&mut self, total: u16) {
        if total == 180 {
            self.ton_eighties += 1;
        }
        if total == 171 {
            self.ton_seventy_ones += 1;
        }
        if total >= 160 {
            self.over_160 += 1;
        }
        if total >= 140 {
            self.over_140 += 1;
        }
        if total >= 120 {
            self.over_120 += 1;
        }
        if total >= 100 {
            self.over_100 += 1;
        }
        if total >= 95 {
            self.over_95 += 1;
        }
    }
}

/// A committed visit as kept in a player's per-leg history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    /// Darts thrown, in order. Empty for aggregate-entry visits.
    pub darts: Vec<Dart>,
    /// Total the player attempted with this visit.
    pub total: u16,
    /// Net score reduction actually applied (0 when busted; may be lower
    /// than `total` while a double-in leg is still unopened).
    pub scored: u16,
    /// Whether the visit busted.
    pub bust: bool,
}

/// Per-side state, reset at leg boundaries (score, history) and set
/// boundaries (leg wins).
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    /// Display name chosen for this side.
    pub display_name: String,
    /// Points left in the current leg.
    pub remaining_score: u16,
    /// Darts thrown in the current leg.
    pub darts_thrown_in_leg: u32,
    /// Darts thrown across the whole match.
    pub darts_thrown_in_match: u32,
    /// Non-bust points scored in the current leg (average numerator).
    pub points_scored_in_leg: u32,
    /// Non-bust points scored across the whole match.
    pub points_scored_in_match: u32,
    /// Legs won in the current set.
    pub legs_won: u8,
    /// Sets won in the match.
    pub sets_won: u8,
    /// Whether the double-in requirement has been satisfied this leg.
    /// Always true under straight-in.
    pub opened: bool,
    /// Committed visits of the current leg, oldest first.
    pub visit_history: Vec<Visit>,
    /// Milestone counters, never reset during the match.
    pub achievements: Achievements,
}

impl PlayerState {
    /// Fresh player state at the start of a match.
    pub fn new(display_name: String, config: &MatchConfig) -> Self {
        Self {
            display_name,
            remaining_score: config.start_score,
            darts_thrown_in_leg: 0,
            darts_thrown_in_match: 0,
            points_scored_in_leg: 0,
            points_scored_in_match: 0,
            legs_won: 0,
            sets_won: 0,
            opened: config.start_mode == StartMode::StraightIn,
            visit_history: Vec::new(),
            achievements: Achievements::default(),
        }
    }

    /// Reset the per-leg fields for a new leg; leg/set wins persist.
    pub fn reset_for_leg(&mut self, config: &MatchConfig) {
        self.remaining_score = config.start_score;
        self.darts_thrown_in_leg = 0;
        self.points_scored_in_leg = 0;
        self.opened = config.start_mode == StartMode::StraightIn;
        self.visit_history.clear();
    }

    /// Three-dart average for the current leg.
    pub fn leg_average(&self) -> f64 {
        if self.darts_thrown_in_leg == 0 {
            return 0.0;
        }
        f64::from(self.points_scored_in_leg) / f64::from(self.darts_thrown_in_leg) * 3.0
    }

    /// Three-dart average across the whole match.
    pub fn match_average(&self) -> f64 {
        if self.darts_thrown_in_match == 0 {
            return 0.0;
        }
        f64::from(self.points_scored_in_match) / f64::from(self.darts_thrown_in_match) * 3.0
    }
}

/// The aggregate scoring state of a two-sided X01 match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchState {
    /// Settings fixed at match start.
    pub config: MatchConfig,
    /// The two sides, indexed by [`Side`].
    pub players: [PlayerState; 2],
    /// Side whose turn it is to throw.
    pub active: Side,
    /// Side that opened the current leg; alternates every leg.
    pub leg_opener: Side,
    /// 1-based count of visits taken by the leg opener this leg.
    pub visit_number: u32,
    /// 1-based leg counter within the current set.
    pub leg_number: u32,
    /// 1-based set counter.
    pub set_number: u32,
    /// Legs played in the current set, busts-to-finish included.
    /// Drives play-all settlement.
    pub legs_played_in_set: u8,
    /// Sets fully played so far.
    pub sets_played: u8,
    /// Progression phase; terminal once complete or abandoned.
    pub phase: MatchPhase,
}

impl MatchState {
    /// Build the state for a fresh match; the home side throws first.
    pub fn new(config: MatchConfig, home_name: String, away_name: String) -> Self {
        let players = [
            PlayerState::new(home_name, &config),
            PlayerState::new(away_name, &config),
        ];

        Self {
            config,
            players,
            active: Side::Home,
            leg_opener: Side::Home,
            visit_number: 0,
            leg_number: 1,
            set_number: 1,
            legs_played_in_set: 0,
            sets_played: 0,
            phase: MatchPhase::InProgress,
        }
    }

    /// Borrow the state of one side.
    pub fn player(&self, side: Side) -> &PlayerState {
        &self[side]
    }

    /// Hand the turn to the opponent.
    pub fn pass_turn(&mut self) {
        self.active = self.active.opponent();
    }
}

impl Index<Side> for MatchState {
    type Output = PlayerState;

    fn index(&self, side: Side) -> &PlayerState {
        match side {
            Side::Home => &self.players[0],
            Side::Away => &self.players[1],
        }
    }
}

impl IndexMut<Side> for MatchState {
    fn index_mut(&mut self, side: Side) -> &mut PlayerState {
        match side {
            Side::Home => &mut self.players[0],
            Side::Away => &mut self.players[1],
        }
    }
}

/// A scoring state plus the identity that makes it addressable: match id,
/// optional room code, audit timestamps, and the optimistic-concurrency
/// version used by the match store.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSession {
    /// Primary key of the match.
    pub id: Uuid,
    /// Join code handed to the second player of an online match.
    pub room_code: Option<String>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time this match was updated.
    pub updated_at: SystemTime,
    /// Version counter bumped on every committed write.
    pub version: u64,
    /// The scoring state proper.
    pub state: MatchState,
}

impl MatchSession {
    /// Build a new in-memory session around a fresh match state.
    pub fn new(state: MatchState, room_code: Option<String>) -> Self {
        let timestamp = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            room_code,
            created_at: timestamp,
            updated_at: timestamp,
            version: 0,
            state,
        }
    }

    /// Bump version and updated-at after a state mutation, returning the
    /// version the store should expect to replace.
    pub fn mark_updated(&mut self) -> u64 {
        let expected = self.version;
        self.version += 1;
        self.updated_at = SystemTime::now();
        expected
    }
}

impl From<SideEntity> for Side {
    fn from(value: SideEntity) -> Self {
        match value {
            SideEntity::Home => Side::Home,
            SideEntity::Away => Side::Away,
        }
    }
}

impl From<Side> for SideEntity {
    fn from(value: Side) -> Self {
        match value {
            Side::Home => SideEntity::Home,
            Side::Away => SideEntity::Away,
        }
    }
}

impl From<MultiplierEntity> for Multiplier {
    fn from(value: MultiplierEntity) -> Self {
        match value {
            MultiplierEntity::Single => Multiplier::Single,
            MultiplierEntity::Double => Multiplier::Double,
            MultiplierEntity::Treble => Multiplier::Treble,
        }
    }
}

impl From<Multiplier> for MultiplierEntity {
    fn from(value: Multiplier) -> Self {
        match value {
            Multiplier::Single => MultiplierEntity::Single,
            Multiplier::Double => MultiplierEntity::Double,
            Multiplier::Treble => MultiplierEntity::Treble,
        }
    }
}

impl From<Dart> for DartEntity {
    fn from(value: Dart) -> Self {
        Self {
            segment: value.segment(),
            multiplier: value.multiplier().into(),
        }
    }
}

impl TryFrom<DartEntity> for Dart {
    type Error = crate::scoring::visit::DartError;

    fn try_from(value: DartEntity) -> Result<Self, Self::Error> {
        Dart::new(value.segment, value.multiplier.into())
    }
}

impl From<RaceFormatEntity> for RaceFormat {
    fn from(value: RaceFormatEntity) -> Self {
        match value {
            RaceFormatEntity::BestOf => RaceFormat::BestOf,
            RaceFormatEntity::PlayAll => RaceFormat::PlayAll,
            RaceFormatEntity::FirstTo => RaceFormat::FirstTo,
        }
    }
}

impl From<RaceFormat> for RaceFormatEntity {
    fn from(value: RaceFormat) -> Self {
        match value {
            RaceFormat::BestOf => RaceFormatEntity::BestOf,
            RaceFormat::PlayAll => RaceFormatEntity::PlayAll,
            RaceFormat::FirstTo => RaceFormatEntity::FirstTo,
        }
    }
}

impl From<RaceTargetEntity> for RaceTarget {
    fn from(value: RaceTargetEntity) -> Self {
        Self {
            format: value.format.into(),
            count: value.count,
        }
    }
}

impl From<RaceTarget> for RaceTargetEntity {
    fn from(value: RaceTarget) -> Self {
        Self {
            format: value.format.into(),
            count: value.count,
        }
    }
}

impl From<MatchConfigEntity> for MatchConfig {
    fn from(value: MatchConfigEntity) -> Self {
        Self {
            start_score: value.start_score,
            start_mode: if value.double_in {
                StartMode::DoubleIn
            } else {
                StartMode::StraightIn
            },
            finish_mode: if value.double_out {
                FinishMode::DoubleOut
            } else {
                FinishMode::StraightOut
            },
            legs_target: value.legs_target.into(),
            sets_target: value.sets_target.map(Into::into),
        }
    }
}

impl From<MatchConfig> for MatchConfigEntity {
    fn from(value: MatchConfig) -> Self {
        Self {
            start_score: value.start_score,
            double_in: value.start_mode == StartMode::DoubleIn,
            double_out: value.finish_mode == FinishMode::DoubleOut,
            legs_target: value.legs_target.into(),
            sets_target: value.sets_target.map(Into::into),
        }
    }
}

impl From<Achievements> for AchievementsEntity {
    fn from(value: Achievements) -> Self {
        Self {
            ton_eighties: value.ton_eighties,
            ton_seventy_ones: value.ton_seventy_ones,
            over_160: value.over_160,
            over_140: value.over_140,
            over_120: value.over_120,
            over_100: value.over_100,
            over_95: value.over_95,
        }
    }
}

impl From<AchievementsEntity> for Achievements {
    fn from(value: AchievementsEntity) -> Self {
        Self {
            ton_eighties: value.ton_eighties,
            ton_seventy_ones: value.ton_seventy_ones,
            over_160: value.over_160,
            over_140: value.over_140,
            over_120: value.over_120,
            over_100: value.over_100,
            over_95: value.over_95,
        }
    }
}

impl From<Visit> for VisitEntity {
    fn from(value: Visit) -> Self {
        Self {
            darts: value.darts.into_iter().map(Into::into).collect(),
            total: value.total,
            scored: value.scored,
            bust: value.bust,
        }
    }
}

impl From<VisitEntity> for Visit {
    fn from(value: VisitEntity) -> Self {
        Self {
            // Darts were validated on the way in; drop any entry a foreign
            // writer corrupted rather than poisoning the whole history.
            darts: value
                .darts
                .into_iter()
                .filter_map(|dart| dart.try_into().ok())
                .collect(),
            total: value.total,
            scored: value.scored,
            bust: value.bust,
        }
    }
}

impl From<PlayerState> for PlayerEntity {
    fn from(value: PlayerState) -> Self {
        Self {
            display_name: value.display_name,
            remaining_score: value.remaining_score,
            darts_thrown_in_leg: value.darts_thrown_in_leg,
            darts_thrown_in_match: value.darts_thrown_in_match,
            points_scored_in_leg: value.points_scored_in_leg,
            points_scored_in_match: value.points_scored_in_match,
            legs_won: value.legs_won,
            sets_won: value.sets_won,
            opened: value.opened,
            visit_history: value.visit_history.into_iter().map(Into::into).collect(),
            achievements: value.achievements.into(),
        }
    }
}

impl From<PlayerEntity> for PlayerState {
    fn from(value: PlayerEntity) -> Self {
        Self {
            display_name: value.display_name,
            remaining_score: value.remaining_score,
            darts_thrown_in_leg: value.darts_thrown_in_leg,
            darts_thrown_in_match: value.darts_thrown_in_match,
            points_scored_in_leg: value.points_scored_in_leg,
            points_scored_in_match: value.points_scored_in_match,
            legs_won: value.legs_won,
            sets_won: value.sets_won,
            opened: value.opened,
            visit_history: value.visit_history.into_iter().map(Into::into).collect(),
            achievements: value.achievements.into(),
        }
    }
}

impl From<MatchPhase> for MatchPhaseEntity {
    fn from(value: MatchPhase) -> Self {
        match value {
            MatchPhase::InProgress => MatchPhaseEntity::InProgress,
            MatchPhase::Complete { winner } => MatchPhaseEntity::Complete {
                winner: winner.into(),
            },
            MatchPhase::Abandoned => MatchPhaseEntity::Abandoned,
        }
    }
}

impl From<MatchPhaseEntity> for MatchPhase {
    fn from(value: MatchPhaseEntity) -> Self {
        match value {
            MatchPhaseEntity::InProgress => MatchPhase::InProgress,
            MatchPhaseEntity::Complete { winner } => MatchPhase::Complete {
                winner: winner.into(),
            },
            MatchPhaseEntity::Abandoned => MatchPhase::Abandoned,
        }
    }
}

impl From<MatchSession> for MatchEntity {
    fn from(value: MatchSession) -> Self {
        let [home, away] = value.state.players;
        Self {
            id: value.id,
            room_code: value.room_code,
            created_at: value.created_at,
            updated_at: value.updated_at,
            version: value.version,
            config: value.state.config.into(),
            players: [home.into(), away.into()],
            active: value.state.active.into(),
            leg_opener: value.state.leg_opener.into(),
            visit_number: value.state.visit_number,
            leg_number: value.state.leg_number,
            set_number: value.state.set_number,
            legs_played_in_set: value.state.legs_played_in_set,
            sets_played: value.state.sets_played,
            phase: value.state.phase.into(),
        }
    }
}

impl From<MatchEntity> for MatchSession {
    fn from(value: MatchEntity) -> Self {
        let [home, away] = value.players;
        Self {
            id: value.id,
            room_code: value.room_code,
            created_at: value.created_at,
            updated_at: value.updated_at,
            version: value.version,
            state: MatchState {
                config: value.config.into(),
                players: [home.into(), away.into()],
                active: value.active.into(),
                leg_opener: value.leg_opener.into(),
                visit_number: value.visit_number,
                leg_number: value.leg_number,
                set_number: value.set_number,
                legs_played_in_set: value.legs_played_in_set,
                sets_played: value.sets_played,
                phase: value.phase.into(),
            },
        }
    }
}
