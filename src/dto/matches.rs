use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dao::models::{MatchListItemEntity, MatchPhaseEntity},
    dto::{
        format_system_time,
        validation::{validate_display_name, validate_room_code},
    },
    scoring::visit::{Dart, DartError, Multiplier, VisitAccumulator},
    state::match_state::{
        Achievements, FinishMode, MatchConfig, MatchSession, PlayerState, RaceFormat, RaceTarget,
        Side, StartMode, Visit,
    },
    state::progression::MatchPhase,
};

/// Wire identifier of a match side / online role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SideDto {
    /// Match creator's side.
    Home,
    /// Opponent's side.
    Away,
}

impl From<Side> for SideDto {
    fn from(value: Side) -> Self {
        match value {
            Side::Home => SideDto::Home,
            Side::Away => SideDto::Away,
        }
    }
}

impl From<SideDto> for Side {
    fn from(value: SideDto) -> Self {
        match value {
            SideDto::Home => Side::Home,
            SideDto::Away => Side::Away,
        }
    }
}

/// Wire identifier of a dartboard ring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MultiplierDto {
    /// Plain segment.
    Single,
    /// Double ring.
    Double,
    /// Treble ring.
    Treble,
}

/// A single dart as entered by a client or echoed back in summaries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DartDto {
    /// Board segment (0 for a miss, 1-20, or 25 for the bull).
    pub segment: u8,
    /// Ring the dart landed in.
    pub multiplier: MultiplierDto,
}

impl TryFrom<DartDto> for Dart {
    type Error = DartError;

    fn try_from(value: DartDto) -> Result<Self, Self::Error> {
        let multiplier = match value.multiplier {
            MultiplierDto::Single => Multiplier::Single,
            MultiplierDto::Double => Multiplier::Double,
            MultiplierDto::Treble => Multiplier::Treble,
        };
        Dart::new(value.segment, multiplier)
    }
}

impl From<Dart> for DartDto {
    fn from(value: Dart) -> Self {
        Self {
            segment: value.segment(),
            multiplier: match value.multiplier() {
                Multiplier::Single => MultiplierDto::Single,
                Multiplier::Double => MultiplierDto::Double,
                Multiplier::Treble => MultiplierDto::Treble,
            },
        }
    }
}

/// Wire identifier of a race format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RaceFormatDto {
    /// First side to a majority of the scheduled count.
    BestOf,
    /// Every scheduled leg/set is played.
    PlayAll,
    /// First side to exactly the scheduled count.
    FirstTo,
}

/// Race target supplied at match creation and echoed in summaries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct RaceTargetDto {
    /// Race format.
    pub format: RaceFormatDto,
    /// Scheduled count.
    pub count: u8,
}

impl From<RaceTargetDto> for RaceTarget {
    fn from(value: RaceTargetDto) -> Self {
        Self {
            format: match value.format {
                RaceFormatDto::BestOf => RaceFormat::BestOf,
                RaceFormatDto::PlayAll => RaceFormat::PlayAll,
                RaceFormatDto::FirstTo => RaceFormat::FirstTo,
            },
            count: value.count,
        }
    }
}

impl From<RaceTarget> for RaceTargetDto {
    fn from(value: RaceTarget) -> Self {
        Self {
            format: match value.format {
                RaceFormat::BestOf => RaceFormatDto::BestOf,
                RaceFormat::PlayAll => RaceFormatDto::PlayAll,
                RaceFormat::FirstTo => RaceFormatDto::FirstTo,
            },
            count: value.count,
        }
    }
}

fn default_start_score() -> u16 {
    501
}

fn default_double_out() -> bool {
    true
}

fn default_legs_target() -> RaceTargetDto {
    RaceTargetDto {
        format: RaceFormatDto::BestOf,
        count: 1,
    }
}

/// Payload used to bootstrap a brand-new match.
///
/// Local matches name both players up front; online matches name only the
/// creator and leave the second seat for the joiner.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMatchRequest {
    /// Display names: two for a local match, one for an online match.
    pub players: Vec<String>,
    /// Whether the match is synchronized through the shared store.
    #[serde(default)]
    pub online: bool,
    /// Leg starting score; 501 when omitted.
    #[serde(default = "default_start_score")]
    pub start_score: u16,
    /// Whether a double is required to open each leg.
    #[serde(default)]
    pub double_in: bool,
    /// Whether a double is required to finish each leg; on by default.
    #[serde(default = "default_double_out")]
    pub double_out: bool,
    /// Legs race within a set; best-of-1 when omitted.
    #[serde(default = "default_legs_target")]
    pub legs: RaceTargetDto,
    /// Optional sets race; omitted means a single-set match.
    #[serde(default)]
    pub sets: Option<RaceTargetDto>,
}

impl Validate for CreateMatchRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let expected = if self.online { 1 } else { 2 };
        if self.players.len() != expected {
            let mut err = ValidationError::new("player_count");
            err.message = Some(
                format!(
                    "expected {expected} player name(s) for this match mode (got {})",
                    self.players.len()
                )
                .into(),
            );
            errors.add("players", err);
        }

        for name in &self.players {
            if let Err(err) = validate_display_name(name) {
                errors.add("players", err);
            }
        }

        if self.legs.count == 0 {
            let mut err = ValidationError::new("legs_count");
            err.message = Some("legs count must be at least 1".into());
            errors.add("legs", err);
        }

        if let Some(sets) = &self.sets {
            if sets.count == 0 {
                let mut err = ValidationError::new("sets_count");
                err.message = Some("sets count must be at least 1".into());
                errors.add("sets", err);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl CreateMatchRequest {
    /// Resolve the request into an immutable match configuration.
    pub fn to_config(&self) -> MatchConfig {
        MatchConfig {
            start_score: self.start_score,
            start_mode: if self.double_in {
                StartMode::DoubleIn
            } else {
                StartMode::StraightIn
            },
            finish_mode: if self.double_out {
                FinishMode::DoubleOut
            } else {
                FinishMode::StraightOut
            },
            legs_target: self.legs.into(),
            sets_target: self.sets.map(Into::into),
        }
    }
}

/// Payload used to claim the away seat of an online match.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinMatchRequest {
    /// Join code handed out by the match creator.
    pub room_code: String,
    /// Display name for the joining player.
    pub display_name: String,
}

impl Validate for JoinMatchRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(err) = validate_room_code(&self.room_code) {
            errors.add("room_code", err);
        }
        if let Err(err) = validate_display_name(&self.display_name) {
            errors.add("display_name", err);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload queuing one dart into the active player's pending visit.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddDartRequest {
    /// Role of the submitting session; required for online matches.
    #[serde(default)]
    pub side: Option<SideDto>,
    /// The dart thrown.
    pub dart: DartDto,
}

/// Query parameters for withdrawing a queued dart.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UndoDartQuery {
    /// Role of the submitting session; required for online matches.
    #[serde(default)]
    pub side: Option<SideDto>,
}

/// Payload committing a visit, either from the queued pending darts (no
/// body fields set), an explicit dart list, or an aggregate total.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SubmitVisitRequest {
    /// Role of the submitting session; required for online matches.
    #[serde(default)]
    pub side: Option<SideDto>,
    /// Explicit darts for this visit; overrides the pending queue.
    #[serde(default)]
    pub darts: Option<Vec<DartDto>>,
    /// Aggregate visit total (0-180); mutually exclusive with `darts`.
    #[serde(default)]
    pub total: Option<u16>,
    /// Dart count for aggregate entry; defaults to 3.
    #[serde(default)]
    pub dart_count: Option<u8>,
}

impl Validate for SubmitVisitRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.darts.is_some() && self.total.is_some() {
            let mut err = ValidationError::new("visit_entry");
            err.message = Some("supply either darts or a total, not both".into());
            errors.add("darts", err);
        }

        if self.dart_count.is_some() && self.total.is_none() {
            let mut err = ValidationError::new("dart_count");
            err.message = Some("dart_count only applies to aggregate totals".into());
            errors.add("dart_count", err);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Milestone counters of one side.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct AchievementsSummary {
    /// Visits of exactly 180.
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

impl From<Achievements> for AchievementsSummary {
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

/// One committed visit in a player's current-leg history.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VisitSummary {
    /// Darts thrown; empty for aggregate-entry visits.
    pub darts: Vec<DartDto>,
    /// Attempted total.
    pub total: u16,
    /// Net score reduction applied.
    pub scored: u16,
    /// Whether the visit busted.
    pub bust: bool,
}

impl From<Visit> for VisitSummary {
    fn from(value: Visit) -> Self {
        Self {
            darts: value.darts.into_iter().map(Into::into).collect(),
            total: value.total,
            scored: value.scored,
            bust: value.bust,
        }
    }
}

/// Public projection of one side of a match.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    /// Display name.
    pub display_name: String,
    /// Points left in the current leg.
    pub remaining_score: u16,
    /// Darts thrown this leg.
    pub darts_thrown_in_leg: u32,
    /// Darts thrown this match.
    pub darts_thrown_in_match: u32,
    /// Legs won in the current set.
    pub legs_won: u8,
    /// Sets won.
    pub sets_won: u8,
    /// Three-dart average for the current leg.
    pub leg_average: f64,
    /// Three-dart average across the match.
    pub match_average: f64,
    /// Committed visits of the current leg, oldest first.
    pub visits: Vec<VisitSummary>,
    /// Milestone counters.
    pub achievements: AchievementsSummary,
}

impl From<PlayerState> for PlayerSummary {
    fn from(value: PlayerState) -> Self {
        let leg_average = value.leg_average();
        let match_average = value.match_average();
        Self {
            display_name: value.display_name,
            remaining_score: value.remaining_score,
            darts_thrown_in_leg: value.darts_thrown_in_leg,
            darts_thrown_in_match: value.darts_thrown_in_match,
            legs_won: value.legs_won,
            sets_won: value.sets_won,
            leg_average,
            match_average,
            visits: value.visit_history.into_iter().map(Into::into).collect(),
            achievements: value.achievements.into(),
        }
    }
}

/// Wire projection of the progression phase.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhaseDto {
    /// Match is live.
    InProgress,
    /// Match has been won.
    Complete {
        /// Winning side.
        winner: SideDto,
    },
    /// Match was abandoned before completion.
    Abandoned,
}

impl From<MatchPhase> for PhaseDto {
    fn from(value: MatchPhase) -> Self {
        match value {
            MatchPhase::InProgress => PhaseDto::InProgress,
            MatchPhase::Complete { winner } => PhaseDto::Complete {
                winner: winner.into(),
            },
            MatchPhase::Abandoned => PhaseDto::Abandoned,
        }
    }
}

impl From<MatchPhaseEntity> for PhaseDto {
    fn from(value: MatchPhaseEntity) -> Self {
        MatchPhase::from(value).into()
    }
}

/// Echo of the match configuration inside summaries.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchConfigSummary {
    /// Leg starting score.
    pub start_score: u16,
    /// Whether a double opens each leg.
    pub double_in: bool,
    /// Whether a double finishes each leg.
    pub double_out: bool,
    /// Legs race within a set.
    pub legs: RaceTargetDto,
    /// Optional sets race.
    pub sets: Option<RaceTargetDto>,
}

impl From<MatchConfig> for MatchConfigSummary {
    fn from(value: MatchConfig) -> Self {
        Self {
            start_score: value.start_score,
            double_in: value.start_mode == StartMode::DoubleIn,
            double_out: value.finish_mode == FinishMode::DoubleOut,
            legs: value.legs_target.into(),
            sets: value.sets_target.map(Into::into),
        }
    }
}

/// Full public snapshot of a match, returned by REST reads and carried by
/// SSE updates. Rendering the same snapshot twice yields the same view;
/// all statistics are carried, never re-derived by the client.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchSummary {
    /// Match id.
    pub id: Uuid,
    /// Join code, present for online matches.
    pub room_code: Option<String>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 last-update timestamp.
    pub updated_at: String,
    /// Store record version.
    pub version: u64,
    /// Progression phase.
    pub phase: PhaseDto,
    /// Side holding the throw.
    pub active: SideDto,
    /// 1-based leg counter within the set.
    pub leg_number: u32,
    /// 1-based set counter.
    pub set_number: u32,
    /// Visits taken by the leg opener this leg.
    pub visit_number: u32,
    /// Match configuration.
    pub config: MatchConfigSummary,
    /// Both sides, home first.
    pub players: Vec<PlayerSummary>,
}

impl From<MatchSession> for MatchSummary {
    fn from(session: MatchSession) -> Self {
        let state = session.state;
        let [home, away] = state.players;
        Self {
            id: session.id,
            room_code: session.room_code,
            created_at: format_system_time(session.created_at),
            updated_at: format_system_time(session.updated_at),
            version: session.version,
            phase: state.phase.into(),
            active: state.active.into(),
            leg_number: state.leg_number,
            set_number: state.set_number,
            visit_number: state.visit_number,
            config: state.config.into(),
            players: vec![home.into(), away.into()],
        }
    }
}

/// Response to creating or joining a match: the seat assigned to the
/// calling session plus the initial snapshot.
#[derive(Debug, Serialize, ToSchema)]
pub struct SeatAssignment {
    /// Role the calling session plays as.
    pub role: SideDto,
    /// Snapshot of the match.
    pub summary: MatchSummary,
}

/// Discriminated outcome tag shipped with every committed visit.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeDto {
    /// Ordinary scoring visit.
    Scored,
    /// Busted visit; score untouched, turn passed.
    Bust,
    /// Visit won the leg.
    LegWon,
    /// Visit won the leg and decided the set.
    SetWon,
    /// Visit won the leg and decided the match.
    MatchWon,
    /// Match was abandoned.
    Abandoned,
}

/// Result of a committed visit: outcome tag plus the fresh snapshot.
#[derive(Debug, Serialize, ToSchema)]
pub struct VisitReport {
    /// What the visit did.
    pub outcome: OutcomeDto,
    /// Side that threw.
    pub side: SideDto,
    /// Total the visit attempted.
    pub attempted: u16,
    /// Snapshot after the commit.
    pub summary: MatchSummary,
}

/// The darts queued for the current visit, echoed after add/undo.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PendingVisit {
    /// Queued darts in throw order.
    pub darts: Vec<DartDto>,
    /// Running total.
    pub total: u16,
}

impl From<&VisitAccumulator> for PendingVisit {
    fn from(value: &VisitAccumulator) -> Self {
        Self {
            darts: value.darts().iter().copied().map(Into::into).collect(),
            total: value.total(),
        }
    }
}

/// Lobby listing entry for one match.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchListItem {
    /// Match id.
    pub id: Uuid,
    /// Join code, present for online matches.
    pub room_code: Option<String>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 last-update timestamp.
    pub updated_at: String,
    /// Display names of both sides, home first.
    pub players: Vec<String>,
    /// Progression phase.
    pub phase: PhaseDto,
}

impl From<MatchListItemEntity> for MatchListItem {
    fn from(entity: MatchListItemEntity) -> Self {
        Self {
            id: entity.id,
            room_code: entity.room_code,
            created_at: format_system_time(entity.created_at),
            updated_at: format_system_time(entity.updated_at),
            players: entity.players.to_vec(),
            phase: entity.phase.into(),
        }
    }
}
