use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Serialized identifier of a match side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SideEntity {
    /// Creator's side; throws first in leg one.
    Home,
    /// Opponent's side.
    Away,
}

/// Serialized dartboard ring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MultiplierEntity {
    /// Plain segment.
    Single,
    /// Double ring.
    Double,
    /// Treble ring.
    Treble,
}

/// Serialized single dart.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DartEntity {
    /// Board segment (0 for a miss, 1-20, or 25 for the bull).
    pub segment: u8,
    /// Ring the dart landed in.
    pub multiplier: MultiplierEntity,
}

/// Serialized race format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RaceFormatEntity {
    /// First to a majority of the scheduled count.
    BestOf,
    /// All scheduled legs/sets are played out.
    PlayAll,
    /// First to exactly the scheduled count.
    FirstTo,
}

/// Serialized race target (format plus count).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RaceTargetEntity {
    /// Race format.
    pub format: RaceFormatEntity,
    /// Scheduled count.
    pub count: u8,
}

/// Serialized match configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchConfigEntity {
    /// Leg starting score.
    pub start_score: u16,
    /// Whether a double is required to open a leg.
    pub double_in: bool,
    /// Whether a double is required to finish a leg.
    pub double_out: bool,
    /// Legs race within a set.
    pub legs_target: RaceTargetEntity,
    /// Optional sets race.
    pub sets_target: Option<RaceTargetEntity>,
}

/// Serialized milestone counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AchievementsEntity {
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

/// Serialized committed visit (one entry of the shared visit log).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisitEntity {
    /// Darts thrown, empty for aggregate-entry visits.
    pub darts: Vec<DartEntity>,
    /// Attempted visit total.
    pub total: u16,
    /// Net score reduction applied.
    pub scored: u16,
    /// Whether the visit busted.
    pub bust: bool,
}

/// Serialized per-side state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerEntity {
    /// Display name of the side.
    pub display_name: String,
    /// Points left in the current leg.
    pub remaining_score: u16,
    /// Darts thrown this leg.
    pub darts_thrown_in_leg: u32,
    /// Darts thrown this match.
    pub darts_thrown_in_match: u32,
    /// Non-bust points scored this leg.
    pub points_scored_in_leg: u32,
    /// Non-bust points scored this match.
    pub points_scored_in_match: u32,
    /// Legs won in the current set.
    pub legs_won: u8,
    /// Sets won.
    pub sets_won: u8,
    /// Whether double-in has been satisfied this leg.
    pub opened: bool,
    /// Committed visits of the current leg.
    pub visit_history: Vec<VisitEntity>,
    /// Milestone counters.
    pub achievements: AchievementsEntity,
}

/// Serialized progression phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchPhaseEntity {
    /// Match is being played.
    InProgress,
    /// A side has won the match.
    Complete {
        /// The winning side.
        winner: SideEntity,
    },
    /// The room was torn down before a winner emerged.
    Abandoned,
}

/// The whole per-match record written to and read from the match store.
///
/// Writes replace the record as a unit; `version` carries the
/// optimistic-concurrency token a conditional write must name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchEntity {
    /// Primary key of the match.
    pub id: Uuid,
    /// Join code for online matches.
    pub room_code: Option<String>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time this record was replaced.
    pub updated_at: SystemTime,
    /// Version counter bumped on every committed write.
    pub version: u64,
    /// Match configuration.
    pub config: MatchConfigEntity,
    /// Both sides, home first.
    pub players: [PlayerEntity; 2],
    /// Side whose turn it is.
    pub active: SideEntity,
    /// Side that opened the current leg.
    pub leg_opener: SideEntity,
    /// Visits taken by the leg opener this leg.
    pub visit_number: u32,
    /// 1-based leg counter within the set.
    pub leg_number: u32,
    /// 1-based set counter.
    pub set_number: u32,
    /// Legs played in the current set.
    pub legs_played_in_set: u8,
    /// Sets fully played.
    pub sets_played: u8,
    /// Progression phase.
    pub phase: MatchPhaseEntity,
}

/// Summary projection used by the match listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchListItemEntity {
    /// Primary key of the match.
    pub id: Uuid,
    /// Join code for online matches.
    pub room_code: Option<String>,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last update timestamp.
    pub updated_at: SystemTime,
    /// Display names of both sides, home first.
    pub players: [String; 2],
    /// Progression phase.
    pub phase: MatchPhaseEntity,
}

impl From<MatchEntity> for MatchListItemEntity {
    fn from(entity: MatchEntity) -> Self {
        let [home, away] = entity.players;
        Self {
            id: entity.id,
            room_code: entity.room_code,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            players: [home.display_name, away.display_name],
            phase: entity.phase,
        }
    }
}
