use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for room participants (hosts, players, viewers)
pub type ParticipantId = Uuid;
/// Unique identifier for gateway connections
pub type ConnectionId = Uuid;

/// Role a participant asserts when joining a room.
///
/// The role recorded at join time is authoritative: a participant id cannot
/// rejoin under a different role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    /// Runs the game: loads content, selects clues, judges answers
    Host,
    /// Competes: buzzes, answers, wagers
    Player,
    /// Passive big-screen display; carries no score
    Viewer,
}

impl ParticipantRole {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Player => "player",
            Self::Viewer => "viewer",
        }
    }
}

/// Which board (or the final clue) is currently in play.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoundKind {
    First,
    Double,
    Final,
}

/// Lifecycle status of a room.
///
/// Regular play walks `Waiting → Ready → Selecting ⇄ ClueRevealed → Buzzing
/// → Answering → Judging`, with `returnToBoard` folding back to `Selecting`.
/// The final round appends `FinalWagering → FinalClueReading →
/// FinalAnswering → FinalJudging → Finished`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Ready,
    Selecting,
    ClueRevealed,
    Buzzing,
    Answering,
    Judging,
    FinalWagering,
    FinalClueReading,
    FinalAnswering,
    FinalJudging,
    Finished,
}

impl RoomStatus {
    /// Buzzes are only eligible while a clue is live and late arrivals can
    /// still enter the visible queue.
    #[must_use]
    pub const fn accepts_buzzes(&self) -> bool {
        matches!(self, Self::Buzzing | Self::Answering)
    }

    /// True for every status reached after the double round hands over to
    /// the final sub-machine.
    #[must_use]
    pub const fn in_final(&self) -> bool {
        matches!(
            self,
            Self::FinalWagering
                | Self::FinalClueReading
                | Self::FinalAnswering
                | Self::FinalJudging
                | Self::Finished
        )
    }
}
