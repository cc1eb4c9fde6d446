use serde::{Deserialize, Serialize};

use super::errors::RoomError;
use super::types::{ParticipantId, ParticipantRole, RoomStatus, RoundKind};
use crate::game::{Clue, GameConfig};

/// Message types sent from client to server.
///
/// One JSON object per text frame, discriminated on `type`. Unknown types
/// fail to parse and are answered with an `error` frame, never a disconnect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    /// Join or create a room; the first frame on every connection.
    /// `player_id` re-binds a participant the room already knows.
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        #[serde(default)]
        room_id: Option<String>,
        #[serde(default)]
        player_name: Option<String>,
        role: ParticipantRole,
        #[serde(default)]
        player_id: Option<ParticipantId>,
    },
    /// Race for the current clue. The timestamp is the client's clock and is
    /// advisory only; adjudication uses server receipt time.
    Buzz { timestamp: i64 },
    #[serde(rename_all = "camelCase")]
    SelectClue { category_id: String, clue_id: String },
    RevealAnswer,
    #[serde(rename_all = "camelCase")]
    JudgeAnswer { player_id: ParticipantId, correct: bool },
    #[serde(rename_all = "camelCase")]
    UpdateScore { player_id: ParticipantId, delta: i64 },
    NextRound,
    StartGame,
    StartFinalJeopardy,
    ShowFinalJeopardyClue,
    StartFinalJeopardyJudging,
    RevealFinalJeopardyWager,
    RevealFinalJeopardyAnswer,
    #[serde(rename_all = "camelCase")]
    JudgeFinalJeopardyAnswer { player_id: ParticipantId, correct: bool },
    SubmitWager { wager: i64 },
    SubmitFinalAnswer { answer: String },
    ReturnToBoard,
    #[serde(rename_all = "camelCase")]
    SaveGame {
        #[serde(default)]
        game_config: Option<Box<GameConfig>>,
    },
    #[serde(rename_all = "camelCase")]
    LoadGame { game_config: Box<GameConfig> },
    Ping { timestamp: i64 },
}

/// Message types sent from server to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerFrame {
    /// Sent to the joiner only; the room gets a snapshot.
    #[serde(rename_all = "camelCase")]
    RoomJoined {
        room_id: String,
        game_state: Box<GameStateView>,
        player_id: ParticipantId,
    },
    /// Total room snapshot; idempotent, so superseded copies may be dropped
    /// for a slow consumer.
    #[serde(rename_all = "camelCase")]
    GameStateUpdate { game_state: Box<GameStateView> },
    BuzzerLocked { locked: bool },
    /// Optimistic acknowledgement that a buzz entered the log.
    #[serde(rename_all = "camelCase")]
    BuzzReceived {
        player_id: ParticipantId,
        timestamp: i64,
    },
    #[serde(rename_all = "camelCase")]
    GameCreated { game_state: Box<GameStateView> },
    #[serde(rename_all = "camelCase")]
    GameSaved { game_id: String },
    Error { message: String },
    Pong { timestamp: i64 },
}

impl ServerFrame {
    /// Snapshots may coalesce per connection; narrow events never do.
    #[must_use]
    pub const fn is_snapshot(&self) -> bool {
        matches!(self, Self::GameStateUpdate { .. })
    }
}

/// The clue currently on screen, with enough context to render it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SelectedClueView {
    pub category_id: String,
    pub category_name: String,
    pub clue: Clue,
}

/// One row of the scoreboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: ParticipantId,
    pub name: String,
    pub score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buzzed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_wager: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
}

/// A full, self-contained view of a room, sufficient to render any
/// participant's UI. Players appear in join order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub room_id: String,
    pub status: RoomStatus,
    pub current_round: RoundKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<GameConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_clue: Option<SelectedClueView>,
    pub players: Vec<PlayerView>,
    pub buzzer_order: Vec<ParticipantId>,
    pub display_buzzer_order: Vec<ParticipantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_player: Option<ParticipantId>,
    pub judged_players: Vec<ParticipantId>,
    pub not_picked_in_ties: Vec<ParticipantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_correct_player: Option<ParticipantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<ParticipantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_countdown_end: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_judging_player_index: Option<usize>,
    pub final_revealed_wager: bool,
    pub final_revealed_answer: bool,
}

/// Parse one inbound text frame, mapping serde failures to protocol errors.
pub fn parse_client_frame(text: &str) -> Result<ClientFrame, RoomError> {
    serde_json::from_str(text).map_err(|err| RoomError::Protocol(err.to_string()))
}
