//! The room state machine.
//!
//! Synchronous and effect-driven: every operation takes the sender's
//! identity plus the current clocks and returns the effects the actor shell
//! must execute (frames to send, timers to arm, saves to launch). Keeping
//! the machine free of I/O makes every transition unit-testable with
//! injected clocks.

use chrono::{DateTime, Utc};

use super::buzzer::{resolve_tie, BuzzEntry, BuzzerState};
use super::final_round::FinalRound;
use crate::game::{speaking_time_ms, GameConfig};
use crate::protocol::{
    validate_display_name, ClientFrame, ConnectionId, ParticipantId, ParticipantRole, RoomError,
    RoomStatus, RoundKind, ServerFrame,
};

/// Monotonic and wall clocks at the moment a command is processed.
/// `mono_ms` orders the buzzer race; `wall_ms` stamps deadlines.
#[derive(Debug, Clone, Copy)]
pub struct Now {
    pub mono_ms: u64,
    pub wall_ms: i64,
}

/// Room-scoped timing knobs, copied out of the process config at spawn.
#[derive(Debug, Clone, Copy)]
pub struct RoomTimings {
    pub tie_window_ms: u64,
    pub tie_buffer_ms: u64,
    pub final_answer_timeout_ms: u64,
}

impl Default for RoomTimings {
    fn default() -> Self {
        Self {
            tie_window_ms: 250,
            tie_buffer_ms: 50,
            final_answer_timeout_ms: 30_000,
        }
    }
}

/// Single-shot timers the machine asks the shell to arm. Each carries the
/// clue epoch at scheduling time; a fired timer whose epoch no longer
/// matches is discarded, which is how deselection cancels pending unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomTimer {
    /// End of the reading delay: unlock the buzzer.
    ClueUnlock { epoch: u64 },
    /// Tie window plus buffer elapsed: pick the winner.
    TieClose { epoch: u64 },
    /// Final clue has been read out: open the answer window.
    FinalReading { epoch: u64 },
}

/// What the actor shell must do after a transition.
#[derive(Debug)]
pub enum Effect {
    Unicast {
        conn: ConnectionId,
        frame: ServerFrame,
    },
    Broadcast(ServerFrame),
    /// Associate the connection with a participant in the gateway registry.
    Bind {
        conn: ConnectionId,
        participant: ParticipantId,
    },
    Schedule {
        timer: RoomTimer,
        delay_ms: u64,
    },
    /// Persist a content pack outside the room's critical section; the
    /// result comes back as a `SaveFinished` command.
    Save {
        conn: ConnectionId,
        config: Box<GameConfig>,
    },
}

/// Explicit lifecycle of the at-most-one in-flight save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingSave {
    Idle,
    Pending,
    Succeeded { game_id: String },
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub role: ParticipantRole,
    pub score: i64,
    pub buzzed_at: Option<i64>,
    pub connected: bool,
}

/// Health report for the registry's reaper.
#[derive(Debug, Clone, Copy)]
pub struct RoomHealth {
    pub finished: bool,
    pub host_absent_since: Option<i64>,
    pub last_activity_ms: i64,
    pub created_at_ms: i64,
}

pub struct RoomState {
    pub(crate) code: String,
    pub(crate) host_id: Option<ParticipantId>,
    pub(crate) status: RoomStatus,
    pub(crate) config: Option<GameConfig>,
    pub(crate) current_round: RoundKind,
    /// Join order matters: snapshots serialise players in insertion order.
    pub(crate) participants: Vec<Participant>,
    pub(crate) selected_clue: Option<(String, String)>,
    pub(crate) buzzer_locked: bool,
    pub(crate) buzzer: BuzzerState,
    /// Fairness memory; survives clue and round boundaries.
    pub(crate) not_picked_in_ties: Vec<ParticipantId>,
    pub(crate) last_correct_player: Option<ParticipantId>,
    pub(crate) current_player: Option<ParticipantId>,
    pub(crate) final_round: Option<FinalRound>,
    pub(crate) created_at: DateTime<Utc>,
    /// Bumps whenever the active clue context changes; stale timers check it.
    pub(crate) clue_epoch: u64,
    pub(crate) pending_save: PendingSave,
    pub(crate) host_absent_since: Option<i64>,
    pub(crate) last_activity_ms: i64,
    pub(crate) timings: RoomTimings,
}

impl RoomState {
    #[must_use]
    pub fn new(code: String, timings: RoomTimings, created_at: DateTime<Utc>) -> Self {
        Self {
            code,
            host_id: None,
            status: RoomStatus::Waiting,
            config: None,
            current_round: RoundKind::First,
            participants: Vec::new(),
            selected_clue: None,
            buzzer_locked: true,
            buzzer: BuzzerState::default(),
            not_picked_in_ties: Vec::new(),
            last_correct_player: None,
            current_player: None,
            final_round: None,
            created_at,
            clue_epoch: 0,
            pending_save: PendingSave::Idle,
            host_absent_since: None,
            last_activity_ms: created_at.timestamp_millis(),
            timings,
        }
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn status(&self) -> RoomStatus {
        self.status
    }

    #[must_use]
    pub fn health(&self) -> RoomHealth {
        RoomHealth {
            finished: self.status == RoomStatus::Finished,
            host_absent_since: self.host_absent_since,
            last_activity_ms: self.last_activity_ms,
            created_at_ms: self.created_at.timestamp_millis(),
        }
    }

    /// Apply one inbound frame. Errors become an `error` frame to the caller
    /// and never touch state.
    pub fn handle_frame(
        &mut self,
        conn: ConnectionId,
        sender: Option<ParticipantId>,
        frame: ClientFrame,
        now: Now,
    ) -> Vec<Effect> {
        self.last_activity_ms = now.wall_ms;
        let result = match frame {
            ClientFrame::JoinRoom {
                player_name,
                role,
                player_id,
                ..
            } => self.join(conn, player_name, role, player_id),
            ClientFrame::Buzz { timestamp } => self.buzz(sender, conn, timestamp, now),
            ClientFrame::SelectClue {
                category_id,
                clue_id,
            } => self.select_clue(sender, &category_id, &clue_id),
            ClientFrame::RevealAnswer => self.reveal_answer(sender),
            ClientFrame::JudgeAnswer { player_id, correct } => {
                self.judge_answer(sender, player_id, correct)
            }
            ClientFrame::UpdateScore { player_id, delta } => {
                self.update_score(sender, player_id, delta)
            }
            ClientFrame::NextRound => self.next_round(sender),
            ClientFrame::StartGame => self.start_game(sender),
            ClientFrame::StartFinalJeopardy => self.start_final_jeopardy(sender),
            ClientFrame::ShowFinalJeopardyClue => self.show_final_clue(sender),
            ClientFrame::StartFinalJeopardyJudging => self.start_final_judging(sender),
            ClientFrame::RevealFinalJeopardyWager => self.reveal_final_wager(sender),
            ClientFrame::RevealFinalJeopardyAnswer => self.reveal_final_answer(sender),
            ClientFrame::JudgeFinalJeopardyAnswer { player_id, correct } => {
                self.judge_final_answer(sender, player_id, correct)
            }
            ClientFrame::SubmitWager { wager } => self.submit_wager(sender, wager),
            ClientFrame::SubmitFinalAnswer { answer } => {
                self.submit_final_answer(sender, answer, now)
            }
            ClientFrame::ReturnToBoard => self.return_to_board(sender),
            ClientFrame::SaveGame { game_config } => self.save_game(sender, conn, game_config),
            ClientFrame::LoadGame { game_config } => self.load_game(sender, game_config),
            // Answered at the gateway; kept here so the match is exhaustive.
            ClientFrame::Ping { timestamp } => Ok(vec![Effect::Unicast {
                conn,
                frame: ServerFrame::Pong { timestamp },
            }]),
        };

        match result {
            Ok(effects) => effects,
            Err(err) => vec![Effect::Unicast {
                conn,
                frame: err.frame(),
            }],
        }
    }

    /// A scheduled timer fired. Stale epochs and superseded statuses are
    /// ignored without effect.
    pub fn handle_timer(&mut self, timer: RoomTimer, now: Now) -> Vec<Effect> {
        match timer {
            RoomTimer::ClueUnlock { epoch } => self.unlock_after_reading(epoch),
            RoomTimer::TieClose { epoch } => self.close_tie_window(epoch),
            RoomTimer::FinalReading { epoch } => self.open_answer_window(epoch, now),
        }
    }

    /// Transport-level disconnect. Never mutates game progress; the host's
    /// absence clock starts ticking for the reaper.
    pub fn handle_disconnect(&mut self, participant: ParticipantId, now: Now) {
        if let Some(p) = self.participant_mut(participant) {
            p.connected = false;
            tracing::info!(room = %self.code, %participant, "participant disconnected");
        }
        if self.host_id == Some(participant) {
            self.host_absent_since = Some(now.wall_ms);
        }
    }

    /// Result of the save launched by [`Effect::Save`].
    pub fn handle_save_result(
        &mut self,
        conn: ConnectionId,
        result: Result<String, String>,
    ) -> Vec<Effect> {
        match result {
            Ok(game_id) => {
                self.pending_save = PendingSave::Succeeded {
                    game_id: game_id.clone(),
                };
                vec![Effect::Unicast {
                    conn,
                    frame: ServerFrame::GameSaved { game_id },
                }]
            }
            Err(reason) => {
                self.pending_save = PendingSave::Failed {
                    reason: reason.clone(),
                };
                vec![Effect::Unicast {
                    conn,
                    frame: RoomError::Dependency(reason).frame(),
                }]
            }
        }
    }

    // ------------------------------------------------------------------
    // Joining

    fn join(
        &mut self,
        conn: ConnectionId,
        player_name: Option<String>,
        role: ParticipantRole,
        existing: Option<ParticipantId>,
    ) -> Result<Vec<Effect>, RoomError> {
        if let Some(id) = existing {
            if let Some(known) = self.participant(id) {
                if known.role != role {
                    return Err(RoomError::validation(format!(
                        "participant is already registered as a {}",
                        known.role.as_str()
                    )));
                }
                let rejoined_host = self.host_id == Some(id);
                if let Some(p) = self.participant_mut(id) {
                    p.connected = true;
                }
                if rejoined_host {
                    self.host_absent_since = None;
                }
                tracing::info!(room = %self.code, participant = %id, role = role.as_str(), "participant re-bound");
                return Ok(self.join_effects(conn, id));
            }
        }

        if role == ParticipantRole::Host {
            if let Some(host_id) = self.host_id {
                let host_connected = self
                    .participant(host_id)
                    .is_some_and(|p| p.connected);
                if host_connected {
                    return Err(RoomError::validation("room already has a host"));
                }
                return Err(RoomError::validation(
                    "host seat is reserved; rejoin with the original player id",
                ));
            }
        }

        let name = match role {
            ParticipantRole::Viewer => match player_name {
                Some(name) => validate_display_name(&name)?,
                None => "Viewer".to_string(),
            },
            _ => {
                let name =
                    player_name.ok_or_else(|| RoomError::validation("display name required"))?;
                validate_display_name(&name)?
            }
        };

        let id = existing.unwrap_or_else(ParticipantId::new_v4);
        self.participants.push(Participant {
            id,
            name,
            role,
            score: 0,
            buzzed_at: None,
            connected: true,
        });
        if role == ParticipantRole::Host {
            self.host_id = Some(id);
            self.host_absent_since = None;
        }
        tracing::info!(room = %self.code, participant = %id, role = role.as_str(), "participant joined");
        Ok(self.join_effects(conn, id))
    }

    fn join_effects(&self, conn: ConnectionId, id: ParticipantId) -> Vec<Effect> {
        vec![
            Effect::Bind {
                conn,
                participant: id,
            },
            Effect::Unicast {
                conn,
                frame: ServerFrame::RoomJoined {
                    room_id: self.code.clone(),
                    game_state: Box::new(self.snapshot()),
                    player_id: id,
                },
            },
            self.snapshot_effect(),
        ]
    }

    // ------------------------------------------------------------------
    // Board play

    fn load_game(
        &mut self,
        sender: Option<ParticipantId>,
        config: Box<GameConfig>,
    ) -> Result<Vec<Effect>, RoomError> {
        self.require_host(sender)?;
        if !matches!(
            self.status,
            RoomStatus::Waiting | RoomStatus::Ready | RoomStatus::Selecting
        ) {
            return Err(RoomError::state("a game is already in progress"));
        }
        config.validate().map_err(RoomError::Validation)?;

        self.config = Some(*config);
        self.current_round = RoundKind::First;
        self.status = RoomStatus::Ready;
        self.selected_clue = None;
        self.current_player = None;
        self.last_correct_player = None;
        self.final_round = None;
        self.buzzer.clear();
        self.clue_epoch += 1;
        let mut effects = Vec::new();
        self.set_buzzer_locked(true, &mut effects);
        effects.push(Effect::Broadcast(ServerFrame::GameCreated {
            game_state: Box::new(self.snapshot()),
        }));
        effects.push(self.snapshot_effect());
        Ok(effects)
    }

    fn start_game(&mut self, sender: Option<ParticipantId>) -> Result<Vec<Effect>, RoomError> {
        self.require_host(sender)?;
        if self.status != RoomStatus::Ready {
            return Err(RoomError::state("load a game before starting"));
        }
        self.status = RoomStatus::Selecting;
        Ok(vec![self.snapshot_effect()])
    }

    fn select_clue(
        &mut self,
        sender: Option<ParticipantId>,
        category_id: &str,
        clue_id: &str,
    ) -> Result<Vec<Effect>, RoomError> {
        self.require_host(sender)?;

        // A double-click on the tile the room is already showing is a UI
        // race, answered with a fresh snapshot.
        if self.status == RoomStatus::ClueRevealed
            && matches!(&self.selected_clue, Some((c, q)) if c == category_id && q == clue_id)
        {
            return Ok(vec![self.snapshot_effect()]);
        }
        if self.status != RoomStatus::Selecting {
            return Err(RoomError::state("a clue is already in play"));
        }
        if self.current_round == RoundKind::Final {
            return Err(RoomError::state("the final round has no board"));
        }
        let round = self.current_round;
        let config = self
            .config
            .as_mut()
            .ok_or_else(|| RoomError::state("no game loaded"))?;
        let board = config
            .board_mut(round)
            .ok_or_else(|| RoomError::state("the final round has no board"))?;
        let clue = board
            .clue_mut(category_id, clue_id)
            .ok_or_else(|| RoomError::not_found("clue"))?;
        if clue.answered {
            return Err(RoomError::state("that clue has already been answered"));
        }
        if clue.revealed {
            return Err(RoomError::state("that clue has already been revealed"));
        }
        clue.revealed = true;
        let reading_ms = speaking_time_ms(&clue.prompt_text);

        self.selected_clue = Some((category_id.to_string(), clue_id.to_string()));
        self.status = RoomStatus::ClueRevealed;
        self.current_player = None;
        self.buzzer.clear();
        self.clear_buzzed_at();
        self.clue_epoch += 1;

        let mut effects = Vec::new();
        self.set_buzzer_locked(true, &mut effects);
        effects.push(Effect::Schedule {
            timer: RoomTimer::ClueUnlock {
                epoch: self.clue_epoch,
            },
            delay_ms: reading_ms,
        });
        effects.push(self.snapshot_effect());
        Ok(effects)
    }

    fn unlock_after_reading(&mut self, epoch: u64) -> Vec<Effect> {
        if epoch != self.clue_epoch || self.status != RoomStatus::ClueRevealed {
            return Vec::new();
        }
        self.status = RoomStatus::Buzzing;
        let mut effects = Vec::new();
        self.set_buzzer_locked(false, &mut effects);
        effects.push(self.snapshot_effect());
        effects
    }

    fn reveal_answer(&mut self, sender: Option<ParticipantId>) -> Result<Vec<Effect>, RoomError> {
        self.require_host(sender)?;
        if !matches!(
            self.status,
            RoomStatus::ClueRevealed
                | RoomStatus::Buzzing
                | RoomStatus::Answering
                | RoomStatus::Judging
        ) {
            return Err(RoomError::state("no clue is in play"));
        }
        self.status = RoomStatus::Judging;
        self.clue_epoch += 1;
        let mut effects = Vec::new();
        self.set_buzzer_locked(true, &mut effects);
        effects.push(self.snapshot_effect());
        Ok(effects)
    }

    fn return_to_board(&mut self, sender: Option<ParticipantId>) -> Result<Vec<Effect>, RoomError> {
        self.require_host(sender)?;
        if !matches!(
            self.status,
            RoomStatus::ClueRevealed
                | RoomStatus::Buzzing
                | RoomStatus::Answering
                | RoomStatus::Judging
        ) {
            return Err(RoomError::state("no clue is in play"));
        }
        self.selected_clue = None;
        self.current_player = None;
        self.buzzer.clear();
        self.clear_buzzed_at();
        self.status = RoomStatus::Selecting;
        self.clue_epoch += 1;
        let mut effects = Vec::new();
        self.set_buzzer_locked(true, &mut effects);
        effects.push(self.snapshot_effect());
        Ok(effects)
    }

    fn update_score(
        &mut self,
        sender: Option<ParticipantId>,
        player_id: ParticipantId,
        delta: i64,
    ) -> Result<Vec<Effect>, RoomError> {
        self.require_host(sender)?;
        let player = self
            .participants
            .iter_mut()
            .find(|p| p.id == player_id && p.role == ParticipantRole::Player)
            .ok_or_else(|| RoomError::not_found("player"))?;
        player.score += delta;
        Ok(vec![self.snapshot_effect()])
    }

    fn next_round(&mut self, sender: Option<ParticipantId>) -> Result<Vec<Effect>, RoomError> {
        self.require_host(sender)?;
        if !matches!(self.status, RoomStatus::Selecting | RoomStatus::Judging) {
            return Err(RoomError::state("finish the current clue first"));
        }
        match self.current_round {
            RoundKind::First => {
                self.current_round = RoundKind::Double;
                self.selected_clue = None;
                self.current_player = None;
                self.buzzer.clear();
                self.clear_buzzed_at();
                self.status = RoomStatus::Selecting;
                self.clue_epoch += 1;
                let mut effects = Vec::new();
                self.set_buzzer_locked(true, &mut effects);
                effects.push(self.snapshot_effect());
                Ok(effects)
            }
            RoundKind::Double => self.enter_final(),
            RoundKind::Final => Err(RoomError::state("the final round is already in play")),
        }
    }

    // ------------------------------------------------------------------
    // Buzzing

    fn buzz(
        &mut self,
        sender: Option<ParticipantId>,
        conn: ConnectionId,
        client_ts: i64,
        now: Now,
    ) -> Result<Vec<Effect>, RoomError> {
        let player = self.require_player(sender)?;
        if !self.status.accepts_buzzes() {
            return Err(RoomError::state("the buzzer is locked"));
        }

        if self.buzzer.has_buzzed(player) {
            // The client resent; echo the acknowledgement so its UI settles
            // into "buzzed", but record nothing.
            return Ok(vec![Effect::Unicast {
                conn,
                frame: ServerFrame::BuzzReceived {
                    player_id: player,
                    timestamp: client_ts,
                },
            }]);
        }

        self.buzzer.record(BuzzEntry {
            player,
            client_ts,
            server_ts: now.mono_ms,
        });
        if let Some(p) = self.participant_mut(player) {
            p.buzzed_at = Some(client_ts);
        }

        let mut effects = vec![Effect::Broadcast(ServerFrame::BuzzReceived {
            player_id: player,
            timestamp: client_ts,
        })];

        if self.current_player.is_some() {
            // Late buzz: joins the visible queue, never displaces the winner.
            self.buzzer.append_late(player);
        } else if !self.buzzer.timer_armed {
            self.buzzer.timer_armed = true;
            effects.push(Effect::Schedule {
                timer: RoomTimer::TieClose {
                    epoch: self.clue_epoch,
                },
                delay_ms: self.timings.tie_window_ms + self.timings.tie_buffer_ms,
            });
        }
        effects.push(self.snapshot_effect());
        Ok(effects)
    }

    fn close_tie_window(&mut self, epoch: u64) -> Vec<Effect> {
        if epoch != self.clue_epoch {
            return Vec::new();
        }
        self.buzzer.timer_armed = false;
        if self.status != RoomStatus::Buzzing
            || self.current_player.is_some()
            || self.buzzer.log.is_empty()
        {
            return Vec::new();
        }

        let tied = self.buzzer.tied_set(self.timings.tie_window_ms);
        let Some(winner) = resolve_tie(&tied, &mut self.not_picked_in_ties) else {
            return Vec::new();
        };
        self.buzzer.commit(winner);
        self.current_player = Some(winner);
        self.status = RoomStatus::Answering;
        tracing::debug!(room = %self.code, %winner, tied = tied.len(), "buzzer race resolved");
        vec![self.snapshot_effect()]
    }

    // ------------------------------------------------------------------
    // Judging

    fn judge_answer(
        &mut self,
        sender: Option<ParticipantId>,
        player_id: ParticipantId,
        correct: bool,
    ) -> Result<Vec<Effect>, RoomError> {
        self.require_host(sender)?;
        if !matches!(self.status, RoomStatus::Answering | RoomStatus::Judging) {
            return Err(RoomError::state("no answer to judge"));
        }
        if self.current_player != Some(player_id) {
            return Err(RoomError::validation("that player is not answering"));
        }
        if self.buzzer.was_judged(player_id) {
            return Err(RoomError::validation(
                "that player was already judged on this clue",
            ));
        }

        let (category_id, clue_id) = self
            .selected_clue
            .clone()
            .ok_or_else(|| RoomError::state("no clue is in play"))?;
        let round = self.current_round;
        let config = self
            .config
            .as_mut()
            .ok_or_else(|| RoomError::state("no game loaded"))?;
        let clue = config
            .board_mut(round)
            .and_then(|board| board.clue_mut(&category_id, &clue_id))
            .ok_or_else(|| RoomError::not_found("clue"))?;
        let value = i64::from(clue.value);
        if correct {
            clue.answered = true;
        }

        self.buzzer.mark_judged(player_id);
        let mut effects = Vec::new();
        if correct {
            if let Some(p) = self.participant_mut(player_id) {
                p.score += value;
            }
            self.last_correct_player = Some(player_id);
            self.current_player = None;
            self.status = RoomStatus::Judging;
            self.set_buzzer_locked(true, &mut effects);
        } else {
            if let Some(p) = self.participant_mut(player_id) {
                p.score -= value;
            }
            match self.buzzer.next_in_queue(player_id) {
                Some(next) => {
                    self.current_player = Some(next);
                    self.status = RoomStatus::Answering;
                }
                None => {
                    self.current_player = None;
                    self.status = RoomStatus::Judging;
                    self.set_buzzer_locked(true, &mut effects);
                }
            }
        }
        effects.push(self.snapshot_effect());
        Ok(effects)
    }

    // ------------------------------------------------------------------
    // Final round

    fn enter_final(&mut self) -> Result<Vec<Effect>, RoomError> {
        let roster: Vec<(ParticipantId, i64)> = self
            .participants
            .iter()
            .filter(|p| p.role == ParticipantRole::Player)
            .map(|p| (p.id, p.score))
            .collect();
        self.final_round = Some(FinalRound::start(&roster));
        self.current_round = RoundKind::Final;
        self.status = RoomStatus::FinalWagering;
        self.selected_clue = None;
        self.current_player = None;
        self.buzzer.clear();
        self.clear_buzzed_at();
        self.clue_epoch += 1;
        let mut effects = Vec::new();
        self.set_buzzer_locked(true, &mut effects);
        effects.push(self.snapshot_effect());
        Ok(effects)
    }

    fn start_final_jeopardy(
        &mut self,
        sender: Option<ParticipantId>,
    ) -> Result<Vec<Effect>, RoomError> {
        self.require_host(sender)?;
        if self.current_round != RoundKind::Double {
            return Err(RoomError::state(
                "final jeopardy starts from the double round",
            ));
        }
        if !matches!(self.status, RoomStatus::Selecting | RoomStatus::Judging) {
            return Err(RoomError::state("finish the current clue first"));
        }
        self.enter_final()
    }

    fn submit_wager(
        &mut self,
        sender: Option<ParticipantId>,
        wager: i64,
    ) -> Result<Vec<Effect>, RoomError> {
        let player = self.require_player(sender)?;
        if self.status != RoomStatus::FinalWagering {
            return Err(RoomError::state("wagers are not being accepted"));
        }
        self.final_round_mut()?.record_wager(player, wager)?;
        Ok(vec![self.snapshot_effect()])
    }

    fn show_final_clue(&mut self, sender: Option<ParticipantId>) -> Result<Vec<Effect>, RoomError> {
        self.require_host(sender)?;
        if self.status != RoomStatus::FinalWagering {
            return Err(RoomError::state("wagering is already over"));
        }
        let final_round = self.final_round_mut()?;
        if !final_round.all_wagered() {
            return Err(RoomError::state("waiting for all wagers"));
        }
        let prompt = self
            .config
            .as_ref()
            .map(|c| c.final_round.prompt_text.clone())
            .ok_or_else(|| RoomError::state("no game loaded"))?;
        self.status = RoomStatus::FinalClueReading;
        self.clue_epoch += 1;
        Ok(vec![
            Effect::Schedule {
                timer: RoomTimer::FinalReading {
                    epoch: self.clue_epoch,
                },
                delay_ms: speaking_time_ms(&prompt),
            },
            self.snapshot_effect(),
        ])
    }

    fn open_answer_window(&mut self, epoch: u64, now: Now) -> Vec<Effect> {
        if epoch != self.clue_epoch || self.status != RoomStatus::FinalClueReading {
            return Vec::new();
        }
        let deadline = now.wall_ms + self.timings.final_answer_timeout_ms as i64;
        if let Some(final_round) = self.final_round.as_mut() {
            final_round.countdown_end = Some(deadline);
        }
        self.status = RoomStatus::FinalAnswering;
        vec![self.snapshot_effect()]
    }

    fn submit_final_answer(
        &mut self,
        sender: Option<ParticipantId>,
        answer: String,
        now: Now,
    ) -> Result<Vec<Effect>, RoomError> {
        let player = self.require_player(sender)?;
        if self.status != RoomStatus::FinalAnswering {
            return Err(RoomError::state("answers are not being accepted"));
        }
        self.final_round_mut()?
            .record_answer(player, answer, now.wall_ms)?;
        Ok(vec![self.snapshot_effect()])
    }

    fn start_final_judging(
        &mut self,
        sender: Option<ParticipantId>,
    ) -> Result<Vec<Effect>, RoomError> {
        self.require_host(sender)?;
        if self.status != RoomStatus::FinalAnswering {
            return Err(RoomError::state("the answer window is not open"));
        }
        let final_round = self.final_round_mut()?;
        final_round.judging_index = 0;
        final_round.revealed_wager = false;
        final_round.revealed_answer = false;
        self.status = RoomStatus::FinalJudging;
        Ok(vec![self.snapshot_effect()])
    }

    fn reveal_final_wager(
        &mut self,
        sender: Option<ParticipantId>,
    ) -> Result<Vec<Effect>, RoomError> {
        self.require_host(sender)?;
        if self.status != RoomStatus::FinalJudging {
            return Err(RoomError::state("final judging has not started"));
        }
        self.final_round_mut()?.reveal_wager()?;
        Ok(vec![self.snapshot_effect()])
    }

    fn reveal_final_answer(
        &mut self,
        sender: Option<ParticipantId>,
    ) -> Result<Vec<Effect>, RoomError> {
        self.require_host(sender)?;
        if self.status != RoomStatus::FinalJudging {
            return Err(RoomError::state("final judging has not started"));
        }
        self.final_round_mut()?.reveal_answer()?;
        Ok(vec![self.snapshot_effect()])
    }

    fn judge_final_answer(
        &mut self,
        sender: Option<ParticipantId>,
        player_id: ParticipantId,
        correct: bool,
    ) -> Result<Vec<Effect>, RoomError> {
        self.require_host(sender)?;
        if self.status != RoomStatus::FinalJudging {
            return Err(RoomError::state("final judging has not started"));
        }
        let delta = self.final_round_mut()?.judge(player_id, correct)?;
        if let Some(p) = self.participant_mut(player_id) {
            p.score += delta;
        }
        let finished = self
            .final_round
            .as_ref()
            .is_some_and(FinalRound::finished_judging);
        if finished {
            self.status = RoomStatus::Finished;
            tracing::info!(room = %self.code, "game finished");
        }
        Ok(vec![self.snapshot_effect()])
    }

    // ------------------------------------------------------------------
    // Persistence

    fn save_game(
        &mut self,
        sender: Option<ParticipantId>,
        conn: ConnectionId,
        payload: Option<Box<GameConfig>>,
    ) -> Result<Vec<Effect>, RoomError> {
        self.require_host(sender)?;
        if self.pending_save == PendingSave::Pending {
            return Err(RoomError::validation("a save is already in progress"));
        }
        let config = match payload {
            Some(config) => config,
            None => Box::new(
                self.config
                    .clone()
                    .ok_or_else(|| RoomError::validation("no game to save"))?,
            ),
        };
        self.pending_save = PendingSave::Pending;
        Ok(vec![Effect::Save { conn, config }])
    }

    // ------------------------------------------------------------------
    // Helpers

    pub(crate) fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    fn participant_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id == id)
    }

    fn require_host(&self, sender: Option<ParticipantId>) -> Result<ParticipantId, RoomError> {
        let id = sender.ok_or(RoomError::requires(ParticipantRole::Host))?;
        match self.participant(id) {
            Some(p) if p.role == ParticipantRole::Host => Ok(id),
            Some(_) => Err(RoomError::requires(ParticipantRole::Host)),
            None => Err(RoomError::not_found("participant")),
        }
    }

    fn require_player(&self, sender: Option<ParticipantId>) -> Result<ParticipantId, RoomError> {
        let id = sender.ok_or(RoomError::requires(ParticipantRole::Player))?;
        match self.participant(id) {
            Some(p) if p.role == ParticipantRole::Player => Ok(id),
            Some(_) => Err(RoomError::requires(ParticipantRole::Player)),
            None => Err(RoomError::not_found("participant")),
        }
    }

    fn final_round_mut(&mut self) -> Result<&mut FinalRound, RoomError> {
        self.final_round
            .as_mut()
            .ok_or_else(|| RoomError::state("the final round has not started"))
    }

    fn clear_buzzed_at(&mut self) {
        for p in &mut self.participants {
            p.buzzed_at = None;
        }
    }

    /// Flip the lock, emitting the narrow event only on an actual change.
    fn set_buzzer_locked(&mut self, locked: bool, effects: &mut Vec<Effect>) {
        if self.buzzer_locked != locked {
            self.buzzer_locked = locked;
            effects.push(Effect::Broadcast(ServerFrame::BuzzerLocked { locked }));
        }
    }

    fn snapshot_effect(&self) -> Effect {
        Effect::Broadcast(ServerFrame::GameStateUpdate {
            game_state: Box::new(self.snapshot()),
        })
    }
}
