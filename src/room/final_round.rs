//! Final-round sub-machine: wagering, the timed answer window, and
//! sequential judging in ascending-score order.
//!
//! Phases are encoded in the room's status; this struct carries the data the
//! phases operate on. Scores are snapshotted at initialisation, so wager
//! bounds and judging order stay fixed even as judging mutates live scores.

use std::collections::HashMap;

use crate::protocol::{ParticipantId, RoomError};

#[derive(Debug)]
pub struct FinalRound {
    /// Score of every player when the final round began.
    pub initial_scores: HashMap<ParticipantId, i64>,
    /// Players with a strictly positive score at the snapshot, ascending.
    pub judging_order: Vec<ParticipantId>,
    pub wagers: HashMap<ParticipantId, i64>,
    pub answers: HashMap<ParticipantId, String>,
    /// Absolute wall-clock deadline (ms since epoch) for answers.
    pub countdown_end: Option<i64>,
    pub judging_index: usize,
    pub revealed_wager: bool,
    pub revealed_answer: bool,
}

impl FinalRound {
    /// Snapshot scores and fix the judging order. Players at zero or below
    /// are excluded from wagering and judging entirely.
    #[must_use]
    pub fn start(players: &[(ParticipantId, i64)]) -> Self {
        let initial_scores: HashMap<ParticipantId, i64> = players.iter().copied().collect();
        let mut judging_order: Vec<(ParticipantId, i64)> = players
            .iter()
            .copied()
            .filter(|(_, score)| *score > 0)
            .collect();
        // Stable sort keeps join order among equal scores.
        judging_order.sort_by_key(|(_, score)| *score);

        Self {
            initial_scores,
            judging_order: judging_order.into_iter().map(|(id, _)| id).collect(),
            wagers: HashMap::new(),
            answers: HashMap::new(),
            countdown_end: None,
            judging_index: 0,
            revealed_wager: false,
            revealed_answer: false,
        }
    }

    #[must_use]
    pub fn is_eligible(&self, player: ParticipantId) -> bool {
        self.judging_order.contains(&player)
    }

    /// Record a wager. Bounds come from the snapshot, not the live score,
    /// and a wager is final once recorded.
    pub fn record_wager(&mut self, player: ParticipantId, wager: i64) -> Result<(), RoomError> {
        if !self.is_eligible(player) {
            return Err(RoomError::validation(
                "players without a positive score cannot wager",
            ));
        }
        let ceiling = self.initial_scores.get(&player).copied().unwrap_or(0);
        if wager < 0 || wager > ceiling {
            return Err(RoomError::validation(format!(
                "wager must be between 0 and {ceiling}"
            )));
        }
        if self.wagers.contains_key(&player) {
            return Err(RoomError::validation("wager already recorded"));
        }
        self.wagers.insert(player, wager);
        Ok(())
    }

    #[must_use]
    pub fn all_wagered(&self) -> bool {
        self.judging_order
            .iter()
            .all(|player| self.wagers.contains_key(player))
    }

    /// Record an answer before the countdown expires. One answer per player.
    pub fn record_answer(
        &mut self,
        player: ParticipantId,
        answer: String,
        now_wall_ms: i64,
    ) -> Result<(), RoomError> {
        if !self.is_eligible(player) {
            return Err(RoomError::validation(
                "players without a positive score cannot answer",
            ));
        }
        match self.countdown_end {
            Some(deadline) if now_wall_ms < deadline => {}
            Some(_) => return Err(RoomError::validation("the answer window has closed")),
            None => return Err(RoomError::state("the answer window has not opened")),
        }
        if self.answers.contains_key(&player) {
            return Err(RoomError::validation("answer already recorded"));
        }
        self.answers.insert(player, answer);
        Ok(())
    }

    /// The player currently on the judging block, if any remain.
    #[must_use]
    pub fn current_judged_player(&self) -> Option<ParticipantId> {
        self.judging_order.get(self.judging_index).copied()
    }

    pub fn reveal_wager(&mut self) -> Result<(), RoomError> {
        if self.current_judged_player().is_none() {
            return Err(RoomError::state("final judging is already complete"));
        }
        if self.revealed_wager {
            return Err(RoomError::state("wager already revealed"));
        }
        self.revealed_wager = true;
        Ok(())
    }

    pub fn reveal_answer(&mut self) -> Result<(), RoomError> {
        if !self.revealed_wager {
            return Err(RoomError::state("reveal the wager first"));
        }
        if self.revealed_answer {
            return Err(RoomError::state("answer already revealed"));
        }
        self.revealed_answer = true;
        Ok(())
    }

    /// Judge the current player, returning the signed score delta to apply.
    /// Advances to the next player and resets the reveal flags.
    pub fn judge(&mut self, player: ParticipantId, correct: bool) -> Result<i64, RoomError> {
        let current = self
            .current_judged_player()
            .ok_or_else(|| RoomError::state("final judging is already complete"))?;
        if player != current {
            return Err(RoomError::validation(
                "players are judged in ascending-score order",
            ));
        }
        if !self.revealed_wager || !self.revealed_answer {
            return Err(RoomError::state(
                "reveal the wager and answer before judging",
            ));
        }
        let wager = self.wagers.get(&player).copied().unwrap_or(0);
        self.judging_index += 1;
        self.revealed_wager = false;
        self.revealed_answer = false;
        Ok(if correct { wager } else { -wager })
    }

    #[must_use]
    pub fn finished_judging(&self) -> bool {
        self.judging_index >= self.judging_order.len()
    }
}
