//! Buzz log and tie resolution for a single clue.
//!
//! All timestamps here are the actor's monotonic receipt clock in
//! milliseconds; client clocks are recorded for diagnostics only. The
//! fairness memory (`not_picked_in_ties`) outlives individual clues and is
//! owned by the room state, not by this per-clue scratchpad.

use crate::protocol::ParticipantId;

/// One recorded buzz. `server_ts` orders the race; `client_ts` is advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuzzEntry {
    pub player: ParticipantId,
    pub client_ts: i64,
    pub server_ts: u64,
}

/// Per-clue buzz bookkeeping, cleared whenever a clue is selected or the
/// host returns to the board.
#[derive(Debug, Default)]
pub struct BuzzerState {
    /// Buzzes in receipt order; at most one entry per player.
    pub log: Vec<BuzzEntry>,
    /// Raw receipt order, frozen at selection commit.
    pub order_raw: Vec<ParticipantId>,
    /// Visible queue: winner first, then receipt order. Late buzzes append;
    /// relative order of existing entries never changes.
    pub display_order: Vec<ParticipantId>,
    /// Players already judged on the current clue.
    pub judged: Vec<ParticipantId>,
    /// Whether the tie-close timer for this clue has been armed.
    pub timer_armed: bool,
}

impl BuzzerState {
    pub fn clear(&mut self) {
        self.log.clear();
        self.order_raw.clear();
        self.display_order.clear();
        self.judged.clear();
        self.timer_armed = false;
    }

    #[must_use]
    pub fn has_buzzed(&self, player: ParticipantId) -> bool {
        self.log.iter().any(|entry| entry.player == player)
    }

    pub fn record(&mut self, entry: BuzzEntry) {
        self.log.push(entry);
    }

    /// Append a late buzzer to the visible queue without disturbing it.
    pub fn append_late(&mut self, player: ParticipantId) {
        if !self.display_order.contains(&player) {
            self.display_order.push(player);
        }
    }

    /// Players whose receipt time falls within `window_ms` of the earliest
    /// buzz, in receipt order.
    #[must_use]
    pub fn tied_set(&self, window_ms: u64) -> Vec<ParticipantId> {
        let Some(first) = self.log.first() else {
            return Vec::new();
        };
        let cutoff = first.server_ts.saturating_add(window_ms);
        self.log
            .iter()
            .filter(|entry| entry.server_ts <= cutoff)
            .map(|entry| entry.player)
            .collect()
    }

    /// Freeze the queue: winner first, everyone else in receipt order.
    pub fn commit(&mut self, winner: ParticipantId) {
        self.order_raw = self.log.iter().map(|entry| entry.player).collect();
        self.display_order = std::iter::once(winner)
            .chain(self.order_raw.iter().copied().filter(|p| *p != winner))
            .collect();
    }

    /// Next player in the visible queue after `after` who has not been
    /// judged on this clue.
    #[must_use]
    pub fn next_in_queue(&self, after: ParticipantId) -> Option<ParticipantId> {
        let position = self.display_order.iter().position(|p| *p == after)?;
        self.display_order
            .iter()
            .skip(position + 1)
            .copied()
            .find(|p| !self.judged.contains(p))
    }

    #[must_use]
    pub fn was_judged(&self, player: ParticipantId) -> bool {
        self.judged.contains(&player)
    }

    pub fn mark_judged(&mut self, player: ParticipantId) {
        if !self.judged.contains(&player) {
            self.judged.push(player);
        }
    }
}

/// Pick the winner of a tie and update the fairness memory.
///
/// Among the tied set (receipt order), a player still owed a win from an
/// earlier tie takes priority; otherwise the earliest buzz wins. The winner
/// leaves the memory, every other tied player enters it.
pub fn resolve_tie(
    tied: &[ParticipantId],
    not_picked_in_ties: &mut Vec<ParticipantId>,
) -> Option<ParticipantId> {
    let winner = tied
        .iter()
        .copied()
        .find(|p| not_picked_in_ties.contains(p))
        .or_else(|| tied.first().copied())?;

    not_picked_in_ties.retain(|p| *p != winner);
    for player in tied.iter().copied().filter(|p| *p != winner) {
        if !not_picked_in_ties.contains(&player) {
            not_picked_in_ties.push(player);
        }
    }
    Some(winner)
}
