//! Total-view construction: one self-contained `gameState` object per
//! mutation, sufficient to render any participant's UI from scratch.

use super::state::RoomState;
use crate::protocol::{GameStateView, ParticipantRole, PlayerView, RoomStatus, SelectedClueView};

impl RoomState {
    /// Build the full snapshot for the room's current state.
    #[must_use]
    pub fn snapshot(&self) -> GameStateView {
        let selected_clue = self.selected_clue.as_ref().and_then(|(category_id, clue_id)| {
            let config = self.config.as_ref()?;
            let board = config.board(self.current_round)?;
            let category = board.categories.iter().find(|c| &c.id == category_id)?;
            let clue = category.clues.iter().find(|c| &c.id == clue_id)?;
            Some(SelectedClueView {
                category_id: category.id.clone(),
                category_name: category.name.clone(),
                clue: clue.clone(),
            })
        });

        let players = self
            .participants
            .iter()
            .filter(|p| p.role == ParticipantRole::Player)
            .map(|p| PlayerView {
                id: p.id,
                name: p.name.clone(),
                score: p.score,
                buzzed_at: p.buzzed_at,
                final_wager: self
                    .final_round
                    .as_ref()
                    .and_then(|f| f.wagers.get(&p.id).copied()),
                final_answer: self
                    .final_round
                    .as_ref()
                    .and_then(|f| f.answers.get(&p.id).cloned()),
            })
            .collect();

        let final_round = self.final_round.as_ref();
        GameStateView {
            room_id: self.code.clone(),
            status: self.status,
            current_round: self.current_round,
            config: self.config.clone(),
            selected_clue,
            players,
            buzzer_order: self.buzzer.order_raw.clone(),
            display_buzzer_order: self.buzzer.display_order.clone(),
            current_player: self.current_player,
            judged_players: self.buzzer.judged.clone(),
            not_picked_in_ties: self.not_picked_in_ties.clone(),
            last_correct_player: self.last_correct_player,
            host_id: self.host_id,
            final_countdown_end: final_round.and_then(|f| f.countdown_end),
            final_judging_player_index: final_round
                .filter(|_| self.status == RoomStatus::FinalJudging)
                .map(|f| f.judging_index),
            final_revealed_wager: final_round.is_some_and(|f| f.revealed_wager),
            final_revealed_answer: final_round.is_some_and(|f| f.revealed_answer),
        }
    }
}
