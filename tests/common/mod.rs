//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use buzzline_server::game::{Board, Category, Clue, FinalClue, GameConfig, GameMetadata};
use buzzline_server::protocol::{ConnectionId, ParticipantId, ServerFrame};
use buzzline_server::room::RoomPublisher;
use chrono::Utc;
use tokio::sync::mpsc;

/// Where a captured frame was headed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    To(ConnectionId),
    Room(String),
}

/// A `RoomPublisher` that records every frame for the test to await.
pub struct RecordingPublisher {
    tx: mpsc::UnboundedSender<(Delivery, ServerFrame)>,
}

impl RecordingPublisher {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<(Delivery, ServerFrame)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl RoomPublisher for RecordingPublisher {
    fn bind(&self, _conn: ConnectionId, _room: &str, _participant: ParticipantId) {}

    fn unicast(&self, conn: ConnectionId, frame: &ServerFrame) {
        let _ = self.tx.send((Delivery::To(conn), frame.clone()));
    }

    fn broadcast(&self, room: &str, frame: &ServerFrame) {
        let _ = self.tx.send((Delivery::Room(room.to_string()), frame.clone()));
    }
}

pub fn board(prefix: &str, base_value: u32) -> Board {
    let categories = (0..6)
        .map(|c| Category {
            id: format!("{prefix}-cat-{c}"),
            name: format!("Category {c}"),
            clues: (1..=5u32)
                .map(|i| Clue {
                    id: format!("{prefix}-clue-{c}-{i}"),
                    category_id: format!("{prefix}-cat-{c}"),
                    value: i * base_value,
                    prompt_text: format!("Prompt number {i} in category {c}"),
                    expected_response: format!("What is answer {c}-{i}?"),
                    revealed: false,
                    answered: false,
                })
                .collect(),
        })
        .collect();
    Board { categories }
}

pub fn game_config() -> GameConfig {
    GameConfig {
        id: "integration-game".to_string(),
        first_round: board("first", 200),
        double_round: board("double", 400),
        final_round: FinalClue {
            category_name: "Rivers".to_string(),
            prompt_text: "This river drains more water than the next seven combined".to_string(),
            expected_response: "What is the Amazon?".to_string(),
        },
        created_at: Utc::now(),
        metadata: GameMetadata {
            topics: vec!["geography".to_string()],
            difficulty: Some("medium".to_string()),
        },
        saved_at: None,
        saved_by: None,
    }
}
