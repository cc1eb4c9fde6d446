//! Connection registry: the gateway's side of the fan-out.
//!
//! Room actors hold participant ids only; this registry maps connection ids
//! to live outbound queues and room bindings, and implements
//! [`RoomPublisher`] so actors can reach their audience without owning any
//! transport state.
//!
//! Outbound delivery per connection is two-lane: the latest snapshot sits in
//! a `watch` slot (a slow consumer coalesces straight to the newest state —
//! snapshots are idempotent, so nothing is lost), while narrow events go
//! through an unbounded FIFO that is never coalesced and never dropped.
//! Events are one-shot signals (`buzzReceived`, `gameSaved`) that cannot be
//! reconstructed from a later snapshot, so the big per-connection payloads
//! ride the coalescing lane and the event lane is kept lossless; its growth
//! is bounded in practice because events are rate-limited by game actions
//! and a consumer that stops reading is evicted by the heartbeat within the
//! pong timeout.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, watch};

use crate::protocol::{ConnectionId, ParticipantId, ServerFrame};
use crate::room::RoomPublisher;
use crate::websocket::sending::encode_frame;

struct ConnectionEntry {
    room: Option<String>,
    participant: Option<ParticipantId>,
    snapshot_tx: watch::Sender<Option<Arc<str>>>,
    event_tx: mpsc::UnboundedSender<Arc<str>>,
}

/// The receiving half handed to each socket's send task.
pub struct OutboundQueues {
    pub snapshot_rx: watch::Receiver<Option<Arc<str>>>,
    pub event_rx: mpsc::UnboundedReceiver<Arc<str>>,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionEntry>,
    rooms: DashMap<String, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh connection and hand back its outbound queues.
    pub fn register(&self) -> (ConnectionId, OutboundQueues) {
        let conn = ConnectionId::new_v4();
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.connections.insert(
            conn,
            ConnectionEntry {
                room: None,
                participant: None,
                snapshot_tx,
                event_tx,
            },
        );
        (
            conn,
            OutboundQueues {
                snapshot_rx,
                event_rx,
            },
        )
    }

    /// Drop a connection, returning its binding so the caller can tell the
    /// room actor who disconnected.
    pub fn remove(&self, conn: ConnectionId) -> Option<(String, ParticipantId)> {
        let (_, entry) = self.connections.remove(&conn)?;
        if let Some(room) = &entry.room {
            if let Some(mut members) = self.rooms.get_mut(room) {
                members.remove(&conn);
            }
        }
        match (entry.room, entry.participant) {
            (Some(room), Some(participant)) => Some((room, participant)),
            _ => None,
        }
    }

    /// The `(room, participant)` binding of a connection, if it has joined.
    #[must_use]
    pub fn binding(&self, conn: ConnectionId) -> Option<(String, ParticipantId)> {
        let entry = self.connections.get(&conn)?;
        match (&entry.room, entry.participant) {
            (Some(room), Some(participant)) => Some((room.clone(), participant)),
            _ => None,
        }
    }

    /// Clear every binding for a room that is being torn down.
    pub fn drop_room(&self, room: &str) {
        let Some((_, members)) = self.rooms.remove(room) else {
            return;
        };
        for conn in members {
            if let Some(mut entry) = self.connections.get_mut(&conn) {
                entry.room = None;
                entry.participant = None;
            }
        }
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn send_event(&self, conn: ConnectionId, payload: &Arc<str>) {
        let Some(entry) = self.connections.get(&conn) else {
            return;
        };
        // Fails only once the socket's send task is gone; the connection is
        // already being torn down at that point.
        if entry.event_tx.send(Arc::clone(payload)).is_err() {
            tracing::debug!(%conn, "connection closing, outbound event discarded");
        }
    }
}

impl RoomPublisher for ConnectionRegistry {
    fn bind(&self, conn: ConnectionId, room: &str, participant: ParticipantId) {
        if let Some(mut entry) = self.connections.get_mut(&conn) {
            entry.room = Some(room.to_string());
            entry.participant = Some(participant);
        }
        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(conn);
    }

    fn unicast(&self, conn: ConnectionId, frame: &ServerFrame) {
        let Some(payload) = encode_frame(frame) else {
            return;
        };
        self.send_event(conn, &payload);
    }

    fn broadcast(&self, room: &str, frame: &ServerFrame) {
        let Some(payload) = encode_frame(frame) else {
            return;
        };
        let Some(members) = self.rooms.get(room) else {
            return;
        };
        if frame.is_snapshot() {
            for conn in members.iter() {
                if let Some(entry) = self.connections.get(conn) {
                    // watch::send_replace never blocks; the newest snapshot
                    // simply wins.
                    entry.snapshot_tx.send_replace(Some(Arc::clone(&payload)));
                }
            }
        } else {
            for conn in members.iter() {
                self.send_event(*conn, &payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ServerFrame;

    fn snapshot_frame(code: &str) -> ServerFrame {
        use crate::protocol::{GameStateView, RoomStatus, RoundKind};
        ServerFrame::GameStateUpdate {
            game_state: Box::new(GameStateView {
                room_id: code.to_string(),
                status: RoomStatus::Waiting,
                current_round: RoundKind::First,
                config: None,
                selected_clue: None,
                players: Vec::new(),
                buzzer_order: Vec::new(),
                display_buzzer_order: Vec::new(),
                current_player: None,
                judged_players: Vec::new(),
                not_picked_in_ties: Vec::new(),
                last_correct_player: None,
                host_id: None,
                final_countdown_end: None,
                final_judging_player_index: None,
                final_revealed_wager: false,
                final_revealed_answer: false,
            }),
        }
    }

    #[tokio::test]
    async fn events_reach_every_room_member() {
        let registry = ConnectionRegistry::new();
        let (a, mut queues_a) = registry.register();
        let (b, mut queues_b) = registry.register();
        let (_other, mut queues_other) = registry.register();

        registry.bind(a, "AB12", ParticipantId::new_v4());
        registry.bind(b, "AB12", ParticipantId::new_v4());

        registry.broadcast("AB12", &ServerFrame::BuzzerLocked { locked: true });

        assert!(queues_a.event_rx.recv().await.unwrap().contains("buzzerLocked"));
        assert!(queues_b.event_rx.recv().await.unwrap().contains("buzzerLocked"));
        assert!(queues_other.event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn snapshots_coalesce_to_the_newest() {
        let registry = ConnectionRegistry::new();
        let (conn, mut queues) = registry.register();
        registry.bind(conn, "AB12", ParticipantId::new_v4());

        registry.broadcast("AB12", &snapshot_frame("AB12"));
        registry.broadcast("AB12", &snapshot_frame("AB12"));

        queues.snapshot_rx.changed().await.unwrap();
        let latest = queues.snapshot_rx.borrow_and_update().clone().unwrap();
        assert!(latest.contains("gameStateUpdate"));
        // Only the newest snapshot is observable.
        assert!(!queues.snapshot_rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn unicast_hits_only_the_target() {
        let registry = ConnectionRegistry::new();
        let (a, mut queues_a) = registry.register();
        let (_b, mut queues_b) = registry.register();

        registry.unicast(a, &ServerFrame::Pong { timestamp: 7 });
        assert!(queues_a.event_rx.recv().await.unwrap().contains("pong"));
        assert!(queues_b.event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn narrow_events_survive_a_stalled_consumer() {
        let registry = ConnectionRegistry::new();
        let (conn, mut queues) = registry.register();
        let player = ParticipantId::new_v4();
        registry.bind(conn, "AB12", player);

        // The consumer reads nothing while a burst of narrow events arrives,
        // interleaved with snapshot churn. Snapshots may coalesce; events
        // may not be dropped.
        const BURST: i64 = 1_000;
        for i in 0..BURST {
            registry.broadcast(
                "AB12",
                &ServerFrame::BuzzReceived {
                    player_id: player,
                    timestamp: i,
                },
            );
            registry.broadcast("AB12", &snapshot_frame("AB12"));
        }

        for i in 0..BURST {
            let payload = queues.event_rx.recv().await.expect("event delivered");
            let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
            assert_eq!(value["type"], "buzzReceived");
            assert_eq!(value["timestamp"], i, "events arrive losslessly in order");
        }
        assert!(queues.event_rx.try_recv().is_err(), "nothing extra queued");
        // The snapshot lane coalesced to the newest state in the meantime.
        assert!(queues.snapshot_rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn remove_returns_the_binding_once() {
        let registry = ConnectionRegistry::new();
        let (conn, _queues) = registry.register();
        let participant = ParticipantId::new_v4();
        registry.bind(conn, "AB12", participant);

        assert_eq!(registry.binding(conn), Some(("AB12".to_string(), participant)));
        assert_eq!(registry.remove(conn), Some(("AB12".to_string(), participant)));
        assert_eq!(registry.remove(conn), None);
        assert_eq!(registry.binding(conn), None);
    }

    #[tokio::test]
    async fn drop_room_unbinds_without_killing_connections() {
        let registry = ConnectionRegistry::new();
        let (conn, _queues) = registry.register();
        registry.bind(conn, "AB12", ParticipantId::new_v4());

        registry.drop_room("AB12");
        assert_eq!(registry.binding(conn), None);
        assert_eq!(registry.connection_count(), 1);
    }
}
