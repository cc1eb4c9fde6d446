//! The per-room actor shell.
//!
//! One tokio task owns the [`RoomState`]; everything else talks to it
//! through the mailbox, so all mutations are serialised by construction.
//! Timers and persistence run in spawned tasks that post commands back to
//! the mailbox — the state machine never awaits anything.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, Duration, Instant};

use super::state::{Effect, Now, RoomHealth, RoomState, RoomTimer, RoomTimings};
use super::RoomPublisher;
use crate::protocol::{ClientFrame, ConnectionId, ParticipantId, ServerFrame};
use crate::store::GameStore;

const MAILBOX_CAPACITY: usize = 128;

/// Everything a room actor can be asked to do.
#[derive(Debug)]
pub enum RoomCommand {
    /// A parsed client frame, tagged with the sender's connection binding.
    Frame {
        conn: ConnectionId,
        sender: Option<ParticipantId>,
        frame: ClientFrame,
    },
    /// Transport-level disconnect of a bound participant.
    Disconnected { participant: ParticipantId },
    /// A scheduled single-shot timer fired.
    Timer(RoomTimer),
    /// A save launched from this room completed.
    SaveFinished {
        conn: ConnectionId,
        result: Result<String, String>,
    },
    /// Reaper probe.
    Health { reply: oneshot::Sender<RoomHealth> },
    /// Close the room; the mailbox drains no further commands.
    Shutdown,
}

/// Cheap, cloneable address of a room actor.
#[derive(Clone)]
pub struct RoomHandle {
    code: String,
    tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Enqueue a command; `false` means the actor is gone.
    pub async fn send(&self, command: RoomCommand) -> bool {
        self.tx.send(command).await.is_ok()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Ask the actor for its health report. `None` when the actor is gone
    /// or shutting down.
    pub async fn health(&self) -> Option<RoomHealth> {
        let (reply, rx) = oneshot::channel();
        if !self.send(RoomCommand::Health { reply }).await {
            return None;
        }
        rx.await.ok()
    }
}

/// Spawn a new room actor and return its handle.
pub fn spawn_room(
    code: String,
    timings: RoomTimings,
    publisher: Arc<dyn RoomPublisher>,
    store: Arc<dyn GameStore>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
    let state = RoomState::new(code.clone(), timings, Utc::now());
    let handle = RoomHandle {
        code: code.clone(),
        tx: tx.clone(),
    };
    tokio::spawn(run_room(state, rx, tx, publisher, store));
    tracing::info!(room = %code, "room actor spawned");
    handle
}

async fn run_room(
    mut state: RoomState,
    mut rx: mpsc::Receiver<RoomCommand>,
    tx: mpsc::Sender<RoomCommand>,
    publisher: Arc<dyn RoomPublisher>,
    store: Arc<dyn GameStore>,
) {
    let origin = Instant::now();
    while let Some(command) = rx.recv().await {
        let now = Now {
            mono_ms: origin.elapsed().as_millis() as u64,
            wall_ms: Utc::now().timestamp_millis(),
        };
        let effects = match command {
            RoomCommand::Frame {
                conn,
                sender,
                frame,
            } => state.handle_frame(conn, sender, frame, now),
            RoomCommand::Disconnected { participant } => {
                state.handle_disconnect(participant, now);
                Vec::new()
            }
            RoomCommand::Timer(timer) => state.handle_timer(timer, now),
            RoomCommand::SaveFinished { conn, result } => state.handle_save_result(conn, result),
            RoomCommand::Health { reply } => {
                let _ = reply.send(state.health());
                Vec::new()
            }
            RoomCommand::Shutdown => {
                publisher.broadcast(
                    state.code(),
                    &ServerFrame::Error {
                        message: "room closed".to_string(),
                    },
                );
                break;
            }
        };
        execute_effects(effects, &state, &tx, &publisher, &store);
    }
    tracing::info!(room = %state.code(), "room actor stopped");
}

fn execute_effects(
    effects: Vec<Effect>,
    state: &RoomState,
    tx: &mpsc::Sender<RoomCommand>,
    publisher: &Arc<dyn RoomPublisher>,
    store: &Arc<dyn GameStore>,
) {
    for effect in effects {
        match effect {
            Effect::Unicast { conn, frame } => publisher.unicast(conn, &frame),
            Effect::Broadcast(frame) => publisher.broadcast(state.code(), &frame),
            Effect::Bind { conn, participant } => publisher.bind(conn, state.code(), participant),
            Effect::Schedule { timer, delay_ms } => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    sleep(Duration::from_millis(delay_ms)).await;
                    // The state machine drops stale epochs, so a timer that
                    // outlives its clue is harmless.
                    let _ = tx.send(RoomCommand::Timer(timer)).await;
                });
            }
            Effect::Save { conn, config } => {
                let tx = tx.clone();
                let store = Arc::clone(store);
                tokio::spawn(async move {
                    let result = store
                        .save(*config)
                        .await
                        .map_err(|err| err.to_string());
                    let _ = tx.send(RoomCommand::SaveFinished { conn, result }).await;
                });
            }
        }
    }
}
