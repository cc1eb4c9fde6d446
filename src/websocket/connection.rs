use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::time::{Duration, Instant, MissedTickBehavior};

use super::connections::OutboundQueues;
use crate::protocol::{
    parse_client_frame, ClientFrame, ConnectionId, ParticipantRole, RoomError, ServerFrame,
};
use crate::room::{RoomCommand, RoomHandle, RoomPublisher};
use crate::server::GameServer;

pub(super) async fn handle_socket(socket: WebSocket, server: Arc<GameServer>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (conn, queues) = server.connections().register();
    tracing::info!(%conn, "websocket connection established");

    let ping_interval = Duration::from_millis(server.config().server.ping_interval_ms);
    let pong_timeout = Duration::from_millis(server.config().server.pong_timeout_ms);

    // Outbound: latest snapshot, queued events, and heartbeat pings.
    let send_task = tokio::spawn(async move {
        let OutboundQueues {
            mut snapshot_rx,
            mut event_rx,
        } = queues;
        let mut heartbeat = tokio::time::interval(ping_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = snapshot_rx.changed() => {
                    // The registry entry is gone once this errors.
                    if changed.is_err() {
                        break;
                    }
                    let payload = snapshot_rx.borrow_and_update().clone();
                    if let Some(json) = payload {
                        if ws_tx.send(Message::Text(json.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                }
                event = event_rx.recv() => {
                    let Some(json) = event else { break };
                    if ws_tx.send(Message::Text(json.to_string().into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    let stamp = Utc::now().timestamp_millis().to_be_bytes();
                    if ws_tx.send(Message::Ping(stamp.to_vec().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Inbound: frames refresh the liveness deadline; silence past the pong
    // timeout evicts the connection, because a partitioned peer will not
    // signal closure on its own.
    let receive_server = server.clone();
    let receive_task = tokio::spawn(async move {
        let mut last_heard = Instant::now();
        loop {
            let deadline = last_heard + pong_timeout;
            let message = tokio::select! {
                message = ws_rx.next() => message,
                () = tokio::time::sleep_until(deadline) => {
                    tracing::info!(%conn, "heartbeat timed out, evicting connection");
                    break;
                }
            };
            let Some(message) = message else { break };
            let message = match message {
                Ok(message) => message,
                Err(err) => {
                    tracing::warn!(%conn, error = %err, "websocket error");
                    break;
                }
            };
            last_heard = Instant::now();

            match message {
                Message::Text(text) => handle_text(&receive_server, conn, text.as_str()).await,
                Message::Binary(_) => {
                    receive_server.connections().unicast(
                        conn,
                        &RoomError::Protocol("binary frames are not supported".to_string())
                            .frame(),
                    );
                }
                // Pong already refreshed the deadline above; axum answers
                // peer pings for us.
                Message::Pong(_) | Message::Ping(_) => {}
                Message::Close(_) => {
                    tracing::info!(%conn, "websocket connection closed by peer");
                    break;
                }
            }
        }
    });

    // Whichever half dies first takes the connection down.
    tokio::select! {
        _ = send_task => {}
        _ = receive_task => {}
    }

    if let Some((room, participant)) = server.connections().remove(conn) {
        if let Some(handle) = server.lookup(&room) {
            let _ = handle.send(RoomCommand::Disconnected { participant }).await;
        }
    }
    tracing::info!(%conn, "websocket connection closed");
}

async fn handle_text(server: &Arc<GameServer>, conn: ConnectionId, text: &str) {
    let registry = server.connections();

    let max_size = server.config().server.max_message_size;
    if text.len() > max_size {
        tracing::warn!(%conn, size = text.len(), max = max_size, "frame exceeds size limit");
        registry.unicast(
            conn,
            &RoomError::Protocol(format!(
                "message too large ({} bytes, max {max_size})",
                text.len()
            ))
            .frame(),
        );
        return;
    }

    let frame = match parse_client_frame(text) {
        Ok(frame) => frame,
        Err(err) => {
            tracing::debug!(%conn, error = %err, "rejected client frame");
            registry.unicast(conn, &err.frame());
            return;
        }
    };

    match frame {
        // Answered straight from the gateway; no room involvement.
        ClientFrame::Ping { timestamp } => {
            registry.unicast(conn, &ServerFrame::Pong { timestamp });
        }
        ClientFrame::JoinRoom { ref room_id, role, .. } => {
            if registry.binding(conn).is_some() {
                registry.unicast(
                    conn,
                    &RoomError::validation("this connection has already joined a room").frame(),
                );
                return;
            }
            let handle = match resolve_room(server, room_id.as_deref(), role) {
                Ok(handle) => handle,
                Err(err) => {
                    registry.unicast(conn, &err.frame());
                    return;
                }
            };
            if !handle
                .send(RoomCommand::Frame {
                    conn,
                    sender: None,
                    frame,
                })
                .await
            {
                registry.unicast(conn, &RoomError::not_found("room").frame());
            }
        }
        frame => {
            let Some((room, participant)) = registry.binding(conn) else {
                registry.unicast(
                    conn,
                    &RoomError::validation("join a room before sending game messages").frame(),
                );
                return;
            };
            let Some(handle) = server.lookup(&room) else {
                registry.unicast(conn, &RoomError::not_found(format!("room {room}")).frame());
                return;
            };
            if !handle
                .send(RoomCommand::Frame {
                    conn,
                    sender: Some(participant),
                    frame,
                })
                .await
            {
                registry.unicast(conn, &RoomError::not_found(format!("room {room}")).frame());
            }
        }
    }
}

/// Hosts may create (optionally minting a code); everyone else must name a
/// live room.
fn resolve_room(
    server: &Arc<GameServer>,
    room_id: Option<&str>,
    role: ParticipantRole,
) -> Result<RoomHandle, RoomError> {
    match role {
        ParticipantRole::Host => server.create_or_join_host(room_id),
        ParticipantRole::Player | ParticipantRole::Viewer => {
            let code = room_id
                .ok_or_else(|| RoomError::validation("room code required"))?;
            server
                .lookup(code)
                .ok_or_else(|| RoomError::not_found(format!("room {}", code.to_ascii_uppercase())))
        }
    }
}
