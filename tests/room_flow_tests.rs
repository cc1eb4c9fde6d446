//! Regular-play scenarios driven through a live room actor with the tokio
//! clock paused: selection, the reading delay, the buzzer race, and the
//! judging cascade all run against real timers.

mod common;

use std::sync::Arc;

use buzzline_server::protocol::{
    ClientFrame, ConnectionId, GameStateView, ParticipantId, ParticipantRole, RoomStatus,
    ServerFrame,
};
use buzzline_server::room::{spawn_room, RoomCommand, RoomHandle, RoomTimings};
use buzzline_server::store::DocumentStore;
use common::{Delivery, RecordingPublisher};
use tokio::sync::mpsc;
use tokio::time::{advance, timeout, Duration};

type FrameRx = mpsc::UnboundedReceiver<(Delivery, ServerFrame)>;

async fn next_frame(rx: &mut FrameRx) -> (Delivery, ServerFrame) {
    timeout(Duration::from_secs(30), rx.recv())
        .await
        .expect("frame within timeout")
        .expect("publisher channel open")
}

/// Wait for the next room snapshot matching `predicate`.
async fn await_snapshot<F>(rx: &mut FrameRx, predicate: F) -> GameStateView
where
    F: Fn(&GameStateView) -> bool,
{
    loop {
        let (_, frame) = next_frame(rx).await;
        if let ServerFrame::GameStateUpdate { game_state } = frame {
            if predicate(&game_state) {
                return *game_state;
            }
        }
    }
}

async fn send_frame(
    room: &RoomHandle,
    conn: ConnectionId,
    sender: Option<ParticipantId>,
    frame: ClientFrame,
) {
    assert!(
        room.send(RoomCommand::Frame {
            conn,
            sender,
            frame
        })
        .await,
        "room actor alive"
    );
}

async fn join(
    room: &RoomHandle,
    rx: &mut FrameRx,
    name: &str,
    role: ParticipantRole,
) -> ParticipantId {
    let conn = ConnectionId::new_v4();
    send_frame(
        room,
        conn,
        None,
        ClientFrame::JoinRoom {
            room_id: Some(room.code().to_string()),
            player_name: Some(name.to_string()),
            role,
            player_id: None,
        },
    )
    .await;
    loop {
        let (delivery, frame) = next_frame(rx).await;
        if let ServerFrame::RoomJoined { player_id, .. } = frame {
            assert_eq!(delivery, Delivery::To(conn));
            return player_id;
        }
    }
}

/// Spawn a room with a host and three players, game loaded and started.
async fn room_in_play() -> (RoomHandle, FrameRx, ParticipantId, Vec<ParticipantId>) {
    let (publisher, mut rx) = RecordingPublisher::new();
    let room = spawn_room(
        "IT01".to_string(),
        RoomTimings::default(),
        publisher,
        Arc::new(DocumentStore::new()),
    );

    let host = join(&room, &mut rx, "Host", ParticipantRole::Host).await;
    let mut players = Vec::new();
    for name in ["Anna", "Bram", "Cleo"] {
        players.push(join(&room, &mut rx, name, ParticipantRole::Player).await);
    }

    let conn = ConnectionId::new_v4();
    send_frame(
        &room,
        conn,
        Some(host),
        ClientFrame::LoadGame {
            game_config: Box::new(common::game_config()),
        },
    )
    .await;
    await_snapshot(&mut rx, |s| s.status == RoomStatus::Ready).await;

    send_frame(&room, conn, Some(host), ClientFrame::StartGame).await;
    await_snapshot(&mut rx, |s| s.status == RoomStatus::Selecting).await;

    (room, rx, host, players)
}

#[tokio::test(start_paused = true)]
async fn selection_unlocks_after_the_reading_delay() {
    let (room, mut rx, host, _) = room_in_play().await;

    send_frame(
        &room,
        ConnectionId::new_v4(),
        Some(host),
        ClientFrame::SelectClue {
            category_id: "first-cat-0".to_string(),
            clue_id: "first-clue-0-1".to_string(),
        },
    )
    .await;

    let revealed = await_snapshot(&mut rx, |s| s.status == RoomStatus::ClueRevealed).await;
    let selected = revealed.selected_clue.expect("clue on screen");
    assert_eq!(selected.clue.value, 200);
    assert!(selected.clue.revealed);

    // The paused clock auto-advances to the scheduled unlock.
    let buzzing = await_snapshot(&mut rx, |s| s.status == RoomStatus::Buzzing).await;
    assert!(buzzing.selected_clue.is_some());
}

#[tokio::test(start_paused = true)]
async fn buzzer_race_resolves_with_tie_fairness() {
    let (room, mut rx, host, players) = room_in_play().await;
    let (a, b, c) = (players[0], players[1], players[2]);

    send_frame(
        &room,
        ConnectionId::new_v4(),
        Some(host),
        ClientFrame::SelectClue {
            category_id: "first-cat-0".to_string(),
            clue_id: "first-clue-0-1".to_string(),
        },
    )
    .await;
    await_snapshot(&mut rx, |s| s.status == RoomStatus::Buzzing).await;

    // A and B buzz 100ms apart (inside the tie window); C buzzes at 260ms,
    // just outside it.
    send_frame(&room, ConnectionId::new_v4(), Some(a), ClientFrame::Buzz { timestamp: 1 }).await;
    await_snapshot(&mut rx, |s| s.players.iter().any(|p| p.id == a && p.buzzed_at.is_some())).await;
    advance(Duration::from_millis(100)).await;
    send_frame(&room, ConnectionId::new_v4(), Some(b), ClientFrame::Buzz { timestamp: 2 }).await;
    await_snapshot(&mut rx, |s| s.players.iter().any(|p| p.id == b && p.buzzed_at.is_some())).await;
    advance(Duration::from_millis(160)).await;
    send_frame(&room, ConnectionId::new_v4(), Some(c), ClientFrame::Buzz { timestamp: 3 }).await;

    let resolved = await_snapshot(&mut rx, |s| s.status == RoomStatus::Answering).await;
    assert_eq!(resolved.current_player, Some(a));
    assert_eq!(resolved.not_picked_in_ties, vec![b]);
    assert_eq!(resolved.display_buzzer_order, vec![a, b, c]);

    // Rematch on a fresh clue: the owed player wins this time.
    send_frame(&room, ConnectionId::new_v4(), Some(host), ClientFrame::ReturnToBoard).await;
    await_snapshot(&mut rx, |s| s.status == RoomStatus::Selecting).await;
    send_frame(
        &room,
        ConnectionId::new_v4(),
        Some(host),
        ClientFrame::SelectClue {
            category_id: "first-cat-1".to_string(),
            clue_id: "first-clue-1-1".to_string(),
        },
    )
    .await;
    await_snapshot(&mut rx, |s| s.status == RoomStatus::Buzzing).await;

    send_frame(&room, ConnectionId::new_v4(), Some(a), ClientFrame::Buzz { timestamp: 4 }).await;
    await_snapshot(&mut rx, |s| s.players.iter().any(|p| p.id == a && p.buzzed_at.is_some())).await;
    advance(Duration::from_millis(50)).await;
    send_frame(&room, ConnectionId::new_v4(), Some(b), ClientFrame::Buzz { timestamp: 5 }).await;

    let resolved = await_snapshot(&mut rx, |s| s.status == RoomStatus::Answering).await;
    assert_eq!(resolved.current_player, Some(b));
    assert_eq!(resolved.not_picked_in_ties, vec![a]);
}

#[tokio::test(start_paused = true)]
async fn incorrect_cascade_walks_the_queue_and_scores() {
    let (room, mut rx, host, players) = room_in_play().await;
    let (p1, p2, p3) = (players[0], players[1], players[2]);
    let host_conn = ConnectionId::new_v4();

    send_frame(
        &room,
        host_conn,
        Some(host),
        ClientFrame::SelectClue {
            category_id: "first-cat-0".to_string(),
            clue_id: "first-clue-0-2".to_string(),
        },
    )
    .await;
    await_snapshot(&mut rx, |s| s.status == RoomStatus::Buzzing).await;

    for (i, player) in [p1, p2, p3].into_iter().enumerate() {
        send_frame(
            &room,
            ConnectionId::new_v4(),
            Some(player),
            ClientFrame::Buzz { timestamp: i as i64 },
        )
        .await;
        advance(Duration::from_millis(20)).await;
    }
    let resolved = await_snapshot(&mut rx, |s| s.status == RoomStatus::Answering).await;
    assert_eq!(resolved.current_player, Some(p1));

    send_frame(
        &room,
        host_conn,
        Some(host),
        ClientFrame::JudgeAnswer {
            player_id: p1,
            correct: false,
        },
    )
    .await;
    let snapshot = await_snapshot(&mut rx, |s| s.current_player == Some(p2)).await;
    let score = |s: &GameStateView, id: ParticipantId| {
        s.players.iter().find(|p| p.id == id).unwrap().score
    };
    assert_eq!(score(&snapshot, p1), -400);

    send_frame(
        &room,
        host_conn,
        Some(host),
        ClientFrame::JudgeAnswer {
            player_id: p2,
            correct: false,
        },
    )
    .await;
    await_snapshot(&mut rx, |s| s.current_player == Some(p3)).await;

    send_frame(
        &room,
        host_conn,
        Some(host),
        ClientFrame::JudgeAnswer {
            player_id: p3,
            correct: true,
        },
    )
    .await;
    let judged = await_snapshot(&mut rx, |s| s.status == RoomStatus::Judging).await;
    assert_eq!(score(&judged, p3), 400);
    assert_eq!(judged.last_correct_player, Some(p3));

    send_frame(&room, host_conn, Some(host), ClientFrame::ReturnToBoard).await;
    let board = await_snapshot(&mut rx, |s| s.status == RoomStatus::Selecting).await;
    assert!(board.selected_clue.is_none());
}

#[tokio::test(start_paused = true)]
async fn save_acknowledges_with_the_game_id() {
    let (room, mut rx, host, _) = room_in_play().await;
    let conn = ConnectionId::new_v4();

    send_frame(&room, conn, Some(host), ClientFrame::SaveGame { game_config: None }).await;
    loop {
        let (delivery, frame) = next_frame(&mut rx).await;
        if let ServerFrame::GameSaved { game_id } = frame {
            assert_eq!(delivery, Delivery::To(conn));
            assert_eq!(game_id, "integration-game");
            break;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn role_violations_answer_only_the_caller() {
    let (room, mut rx, _, players) = room_in_play().await;
    let conn = ConnectionId::new_v4();

    send_frame(
        &room,
        conn,
        Some(players[0]),
        ClientFrame::SelectClue {
            category_id: "first-cat-0".to_string(),
            clue_id: "first-clue-0-1".to_string(),
        },
    )
    .await;

    let (delivery, frame) = next_frame(&mut rx).await;
    assert_eq!(delivery, Delivery::To(conn));
    match frame {
        ServerFrame::Error { message } => assert!(message.contains("host")),
        other => panic!("expected an error frame, got {other:?}"),
    }
}
