//! Integration tests for the arena session protocol.
//!
//! These drive a real server over real TCP sockets and validate the
//! lobby/start/tick flow, event relaying, and departure handling.

use std::time::Duration;

use tokio::time::timeout;

use client::game::ClientGameState;
use client::network::Client;
use server::network::Server;
use shared::{Layout, Message, PlayerAction, MIN_TICK_INTERVAL};

/// Generous cap on every await; the stall watchdog alone can take 2s.
const WAIT: Duration = Duration::from_secs(5);

fn arena() -> Layout {
    Layout {
        width: 1000,
        height: 1000,
        spawns: vec![(20, 20), (20, 320), (320, 20), (320, 320)],
        obstacles: Vec::new(),
    }
}

async fn start_server(capacity: usize) -> String {
    let mut server = Server::bind("127.0.0.1:0", MIN_TICK_INTERVAL, capacity, arena())
        .await
        .expect("bind failed");
    let addr = server.local_addr().to_string();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

async fn recv(client: &mut Client) -> Message {
    timeout(WAIT, client.next_message())
        .await
        .expect("timed out waiting for server")
        .expect("read failed")
        .expect("server closed the stream")
}

/// Connects, consumes the greeting, joins, and consumes the roster snapshot.
async fn join(addr: &str, name: &str) -> (Client, Vec<shared::PlayerRecord>) {
    let mut client = Client::connect(addr).await.expect("connect failed");
    match recv(&mut client).await {
        Message::ServerIp { .. } => {}
        other => panic!("expected greeting, got {:?}", other),
    }
    client.join(name, "img.png").await.expect("join failed");
    let snapshot = match recv(&mut client).await {
        Message::AllPlayers(records) => records,
        other => panic!("expected roster snapshot, got {:?}", other),
    };
    (client, snapshot)
}

mod lobby_tests {
    use super::*;

    #[tokio::test]
    async fn greeting_then_roster_snapshot() {
        let addr = start_server(4).await;
        let (_c1, snapshot) = join(&addr, "alice").await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "alice");

        let (_c2, snapshot) = join(&addr, "bob").await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].name, "alice");
        assert_eq!(snapshot[1].name, "bob");
    }

    #[tokio::test]
    async fn earlier_clients_hear_about_joiners() {
        let addr = start_server(4).await;
        let (mut c1, _) = join(&addr, "alice").await;
        let (_c2, _) = join(&addr, "bob").await;

        match recv(&mut c1).await {
            Message::NewPlayer(record) => assert_eq!(record.name, "bob"),
            other => panic!("expected join announcement, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn lobby_departure_is_broadcast() {
        let addr = start_server(4).await;
        let (c1, _) = join(&addr, "alice").await;
        let (mut c2, _) = join(&addr, "bob").await;

        drop(c1);
        loop {
            match recv(&mut c2).await {
                Message::PlayerLeft { index } => {
                    assert_eq!(index, 0);
                    break;
                }
                Message::NewPlayer(_) => continue,
                other => panic!("unexpected message {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn start_refused_below_minimum() {
        let addr = start_server(4).await;
        let (mut c1, _) = join(&addr, "alone").await;
        c1.send(&Message::StartGame).await.unwrap();

        // No START_GAME comes back; a second joiner must arrive first.
        let (_c2, _) = join(&addr, "bob").await;
        c1.send(&Message::StartGame).await.unwrap();
        loop {
            match recv(&mut c1).await {
                Message::StartGame => break,
                Message::NewPlayer(_) => continue,
                other => panic!("unexpected message {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn late_connection_rejected_after_start() {
        let addr = start_server(4).await;
        let (mut c1, _) = join(&addr, "alice").await;
        let (mut c2, _) = join(&addr, "bob").await;
        c1.send(&Message::StartGame).await.unwrap();
        loop {
            if matches!(recv(&mut c2).await, Message::StartGame) {
                break;
            }
        }

        let mut late = Client::connect(&addr).await.unwrap();
        assert_eq!(recv(&mut late).await, Message::Rejected);
    }
}

mod game_tests {
    use super::*;

    /// Joins two clients and starts the game, leaving both readers parked
    /// right after their START_GAME.
    async fn started_pair(addr: &str) -> (Client, Client) {
        let (mut c1, _) = join(addr, "alice").await;
        let (mut c2, _) = join(addr, "bob").await;
        loop {
            if matches!(recv(&mut c1).await, Message::NewPlayer(_)) {
                break;
            }
        }
        c1.send(&Message::StartGame).await.unwrap();
        loop {
            if matches!(recv(&mut c1).await, Message::StartGame) {
                break;
            }
        }
        loop {
            if matches!(recv(&mut c2).await, Message::StartGame) {
                break;
            }
        }
        (c1, c2)
    }

    /// Reads one client's tick: everything up to and including the end
    /// marker.
    async fn read_tick(client: &mut Client) -> Vec<Message> {
        let mut messages = Vec::new();
        loop {
            let message = recv(client).await;
            let done = matches!(message, Message::EndPlayerUpdate);
            messages.push(message);
            if done {
                return messages;
            }
        }
    }

    #[tokio::test]
    async fn validated_move_relayed_to_everyone() {
        let addr = start_server(4).await;
        let (mut c1, mut c2) = started_pair(&addr).await;

        c1.send_update(&[PlayerAction::Translate { dx: 5, dy: 0 }])
            .await
            .unwrap();
        c2.send_update(&[]).await.unwrap();

        let echo = Message::PlayerTranslate {
            index: 0,
            dx: 5,
            dy: 0,
        };
        let c2_tick = read_tick(&mut c2).await;
        assert!(c2_tick.contains(&echo));

        // The originator hears its own validated action too; that is the
        // only way its mirror ever learns the verdict.
        let c1_tick = read_tick(&mut c1).await;
        assert!(c1_tick.contains(&echo));
    }

    #[tokio::test]
    async fn own_mirror_advances_from_own_echoes() {
        let addr = start_server(4).await;
        let (mut c1, mut c2) = started_pair(&addr).await;

        let mut mirror = ClientGameState::new(arena());
        mirror.apply(&Message::AllPlayers(vec![
            shared::PlayerRecord {
                name: "alice".to_string(),
                image_path: "img.png".to_string(),
                x: 0,
                y: 0,
            },
            shared::PlayerRecord {
                name: "bob".to_string(),
                image_path: "img.png".to_string(),
                x: 0,
                y: 0,
            },
        ]));
        mirror.apply(&Message::StartGame);

        // Feed alice's mirror only from alice's own stream.
        for _ in 0..3 {
            c1.send_update(&[PlayerAction::Translate { dx: 5, dy: 0 }])
                .await
                .unwrap();
            c2.send_update(&[]).await.unwrap();
            for message in read_tick(&mut c1).await {
                mirror.apply(&message);
            }
            read_tick(&mut c2).await;
        }

        assert_eq!(mirror.world().unwrap().player(0).position(), (35, 20));
    }

    #[tokio::test]
    async fn batched_kinds_all_relayed_in_one_tick() {
        let addr = start_server(4).await;
        let (mut c1, mut c2) = started_pair(&addr).await;

        c1.send_update(&[
            PlayerAction::Translate { dx: 0, dy: 5 },
            PlayerAction::Rotate { angle: 1.25 },
            PlayerAction::Shoot,
        ])
        .await
        .unwrap();
        c2.send_update(&[]).await.unwrap();

        let tick = read_tick(&mut c2).await;
        assert!(tick.contains(&Message::PlayerTranslate {
            index: 0,
            dx: 0,
            dy: 5
        }));
        assert!(tick.contains(&Message::PlayerRotate {
            index: 0,
            angle: 1.25
        }));
        assert!(tick.contains(&Message::PlayerShoot { index: 0 }));
    }

    #[tokio::test]
    async fn mirror_state_follows_relayed_events() {
        let addr = start_server(4).await;
        let (mut c1, mut c2) = started_pair(&addr).await;

        let mut mirror = ClientGameState::new(arena());
        mirror.apply(&Message::AllPlayers(vec![
            shared::PlayerRecord {
                name: "alice".to_string(),
                image_path: "img.png".to_string(),
                x: 0,
                y: 0,
            },
            shared::PlayerRecord {
                name: "bob".to_string(),
                image_path: "img.png".to_string(),
                x: 0,
                y: 0,
            },
        ]));
        mirror.apply(&Message::StartGame);

        for _ in 0..3 {
            c1.send_update(&[PlayerAction::Translate { dx: 5, dy: 0 }])
                .await
                .unwrap();
            c2.send_update(&[]).await.unwrap();
            for message in read_tick(&mut c2).await {
                mirror.apply(&message);
            }
            read_tick(&mut c1).await;
        }

        let world = mirror.world().unwrap();
        assert_eq!(world.player(0).position(), (35, 20));
    }

    #[tokio::test]
    async fn stalled_client_dropped_and_announced() {
        let addr = start_server(4).await;
        let (mut c1, mut c2) = started_pair(&addr).await;

        // c2 never reports; the watchdog drops it and tells c1.
        c1.send_update(&[PlayerAction::Translate { dx: 5, dy: 0 }])
            .await
            .unwrap();

        let mut saw_departure = false;
        for message in read_tick(&mut c1).await {
            if message == (Message::PlayerLeft { index: 1 }) {
                saw_departure = true;
            }
        }
        assert!(saw_departure, "stalled peer was never announced as gone");

        // The dropped client's stream is closed by the server.
        let closed = timeout(WAIT, c2.next_message())
            .await
            .expect("stream not closed in time")
            .expect("read failed");
        assert_eq!(closed, None);
    }

    #[tokio::test]
    async fn mid_game_disconnect_announced() {
        let addr = start_server(4).await;
        let (mut c1, c2) = started_pair(&addr).await;
        drop(c2);

        let mut saw_departure = false;
        for _ in 0..5 {
            c1.send_update(&[]).await.unwrap();
            for message in read_tick(&mut c1).await {
                if message == (Message::PlayerLeft { index: 1 }) {
                    saw_departure = true;
                }
            }
            if saw_departure {
                break;
            }
        }
        assert!(saw_departure);
    }

    #[tokio::test]
    async fn ticks_keep_flowing_for_survivors() {
        let addr = start_server(4).await;
        let (mut c1, c2) = started_pair(&addr).await;
        drop(c2);

        // The barrier must not wait on the departed connection.
        for _ in 0..5 {
            c1.send_update(&[PlayerAction::Rotate { angle: 0.5 }])
                .await
                .unwrap();
            read_tick(&mut c1).await;
        }
    }
}
