//! Integration tests for zoondo-server

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;
use zoondo_core::{Capabilities, Catalog, Phase, Pos};
use zoondo_server::dispatch::{self, Flow, Session};
use zoondo_server::protocol::ServerMessage;
use zoondo_server::{create_router, Outgoing, ServerConfig, ServerState};

fn test_state(config: &ServerConfig) -> Arc<ServerState> {
    Arc::new(ServerState::new(
        config.clone(),
        Arc::new(Catalog::sample().unwrap()),
        Capabilities::builtin(),
    ))
}

struct Client {
    session: Session,
    rx: mpsc::UnboundedReceiver<Outgoing>,
}

impl Client {
    fn connect(state: &ServerState, id: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        state.connect(id, tx.clone());
        Self {
            session: Session::new(id, tx),
            rx,
        }
    }

    async fn send(&mut self, state: &Arc<ServerState>, message: Value) -> Flow {
        dispatch::handle_text(state, &mut self.session, &message.to_string()).await
    }

    fn drain(&mut self) -> Vec<Outgoing> {
        let mut out = Vec::new();
        while let Ok(outgoing) = self.rx.try_recv() {
            out.push(outgoing);
        }
        out
    }
}

fn register(name: &str, tribe: &str, disposition: Value) -> Value {
    json!({
        "type": "register",
        "player": { "name": name, "tribe": tribe, "disposition": disposition }
    })
}

fn room_id(messages: &[Outgoing]) -> Option<String> {
    messages.iter().find_map(|m| match m {
        Outgoing::Message(ServerMessage::Registered { room_id, .. }) => Some(room_id.clone()),
        _ => None,
    })
}

fn has_state(messages: &[Outgoing]) -> bool {
    messages
        .iter()
        .any(|m| matches!(m, Outgoing::Message(ServerMessage::State(_))))
}

/// Register both players; returns the room id
async fn pair(state: &Arc<ServerState>, alice: &mut Client, bob: &mut Client, bob_disposition: Value) -> String {
    assert_eq!(
        alice.send(state, register("Alice", "sylvan", json!([["emblem", "brute"]]))).await,
        Flow::Continue
    );
    assert_eq!(
        bob.send(state, register("Bob", "ember", bob_disposition)).await,
        Flow::Continue
    );
    let alice_room = room_id(&alice.drain()).unwrap();
    let bob_room = room_id(&bob.drain()).unwrap();
    assert_eq!(alice_room, bob_room);
    alice_room
}

#[tokio::test]
async fn test_status_endpoint() {
    let config = ServerConfig::default();
    let app = create_router(&config, test_state(&config));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["status"], "ok");
    assert_eq!(json["engine"], "rust");
    assert_eq!(json["rooms"], 0);
}

#[tokio::test]
async fn test_unknown_route_without_static_dir() {
    let config = ServerConfig::default();
    let app = create_router(&config, test_state(&config));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/index.html")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_two_registrations_share_a_room() {
    let config = ServerConfig::default();
    let state = test_state(&config);
    let mut alice = Client::connect(&state, "alice");
    let mut bob = Client::connect(&state, "bob");

    alice
        .send(&state, register("Alice", "sylvan", json!([["emblem"]])))
        .await;
    let first = alice.drain();
    let room = room_id(&first).unwrap();
    assert!(room.starts_with("game-"));
    assert_eq!(state.room_count(), 1);

    bob.send(&state, register("Bob", "ember", json!([["emblem"]])))
        .await;
    let bob_messages = bob.drain();
    assert_eq!(room_id(&bob_messages), Some(room.clone()));
    assert!(has_state(&bob_messages));
    assert!(has_state(&alice.drain()));
    assert_eq!(state.room_count(), 1);

    let game = state.room(&room).unwrap();
    let game = game.game.lock().await;
    assert_eq!(game.turn().phase, Phase::Main);
    assert_eq!(game.players().len(), 2);
}

#[tokio::test]
async fn test_third_player_opens_a_new_room() {
    let config = ServerConfig::default();
    let state = test_state(&config);
    let mut alice = Client::connect(&state, "alice");
    let mut bob = Client::connect(&state, "bob");
    let mut carol = Client::connect(&state, "carol");

    pair(&state, &mut alice, &mut bob, json!([["emblem"]])).await;
    carol
        .send(&state, register("Carol", "ember", json!([["emblem"]])))
        .await;
    assert!(room_id(&carol.drain()).is_some());
    assert_eq!(state.room_count(), 2);
}

#[tokio::test]
async fn test_malformed_message_closes_the_connection() {
    let config = ServerConfig::default();
    let state = test_state(&config);
    let mut alice = Client::connect(&state, "alice");

    let flow = dispatch::handle_text(&state, &mut alice.session, "{not json").await;
    assert_eq!(flow, Flow::Close);

    let messages = alice.drain();
    assert!(matches!(
        &messages[0],
        Outgoing::Message(ServerMessage::Error { fatal: true, .. })
    ));
    assert!(matches!(messages.last(), Some(Outgoing::Close)));
}

#[tokio::test]
async fn test_request_before_register_is_fatal() {
    let config = ServerConfig::default();
    let state = test_state(&config);
    let mut alice = Client::connect(&state, "alice");

    let flow = alice.send(&state, json!({ "type": "fight", "corner": 0 })).await;
    assert_eq!(flow, Flow::Close);
}

#[tokio::test]
async fn test_illegal_move_keeps_the_connection() {
    let config = ServerConfig::default();
    let state = test_state(&config);
    let mut alice = Client::connect(&state, "alice");
    let mut bob = Client::connect(&state, "bob");
    let room = pair(&state, &mut alice, &mut bob, json!([["emblem"]])).await;

    let active = {
        let room = state.room(&room).unwrap();
        let game = room.game.lock().await;
        game.turn().active_player.clone().unwrap()
    };
    let (mover, from) = if active == "alice" {
        (&mut alice, Pos::new(0, 0))
    } else {
        (&mut bob, Pos::new(5, 5))
    };
    mover.drain();

    // emblems step one cell at a time
    let to = if from.x == 0 { Pos::new(0, 3) } else { Pos::new(5, 2) };
    let flow = mover
        .send(&state, json!({ "type": "move", "card": from, "destination": to }))
        .await;
    assert_eq!(flow, Flow::Continue);

    let messages = mover.drain();
    assert!(messages.iter().any(|m| matches!(
        m,
        Outgoing::Message(ServerMessage::Error { fatal: false, .. })
    )));
}

#[tokio::test]
async fn test_passive_player_move_is_fatal() {
    let config = ServerConfig::default();
    let state = test_state(&config);
    let mut alice = Client::connect(&state, "alice");
    let mut bob = Client::connect(&state, "bob");
    let room = pair(&state, &mut alice, &mut bob, json!([["emblem"]])).await;

    let active = {
        let room = state.room(&room).unwrap();
        let game = room.game.lock().await;
        game.turn().active_player.clone().unwrap()
    };
    let (passive, from, to) = if active == "alice" {
        (&mut bob, Pos::new(5, 5), Pos::new(5, 4))
    } else {
        (&mut alice, Pos::new(0, 0), Pos::new(0, 1))
    };

    let flow = passive
        .send(&state, json!({ "type": "move", "card": from, "destination": to }))
        .await;
    assert_eq!(flow, Flow::Close);
    assert!(matches!(passive.drain().last(), Some(Outgoing::Close)));
}

#[tokio::test]
async fn test_combat_settles_after_the_delay() {
    let config = ServerConfig {
        settle_delay: Duration::from_millis(10),
        ..ServerConfig::default()
    };
    let state = test_state(&config);
    let mut alice = Client::connect(&state, "alice");
    let mut bob = Client::connect(&state, "bob");
    // bob's guard lands on (1, 1) once mirrored
    let room = pair(
        &state,
        &mut alice,
        &mut bob,
        json!([["emblem"], [], [], [], ["", "", "", "", "guard"]]),
    )
    .await;
    let room = state.room(&room).unwrap();

    let bob_starts = room.game.lock().await.turn().is_active("bob");
    if bob_starts {
        let flow = bob
            .send(
                &state,
                json!({ "type": "move", "card": {"x": 5, "y": 5}, "destination": {"x": 5, "y": 4} }),
            )
            .await;
        assert_eq!(flow, Flow::Continue);
    }

    alice
        .send(
            &state,
            json!({ "type": "move", "card": {"x": 1, "y": 0}, "destination": {"x": 1, "y": 1} }),
        )
        .await;
    assert_eq!(room.game.lock().await.turn().phase, Phase::Combat);

    assert_eq!(alice.send(&state, json!({ "type": "fight", "corner": 0 })).await, Flow::Continue);
    assert_eq!(bob.send(&state, json!({ "type": "fight", "corner": 2 })).await, Flow::Continue);
    assert!(room.game.lock().await.is_settling());

    tokio::time::sleep(Duration::from_millis(200)).await;

    let game = room.game.lock().await;
    assert!(!game.is_settling());
    assert!(game.turn().combat.is_none());
    assert!(game.turn().is_active("bob"));
    assert_eq!(game.board().get(Pos::new(1, 1)).unwrap().card.slug, "brute");
}

#[tokio::test]
async fn test_disconnect_narrates_and_closes_empty_rooms() {
    let config = ServerConfig::default();
    let state = test_state(&config);
    let mut alice = Client::connect(&state, "alice");
    let mut bob = Client::connect(&state, "bob");
    let room = pair(&state, &mut alice, &mut bob, json!([["emblem"]])).await;
    alice.drain();

    dispatch::disconnect(&state, &bob.session).await;
    let notices: Vec<_> = alice
        .drain()
        .into_iter()
        .filter_map(|m| match m {
            Outgoing::Message(ServerMessage::Message { text }) => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(notices.len(), 1);
    assert!(state.room(&room).is_some());

    dispatch::disconnect(&state, &alice.session).await;
    assert!(state.room(&room).is_none());
    assert_eq!(state.room_count(), 0);
}
