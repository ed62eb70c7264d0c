//! Client message dispatch
//!
//! Each message locks its room's game, runs one engine operation, routes
//! the drained events and, when a combat outcome starts settling, schedules
//! the follow-up after the configured delay.

use std::sync::Arc;

use tokio::sync::mpsc;
use zoondo_core::{ActionInput, Game, GameError};

use crate::protocol::{ClientMessage, Registration, ServerMessage};
use crate::state::{Outgoing, Room, ServerState};

/// What the socket loop should do after a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// One connection
pub struct Session {
    pub player_id: String,
    pub room: Option<Arc<Room>>,
    outbox: mpsc::UnboundedSender<Outgoing>,
}

impl Session {
    pub fn new(player_id: impl Into<String>, outbox: mpsc::UnboundedSender<Outgoing>) -> Self {
        Self {
            player_id: player_id.into(),
            room: None,
            outbox,
        }
    }

    fn reply(&self, message: ServerMessage) {
        let _ = self.outbox.send(Outgoing::Message(message));
    }

    fn close(&self) {
        let _ = self.outbox.send(Outgoing::Close);
    }
}

/// Parse and handle one text frame
pub async fn handle_text(state: &Arc<ServerState>, session: &mut Session, text: &str) -> Flow {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(err) => {
            tracing::warn!(player = %session.player_id, error = %err, "Malformed client message");
            session.reply(ServerMessage::Error {
                message: format!("malformed message: {err}"),
                fatal: true,
            });
            session.close();
            return Flow::Close;
        }
    };

    match handle_message(state, session, message).await {
        Ok(()) => Flow::Continue,
        Err(err) => {
            let fatal = err.is_fatal();
            session.reply(ServerMessage::Error {
                message: err.to_string(),
                fatal,
            });
            if fatal {
                tracing::warn!(player = %session.player_id, error = %err, "Closing connection");
                session.close();
                Flow::Close
            } else {
                Flow::Continue
            }
        }
    }
}

pub async fn handle_message(
    state: &Arc<ServerState>,
    session: &mut Session,
    message: ClientMessage,
) -> Result<(), GameError> {
    let player = session.player_id.clone();

    match message {
        ClientMessage::Register { player: registration } => register(state, session, registration).await,
        ClientMessage::Move { card, destination } => {
            with_game(state, session, |game| game.move_card(&player, card, destination)).await
        }
        ClientMessage::ResolveAction {
            action,
            value,
            discard,
        } => {
            let value = value.unwrap_or(ActionInput::None);
            with_game(state, session, |game| game.resolve_action(&player, action, value, discard)).await
        }
        ClientMessage::Trump { card } => with_game(state, session, |game| game.trump(&player, &card)).await,
        ClientMessage::Fight { corner } => with_game(state, session, |game| game.fight(&player, corner)).await,
        ClientMessage::Leave => with_game(state, session, |game| game.leave(&player)).await,
    }
}

/// Seat the connection in the oldest waiting room, or open a new one
async fn register(state: &Arc<ServerState>, session: &mut Session, registration: Registration) -> Result<(), GameError> {
    if session.room.is_some() {
        return Err(GameError::protocol("already registered"));
    }
    let info = registration.into_info(&session.player_id);

    if let Some(room) = state.pop_waiting() {
        let mut game = room.game.lock().await;
        if let Err(err) = game.join(&info) {
            drop(game);
            if !err.is_fatal() {
                state.requeue_waiting(&room.id);
            }
            return Err(err);
        }
        tracing::info!(room = %room.id, player = %session.player_id, "Player joined room");
        session.reply(ServerMessage::Registered {
            player_id: session.player_id.clone(),
            room_id: room.id.clone(),
        });
        let members = members(&game);
        let events = game.drain_events();
        drop(game);

        state.route(&members, events);
        session.room = Some(room);
        return Ok(());
    }

    let id = format!("game-{:08x}", rand::random::<u32>());
    let mut game = Game::new(
        id.clone(),
        &info,
        state.catalog.clone(),
        state.capabilities.clone(),
        state.config.game.clone(),
    )?;
    let events = game.drain_events();
    let members = members(&game);

    let room = Arc::new(Room::new(id.clone(), game));
    state.insert_room(room.clone());
    state.push_waiting(&id);
    tracing::info!(room = %id, player = %session.player_id, "Room created");

    session.reply(ServerMessage::Registered {
        player_id: session.player_id.clone(),
        room_id: id,
    });
    state.route(&members, events);
    session.room = Some(room);
    Ok(())
}

fn members(game: &Game) -> Vec<String> {
    game.players().iter().map(|p| p.id.clone()).collect()
}

/// Run one engine operation against the session's game
async fn with_game<F>(state: &Arc<ServerState>, session: &Session, op: F) -> Result<(), GameError>
where
    F: FnOnce(&mut Game) -> Result<(), GameError>,
{
    let room = session
        .room
        .clone()
        .ok_or_else(|| GameError::protocol("not registered"))?;

    let mut game = room.game.lock().await;
    let was_settling = game.is_settling();
    let result = op(&mut game);
    let started_settling = !was_settling && game.is_settling();
    let members = members(&game);
    let events = game.drain_events();
    drop(game);

    state.route(&members, events);
    if started_settling {
        schedule_settle(state.clone(), room);
    }
    result
}

/// Settle the room's combat once clients had time to show it
fn schedule_settle(state: Arc<ServerState>, room: Arc<Room>) {
    let delay = state.config.settle_delay;
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        let mut game = room.game.lock().await;
        if let Err(err) = game.settle() {
            tracing::warn!(room = %room.id, error = %err, "Settle failed");
        }
        let members = members(&game);
        let events = game.drain_events();
        drop(game);

        state.route(&members, events);
    });
}

/// Connection closed: narrate it and drop rooms nobody is connected to
pub async fn disconnect(state: &Arc<ServerState>, session: &Session) {
    state.disconnect(&session.player_id);
    let Some(room) = &session.room else {
        return;
    };

    let mut game = room.game.lock().await;
    if let Err(err) = game.leave(&session.player_id) {
        tracing::debug!(room = %room.id, error = %err, "Leave ignored");
    }
    let members = members(&game);
    let events = game.drain_events();
    drop(game);

    state.route(&members, events);
    if !members.iter().any(|member| state.is_connected(member)) {
        tracing::info!(room = %room.id, "Room closed");
        state.remove_room(&room.id);
    }
}
