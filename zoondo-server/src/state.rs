//! Server state management
//!
//! Rooms map to games; connections map player ids to outbound channels.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use tokio::sync::{mpsc, Mutex};
use zoondo_core::{Capabilities, CardCatalog, Game, Outbound};

use crate::protocol::ServerMessage;
use crate::ServerConfig;

/// Frame queued for a connection's writer task
#[derive(Clone, Debug)]
pub enum Outgoing {
    Message(ServerMessage),
    Close,
}

/// A room and its game
pub struct Room {
    pub id: String,
    pub game: Mutex<Game>,
}

impl Room {
    pub fn new(id: String, game: Game) -> Self {
        Self {
            id,
            game: Mutex::new(game),
        }
    }
}

/// Server-wide shared state
pub struct ServerState {
    pub config: ServerConfig,
    pub catalog: Arc<dyn CardCatalog>,
    pub capabilities: Arc<Capabilities>,
    rooms: RwLock<HashMap<String, Arc<Room>>>,
    /// Rooms waiting for a second player, oldest first
    lobby: RwLock<VecDeque<String>>,
    connections: RwLock<HashMap<String, mpsc::UnboundedSender<Outgoing>>>,
}

impl ServerState {
    pub fn new(config: ServerConfig, catalog: Arc<dyn CardCatalog>, capabilities: Capabilities) -> Self {
        Self {
            config,
            catalog,
            capabilities: Arc::new(capabilities),
            rooms: RwLock::new(HashMap::new()),
            lobby: RwLock::new(VecDeque::new()),
            connections: RwLock::new(HashMap::new()),
        }
    }

    // ========================================================================
    // Rooms
    // ========================================================================

    pub fn room(&self, id: &str) -> Option<Arc<Room>> {
        self.rooms.read().ok()?.get(id).cloned()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().map(|rooms| rooms.len()).unwrap_or(0)
    }

    pub fn insert_room(&self, room: Arc<Room>) {
        if let Ok(mut rooms) = self.rooms.write() {
            rooms.insert(room.id.clone(), room);
        }
    }

    pub fn remove_room(&self, id: &str) {
        if let Ok(mut rooms) = self.rooms.write() {
            rooms.remove(id);
        }
        if let Ok(mut lobby) = self.lobby.write() {
            lobby.retain(|waiting| waiting != id);
        }
    }

    /// Take the oldest room still waiting for an opponent
    pub fn pop_waiting(&self) -> Option<Arc<Room>> {
        loop {
            let id = self.lobby.write().ok()?.pop_front()?;
            if let Some(room) = self.room(&id) {
                return Some(room);
            }
        }
    }

    pub fn push_waiting(&self, id: &str) {
        if let Ok(mut lobby) = self.lobby.write() {
            lobby.push_back(id.to_string());
        }
    }

    /// Put a room back at the head of the lobby after a failed join
    pub fn requeue_waiting(&self, id: &str) {
        if let Ok(mut lobby) = self.lobby.write() {
            lobby.push_front(id.to_string());
        }
    }

    // ========================================================================
    // Connections
    // ========================================================================

    pub fn connect(&self, player: &str, sender: mpsc::UnboundedSender<Outgoing>) {
        if let Ok(mut connections) = self.connections.write() {
            connections.insert(player.to_string(), sender);
        }
    }

    pub fn disconnect(&self, player: &str) {
        if let Ok(mut connections) = self.connections.write() {
            connections.remove(player);
        }
    }

    pub fn is_connected(&self, player: &str) -> bool {
        self.connections
            .read()
            .map(|connections| connections.contains_key(player))
            .unwrap_or(false)
    }

    /// Send to a player; players without a live connection are skipped
    pub fn send(&self, player: &str, message: ServerMessage) {
        let Ok(connections) = self.connections.read() else {
            return;
        };
        if let Some(sender) = connections.get(player) {
            let _ = sender.send(Outgoing::Message(message));
        }
    }

    /// Deliver drained game events to the members of a room
    pub fn route(&self, members: &[String], events: Vec<Outbound>) {
        for event in events {
            for member in members.iter().filter(|member| event.is_for(member.as_str())) {
                let message = match &event {
                    Outbound::State { view, .. } => ServerMessage::State(view.clone()),
                    Outbound::Notice { text, .. } => ServerMessage::Message { text: text.clone() },
                };
                self.send(member, message);
            }
        }
    }
}
