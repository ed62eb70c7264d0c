//! WebSocket message types

use serde::{Deserialize, Serialize};
use zoondo_core::{ActionInput, ActionType, CardRef, Disposition, PlayerInfo, PlayerView, Pos};

/// What a client registers with; the server assigns the id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub tribe: String,
    #[serde(default)]
    pub disposition: Disposition,
}

impl Registration {
    pub fn into_info(self, id: &str) -> PlayerInfo {
        PlayerInfo {
            id: id.to_string(),
            name: self.name,
            tribe: self.tribe,
            disposition: self.disposition,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Register {
        player: Registration,
    },
    Move {
        card: Pos,
        destination: Pos,
    },
    ResolveAction {
        action: ActionType,
        #[serde(default)]
        value: Option<ActionInput>,
        #[serde(default)]
        discard: bool,
    },
    Trump {
        card: CardRef,
    },
    Fight {
        corner: u8,
    },
    Leave,
}

#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Registered { player_id: String, room_id: String },
    State(Box<PlayerView>),
    Message { text: String },
    Error { message: String, fatal: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_parsing() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "move", "card": {"x": 1, "y": 0}, "destination": {"x": 1, "y": 1}}"#)
                .unwrap();
        assert!(matches!(msg, ClientMessage::Move { destination, .. } if destination == Pos::new(1, 1)));

        let msg: ClientMessage = serde_json::from_str(
            r#"{"type": "resolve_action", "action": "SELECT_CELL", "value": {"kind": "cell", "x": 2, "y": 2}}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::ResolveAction { action: ActionType::SelectCell, value: Some(ActionInput::Cell(_)), discard: false }
        ));

        let msg: ClientMessage = serde_json::from_str(r#"{"type": "leave"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Leave));
    }

    #[test]
    fn test_server_message_tags() {
        let json = serde_json::to_value(ServerMessage::Error {
            message: "nope".into(),
            fatal: true,
        })
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["fatal"], true);

        let json = serde_json::to_value(ServerMessage::Registered {
            player_id: "p".into(),
            room_id: "game-1".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "registered");
        assert_eq!(json["room_id"], "game-1");
    }
}
