//! Outbound events produced by a game
//!
//! The engine never talks to sockets. Everything meant for players is
//! queued here and drained by the embedder in emission order.

use serde::{Deserialize, Serialize};

use crate::view::PlayerView;

/// Who a notice is addressed to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Audience {
    Room,
    Player(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Outbound {
    /// Filtered snapshot for one seated player
    State { to: String, view: Box<PlayerView> },
    /// Narrative message
    Notice { audience: Audience, text: String },
}

impl Outbound {
    /// Whether `player` should receive this event
    pub fn is_for(&self, player: &str) -> bool {
        match self {
            Outbound::State { to, .. } => to == player,
            Outbound::Notice { audience: Audience::Room, .. } => true,
            Outbound::Notice {
                audience: Audience::Player(id),
                ..
            } => id == player,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_routing() {
        let room = Outbound::Notice {
            audience: Audience::Room,
            text: "hello".into(),
        };
        let direct = Outbound::Notice {
            audience: Audience::Player("a".into()),
            text: "psst".into(),
        };
        assert!(room.is_for("a") && room.is_for("b"));
        assert!(direct.is_for("a"));
        assert!(!direct.is_for("b"));
    }
}
