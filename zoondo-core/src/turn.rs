//! Turn record and phases

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::combat::Combat;

/// Turn phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Waiting for the second player
    Waiting,
    /// Active player may move or play a trump
    Main,
    /// A prompt from the action stack awaits input
    Action,
    /// Corner picks or a resolved combat awaiting settle
    Combat,
    /// Game over
    End,
}

/// The single turn of a game, replaced at every turn start
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub count: u32,
    pub active_player: Option<String>,
    pub passive_player: Option<String>,
    pub phase: Phase,
    pub combat: Option<Combat>,
    pub action: Option<Action>,
    pub timer: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

impl Turn {
    pub fn waiting(timer: u32) -> Self {
        Self {
            count: 0,
            active_player: None,
            passive_player: None,
            phase: Phase::Waiting,
            combat: None,
            action: None,
            timer,
            winner: None,
        }
    }

    /// Next turn record for `active` against `passive`
    pub fn next(&self, active: String, passive: Option<String>) -> Self {
        Self {
            count: self.count + 1,
            active_player: Some(active),
            passive_player: passive,
            phase: Phase::Main,
            combat: None,
            action: None,
            timer: self.timer,
            winner: None,
        }
    }

    pub fn is_active(&self, player: &str) -> bool {
        self.active_player.as_deref() == Some(player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_turn_resets_payload() {
        let mut turn = Turn::waiting(30);
        turn.phase = Phase::Action;
        turn.action = Some(Action::Custom { name: "x".into() });

        let next = turn.next("a".into(), Some("b".into()));
        assert_eq!(next.count, 1);
        assert_eq!(next.phase, Phase::Main);
        assert!(next.action.is_none());
        assert!(next.combat.is_none());
        assert!(next.is_active("a"));
        assert!(!next.is_active("b"));
        assert_eq!(next.timer, 30);
    }

    #[test]
    fn test_phase_wire_names() {
        assert_eq!(serde_json::to_string(&Phase::Combat).unwrap(), "\"combat\"");
    }
}
