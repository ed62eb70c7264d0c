//! Action stack: pending follow-up steps within a turn
//!
//! Entries are consumed in FIFO order. Paused interactions are stored as
//! plain data ([`Continuation`]) so the whole turn stays inspectable and
//! serializable; the engine resumes them through the capability registry.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::board::Pos;
use crate::cards::{CardRef, CornerOverride, MovePattern};
use crate::combat::{Combatant, Winner};

/// Discriminant of an [`Action`], as named on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    #[serde(rename = "SELECT_CELL")]
    SelectCell,
    #[serde(rename = "SELECT_CARD")]
    SelectCard,
    #[serde(rename = "MOVE_CARD")]
    MoveCard,
    #[serde(rename = "power")]
    Power,
    #[serde(rename = "win")]
    Win,
    #[serde(rename = "custom")]
    Custom,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ActionType::SelectCell => "SELECT_CELL",
            ActionType::SelectCard => "SELECT_CARD",
            ActionType::MoveCard => "MOVE_CARD",
            ActionType::Power => "power",
            ActionType::Win => "win",
            ActionType::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Configuration read by the phase handler while a prompt is pending
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOptions {
    /// Player expected to answer; defaults to the active player
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
    /// Corner override applied to this player's side of a combat
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corners: Option<CornerOverride>,
    /// Movement pattern replacing the card's own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moves: Option<MovePattern>,
    #[serde(default)]
    pub only_free_cells: bool,
    #[serde(default)]
    pub discardable: bool,
    /// Selectable cells; empty means unrestricted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cells: Vec<Pos>,
    /// Only this card may be moved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<Pos>,
}

/// A card acting through a capability
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub player: String,
    pub card: CardRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<Pos>,
}

impl From<&Combatant> for Actor {
    fn from(side: &Combatant) -> Self {
        Self {
            player: side.player.clone(),
            card: side.card.clone(),
            pos: (!side.is_trump).then(|| side.pos()),
        }
    }
}

/// What a capability is acting on
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionContext {
    pub source: Actor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Actor>,
}

/// Resumable state of a paused capability
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Continuation {
    /// Capability to resume
    pub resolver: String,
    /// Stage inside the capability
    pub step: u8,
    pub context: ActionContext,
    /// Cells collected by earlier stages
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cells: Vec<Pos>,
}

impl Continuation {
    pub fn new(resolver: &str, step: u8, context: ActionContext) -> Self {
        Self {
            resolver: resolver.to_string(),
            step,
            context,
            cells: Vec::new(),
        }
    }

    /// Next stage, remembering one more cell
    pub fn advance(&self, cell: Option<Pos>) -> Self {
        let mut next = self.clone();
        next.step += 1;
        next.cells.extend(cell);
        next
    }
}

/// Input delivered to a continuation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionInput {
    None,
    Cell(Pos),
    Card(CardRef),
    /// A card finished a move (possibly after a combat) at `to`
    Moved { from: Pos, to: Pos },
    /// A ranged combat finished
    Combat { winner: Option<Winner> },
}

/// Prompt awaiting player input
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub options: ActionOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Continuation>,
}

impl Prompt {
    pub fn new(options: ActionOptions, next: Option<Continuation>) -> Self {
        Self { options, next }
    }
}

/// Action stack entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    #[serde(rename = "SELECT_CELL")]
    SelectCell(Prompt),
    #[serde(rename = "SELECT_CARD")]
    SelectCard(Prompt),
    #[serde(rename = "MOVE_CARD")]
    MoveCard(Prompt),
    #[serde(rename = "power")]
    Power { source: Combatant, target: Combatant },
    #[serde(rename = "win")]
    Win { winner: String },
    /// Extension point; skipped by the engine
    #[serde(rename = "custom")]
    Custom { name: String },
}

impl Action {
    pub fn action_type(&self) -> ActionType {
        match self {
            Action::SelectCell(_) => ActionType::SelectCell,
            Action::SelectCard(_) => ActionType::SelectCard,
            Action::MoveCard(_) => ActionType::MoveCard,
            Action::Power { .. } => ActionType::Power,
            Action::Win { .. } => ActionType::Win,
            Action::Custom { .. } => ActionType::Custom,
        }
    }

    pub fn prompt(&self) -> Option<&Prompt> {
        match self {
            Action::SelectCell(p) | Action::SelectCard(p) | Action::MoveCard(p) => Some(p),
            _ => None,
        }
    }

    pub fn options(&self) -> Option<&ActionOptions> {
        self.prompt().map(|p| &p.options)
    }
}

/// FIFO queue of pending actions
#[derive(Clone, Debug, Default)]
pub struct ActionStack {
    entries: VecDeque<Action>,
}

impl ActionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue at the back
    pub fn push(&mut self, action: Action) {
        self.entries.push_back(action);
    }

    /// Take the front entry
    pub fn shift(&mut self) -> Option<Action> {
        self.entries.pop_front()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.entries.iter()
    }
}
