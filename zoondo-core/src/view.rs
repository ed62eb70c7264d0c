//! Per-player projection of the game state
//!
//! A viewer sees their own cards in full and only the tribe of the
//! opponent's cards, both on the board and inside a combat awaiting corner
//! picks. Continuations never leave the engine.

use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionOptions, ActionType};
use crate::board::{Owner, Pos};
use crate::cards::{CardKind, CardRef, CornerOverride, CornerValue, MovePattern};
use crate::catalog::CardCatalog;
use crate::combat::{Combat, CombatStep, Combatant, Role, Winner};
use crate::game::Game;
use crate::moves::PathStep;
use crate::player::Player;
use crate::turn::{Phase, Turn};

/// Card identity, possibly reduced to its tribe
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub tribe: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<CardKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_type: Option<String>,
}

impl CardView {
    fn full(card: &CardRef, catalog: &dyn CardCatalog) -> Self {
        Self {
            tribe: card.tribe.clone(),
            kind: Some(card.kind),
            slug: Some(card.slug.clone()),
            original_type: catalog.card(card).and_then(|def| def.original_type.clone()),
        }
    }

    fn hidden(card: &CardRef) -> Self {
        Self {
            tribe: card.tribe.clone(),
            kind: None,
            slug: None,
            original_type: None,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.slug.is_none()
    }
}

/// A player as shown to a viewer; only the viewer's own hand is listed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub id: String,
    pub name: String,
    pub tribe: String,
    pub is_first_player: bool,
    pub trumps: Vec<CardView>,
}

impl PlayerRecord {
    fn of(player: &Player, viewer: &str, catalog: &dyn CardCatalog) -> Self {
        let own = player.id == viewer;
        Self {
            id: player.id.clone(),
            name: player.name.clone(),
            tribe: player.tribe.clone(),
            is_first_player: player.is_first_player,
            trumps: player
                .trumps
                .iter()
                .map(|card| if own { CardView::full(card, catalog) } else { CardView::hidden(card) })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellView {
    pub player: Owner,
    pub x: i8,
    pub y: i8,
    pub card: CardView,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatantView {
    pub x: i8,
    pub y: i8,
    pub card: CardView,
    pub player: String,
    pub role: Role,
    #[serde(rename = "move", default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathStep>,
    pub corner_index: Option<u8>,
    pub value: Option<CornerValue>,
    pub is_trump: bool,
    /// Effective corners when an override applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corners: Option<[CornerValue; 4]>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatView {
    pub step: CombatStep,
    pub attacker: CombatantView,
    pub defender: CombatantView,
    pub shooting: bool,
    pub winner: Option<Winner>,
    pub power_owner: Option<Role>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOptionsView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corners: Option<CornerOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moves: Option<MovePattern>,
    pub only_free_cells: bool,
    pub discardable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cells: Vec<Pos>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<Pos>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionView {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ActionOptionsView>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnView {
    pub count: u32,
    pub active_player: Option<PlayerRecord>,
    pub passive_player: Option<PlayerRecord>,
    pub phase: Phase,
    pub combat: Option<CombatView>,
    pub action: Option<ActionView>,
    pub timer: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<PlayerRecord>,
}

/// Everything one player is allowed to know
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub turn: TurnView,
    pub player: Option<PlayerRecord>,
    pub opponent: Option<PlayerRecord>,
    pub board: Vec<CellView>,
}

struct Projector<'a> {
    game: &'a Game,
    viewer: &'a str,
}

impl<'a> Projector<'a> {
    fn catalog(&self) -> &'a dyn CardCatalog {
        self.game.catalog()
    }

    fn record(&self, id: Option<&str>) -> Option<PlayerRecord> {
        let player = self.game.players().iter().find(|p| Some(p.id.as_str()) == id)?;
        Some(PlayerRecord::of(player, self.viewer, self.catalog()))
    }

    fn turn(&self, turn: &Turn) -> TurnView {
        TurnView {
            count: turn.count,
            active_player: self.record(turn.active_player.as_deref()),
            passive_player: self.record(turn.passive_player.as_deref()),
            phase: turn.phase,
            combat: turn.combat.as_ref().map(|c| self.combat(c)),
            action: turn.action.as_ref().map(|a| self.action(a)),
            timer: turn.timer,
            winner: self.record(turn.winner.as_deref()),
        }
    }

    fn combat(&self, combat: &Combat) -> CombatView {
        CombatView {
            step: combat.step,
            attacker: self.combatant(&combat.attacker, combat.step),
            defender: self.combatant(&combat.defender, combat.step),
            shooting: combat.shooting,
            winner: combat.winner,
            power_owner: combat.power_owner,
        }
    }

    fn combatant(&self, side: &Combatant, step: CombatStep) -> CombatantView {
        let visible = step == CombatStep::Resolve || side.player == self.viewer;

        let corners = match (visible, side.corners) {
            (true, Some(o)) => self.catalog().card(&side.card).map(|def| o.apply(def.corners)),
            _ => None,
        };

        CombatantView {
            x: side.x,
            y: side.y,
            card: if visible {
                CardView::full(&side.card, self.catalog())
            } else {
                CardView::hidden(&side.card)
            },
            player: side.player.clone(),
            role: side.role,
            path: side.path.clone(),
            corner_index: side.corner_index,
            value: if visible { side.value } else { None },
            is_trump: side.is_trump,
            corners,
        }
    }

    fn action(&self, action: &Action) -> ActionView {
        ActionView {
            action_type: action.action_type(),
            options: action.options().map(|o| self.options(o)),
        }
    }

    fn options(&self, options: &ActionOptions) -> ActionOptionsView {
        ActionOptionsView {
            player: self.record(options.player.as_deref()),
            corners: options.corners,
            moves: options.moves.clone(),
            only_free_cells: options.only_free_cells,
            discardable: options.discardable,
            cells: options.cells.clone(),
            card: options.card,
        }
    }

    fn board(&self) -> Vec<CellView> {
        self.game
            .board()
            .cells()
            .into_iter()
            .map(|cell| {
                let visible = match &cell.player {
                    Owner::Obstacle => true,
                    Owner::Player(id) => id == self.viewer,
                };
                CellView {
                    player: cell.player.clone(),
                    x: cell.x,
                    y: cell.y,
                    card: if visible {
                        CardView::full(&cell.card, self.catalog())
                    } else {
                        CardView::hidden(&cell.card)
                    },
                }
            })
            .collect()
    }
}

/// Build the view of `game` for `viewer`
pub fn project(game: &Game, viewer: &str) -> PlayerView {
    let projector = Projector { game, viewer };
    let opponent = game
        .players()
        .iter()
        .find(|p| p.id != viewer)
        .map(|p| p.id.as_str());

    PlayerView {
        turn: projector.turn(game.turn()),
        player: projector.record(Some(viewer)),
        opponent: projector.record(opponent),
        board: projector.board(),
    }
}
