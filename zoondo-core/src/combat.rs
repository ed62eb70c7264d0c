//! Corner-based combat resolution
//!
//! Each player commits a corner index for the *opponent's* card. The index
//! is randomly rotated by 180° (a card can be read either way up), then the
//! two corner values are compared.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionInput, Actor, Continuation, Prompt};
use crate::board::{BoardCell, Pos};
use crate::cards::{CardRef, CornerOverride, CornerValue};
use crate::error::GameError;
use crate::game::Game;
use crate::moves::PathStep;
use crate::turn::Phase;

/// Side of a combat
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Attacker,
    Defender,
}

/// Combat progress
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombatStep {
    /// Waiting for corner picks
    Choice,
    /// Outcome computed
    Resolve,
}

/// Combat outcome
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Attacker,
    Defender,
    Draw,
    Power,
}

/// Snapshot of one side, independent from the live board
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combatant {
    pub x: i8,
    pub y: i8,
    pub card: CardRef,
    pub player: String,
    pub role: Role,
    /// Path travelled by the attacker, destination included
    #[serde(rename = "move", default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathStep>,
    pub corner_index: Option<u8>,
    pub value: Option<CornerValue>,
    #[serde(default)]
    pub is_trump: bool,
    #[serde(default)]
    pub corners: Option<CornerOverride>,
}

impl Combatant {
    /// Snapshot a board cell. Obstacles never fight.
    pub fn from_cell(cell: &BoardCell, role: Role, path: Vec<PathStep>) -> Option<Self> {
        let player = cell.player.player_id()?.to_string();
        Some(Self {
            x: cell.x,
            y: cell.y,
            card: cell.card.clone(),
            player,
            role,
            path,
            corner_index: None,
            value: None,
            is_trump: false,
            corners: None,
        })
    }

    pub fn pos(&self) -> Pos {
        Pos::new(self.x, self.y)
    }

    fn set_pos(&mut self, pos: Pos) {
        self.x = pos.x;
        self.y = pos.y;
    }
}

/// A combat in progress
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combat {
    pub step: CombatStep,
    pub attacker: Combatant,
    pub defender: Combatant,
    /// Cell the attacker started from
    pub origin: Pos,
    #[serde(default)]
    pub shooting: bool,
    pub winner: Option<Winner>,
    pub power_owner: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Continuation>,
}

impl Combat {
    pub fn new(attacker: Combatant, defender: Combatant) -> Self {
        Self {
            step: CombatStep::Choice,
            origin: attacker.pos(),
            attacker,
            defender,
            shooting: false,
            winner: None,
            power_owner: None,
            next: None,
        }
    }

    pub fn side(&self, role: Role) -> &Combatant {
        match role {
            Role::Attacker => &self.attacker,
            Role::Defender => &self.defender,
        }
    }

    pub fn side_mut(&mut self, role: Role) -> &mut Combatant {
        match role {
            Role::Attacker => &mut self.attacker,
            Role::Defender => &mut self.defender,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.attacker.value.is_some() && self.defender.value.is_some()
    }
}

/// Map a picked corner onto one of the two corners of its axis
pub fn rotate_corner(index: u8, flip: bool) -> u8 {
    let axis = if index % 2 == 0 { [0, 2] } else { [1, 3] };
    axis[usize::from(flip)]
}

/// Decision reached from two corner values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Draw { retreat: bool },
    /// A ranged trump hit a `"*"` corner: no power, draw
    ShotAbsorbed,
    /// A ranged trump hit an `"X"` corner
    TrumpDestroyed,
    Power { owner: Role, retreat: bool },
    AttackerWins,
    DefenderWins,
}

impl Verdict {
    pub fn winner(&self) -> Winner {
        match self {
            Verdict::Draw { .. } | Verdict::ShotAbsorbed => Winner::Draw,
            Verdict::TrumpDestroyed | Verdict::DefenderWins => Winner::Defender,
            Verdict::Power { .. } => Winner::Power,
            Verdict::AttackerWins => Winner::Attacker,
        }
    }
}

/// Inputs of [`judge`] besides the two values
#[derive(Clone, Copy, Debug, Default)]
pub struct Circumstances {
    pub ranged: bool,
    pub attacker_skips_draw: bool,
    pub defender_skips_draw: bool,
}

/// Compare two corner values.
///
/// Only numeric values are ordered; a sentinel left over after the special
/// cases (an `"X"` outside a ranged combat) loses to the defender.
pub fn judge(attacker: CornerValue, defender: CornerValue, on: Circumstances) -> Verdict {
    if attacker == defender {
        return Verdict::Draw { retreat: !on.ranged };
    }
    if on.ranged && attacker == CornerValue::Kill {
        return Verdict::TrumpDestroyed;
    }
    if attacker == CornerValue::Power {
        return Verdict::Power {
            owner: Role::Attacker,
            retreat: !on.ranged && !on.attacker_skips_draw,
        };
    }
    if defender == CornerValue::Power {
        if on.ranged {
            return Verdict::ShotAbsorbed;
        }
        return Verdict::Power {
            owner: Role::Defender,
            retreat: !on.defender_skips_draw,
        };
    }
    match (attacker.numeric(), defender.numeric()) {
        (Some(a), Some(d)) if a > d => Verdict::AttackerWins,
        _ => Verdict::DefenderWins,
    }
}

impl Game {
    /// Open a ranged combat from a trump against the card at `target`.
    ///
    /// `trump.pos` is the caster's cell. `next` is resumed once the combat
    /// has settled.
    pub fn shoot(
        &mut self,
        trump: &Actor,
        target: Pos,
        next: Option<Continuation>,
    ) -> Result<(), GameError> {
        self.ensure_accepting()?;
        let caster = trump
            .pos
            .ok_or_else(|| GameError::protocol("shooting trump without a caster"))?;

        let defender = self
            .board
            .get(target)
            .filter(|cell| !cell.player.is_player(&trump.player))
            .and_then(|cell| Combatant::from_cell(cell, Role::Defender, Vec::new()))
            .ok_or(GameError::IllegalSelection)?;

        let attacker = Combatant {
            x: caster.x,
            y: caster.y,
            card: trump.card.clone(),
            player: trump.player.clone(),
            role: Role::Attacker,
            path: Vec::new(),
            corner_index: None,
            value: None,
            is_trump: true,
            corners: None,
        };

        let mut combat = Combat::new(attacker, defender);
        combat.shooting = true;
        combat.next = next;

        self.turn.phase = Phase::Combat;
        self.turn.combat = Some(combat);
        self.notify_room("**Combat** - a combat starts (shooting trump).");
        self.send_state();
        Ok(())
    }

    /// Commit `player`'s corner pick for the opposing side
    pub fn fight(&mut self, player: &str, corner: u8) -> Result<(), GameError> {
        self.ensure_accepting()?;
        self.player(player)?;

        let mut combat = match (self.turn.phase, &self.turn.combat) {
            (Phase::Combat, Some(c)) if c.step == CombatStep::Choice => c.clone(),
            _ => return Err(GameError::protocol("corner pick outside of a combat choice")),
        };
        if corner > 3 {
            return Err(GameError::protocol(format!("corner index {corner} out of range")));
        }
        if combat.attacker.player != player && combat.defender.player != player {
            return Err(GameError::protocol("corner pick from a player outside the combat"));
        }

        for role in [Role::Attacker, Role::Defender] {
            let side = combat.side(role);
            if side.player == player {
                continue;
            }
            if side.value.is_some() {
                return Err(GameError::protocol("corner already picked"));
            }

            let base = self.card_def(&side.card)?.corners;
            let corners = side.corners.map_or(base, |o| o.apply(base));
            let index = rotate_corner(corner, self.rng.gen_bool(0.5));

            let side = combat.side_mut(role);
            side.corner_index = Some(index);
            side.value = Some(corners[usize::from(index)]);
        }

        if !combat.is_settled() {
            self.turn.combat = Some(combat);
            self.send_state();
            return Ok(());
        }

        self.resolve_combat(combat)
    }

    fn resolve_combat(&mut self, mut combat: Combat) -> Result<(), GameError> {
        combat.step = CombatStep::Resolve;

        let mut attacker = combat.attacker.clone();
        let defender = combat.defender.clone();
        let (Some(attacker_value), Some(defender_value)) = (attacker.value, defender.value) else {
            return Err(GameError::protocol("combat resolved without both corners"));
        };

        let attacker_def = self.card_def(&attacker.card)?;
        let defender_def = self.card_def(&defender.card)?;
        let attacker_name = self.owner_label(&attacker.player);
        let defender_name = self.owner_label(&defender.player);

        let verdict = judge(
            attacker_value,
            defender_value,
            Circumstances {
                ranged: attacker.is_trump,
                attacker_skips_draw: self.capabilities.skips_draw(attacker_def.resolver.as_deref()),
                defender_skips_draw: self.capabilities.skips_draw(defender_def.resolver.as_deref()),
            },
        );
        tracing::debug!(?verdict, %attacker_value, %defender_value, "Combat resolved");

        match verdict {
            Verdict::Draw { retreat } => {
                let note = if retreat { self.retreat(&mut attacker) } else { String::new() };
                self.notify_room(format!("**Combat** - the combat ends in a draw.{note}"));
            }
            Verdict::ShotAbsorbed => {
                self.notify_room(
                    "**Combat** - a shooting trump hit a \"*\" corner: no power triggers and the combat ends in a draw.",
                );
            }
            Verdict::TrumpDestroyed => {
                self.remove_trump_from_hand(&attacker.player, &attacker.card);
                self.notify_room(format!(
                    "**Combat** - {defender_name}'s _{}_ destroys {attacker_name}'s shooting trump _{}_ and keeps its position.",
                    defender_def.name, attacker_def.name
                ));
            }
            Verdict::Power { owner, retreat } => {
                let note = if retreat { self.retreat(&mut attacker) } else { String::new() };
                let (source, target, def, name) = match owner {
                    Role::Attacker => (attacker.clone(), defender.clone(), &attacker_def, &attacker_name),
                    Role::Defender => (defender.clone(), attacker.clone(), &defender_def, &defender_name),
                };
                self.notify_room(format!(
                    "**Combat** - {name}'s _{}_ triggers its power (_{}_).{note}",
                    def.name,
                    def.power.as_deref().unwrap_or("no description")
                ));
                combat.power_owner = Some(owner);
                self.stack.push(Action::Power { source, target });
            }
            Verdict::AttackerWins => {
                if attacker.is_trump {
                    self.notify_room(format!(
                        "**Combat** - {attacker_name}'s shooting trump _{}_ eliminates {defender_name}'s _{}_.",
                        attacker_def.name, defender_def.name
                    ));
                } else {
                    self.notify_room(format!(
                        "**Combat** - {attacker_name}'s _{}_ eliminates {defender_name}'s _{}_ and takes its place at _{}_.",
                        attacker_def.name,
                        defender_def.name,
                        defender.pos()
                    ));
                }
                self.eliminate(defender.pos())?;
                if !attacker.is_trump && self.board.relocate(attacker.pos(), defender.pos()) {
                    attacker.set_pos(defender.pos());
                }
            }
            Verdict::DefenderWins => {
                if attacker.is_trump {
                    self.notify_room(format!(
                        "**Combat** - {defender_name}'s _{}_ dodges {attacker_name}'s shooting trump _{}_ and keeps its position.",
                        defender_def.name, attacker_def.name
                    ));
                } else {
                    self.notify_room(format!(
                        "**Combat** - {defender_name}'s _{}_ eliminates {attacker_name}'s _{}_ and keeps its position.",
                        defender_def.name, attacker_def.name
                    ));
                    self.eliminate(attacker.pos())?;
                }
            }
        }

        combat.winner = Some(verdict.winner());
        combat.attacker = attacker;
        self.turn.combat = Some(combat);
        self.settling = true;
        self.send_state();
        Ok(())
    }

    /// Move the attacker back to the second-to-last cell of its path when
    /// that cell is free. Returns the narration suffix.
    fn retreat(&mut self, attacker: &mut Combatant) -> String {
        let stay = " Both cards keep their positions.".to_string();
        if attacker.is_trump || attacker.path.len() < 2 {
            return stay;
        }

        let back = attacker.path[attacker.path.len() - 2].pos();
        if self.board.is_occupied(back) || !self.board.relocate(attacker.pos(), back) {
            return stay;
        }
        attacker.set_pos(back);

        let name = self
            .card_def(&attacker.card)
            .map(|def| def.name)
            .unwrap_or_else(|_| attacker.card.slug.clone());
        format!(" The attacking **{name}** falls back to _{back}_.")
    }

    /// Follow-up of a resolved combat, once clients had time to show it
    pub fn settle(&mut self) -> Result<(), GameError> {
        if !self.settling {
            return Err(GameError::protocol("no combat to settle"));
        }
        self.settling = false;

        let Some(combat) = self.turn.combat.clone() else {
            return self.resolve_stack();
        };

        let pending_move = match &self.turn.action {
            Some(Action::MoveCard(Prompt { next: Some(next), .. })) => Some(next.clone()),
            _ => None,
        };

        if let Some(next) = pending_move {
            let input = ActionInput::Moved {
                from: combat.origin,
                to: combat.attacker.pos(),
            };
            self.resume(next, input, false)
        } else if let Some(next) = combat.next {
            self.resume(next, ActionInput::Combat { winner: combat.winner }, false)
        } else {
            self.resolve_stack()
        }
    }
}
