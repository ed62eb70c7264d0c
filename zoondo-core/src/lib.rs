//! Zoondo Core - Game engine
//!
//! This crate provides the authoritative rules for Zoondo:
//! - Board store and move generation on the 6x6 grid
//! - Card catalog (tribes, fighters, trumps) behind a lookup trait
//! - Turn/phase machine driven by a FIFO action stack
//! - Corner-based combat resolution
//! - Pluggable powers and trumps, with a few built-in ones
//! - Per-player state projection hiding the opponent's cards

pub mod action;
pub mod board;
pub mod capability;
pub mod cards;
pub mod catalog;
pub mod combat;
pub mod error;
pub mod events;
pub mod game;
pub mod moves;
pub mod player;
pub mod powers;
pub mod turn;
pub mod view;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use action::{Action, ActionContext, ActionInput, ActionOptions, ActionStack, ActionType, Actor, Continuation, Prompt};
pub use board::{Board, BoardCell, Owner, Pos, BOARD_SIZE, OBSTACLE};
pub use capability::{Capabilities, Capability, Invocation};
pub use cards::{CardDef, CardKind, CardRef, CornerOverride, CornerTransform, CornerValue, MovePattern, Step, EMBLEM};
pub use catalog::{CardCatalog, Catalog, Tribe};
pub use combat::{Combat, CombatStep, Combatant, Role, Winner};
pub use error::GameError;
pub use events::{Audience, Outbound};
pub use game::{Game, GameConfig, GraveyardEntry};
pub use moves::{check_move, resolve_moves, MoveCheck, PathStep};
pub use player::{Disposition, Player, PlayerInfo};
pub use turn::{Phase, Turn};
pub use view::{project, PlayerView};
