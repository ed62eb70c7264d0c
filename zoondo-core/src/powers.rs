//! Built-in card powers and trumps

use crate::action::{Action, ActionContext, ActionInput, ActionOptions, Actor, Continuation, Prompt};
use crate::board::Pos;
use crate::capability::{Capabilities, Capability, Invocation};
use crate::cards::{CornerOverride, CornerTransform};
use crate::error::GameError;
use crate::game::Game;

pub(crate) fn register_builtin(caps: &mut Capabilities) {
    caps.register(Advance::NAME, Advance);
    caps.register(Fortify::NAME, Fortify);
    caps.register(Rearrange::NAME, Rearrange);
    caps.register(Volley::NAME, Volley);
}

fn select_cell(player: &str, cells: Vec<Pos>, discardable: bool, next: Continuation) -> Action {
    Action::SelectCell(Prompt::new(
        ActionOptions {
            player: Some(player.to_string()),
            cells,
            discardable,
            ..Default::default()
        },
        Some(next),
    ))
}

fn unexpected(resolver: &str, step: u8, input: &ActionInput) -> GameError {
    GameError::protocol(format!("{resolver} cannot take {input:?} at step {step}"))
}

/// Power: the card that triggered it may move once more, to a free cell
pub struct Advance;

impl Advance {
    pub const NAME: &'static str = "advance";
}

impl Capability for Advance {
    fn invoke(&self, game: &mut Game, ctx: ActionContext) -> Result<Invocation, GameError> {
        let source = ctx.source;
        let Some(pos) = source.pos else {
            return Ok(Invocation::Declined);
        };
        let still_there = game
            .board()
            .get(pos)
            .is_some_and(|cell| cell.player.is_player(&source.player) && cell.card == source.card);
        if !still_there {
            return Ok(Invocation::Declined);
        }

        game.push_action(Action::MoveCard(Prompt::new(
            ActionOptions {
                player: Some(source.player),
                only_free_cells: true,
                discardable: true,
                card: Some(pos),
                ..Default::default()
            },
            None,
        )));
        game.complete()?;
        Ok(Invocation::Started)
    }
}

/// Trump: move any card with its numeric corners raised by one
pub struct Fortify;

impl Fortify {
    pub const NAME: &'static str = "fortify";
}

impl Capability for Fortify {
    fn invoke(&self, game: &mut Game, ctx: ActionContext) -> Result<Invocation, GameError> {
        let Actor { player, card, .. } = ctx.source;
        if !game.check_trump_caster(&player, &card)? {
            return Ok(Invocation::Declined);
        }

        game.remove_trump_from_hand(&player, &card);
        game.push_action(Action::MoveCard(Prompt::new(
            ActionOptions {
                player: Some(player),
                corners: Some(CornerOverride::Transform(CornerTransform::Offset(1))),
                discardable: true,
                ..Default::default()
            },
            None,
        )));
        game.complete()?;
        Ok(Invocation::Started)
    }
}

/// Trump: swap two of the player's own cards
pub struct Rearrange;

impl Rearrange {
    pub const NAME: &'static str = "rearrange";
}

fn own_cells(game: &Game, player: &str) -> Vec<Pos> {
    game.board()
        .cells()
        .into_iter()
        .filter(|cell| cell.player.is_player(player))
        .map(|cell| cell.pos())
        .collect()
}

impl Capability for Rearrange {
    fn invoke(&self, game: &mut Game, ctx: ActionContext) -> Result<Invocation, GameError> {
        let player = ctx.source.player.clone();
        let cells = own_cells(game, &player);
        if cells.len() < 2 {
            return Ok(Invocation::Declined);
        }

        let next = Continuation::new(Self::NAME, 0, ctx);
        game.push_action(select_cell(&player, cells, true, next));
        game.complete()?;
        Ok(Invocation::Started)
    }

    fn resume(
        &self,
        game: &mut Game,
        next: Continuation,
        input: ActionInput,
        discarded: bool,
    ) -> Result<(), GameError> {
        if discarded {
            return Ok(());
        }
        let player = next.context.source.player.clone();

        match (next.step, &input) {
            (0, ActionInput::Cell(first)) => {
                let others = own_cells(game, &player)
                    .into_iter()
                    .filter(|pos| pos != first)
                    .collect();
                game.push_action(select_cell(&player, others, true, next.advance(Some(*first))));
                game.complete()
            }
            (1, ActionInput::Cell(second)) => {
                let first = next.cells.first().copied().ok_or_else(|| unexpected(Self::NAME, 1, &input))?;
                if !game.swap_cells(first, *second) {
                    return Err(GameError::IllegalSelection);
                }
                game.remove_trump_from_hand(&player, &next.context.source.card);
                let name = game.player(&player)?.name.clone();
                game.notify_room(format!("**Trump** - **{name}** swapped the cards at _{first}_ and _{second}_."));
                game.complete()
            }
            (step, _) => Err(unexpected(Self::NAME, step, &input)),
        }
    }
}

/// Shooting trump: a caster shoots an enemy card in range
pub struct Volley;

impl Volley {
    pub const NAME: &'static str = "volley";
}

impl Capability for Volley {
    fn invoke(&self, game: &mut Game, ctx: ActionContext) -> Result<Invocation, GameError> {
        let player = ctx.source.player.clone();
        let casters = game.valid_shooting_casters(&player, &ctx.source.card)?;
        if casters.is_empty() {
            return Ok(Invocation::Declined);
        }

        let next = Continuation::new(Self::NAME, 0, ctx);
        game.push_action(select_cell(&player, casters, true, next));
        game.complete()?;
        Ok(Invocation::Started)
    }

    fn resume(
        &self,
        game: &mut Game,
        next: Continuation,
        input: ActionInput,
        discarded: bool,
    ) -> Result<(), GameError> {
        if discarded {
            return Ok(());
        }
        let Actor { player, card, .. } = next.context.source.clone();

        match (next.step, &input) {
            (0, ActionInput::Cell(caster)) => {
                let targets = game.valid_shooting_targets(&player, &card, *caster)?;
                game.push_action(select_cell(&player, targets, false, next.advance(Some(*caster))));
                game.complete()
            }
            (1, ActionInput::Cell(target)) => {
                let caster = next.cells.first().copied();
                let shooter = Actor {
                    player,
                    card,
                    pos: caster,
                };
                game.shoot(&shooter, *target, Some(next.advance(Some(*target))))
            }
            (2, ActionInput::Combat { .. }) => {
                if game.player(&player)?.holds(&card) {
                    game.remove_trump_from_hand(&player, &card);
                }
                game.complete()
            }
            (step, _) => Err(unexpected(Self::NAME, step, &input)),
        }
    }
}
