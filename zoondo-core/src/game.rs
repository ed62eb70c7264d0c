//! Game aggregate: seating, turn machine and action stack driver

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::action::{
    Action, ActionContext, ActionInput, ActionOptions, ActionStack, ActionType, Actor, Continuation,
    Prompt,
};
use crate::board::{Board, BoardCell, Owner, Pos};
use crate::capability::{Capabilities, Invocation};
use crate::cards::{CardDef, CardRef};
use crate::catalog::CardCatalog;
use crate::combat::{Combat, Combatant, Role};
use crate::error::GameError;
use crate::events::{Audience, Outbound};
use crate::moves::{check_move, resolve_moves};
use crate::player::{place_disposition, Player, PlayerInfo};
use crate::turn::{Phase, Turn};
use crate::view::{project, PlayerView};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Per-game settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameConfig {
    /// Seconds shown on the turn clock
    pub turn_timer: u32,
    /// Fixed rng seed, for reproducible games
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            turn_timer: 30,
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }
}

/// A card that left play
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "lowercase")]
pub enum GraveyardEntry {
    Board(BoardCell),
    Hand { player: String, card: CardRef },
}

// ============================================================================
// GAME
// ============================================================================

/// One room's game. Every request runs to completion before the next one.
pub struct Game {
    room: String,
    config: GameConfig,
    catalog: Arc<dyn CardCatalog>,
    pub(crate) capabilities: Arc<Capabilities>,
    pub(crate) rng: ChaCha8Rng,
    players: Vec<Player>,
    pub(crate) board: Board,
    pub(crate) turn: Turn,
    pub(crate) stack: ActionStack,
    graveyard: Vec<GraveyardEntry>,
    pub(crate) settling: bool,
    events: Vec<Outbound>,
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("room", &self.room)
            .field("players", &self.players)
            .field("turn", &self.turn)
            .field("cells", &self.board.len())
            .field("stack", &self.stack.len())
            .finish_non_exhaustive()
    }
}

impl Game {
    // ========================================================================
    // Setup
    // ========================================================================

    /// Create a game seated with its first player
    pub fn new(
        room: impl Into<String>,
        first: &PlayerInfo,
        catalog: Arc<dyn CardCatalog>,
        capabilities: Arc<Capabilities>,
        config: GameConfig,
    ) -> Result<Self, GameError> {
        let player = Player::seat(first, true, catalog.as_ref())?;
        let cells = place_disposition(first, false, catalog.as_ref())?;

        let mut game = Self {
            room: room.into(),
            rng: config.rng(),
            turn: Turn::waiting(config.turn_timer),
            config,
            catalog,
            capabilities,
            players: vec![player],
            board: Board::new(),
            stack: ActionStack::new(),
            graveyard: Vec::new(),
            settling: false,
            events: Vec::new(),
        };
        game.place_all(cells)?;

        tracing::info!(room = %game.room, player = %first.id, "Game created");
        game.notify_room(format!("**{}** created the game. Waiting for an opponent...", first.name));
        game.send_state();
        Ok(game)
    }

    /// Seat the second player and start the first turn
    pub fn join(&mut self, second: &PlayerInfo) -> Result<(), GameError> {
        if self.is_over() {
            return Err(GameError::GameOver);
        }
        if self.players.len() >= 2 {
            return Err(GameError::RoomFull);
        }
        if self.players.iter().any(|p| p.id == second.id) {
            return Err(GameError::protocol("player already seated in this room"));
        }

        let player = Player::seat(second, false, self.catalog.as_ref())?;
        let cells = place_disposition(second, true, self.catalog.as_ref())?;
        self.place_all(cells)?;
        self.players.push(player);

        tracing::info!(room = %self.room, player = %second.id, "Player joined");
        self.notify_room(format!("**{}** joined the game.", second.name));
        self.send_state();

        let starter = self.players[self.rng.gen_range(0..self.players.len())].id.clone();
        self.start_turn(&starter);
        Ok(())
    }

    fn place_all(&mut self, cells: Vec<BoardCell>) -> Result<(), GameError> {
        if let Some(taken) = cells.iter().find(|cell| self.board.is_occupied(cell.pos())) {
            return Err(GameError::InvalidDisposition(format!("cell {} is already taken", taken.pos())));
        }
        for cell in cells {
            self.board.place(cell);
        }
        Ok(())
    }

    /// A player left the room. The game goes on without forfeit.
    pub fn leave(&mut self, player: &str) -> Result<(), GameError> {
        let name = self.player(player)?.name.clone();
        tracing::info!(room = %self.room, player, "Player left");
        self.notify_room(format!("**{name}** left the game."));
        Ok(())
    }

    // ========================================================================
    // Turn machine
    // ========================================================================

    pub fn start_turn(&mut self, player: &str) {
        let passive = self.opponent_of(player).map(|p| p.id.clone());
        self.turn = self.turn.next(player.to_string(), passive);
        self.stack.clear();
        self.settling = false;

        tracing::info!(room = %self.room, turn = self.turn.count, player, "Turn start");
        self.send_state();
        let name = self.owner_label(player);
        self.notify_room(format!("**Turn {}** - {name} is playing.", self.turn.count));
    }

    /// Close the current turn; returns who plays next
    pub fn end_turn(&mut self) -> Option<String> {
        self.notify_room("End of turn.");
        self.turn.passive_player.clone()
    }

    pub fn end_game(&mut self, winner: &str) {
        self.turn.phase = Phase::End;
        self.turn.winner = Some(winner.to_string());
        self.turn.combat = None;
        self.stack.clear();
        self.settling = false;

        tracing::info!(room = %self.room, winner, "Game over");
        self.send_state();
        let name = self.owner_label(winner);
        self.notify_room(format!("**Game over** - {name} captured the opposing emblem and wins."));
    }

    /// Drain the action stack until a prompt needs input, a capability takes
    /// over, the game ends or the stack is empty (which ends the turn).
    pub fn resolve_stack(&mut self) -> Result<(), GameError> {
        while !self.is_over() {
            let Some(action) = self.stack.shift() else {
                if let Some(next) = self.end_turn() {
                    self.start_turn(&next);
                }
                return Ok(());
            };

            match action {
                Action::SelectCell(_) | Action::SelectCard(_) | Action::MoveCard(_) => {
                    self.turn.phase = Phase::Action;
                    self.turn.combat = None;
                    self.turn.action = Some(action);
                    self.send_state();
                    return Ok(());
                }
                Action::Power { source, target } => {
                    if self.resolve_power(source, target)? == Invocation::Started {
                        return Ok(());
                    }
                }
                Action::Win { winner } => {
                    self.end_game(&winner);
                    return Ok(());
                }
                Action::Custom { name } => {
                    tracing::warn!(room = %self.room, action = %name, "Skipping unknown action");
                }
            }
        }
        Ok(())
    }

    fn resolve_power(&mut self, source: Combatant, target: Combatant) -> Result<Invocation, GameError> {
        let def = self.card_def(&source.card)?;

        let Some(capability) = self.capabilities.lookup(def.resolver.as_deref()) else {
            tracing::warn!(room = %self.room, card = %def.slug, "Power has no capability");
            self.notify_room(format!(
                "**Power** - the power of _{}_ is not implemented yet. It counts as a draw.",
                def.name
            ));
            return Ok(Invocation::Declined);
        };

        tracing::debug!(room = %self.room, card = %def.slug, "Invoking power");
        let ctx = ActionContext {
            source: Actor::from(&source),
            target: Some(Actor::from(&target)),
        };
        let outcome = capability.invoke(self, ctx)?;
        if outcome == Invocation::Declined {
            self.notify_room(format!("**Power** - the power of _{}_ has no effect.", def.name));
        }
        Ok(outcome)
    }

    /// Completion signal for capabilities: rebroadcast and keep draining
    pub fn complete(&mut self) -> Result<(), GameError> {
        self.send_state();
        self.resolve_stack()
    }

    pub(crate) fn resume(
        &mut self,
        next: Continuation,
        input: ActionInput,
        discarded: bool,
    ) -> Result<(), GameError> {
        match self.capabilities.get(&next.resolver) {
            Some(capability) => capability.resume(self, next, input, discarded),
            None => {
                tracing::warn!(room = %self.room, resolver = %next.resolver, "Continuation has no capability");
                if discarded {
                    Ok(())
                } else {
                    self.resolve_stack()
                }
            }
        }
    }

    // ========================================================================
    // Player requests
    // ========================================================================

    /// Move one of `player`'s cards, possibly into a combat
    pub fn move_card(&mut self, player: &str, from: Pos, to: Pos) -> Result<(), GameError> {
        self.ensure_accepting()?;
        let flipped = !self.player(player)?.is_first_player;

        let options = match (self.turn.phase, &self.turn.action) {
            (Phase::Main, _) => ActionOptions::default(),
            (Phase::Action, Some(Action::MoveCard(prompt))) => prompt.options.clone(),
            _ => return Err(GameError::protocol("move outside of the main phase or a MOVE_CARD action")),
        };
        let mover = options.player.as_deref().or(self.turn.active_player.as_deref());
        if mover != Some(player) {
            return Err(GameError::protocol("move requested by the wrong player"));
        }

        let Some(cell) = self.board.get(from).filter(|c| c.player.is_player(player)).cloned() else {
            return self.reject_move(player);
        };
        if options.card.is_some_and(|only| only != from) {
            return self.reject_move(player);
        }

        let def = self.card_def(&cell.card)?;
        let pattern = options.moves.as_ref().unwrap_or(&def.moves);
        let check = check_move(&self.board, from, to, pattern, flipped, player, options.only_free_cells);
        if !check.legal {
            return self.reject_move(player);
        }

        if check.combat {
            let attacker = Combatant::from_cell(&cell, Role::Attacker, check.path);
            let defender = self
                .board
                .get(to)
                .and_then(|c| Combatant::from_cell(c, Role::Defender, Vec::new()));
            let (Some(mut attacker), Some(mut defender)) = (attacker, defender) else {
                return Err(GameError::protocol("combat against a cell without an opponent"));
            };
            for side in [&mut attacker, &mut defender] {
                if options.player.as_deref() == Some(side.player.as_str()) {
                    side.corners = options.corners;
                }
            }

            self.turn.phase = Phase::Combat;
            self.turn.combat = Some(Combat::new(attacker, defender));
            let name = self.owner_label(player);
            self.notify_room(format!("**Combat** - {name} attacks the card at _{to}_."));
            self.send_state();
            return Ok(());
        }

        self.board.relocate(from, to);
        self.send_state();

        self.notify_player(player, format!("You moved _{}_ from _{from}_ to _{to}_.", def.name));
        if let Some(opponent) = self.opponent_of(player).map(|p| p.id.clone()) {
            let name = self.owner_label(player);
            self.notify_player(&opponent, format!("{name} moved a piece from _{from}_ to _{to}_."));
        }

        let next = match &self.turn.action {
            Some(Action::MoveCard(Prompt { next: Some(next), .. })) => Some(next.clone()),
            _ => None,
        };
        match next {
            Some(next) => self.resume(next, ActionInput::Moved { from, to }, false),
            None => self.resolve_stack(),
        }
    }

    fn reject_move(&mut self, player: &str) -> Result<(), GameError> {
        self.notify_player(player, "**Error** - this move is not allowed.");
        Err(GameError::IllegalMove)
    }

    /// Answer or discard the pending prompt
    pub fn resolve_action(
        &mut self,
        player: &str,
        action_type: ActionType,
        value: ActionInput,
        discard: bool,
    ) -> Result<(), GameError> {
        self.ensure_accepting()?;
        self.player(player)?;

        let prompt = match (self.turn.phase, &self.turn.action) {
            (Phase::Action, Some(action)) if action.action_type() == action_type => action
                .prompt()
                .cloned()
                .ok_or_else(|| GameError::protocol("pending action takes no input"))?,
            (Phase::Action, Some(action)) => {
                return Err(GameError::protocol(format!(
                    "answered {action_type} while {} is pending",
                    action.action_type()
                )))
            }
            _ => return Err(GameError::protocol("no action pending")),
        };

        let responder = prompt.options.player.as_deref().or(self.turn.active_player.as_deref());
        if responder != Some(player) {
            return Err(GameError::protocol("action answered by the wrong player"));
        }

        if discard {
            if !prompt.options.discardable {
                return Err(GameError::protocol("action cannot be discarded"));
            }
            tracing::debug!(room = %self.room, player, %action_type, "Action discarded");
            if let Some(next) = prompt.next {
                self.resume(next, ActionInput::None, true)?;
            }
            return self.complete();
        }

        match (action_type, &value) {
            (ActionType::MoveCard, _) => {
                return Err(GameError::protocol("MOVE_CARD is answered with a move"));
            }
            (ActionType::SelectCell, ActionInput::Cell(pos)) => {
                if !prompt.options.cells.is_empty() && !prompt.options.cells.contains(pos) {
                    return Err(GameError::IllegalSelection);
                }
            }
            (ActionType::SelectCard, ActionInput::Card(_) | ActionInput::Cell(_)) => {}
            _ => return Err(GameError::IllegalSelection),
        }

        match prompt.next {
            Some(next) => self.resume(next, value, false),
            None => self.resolve_stack(),
        }
    }

    /// Play a trump from `player`'s hand
    pub fn trump(&mut self, player: &str, card: &CardRef) -> Result<(), GameError> {
        self.ensure_accepting()?;
        let holder = self.player(player)?;
        if self.turn.phase != Phase::Main || !self.turn.is_active(player) {
            return Err(GameError::protocol("trumps are played during the own main phase"));
        }
        if !holder.holds(card) {
            return Err(GameError::protocol("trump not in hand"));
        }
        let name = holder.name.clone();
        let def = self.card_def(card)?;

        let Some(capability) = self.capabilities.lookup(def.resolver.as_deref()) else {
            tracing::warn!(room = %self.room, card = %def.slug, "Trump has no capability");
            self.notify_room(format!(
                "**Trump** - _{}_ is not implemented yet. The turn ends as a draw.",
                def.name
            ));
            return self.resolve_stack();
        };

        let ctx = ActionContext {
            source: Actor {
                player: player.to_string(),
                card: card.clone(),
                pos: None,
            },
            target: None,
        };
        match capability.invoke(self, ctx)? {
            Invocation::Declined => {
                self.notify_player(player, format!("**Trump** - no card can play _{}_ right now.", def.name));
            }
            Invocation::Started => {
                let text = def.text.as_deref().unwrap_or(&def.card_type);
                self.notify_room(format!("**Trump** - **{name}** plays _{}_ ({text}).", def.name));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Helpers for capabilities
    // ========================================================================

    pub fn push_action(&mut self, action: Action) {
        self.stack.push(action);
    }

    /// Does `player` have a card on the board allowed to play `trump`
    pub fn check_trump_caster(&self, player: &str, trump: &CardRef) -> Result<bool, GameError> {
        let def = self.card_def(trump)?;
        Ok(self
            .board
            .cells_of(player)
            .any(|cell| self.can_cast(&def, &cell.card)))
    }

    fn can_cast(&self, trump: &CardDef, caster: &CardRef) -> bool {
        match &trump.usable_by {
            None => true,
            Some(types) => self
                .catalog
                .card(caster)
                .is_some_and(|def| types.contains(&def.card_type)),
        }
    }

    /// Enemy cells covered by `trump`'s target pattern from `caster`.
    /// Shots are not blocked by cards in between.
    pub fn valid_shooting_targets(&self, player: &str, trump: &CardRef, caster: Pos) -> Result<Vec<Pos>, GameError> {
        let def = self.card_def(trump)?;
        let flipped = !self.player(player)?.is_first_player;

        let mut targets: Vec<Pos> = resolve_moves(caster, &def.target, flipped)
            .into_iter()
            .flatten()
            .map(|step| step.pos())
            .filter(|pos| {
                self.board
                    .get(*pos)
                    .is_some_and(|cell| matches!(&cell.player, Owner::Player(id) if id != player))
            })
            .collect();
        targets.sort_by_key(|pos| (pos.y, pos.x));
        targets.dedup();
        Ok(targets)
    }

    /// Own cards able to cast `trump` with at least one target in range
    pub fn valid_shooting_casters(&self, player: &str, trump: &CardRef) -> Result<Vec<Pos>, GameError> {
        let def = self.card_def(trump)?;
        let mut casters = Vec::new();
        for cell in self.board.cells() {
            if !cell.player.is_player(player) || !self.can_cast(&def, &cell.card) {
                continue;
            }
            if !self.valid_shooting_targets(player, trump, cell.pos())?.is_empty() {
                casters.push(cell.pos());
            }
        }
        Ok(casters)
    }

    /// Move a trump from a hand to the graveyard
    pub fn remove_trump_from_hand(&mut self, player: &str, card: &CardRef) -> bool {
        let Some(holder) = self.players.iter_mut().find(|p| p.id == player) else {
            return false;
        };
        let Some(index) = holder.trumps.iter().position(|t| t == card) else {
            return false;
        };
        let card = holder.trumps.remove(index);
        self.graveyard.push(GraveyardEntry::Hand {
            player: player.to_string(),
            card,
        });
        true
    }

    pub fn swap_cells(&mut self, a: Pos, b: Pos) -> bool {
        self.board.swap(a, b)
    }

    /// Remove the card at `pos` to the graveyard. Losing an emblem queues a
    /// win for the other player.
    pub fn eliminate(&mut self, pos: Pos) -> Result<Option<BoardCell>, GameError> {
        let Some(cell) = self.board.get(pos).cloned() else {
            return Ok(None);
        };
        let def = self.card_def(&cell.card)?;
        self.board.remove(pos);

        if def.is_emblem() {
            let winner = cell
                .player
                .player_id()
                .and_then(|owner| self.opponent_of(owner))
                .map(|p| p.id.clone());
            if let Some(winner) = winner {
                self.stack.push(Action::Win { winner });
            }
        }

        self.graveyard.push(GraveyardEntry::Board(cell.clone()));
        Ok(Some(cell))
    }

    // ========================================================================
    // Messaging
    // ========================================================================

    pub fn notify_room(&mut self, text: impl Into<String>) {
        self.events.push(Outbound::Notice {
            audience: Audience::Room,
            text: text.into(),
        });
    }

    pub fn notify_player(&mut self, player: &str, text: impl Into<String>) {
        self.events.push(Outbound::Notice {
            audience: Audience::Player(player.to_string()),
            text: text.into(),
        });
    }

    /// Queue a filtered snapshot for every seated player
    pub fn send_state(&mut self) {
        let states: Vec<Outbound> = self
            .players
            .iter()
            .map(|p| Outbound::State {
                to: p.id.clone(),
                view: Box::new(project(self, &p.id)),
            })
            .collect();
        self.events.extend(states);
    }

    /// Take every event queued since the last call
    pub fn drain_events(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.events)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn catalog(&self) -> &dyn CardCatalog {
        self.catalog.as_ref()
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> &Turn {
        &self.turn
    }

    pub fn stack(&self) -> &ActionStack {
        &self.stack
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: &str) -> Result<&Player, GameError> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| GameError::UnknownPlayer(id.to_string()))
    }

    pub fn opponent_of(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id != id)
    }

    pub fn graveyard(&self) -> &[GraveyardEntry] {
        &self.graveyard
    }

    pub fn is_settling(&self) -> bool {
        self.settling
    }

    pub fn is_over(&self) -> bool {
        self.turn.phase == Phase::End
    }

    pub fn view_for(&self, player: &str) -> PlayerView {
        project(self, player)
    }

    /// Resolved definition of a card
    pub fn card_def(&self, card: &CardRef) -> Result<CardDef, GameError> {
        self.catalog
            .card(card)
            .cloned()
            .ok_or_else(|| GameError::UnknownCard(card.clone()))
    }

    pub(crate) fn owner_label(&self, player: &str) -> String {
        self.players
            .iter()
            .find(|p| p.id == player)
            .map_or_else(|| player.to_string(), |p| format!("**{}**", p.name))
    }

    pub(crate) fn ensure_accepting(&self) -> Result<(), GameError> {
        if self.is_over() {
            return Err(GameError::GameOver);
        }
        if self.settling {
            return Err(GameError::protocol("combat outcome is still settling"));
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CornerOverride, CornerTransform, CornerValue};
    use crate::combat::{CombatStep, Winner};
    use crate::testing::{arena, cell, force_turn, ALICE, BOB};

    #[test]
    fn test_join_starts_a_turn() {
        let game = crate::testing::fresh(7);
        assert_eq!(game.turn().phase, Phase::Main);
        assert_eq!(game.turn().count, 1);
        let active = game.turn().active_player.clone().unwrap();
        let passive = game.turn().passive_player.clone().unwrap();
        assert_ne!(active, passive);
        assert!([ALICE, BOB].contains(&active.as_str()));
    }

    #[test]
    fn test_third_player_is_refused() {
        let mut game = crate::testing::fresh(1);
        let carol = crate::testing::info("carol", "sylvan", &[&["emblem"]]);
        assert_eq!(game.join(&carol), Err(GameError::RoomFull));
    }

    #[test]
    fn test_plain_move_ends_turn() {
        let mut game = arena(&[cell(ALICE, 0, 0, "guard"), cell(BOB, 5, 5, "guard")]);
        force_turn(&mut game, ALICE);

        game.move_card(ALICE, Pos::new(0, 0), Pos::new(0, 1)).unwrap();
        assert!(game.board().get(Pos::new(0, 1)).is_some());
        assert!(game.turn().is_active(BOB));
        assert_eq!(game.turn().phase, Phase::Main);
    }

    #[test]
    fn test_rejected_move_changes_nothing() {
        let mut game = arena(&[cell(ALICE, 0, 0, "guard"), cell(BOB, 5, 5, "guard")]);
        force_turn(&mut game, ALICE);
        let count = game.turn().count;

        assert_eq!(
            game.move_card(ALICE, Pos::new(0, 0), Pos::new(0, 2)),
            Err(GameError::IllegalMove)
        );
        assert!(game.board().get(Pos::new(0, 0)).is_some());
        assert_eq!(game.turn().count, count);
        assert!(game.turn().is_active(ALICE));

        assert!(matches!(
            game.move_card(BOB, Pos::new(5, 5), Pos::new(5, 4)),
            Err(GameError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn test_second_player_moves_are_mirrored() {
        let mut game = arena(&[cell(ALICE, 0, 0, "lancer"), cell(BOB, 5, 5, "lancer")]);
        force_turn(&mut game, BOB);

        // lancer charges forward: downwards for the first player, upwards for the second
        game.move_card(BOB, Pos::new(5, 5), Pos::new(5, 2)).unwrap();
        assert!(game.board().get(Pos::new(5, 2)).is_some());
    }

    #[test]
    fn test_combat_snapshot_is_independent() {
        let mut game = arena(&[cell(ALICE, 0, 0, "guard"), cell(BOB, 0, 1, "guard")]);
        force_turn(&mut game, ALICE);

        game.move_card(ALICE, Pos::new(0, 0), Pos::new(0, 1)).unwrap();
        let combat = game.turn().combat.clone().unwrap();
        assert_eq!(game.turn().phase, Phase::Combat);
        assert_eq!(combat.step, CombatStep::Choice);
        assert_eq!(combat.attacker.path.len(), 1);
        assert_eq!(combat.defender.pos(), Pos::new(0, 1));

        // board untouched until the outcome
        assert!(game.board().get(Pos::new(0, 0)).is_some());
        assert!(game.board().get(Pos::new(0, 1)).unwrap().player.is_player(BOB));
    }

    #[test]
    fn test_fight_requires_combat_and_single_pick() {
        let mut game = arena(&[cell(ALICE, 0, 0, "brute"), cell(BOB, 0, 1, "guard")]);
        force_turn(&mut game, ALICE);
        assert!(matches!(game.fight(ALICE, 0), Err(GameError::ProtocolViolation(_))));

        game.move_card(ALICE, Pos::new(0, 0), Pos::new(0, 1)).unwrap();
        game.fight(ALICE, 1).unwrap();
        assert!(matches!(game.fight(ALICE, 1), Err(GameError::ProtocolViolation(_))));
        assert!(matches!(game.fight(BOB, 7), Err(GameError::ProtocolViolation(_))));
    }

    #[test]
    fn test_stronger_attacker_takes_the_cell() {
        // brute [5,2,5,2] vs guard [2,3,2,3]; even corners give 5 vs 2
        let mut game = arena(&[cell(ALICE, 0, 0, "brute"), cell(BOB, 0, 1, "guard"), cell(BOB, 5, 5, "emblem")]);
        force_turn(&mut game, ALICE);

        game.move_card(ALICE, Pos::new(0, 0), Pos::new(0, 1)).unwrap();
        game.fight(ALICE, 0).unwrap();
        game.fight(BOB, 2).unwrap();

        let combat = game.turn().combat.clone().unwrap();
        assert_eq!(combat.step, CombatStep::Resolve);
        assert_eq!(combat.winner, Some(Winner::Attacker));
        assert!(game.board().get(Pos::new(0, 0)).is_none());
        assert!(game.board().get(Pos::new(0, 1)).unwrap().player.is_player(ALICE));
        assert_eq!(game.graveyard().len(), 1);
        assert!(game.is_settling());

        assert!(matches!(
            game.move_card(ALICE, Pos::new(0, 1), Pos::new(0, 2)),
            Err(GameError::ProtocolViolation(_))
        ));

        game.settle().unwrap();
        assert!(game.turn().is_active(BOB));
    }

    #[test]
    fn test_draw_falls_back_one_step() {
        // odd corners of two lancers: 1 vs 1
        let mut game = arena(&[cell(ALICE, 0, 0, "lancer"), cell(BOB, 0, 2, "lancer")]);
        force_turn(&mut game, ALICE);

        game.move_card(ALICE, Pos::new(0, 0), Pos::new(0, 2)).unwrap();
        game.fight(ALICE, 1).unwrap();
        game.fight(BOB, 1).unwrap();

        let combat = game.turn().combat.clone().unwrap();
        assert_eq!(combat.winner, Some(Winner::Draw));
        assert_eq!(combat.attacker.pos(), Pos::new(0, 1));
        assert!(game.board().get(Pos::new(0, 1)).unwrap().player.is_player(ALICE));
        assert!(game.board().get(Pos::new(0, 2)).unwrap().player.is_player(BOB));
        assert!(game.graveyard().is_empty());
    }

    #[test]
    fn test_draw_without_room_stays() {
        let mut game = arena(&[cell(ALICE, 0, 0, "guard"), cell(BOB, 0, 1, "guard")]);
        force_turn(&mut game, ALICE);

        game.move_card(ALICE, Pos::new(0, 0), Pos::new(0, 1)).unwrap();
        game.fight(ALICE, 0).unwrap();
        game.fight(BOB, 0).unwrap();

        assert_eq!(game.turn().combat.as_ref().unwrap().winner, Some(Winner::Draw));
        assert!(game.board().get(Pos::new(0, 0)).unwrap().player.is_player(ALICE));
        assert!(game.board().get(Pos::new(0, 1)).unwrap().player.is_player(BOB));
    }

    #[test]
    fn test_corner_override_is_scoped_to_its_player() {
        let mut game = arena(&[cell(ALICE, 0, 0, "guard"), cell(BOB, 0, 1, "guard")]);
        force_turn(&mut game, ALICE);
        game.stack.push(Action::MoveCard(Prompt::new(
            ActionOptions {
                player: Some(ALICE.into()),
                corners: Some(CornerOverride::Transform(CornerTransform::Offset(1))),
                discardable: true,
                ..Default::default()
            },
            None,
        )));
        game.resolve_stack().unwrap();
        assert_eq!(game.turn().phase, Phase::Action);

        game.move_card(ALICE, Pos::new(0, 0), Pos::new(0, 1)).unwrap();
        game.fight(BOB, 0).unwrap();
        game.fight(ALICE, 0).unwrap();

        let combat = game.turn().combat.clone().unwrap();
        assert_eq!(combat.attacker.value, Some(CornerValue::Value(3)));
        assert_eq!(combat.defender.value, Some(CornerValue::Value(2)));
        assert_eq!(combat.winner, Some(Winner::Attacker));
    }

    #[test]
    fn test_emblem_loss_ends_game() {
        let mut game = arena(&[cell(ALICE, 0, 0, "brute"), cell(BOB, 0, 1, "emblem")]);
        force_turn(&mut game, ALICE);

        game.move_card(ALICE, Pos::new(0, 0), Pos::new(0, 1)).unwrap();
        game.fight(ALICE, 0).unwrap();
        game.fight(BOB, 0).unwrap();
        let wins = game.stack().iter().filter(|a| a.action_type() == ActionType::Win).count();
        assert_eq!(wins, 1);

        game.settle().unwrap();
        assert!(game.is_over());
        assert_eq!(game.turn().winner.as_deref(), Some(ALICE));
        assert_eq!(
            game.move_card(ALICE, Pos::new(0, 1), Pos::new(0, 2)),
            Err(GameError::GameOver)
        );
        assert_eq!(game.fight(BOB, 0), Err(GameError::GameOver));
    }

    #[test]
    fn test_unknown_actions_are_skipped() {
        let mut game = arena(&[cell(ALICE, 0, 0, "guard"), cell(BOB, 5, 5, "guard")]);
        force_turn(&mut game, ALICE);
        game.stack.push(Action::Custom { name: "mystery".into() });
        game.stack.push(Action::SelectCell(Prompt::default()));

        game.resolve_stack().unwrap();
        assert_eq!(game.turn().phase, Phase::Action);
        assert_eq!(game.turn().action.as_ref().map(Action::action_type), Some(ActionType::SelectCell));
    }

    #[test]
    fn test_action_type_mismatch_is_fatal() {
        let mut game = arena(&[cell(ALICE, 0, 0, "guard"), cell(BOB, 5, 5, "guard")]);
        force_turn(&mut game, ALICE);
        game.stack.push(Action::SelectCell(Prompt::default()));
        game.resolve_stack().unwrap();

        let err = game
            .resolve_action(ALICE, ActionType::SelectCard, ActionInput::None, false)
            .unwrap_err();
        assert!(err.is_fatal());

        let err = game
            .resolve_action(ALICE, ActionType::SelectCell, ActionInput::None, true)
            .unwrap_err();
        assert!(matches!(err, GameError::ProtocolViolation(_)));

        game.resolve_action(ALICE, ActionType::SelectCell, ActionInput::Cell(Pos::new(2, 2)), false)
            .unwrap();
        assert!(game.turn().is_active(BOB));
    }

    #[test]
    fn test_selection_outside_offered_cells() {
        let mut game = arena(&[cell(ALICE, 0, 0, "guard"), cell(BOB, 5, 5, "guard")]);
        force_turn(&mut game, ALICE);
        game.stack.push(Action::SelectCell(Prompt::new(
            ActionOptions {
                cells: vec![Pos::new(1, 1)],
                ..Default::default()
            },
            None,
        )));
        game.resolve_stack().unwrap();

        assert_eq!(
            game.resolve_action(ALICE, ActionType::SelectCell, ActionInput::Cell(Pos::new(2, 2)), false),
            Err(GameError::IllegalSelection)
        );
        assert_eq!(game.turn().phase, Phase::Action);
    }

    #[test]
    fn test_events_are_drained_in_order() {
        let mut game = arena(&[cell(ALICE, 0, 0, "guard"), cell(BOB, 5, 5, "guard")]);
        force_turn(&mut game, ALICE);
        game.drain_events();

        game.move_card(ALICE, Pos::new(0, 0), Pos::new(1, 0)).unwrap();
        let events = game.drain_events();
        assert!(matches!(events.first(), Some(Outbound::State { .. })));
        assert!(events.iter().any(|e| matches!(e, Outbound::Notice { audience: Audience::Player(p), .. } if p == BOB)));
        assert!(game.drain_events().is_empty());
    }
}
