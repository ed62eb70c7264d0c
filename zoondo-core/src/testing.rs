//! Fixtures shared by unit tests

use std::sync::Arc;

use crate::board::{Board, BoardCell, Owner, Pos};
use crate::capability::Capabilities;
use crate::cards::CardRef;
use crate::catalog::Catalog;
use crate::game::{Game, GameConfig};
use crate::player::PlayerInfo;

pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";

fn tribe_of(player: &str) -> &'static str {
    if player == ALICE {
        "sylvan"
    } else {
        "ember"
    }
}

pub fn info(id: &str, tribe: &str, disposition: &[&[&str]]) -> PlayerInfo {
    PlayerInfo {
        id: id.to_string(),
        name: id.to_uppercase(),
        tribe: tribe.to_string(),
        disposition: disposition
            .iter()
            .map(|row| row.iter().map(|slug| slug.to_string()).collect())
            .collect(),
    }
}

/// Alice (first player, sylvan) against Bob (ember), one emblem each
pub fn fresh(seed: u64) -> Game {
    let mut game = Game::new(
        "game-test",
        &info(ALICE, "sylvan", &[&["emblem"]]),
        Arc::new(Catalog::sample().unwrap()),
        Arc::new(Capabilities::builtin()),
        GameConfig::default().with_seed(seed),
    )
    .unwrap();
    game.join(&info(BOB, "ember", &[&["emblem"]])).unwrap();
    game.drain_events();
    game
}

pub fn cell(player: &str, x: i8, y: i8, slug: &str) -> BoardCell {
    BoardCell::new(
        Owner::Player(player.to_string()),
        Pos::new(x, y),
        CardRef::fighter(tribe_of(player), slug),
    )
}

/// Started game whose board holds exactly `cells`
pub fn arena(cells: &[BoardCell]) -> Game {
    let mut game = fresh(0);
    game.board = Board::new();
    for cell in cells {
        assert!(game.board.place(cell.clone()), "overlapping fixture cell");
    }
    game
}

pub fn force_turn(game: &mut Game, player: &str) {
    game.start_turn(player);
    game.drain_events();
}
