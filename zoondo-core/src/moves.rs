//! Move generation and legality checks
//!
//! Movement patterns are authored once, from the first player's side; the
//! second player's paths are the same offsets rotated by 180°.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Owner, Pos};
use crate::cards::MovePattern;

/// Absolute cell along a movement path
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub x: i8,
    pub y: i8,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub jump: bool,
}

impl PathStep {
    pub fn pos(&self) -> Pos {
        Pos::new(self.x, self.y)
    }
}

/// Expand a movement pattern into absolute paths from `origin`.
///
/// Paths are cut at the first step leaving the board. No board occupancy is
/// taken into account.
pub fn resolve_moves(origin: Pos, pattern: &MovePattern, flipped: bool) -> Vec<Vec<PathStep>> {
    let sign: i16 = if flipped { -1 } else { 1 };
    // offsets that leave the i8 range end the path like any off-board step
    let shift = |base: i8, delta: i8| i8::try_from(i16::from(base) + sign * i16::from(delta)).ok();

    pattern
        .iter()
        .map(|path| {
            path.iter()
                .map_while(|step| {
                    let x = shift(origin.x, step.x)?;
                    let y = shift(origin.y, step.y)?;
                    Some(PathStep { x, y, jump: step.jump })
                })
                .take_while(|step| step.pos().is_valid())
                .collect::<Vec<_>>()
        })
        .filter(|path| !path.is_empty())
        .collect()
}

/// A cell reachable from the origin given current occupancy
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reachable {
    pub step: PathStep,
    pub combat: bool,
    /// Index of the source path in the resolved pattern
    pub path: usize,
}

/// Result of a legality check
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct MoveCheck {
    /// Path walked from the origin up to and including the destination
    pub path: Vec<PathStep>,
    pub legal: bool,
    pub combat: bool,
}

/// Walk every path, stopping at the first occupied cell.
///
/// An enemy cell ends the path as a combat candidate; friendly cells and
/// obstacles end it without being reachable. With `only_free_cells` any
/// occupied cell ends the path.
pub fn reachable_cells(
    board: &Board,
    paths: &[Vec<PathStep>],
    mover: &str,
    only_free_cells: bool,
) -> Vec<Reachable> {
    let mut cells = Vec::new();

    for (index, path) in paths.iter().enumerate() {
        for step in path {
            match board.get(step.pos()) {
                None => cells.push(Reachable {
                    step: *step,
                    combat: false,
                    path: index,
                }),
                Some(occupant) => {
                    let enemy = match &occupant.player {
                        Owner::Obstacle => false,
                        Owner::Player(id) => id != mover,
                    };
                    if enemy && !only_free_cells {
                        cells.push(Reachable {
                            step: *step,
                            combat: true,
                            path: index,
                        });
                    }
                    break;
                }
            }
        }
    }

    cells
}

/// Check whether `destination` can be reached from `origin`
pub fn check_move(
    board: &Board,
    origin: Pos,
    destination: Pos,
    pattern: &MovePattern,
    flipped: bool,
    mover: &str,
    only_free_cells: bool,
) -> MoveCheck {
    let paths = resolve_moves(origin, pattern, flipped);
    let reachable = reachable_cells(board, &paths, mover, only_free_cells);

    let Some(hit) = reachable.iter().find(|r| r.step.pos() == destination) else {
        return MoveCheck::default();
    };

    let path = &paths[hit.path];
    let end = path
        .iter()
        .position(|step| step.pos() == destination)
        .map_or(path.len(), |i| i + 1);

    MoveCheck {
        path: path[..end].to_vec(),
        legal: true,
        combat: hit.combat,
    }
}
