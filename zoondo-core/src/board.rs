//! Square board geometry and the board store

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cards::CardRef;

/// Board side length (cells per row and per column)
pub const BOARD_SIZE: i8 = 6;

/// Owner tag used for cells that belong to no player
pub const OBSTACLE: &str = "OBSTACLE";

/// Grid coordinates, origin at the first player's top-left corner
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub x: i8,
    pub y: i8,
}

impl Pos {
    pub const fn new(x: i8, y: i8) -> Self {
        Self { x, y }
    }

    /// Check if this cell is on the board
    pub fn is_valid(&self) -> bool {
        (0..BOARD_SIZE).contains(&self.x) && (0..BOARD_SIZE).contains(&self.y)
    }

    /// Same cell seen from the other side of the table (180° rotation)
    pub fn mirrored(&self) -> Pos {
        Pos::new(BOARD_SIZE - 1 - self.x, BOARD_SIZE - 1 - self.y)
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Who holds a cell
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Owner {
    Player(String),
    Obstacle,
}

impl Owner {
    pub fn is_player(&self, id: &str) -> bool {
        matches!(self, Owner::Player(p) if p == id)
    }

    pub fn player_id(&self) -> Option<&str> {
        match self {
            Owner::Player(id) => Some(id),
            Owner::Obstacle => None,
        }
    }
}

// Serialized as a bare string so obstacles read as "OBSTACLE" on the wire.
impl Serialize for Owner {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Owner::Player(id) => serializer.serialize_str(id),
            Owner::Obstacle => serializer.serialize_str(OBSTACLE),
        }
    }
}

impl<'de> Deserialize<'de> for Owner {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(if raw == OBSTACLE {
            Owner::Obstacle
        } else {
            Owner::Player(raw)
        })
    }
}

/// An occupied cell
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardCell {
    pub player: Owner,
    pub x: i8,
    pub y: i8,
    pub card: CardRef,
}

impl BoardCell {
    pub fn new(player: Owner, pos: Pos, card: CardRef) -> Self {
        Self {
            player,
            x: pos.x,
            y: pos.y,
            card,
        }
    }

    pub fn pos(&self) -> Pos {
        Pos::new(self.x, self.y)
    }
}

/// Mutable grid of occupied cells, keyed by position so that at most one
/// card ever sits on a given cell
#[derive(Clone, Debug, Default)]
pub struct Board {
    cells: FxHashMap<Pos, BoardCell>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a card on an empty cell. Returns false if the cell is taken or off-board.
    pub fn place(&mut self, cell: BoardCell) -> bool {
        let pos = cell.pos();
        if !pos.is_valid() || self.cells.contains_key(&pos) {
            return false;
        }
        self.cells.insert(pos, cell);
        true
    }

    pub fn get(&self, pos: Pos) -> Option<&BoardCell> {
        self.cells.get(&pos)
    }

    pub fn is_occupied(&self, pos: Pos) -> bool {
        self.cells.contains_key(&pos)
    }

    /// Move the card at `from` onto the empty cell `to`
    pub fn relocate(&mut self, from: Pos, to: Pos) -> bool {
        if from == to {
            return self.cells.contains_key(&from);
        }
        if !to.is_valid() || self.cells.contains_key(&to) {
            return false;
        }
        match self.cells.remove(&from) {
            Some(mut cell) => {
                cell.x = to.x;
                cell.y = to.y;
                self.cells.insert(to, cell);
                true
            }
            None => false,
        }
    }

    /// Exchange the cards sitting at two occupied cells
    pub fn swap(&mut self, a: Pos, b: Pos) -> bool {
        if a == b || !self.cells.contains_key(&a) || !self.cells.contains_key(&b) {
            return false;
        }
        let (Some(mut first), Some(mut second)) = (self.cells.remove(&a), self.cells.remove(&b))
        else {
            return false;
        };
        first.x = b.x;
        first.y = b.y;
        second.x = a.x;
        second.y = a.y;
        self.cells.insert(b, first);
        self.cells.insert(a, second);
        true
    }

    pub fn remove(&mut self, pos: Pos) -> Option<BoardCell> {
        self.cells.remove(&pos)
    }

    /// Iterate cells in row-major order
    pub fn cells(&self) -> Vec<&BoardCell> {
        let mut cells: Vec<&BoardCell> = self.cells.values().collect();
        cells.sort_by_key(|cell| (cell.y, cell.x));
        cells
    }

    /// Cells owned by the given player
    pub fn cells_of<'a>(&'a self, player: &'a str) -> impl Iterator<Item = &'a BoardCell> + 'a {
        self.cells.values().filter(move |cell| cell.player.is_player(player))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
