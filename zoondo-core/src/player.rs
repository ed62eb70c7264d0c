//! Seated players and their starting dispositions

use serde::{Deserialize, Serialize};

use crate::board::{BoardCell, Owner, Pos, BOARD_SIZE};
use crate::cards::CardRef;
use crate::catalog::CardCatalog;
use crate::error::GameError;

/// Starting placement grid: rows of fighter slugs, an empty slug leaves the
/// cell free. Row 0 is the row closest to the player's own board edge.
pub type Disposition = Vec<Vec<String>>;

/// What a client submits when registering
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: String,
    pub name: String,
    pub tribe: String,
    #[serde(default)]
    pub disposition: Disposition,
}

/// A seated player
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub name: String,
    pub tribe: String,
    pub is_first_player: bool,
    /// Hand of playable trumps
    pub trumps: Vec<CardRef>,
}

impl Player {
    /// Seat a player with their tribe's starting trumps
    pub fn seat(info: &PlayerInfo, is_first_player: bool, catalog: &dyn CardCatalog) -> Result<Self, GameError> {
        let tribe = catalog
            .tribe(&info.tribe)
            .ok_or_else(|| GameError::UnknownTribe(info.tribe.clone()))?;

        let trumps = tribe
            .composition
            .trumps
            .iter()
            .map(|slug| CardRef::trump(&info.tribe, slug))
            .collect();

        Ok(Self {
            id: info.id.clone(),
            name: info.name.clone(),
            tribe: info.tribe.clone(),
            is_first_player,
            trumps,
        })
    }

    pub fn holds(&self, card: &CardRef) -> bool {
        self.trumps.contains(card)
    }
}

/// Turn a disposition into board cells.
///
/// The second player's grid is rotated 180° so both players author their
/// disposition from their own side of the table.
pub fn place_disposition(
    info: &PlayerInfo,
    mirrored: bool,
    catalog: &dyn CardCatalog,
) -> Result<Vec<BoardCell>, GameError> {
    let size = BOARD_SIZE as usize;
    if info.disposition.len() > size {
        return Err(GameError::InvalidDisposition(format!(
            "{} rows, at most {size} allowed",
            info.disposition.len()
        )));
    }

    let mut cells = Vec::new();
    let mut has_emblem = false;

    for (y, row) in info.disposition.iter().enumerate() {
        if row.len() > size {
            return Err(GameError::InvalidDisposition(format!(
                "row {y} holds {} cells, at most {size} allowed",
                row.len()
            )));
        }
        for (x, slug) in row.iter().enumerate() {
            if slug.is_empty() {
                continue;
            }
            let card = CardRef::fighter(&info.tribe, slug);
            let def = catalog.card(&card).ok_or_else(|| {
                GameError::InvalidDisposition(format!("{slug} is not a fighter of tribe {}", info.tribe))
            })?;
            has_emblem |= def.is_emblem();

            let pos = Pos::new(x as i8, y as i8);
            let pos = if mirrored { pos.mirrored() } else { pos };
            cells.push(BoardCell::new(Owner::Player(info.id.clone()), pos, card));
        }
    }

    if !has_emblem {
        return Err(GameError::InvalidDisposition("no emblem placed".to_string()));
    }

    Ok(cells)
}
