//! Card catalog - tribe and card definitions
//!
//! The engine only sees the [`CardCatalog`] trait; [`Catalog`] is the JSON
//! backed implementation used by the server and tests.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::board::BOARD_SIZE;
use crate::cards::{CardDef, CardKind, CardRef, MovePattern};

const SAMPLE_CATALOG: &str = include_str!("../assets/sample_catalog.json");

/// Lookup of static card data
pub trait CardCatalog: Send + Sync {
    fn card(&self, card: &CardRef) -> Option<&CardDef>;
    fn tribe(&self, tribe: &str) -> Option<&Tribe>;
}

/// Cards a player starts with besides the board
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Composition {
    #[serde(default)]
    pub trumps: Vec<String>,
}

/// A tribe: its fighters, its trumps and its starting composition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tribe {
    pub name: String,
    #[serde(default)]
    pub fighters: Vec<CardDef>,
    #[serde(default)]
    pub trumps: Vec<CardDef>,
    #[serde(default)]
    pub composition: Composition,
}

impl Tribe {
    fn find(&self, kind: CardKind, slug: &str) -> Option<&CardDef> {
        let deck = match kind {
            CardKind::Fighters => &self.fighters,
            CardKind::Trumps => &self.trumps,
        };
        deck.iter().find(|card| card.slug == slug)
    }
}

/// JSON card catalog
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub tribes: HashMap<String, Tribe>,
}

impl CardCatalog for Catalog {
    fn card(&self, card: &CardRef) -> Option<&CardDef> {
        self.tribes.get(&card.tribe)?.find(card.kind, &card.slug)
    }

    fn tribe(&self, tribe: &str) -> Option<&Tribe> {
        self.tribes.get(tribe)
    }
}

impl Catalog {
    /// Parse a catalog and check it for consistency
    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let catalog: Catalog = serde_json::from_str(content).context("Failed to parse catalog")?;
        let problems = catalog.problems();
        if !problems.is_empty() {
            anyhow::bail!("Invalid catalog: {}", problems.join("; "));
        }
        Ok(catalog)
    }

    /// Load from JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        Self::from_json(&content)
    }

    /// Bundled two-tribe catalog
    pub fn sample() -> anyhow::Result<Self> {
        Self::from_json(SAMPLE_CATALOG)
    }

    /// Consistency problems: missing emblems, offsets past the board edge,
    /// dangling composition slugs
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let mut ids: Vec<&String> = self.tribes.keys().collect();
        ids.sort();

        for id in ids {
            let tribe = &self.tribes[id];
            if !tribe.fighters.iter().any(CardDef::is_emblem) {
                problems.push(format!("tribe {id} has no emblem"));
            }
            for card in tribe.fighters.iter().chain(tribe.trumps.iter()) {
                if !fits_board(&card.moves) || !fits_board(&card.target) {
                    problems.push(format!("tribe {id} card {} has an offset outside the board", card.slug));
                }
            }
            for slug in &tribe.composition.trumps {
                if tribe.find(CardKind::Trumps, slug).is_none() {
                    problems.push(format!("tribe {id} composition names unknown trump {slug}"));
                }
            }
        }

        problems
    }

    /// Resolver names referenced by cards, sorted and deduplicated
    pub fn resolvers(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tribes
            .values()
            .flat_map(|t| t.fighters.iter().chain(t.trumps.iter()))
            .filter_map(|card| card.resolver.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Every offset of the pattern stays within one board width
fn fits_board(pattern: &MovePattern) -> bool {
    pattern
        .iter()
        .flatten()
        .all(|step| step.x.unsigned_abs() < BOARD_SIZE as u8 && step.y.unsigned_abs() < BOARD_SIZE as u8)
}
