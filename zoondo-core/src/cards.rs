//! Card references, resolved card definitions and corner values

use serde::{Deserialize, Serialize};

/// Resolved card type whose elimination ends the game
pub const EMBLEM: &str = "EMBLEM";

/// Which deck of a tribe a card belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Fighters,
    Trumps,
}

/// Identifies a card definition; resolved through a [`crate::CardCatalog`]
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardRef {
    pub tribe: String,
    #[serde(rename = "type")]
    pub kind: CardKind,
    pub slug: String,
}

impl CardRef {
    pub fn new(tribe: &str, kind: CardKind, slug: &str) -> Self {
        Self {
            tribe: tribe.to_string(),
            kind,
            slug: slug.to_string(),
        }
    }

    pub fn fighter(tribe: &str, slug: &str) -> Self {
        Self::new(tribe, CardKind::Fighters, slug)
    }

    pub fn trump(tribe: &str, slug: &str) -> Self {
        Self::new(tribe, CardKind::Trumps, slug)
    }
}

/// One of the four combat values printed on a card
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CornerRepr", into = "CornerRepr")]
pub enum CornerValue {
    Value(u8),
    /// `"*"`: the card's power triggers
    Power,
    /// `"X"`: a ranged trump hitting this corner is destroyed
    Kill,
}

impl CornerValue {
    pub fn numeric(&self) -> Option<u8> {
        match self {
            CornerValue::Value(n) => Some(*n),
            _ => None,
        }
    }
}

impl std::fmt::Display for CornerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CornerValue::Value(n) => write!(f, "{n}"),
            CornerValue::Power => f.write_str("*"),
            CornerValue::Kill => f.write_str("X"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum CornerRepr {
    Num(u8),
    Sym(String),
}

impl TryFrom<CornerRepr> for CornerValue {
    type Error = String;

    fn try_from(repr: CornerRepr) -> Result<Self, Self::Error> {
        match repr {
            CornerRepr::Num(n) => Ok(CornerValue::Value(n)),
            CornerRepr::Sym(s) => match s.as_str() {
                "*" => Ok(CornerValue::Power),
                "X" => Ok(CornerValue::Kill),
                other => Err(format!("unknown corner value: {other}")),
            },
        }
    }
}

impl From<CornerValue> for CornerRepr {
    fn from(value: CornerValue) -> Self {
        match value {
            CornerValue::Value(n) => CornerRepr::Num(n),
            other => CornerRepr::Sym(other.to_string()),
        }
    }
}

/// Per-value corner transform carried by an action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CornerTransform {
    /// Shift numeric values, floored at zero
    Offset(i8),
    /// Replace every numeric value
    Fixed(u8),
}

impl CornerTransform {
    pub fn apply(&self, value: CornerValue) -> CornerValue {
        match (self, value) {
            (CornerTransform::Offset(delta), CornerValue::Value(n)) => {
                CornerValue::Value((i16::from(n) + i16::from(*delta)).clamp(0, 255) as u8)
            }
            (CornerTransform::Fixed(n), CornerValue::Value(_)) => CornerValue::Value(*n),
            (_, sentinel) => sentinel,
        }
    }
}

/// Corner override attached to one side of a combat
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CornerOverride {
    Replace([CornerValue; 4]),
    Transform(CornerTransform),
}

impl CornerOverride {
    pub fn apply(&self, base: [CornerValue; 4]) -> [CornerValue; 4] {
        match self {
            CornerOverride::Replace(corners) => *corners,
            CornerOverride::Transform(t) => base.map(|v| t.apply(v)),
        }
    }
}

/// One step of a movement path, relative to the card
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub x: i8,
    pub y: i8,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub jump: bool,
}

impl Step {
    pub const fn new(x: i8, y: i8) -> Self {
        Self { x, y, jump: false }
    }

    pub const fn jump(x: i8, y: i8) -> Self {
        Self { x, y, jump: true }
    }
}

/// Movement pattern: a list of outward paths, authored from the first
/// player's side of the board
pub type MovePattern = Vec<Vec<Step>>;

fn blank_corners() -> [CornerValue; 4] {
    [CornerValue::Value(0); 4]
}

/// Resolved card definition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CardDef {
    pub slug: String,
    pub name: String,
    #[serde(rename = "type")]
    pub card_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_type: Option<String>,
    #[serde(default)]
    pub moves: MovePattern,
    #[serde(default = "blank_corners")]
    pub corners: [CornerValue; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Name of the capability implementing the power or trump
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usable_by: Option<Vec<String>>,
    #[serde(default)]
    pub target: MovePattern,
}

impl CardDef {
    pub fn is_emblem(&self) -> bool {
        self.card_type == EMBLEM
    }
}
