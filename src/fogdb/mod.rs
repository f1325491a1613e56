//! Fog database model
//!
//! The fog database is the raw description of the game world: named areas
//! (zones) with their world connections, and the fog gates that join areas.
//! Everything here is loaded once and immutable for the rest of the
//! pipeline; the cluster builder derives all higher-level structure from it.

mod loader;

pub use loader::load_fogdb;

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use thiserror::Error;

/// Key items granted through the starting inventory.
///
/// A world connection gated only on items from this set is guaranteed
/// traversable. The set is closed: any condition token that is not one of
/// these names is read as a zone reference.
pub const KEY_ITEMS: &[&str] = &[
    "rusty_key",
    "academy_glintstone_key",
    "imbued_sword_key",
    "drawing_room_key",
    "dectus_medallion",
    "rold_medallion",
    "haligtree_secret_medallion",
    "carian_inverted_statue",
    "pureblood_knight_medal",
    "discarded_palace_key",
];

/// Errors from loading the fog database.
#[derive(Debug, Error)]
pub enum FogDbError {
    /// The document is not valid fog-database TOML.
    #[error("malformed fog database: {0}")]
    Parse(String),

    /// Two areas share the same name.
    #[error("duplicate area '{0}'")]
    DuplicateArea(String),

    /// A condition expression could not be tokenized.
    #[error("unparseable condition '{0}'")]
    Condition(String),
}

/// A named game zone.
#[derive(Debug, Clone)]
pub struct Area {
    pub name: String,
    /// Map identifiers this zone spans; the first is the primary map.
    pub maps: Vec<String>,
    pub tags: BTreeSet<String>,
    /// Event flag set when the boss of this zone is defeated.
    pub defeat_flag: Option<u32>,
    /// World connections in definition order.
    pub connections: Vec<WorldConnection>,
}

impl Area {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Primary map identifier, if any map is listed.
    pub fn primary_map(&self) -> Option<&str> {
        self.maps.first().map(String::as_str)
    }
}

/// A world-geometry connection from one area to another.
#[derive(Debug, Clone)]
pub struct WorldConnection {
    pub to: String,
    pub condition: Option<Condition>,
    pub tags: Vec<String>,
}

impl WorldConnection {
    /// Drop connections are one-way: there is no implicit return path.
    pub fn is_drop(&self) -> bool {
        self.tags.iter().any(|t| t == "drop")
    }

    /// A connection is guaranteed when it has no condition, or when every
    /// referenced token is a starting-inventory key item.
    pub fn is_guaranteed(&self) -> bool {
        match &self.condition {
            None => true,
            Some(cond) => cond.is_guaranteed(),
        }
    }
}

/// A parsed world-connection condition.
///
/// Conditions are flat token streams: a lone token is an item or zone
/// reference, `OR a b ...` is a disjunction, `AND a b ...` a conjunction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Item(String),
    Zone(String),
    AnyOf(Vec<String>),
    AllOf(Vec<String>),
}

impl Condition {
    /// Parse a condition expression. Empty input is an error; callers pass
    /// `None` for unconditional connections instead.
    pub fn parse(text: &str) -> Result<Self, FogDbError> {
        let mut tokens = text.split_whitespace();
        let first = tokens
            .next()
            .ok_or_else(|| FogDbError::Condition(text.to_string()))?;
        let rest: Vec<String> = tokens.map(str::to_string).collect();

        match first {
            "OR" | "AND" => {
                if rest.is_empty() {
                    return Err(FogDbError::Condition(text.to_string()));
                }
                if first == "OR" {
                    Ok(Condition::AnyOf(rest))
                } else {
                    Ok(Condition::AllOf(rest))
                }
            }
            tok => {
                if !rest.is_empty() {
                    // Bare token streams must be a single reference.
                    return Err(FogDbError::Condition(text.to_string()));
                }
                if is_key_item(tok) {
                    Ok(Condition::Item(tok.to_string()))
                } else {
                    Ok(Condition::Zone(tok.to_string()))
                }
            }
        }
    }

    /// True when every referenced token is a key item. Zone references make
    /// a condition non-guaranteed regardless of the surrounding operator.
    pub fn is_guaranteed(&self) -> bool {
        match self {
            Condition::Item(_) => true,
            Condition::Zone(_) => false,
            Condition::AnyOf(toks) | Condition::AllOf(toks) => {
                toks.iter().all(|t| is_key_item(t))
            }
        }
    }
}

fn is_key_item(token: &str) -> bool {
    KEY_ITEMS.contains(&token)
}

/// A fog gate joining two areas.
#[derive(Debug, Clone)]
pub struct Fog {
    pub name: String,
    pub a_side: String,
    pub b_side: String,
    pub tags: BTreeSet<String>,
    pub model: String,
    pub entity_id: u32,
    pub map: String,
}

impl Fog {
    /// Unique fogs are one-way: exit-only for the A side, entry-only for
    /// the B side.
    pub fn is_unique(&self) -> bool {
        self.tags.contains("unique")
    }

    /// Excluded from randomization entirely.
    pub fn is_norandom(&self) -> bool {
        self.tags.contains("norandom")
    }

    pub fn touches(&self, zone: &str) -> bool {
        self.a_side == zone || self.b_side == zone
    }
}

/// The loaded fog database: areas indexed by name, fogs in definition order.
#[derive(Debug, Clone, Default)]
pub struct FogDb {
    pub areas: BTreeMap<String, Area>,
    pub fogs: Vec<Fog>,
}

impl FogDb {
    pub fn area(&self, name: &str) -> Option<&Area> {
        self.areas.get(name)
    }

    /// Whether any randomizable fog gate touches the given zone.
    pub fn zone_has_fogs(&self, zone: &str) -> bool {
        self.fogs
            .iter()
            .any(|f| !f.is_norandom() && f.touches(zone))
    }
}
