//! Fog database loader
//!
//! Deserializes the raw fog-database document (TOML array-of-tables) into
//! the in-memory model. List order is significant and preserved: connection
//! lists and the fog list keep their definition order, which downstream
//! cluster hashing and fog classification rely on.

use super::{Area, Condition, Fog, FogDb, FogDbError, WorldConnection};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct RawDb {
    #[serde(default)]
    areas: Vec<RawArea>,
    #[serde(default)]
    fogs: Vec<RawFog>,
}

#[derive(Debug, Deserialize)]
struct RawArea {
    name: String,
    #[serde(default)]
    maps: Vec<String>,
    /// Whitespace-separated tag tokens.
    #[serde(default)]
    tags: String,
    #[serde(default)]
    defeat_flag: Option<u32>,
    #[serde(default, rename = "to")]
    connections: Vec<RawConnection>,
}

#[derive(Debug, Deserialize)]
struct RawConnection {
    area: String,
    #[serde(default)]
    cond: Option<String>,
    #[serde(default)]
    tags: String,
}

#[derive(Debug, Deserialize)]
struct RawFog {
    name: String,
    a: String,
    b: String,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    id: u32,
    #[serde(default)]
    map: String,
}

fn split_tags(tags: &str) -> impl Iterator<Item = String> + '_ {
    tags.split_whitespace().map(str::to_string)
}

/// Parse a fog-database document.
pub fn load_fogdb(text: &str) -> Result<FogDb, FogDbError> {
    let raw: RawDb = toml::from_str(text).map_err(|e| FogDbError::Parse(e.to_string()))?;

    let mut areas: BTreeMap<String, Area> = BTreeMap::new();
    for raw_area in raw.areas {
        let mut connections = Vec::with_capacity(raw_area.connections.len());
        for raw_conn in raw_area.connections {
            let condition = match raw_conn.cond.as_deref() {
                None => None,
                Some(text) => Some(Condition::parse(text)?),
            };
            connections.push(WorldConnection {
                to: raw_conn.area,
                condition,
                tags: split_tags(&raw_conn.tags).collect(),
            });
        }

        let area = Area {
            name: raw_area.name.clone(),
            maps: raw_area.maps,
            tags: split_tags(&raw_area.tags).collect(),
            defeat_flag: raw_area.defeat_flag,
            connections,
        };
        if areas.insert(raw_area.name.clone(), area).is_some() {
            return Err(FogDbError::DuplicateArea(raw_area.name));
        }
    }

    let mut fogs = Vec::with_capacity(raw.fogs.len());
    for raw_fog in raw.fogs {
        if !areas.contains_key(&raw_fog.a) || !areas.contains_key(&raw_fog.b) {
            // Trimmed databases reference areas outside the kept set; the
            // cluster builder never attaches such fogs, so keep loading.
            warn!(fog = %raw_fog.name, "fog references unknown area");
        }
        fogs.push(Fog {
            name: raw_fog.name,
            a_side: raw_fog.a,
            b_side: raw_fog.b,
            tags: split_tags(&raw_fog.tags).collect(),
            model: raw_fog.model,
            entity_id: raw_fog.id,
            map: raw_fog.map,
        });
    }

    Ok(FogDb { areas, fogs })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[areas]]
name = "gatefront"
maps = ["m60_42"]
tags = "start"

[[areas.to]]
area = "stormhill"

[[areas]]
name = "stormhill"
maps = ["m60_41"]
tags = ""

[[areas.to]]
area = "gatefront"

[[areas.to]]
area = "stormhill_cellar"
tags = "drop"

[[areas.to]]
area = "divine_bridge"
cond = "OR dectus_medallion rold_medallion"

[[areas]]
name = "stormhill_cellar"

[[areas]]
name = "divine_bridge"

[[fogs]]
name = "stormhill_main_gate"
a = "gatefront"
b = "stormhill"
model = "AEG099_001"
id = 1042360000
map = "m60_42"

[[fogs]]
name = "cellar_drop_door"
a = "stormhill"
b = "stormhill_cellar"
tags = "unique"
map = "m60_41"
"#;

    #[test]
    fn test_load_sample() {
        let db = load_fogdb(SAMPLE).unwrap();
        assert_eq!(db.areas.len(), 4);
        assert_eq!(db.fogs.len(), 2);

        let gatefront = db.area("gatefront").unwrap();
        assert!(gatefront.has_tag("start"));
        assert_eq!(gatefront.primary_map(), Some("m60_42"));
        assert_eq!(gatefront.connections.len(), 1);

        let stormhill = db.area("stormhill").unwrap();
        assert_eq!(stormhill.connections.len(), 3);
        assert!(stormhill.connections[1].is_drop());
        assert!(stormhill.connections[2].is_guaranteed());
    }

    #[test]
    fn test_connection_order_preserved() {
        let db = load_fogdb(SAMPLE).unwrap();
        let stormhill = db.area("stormhill").unwrap();
        let targets: Vec<&str> = stormhill
            .connections
            .iter()
            .map(|c| c.to.as_str())
            .collect();
        assert_eq!(targets, vec!["gatefront", "stormhill_cellar", "divine_bridge"]);
    }

    #[test]
    fn test_fog_order_preserved() {
        let db = load_fogdb(SAMPLE).unwrap();
        assert_eq!(db.fogs[0].name, "stormhill_main_gate");
        assert_eq!(db.fogs[1].name, "cellar_drop_door");
        assert!(db.fogs[1].is_unique());
    }

    #[test]
    fn test_malformed_input() {
        let err = load_fogdb("[[areas]\nname = ").unwrap_err();
        assert!(matches!(err, FogDbError::Parse(_)));
    }

    #[test]
    fn test_duplicate_area() {
        let text = r#"
[[areas]]
name = "twin"

[[areas]]
name = "twin"
"#;
        let err = load_fogdb(text).unwrap_err();
        assert!(matches!(err, FogDbError::DuplicateArea(name) if name == "twin"));
    }

    #[test]
    fn test_bad_condition() {
        let text = r#"
[[areas]]
name = "a"

[[areas.to]]
area = "b"
cond = "OR"
"#;
        let err = load_fogdb(text).unwrap_err();
        assert!(matches!(err, FogDbError::Condition(_)));
    }

    #[test]
    fn test_zone_has_fogs() {
        let db = load_fogdb(SAMPLE).unwrap();
        assert!(db.zone_has_fogs("gatefront"));
        assert!(!db.zone_has_fogs("divine_bridge"));
    }
}
