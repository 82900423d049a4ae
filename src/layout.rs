//! Floor plan: the built-in ten-table layout, or one read from a JSON file.

use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use serde::Deserialize;
use ulid::Ulid;

use crate::model::*;

/// One table as written in a layout file. Ids are assigned on load.
#[derive(Debug, Clone, Deserialize)]
pub struct TableLayout {
    pub code: String,
    pub capacity: u32,
    pub zone: Zone,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub features: BTreeSet<Feature>,
}

impl TableLayout {
    pub fn into_table(self) -> DiningTable {
        DiningTable {
            id: Ulid::new(),
            code: self.code,
            capacity: self.capacity,
            zone: self.zone,
            position: Position {
                x: self.x,
                y: self.y,
            },
            features: self.features,
        }
    }
}

fn t(code: &str, capacity: u32, zone: Zone, x: i32, y: i32, features: &[Feature]) -> DiningTable {
    TableLayout {
        code: code.into(),
        capacity,
        zone,
        x,
        y,
        features: features.iter().copied().collect(),
    }
    .into_table()
}

pub fn default_floor_plan() -> Vec<DiningTable> {
    use Feature::*;
    use Zone::*;
    vec![
        t("T1", 2, MainHall, 2, 2, &[Quiet]),
        t("T2", 2, MainHall, 4, 2, &[Window]),
        t("T3", 4, MainHall, 6, 2, &[Window]),
        t("T4", 4, MainHall, 2, 4, &[Accessible]),
        t("T5", 6, MainHall, 4, 4, &[KidsNear]),
        t("T6", 2, Terrace, 2, 6, &[Window]),
        t("T7", 4, Terrace, 4, 6, &[Window, Quiet]),
        t("T8", 6, Terrace, 6, 6, &[]),
        t("P1", 4, PrivateRoom, 9, 2, &[Quiet]),
        t("P2", 8, PrivateRoom, 9, 4, &[Quiet, Accessible]),
    ]
}

/// Parse a JSON array of [`TableLayout`] entries.
pub fn parse_floor_plan(json: &str) -> io::Result<Vec<DiningTable>> {
    let entries: Vec<TableLayout> = serde_json::from_str(json)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(entries.into_iter().map(TableLayout::into_table).collect())
}

pub fn load_floor_plan(path: &Path) -> io::Result<Vec<DiningTable>> {
    parse_floor_plan(&std::fs::read_to_string(path)?)
}
