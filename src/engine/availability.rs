use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime};
use ulid::Ulid;

use crate::model::*;

use super::{by_code, Engine, EngineError};

/// Classify each table in `zone` (all tables when `None`) as occupied and/or suitable.
/// The two flags are independent. Output is sorted by code.
pub fn table_availability(
    tables: Vec<DiningTable>,
    occupied: &HashSet<Ulid>,
    party_size: u32,
    zone: Option<Zone>,
) -> Vec<TableAvailability> {
    let mut out: Vec<TableAvailability> = tables
        .into_iter()
        .filter(|t| zone.is_none_or(|z| t.zone == z))
        .map(|table| TableAvailability {
            occupied: occupied.contains(&table.id),
            suitable: table.fits(party_size),
            table,
        })
        .collect();
    out.sort_by(|a, b| by_code(&a.table, &b.table));
    out
}

impl Engine {
    /// Availability of every table for a seating starting at `date` `time`.
    /// Party size is not validated here.
    pub async fn availability(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        party_size: u32,
        zone: Option<Zone>,
    ) -> Result<Vec<TableAvailability>, EngineError> {
        let window = Span::seating(date, time);
        let occupied = self.occupied_during(&window).await?;
        let tables = self.tables.find_all().await?;
        Ok(table_availability(tables, &occupied, party_size, zone))
    }
}
