use std::collections::{BTreeSet, HashSet};

use chrono::{NaiveDate, NaiveTime};
use ulid::Ulid;

use crate::model::*;

use super::{by_code, Engine, EngineError};

const PERFECT_FIT_SCORE: u32 = 20;
const WASTED_SEAT_PENALTY: u32 = 2;
const ZONE_BONUS: u32 = 5;
const FEATURE_BONUS: u32 = 10;

/// Score a candidate table. Caller guarantees `table.capacity >= party_size`.
///
/// - capacity fit: 20 minus 2 per empty seat, floored at 0
/// - zone: +5 when a zone was requested and matches
/// - features: +10 per requested feature the table has
pub fn score(
    table: &DiningTable,
    party_size: u32,
    zone: Option<Zone>,
    features: &BTreeSet<Feature>,
) -> u32 {
    let waste = table.capacity.saturating_sub(party_size);
    let capacity_score =
        PERFECT_FIT_SCORE.saturating_sub(waste.saturating_mul(WASTED_SEAT_PENALTY));

    // Constant under the zone filter below, but kept as part of the score.
    let zone_bonus = match zone {
        Some(z) if table.zone == z => ZONE_BONUS,
        _ => 0,
    };

    let matched = features.iter().filter(|f| table.features.contains(*f)).count() as u32;

    capacity_score + zone_bonus + matched * FEATURE_BONUS
}

/// Filter to free, large-enough, in-zone tables and rank them:
/// score descending, then code ascending.
pub fn rank_candidates(
    tables: Vec<DiningTable>,
    occupied: &HashSet<Ulid>,
    party_size: u32,
    zone: Option<Zone>,
    features: &BTreeSet<Feature>,
) -> Vec<Candidate> {
    let mut ranked: Vec<Candidate> = tables
        .into_iter()
        .filter(|t| !occupied.contains(&t.id))
        .filter(|t| t.fits(party_size))
        .filter(|t| zone.is_none_or(|z| t.zone == z))
        .map(|table| Candidate {
            score: score(&table, party_size, zone, features),
            table,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| by_code(&a.table, &b.table))
    });
    ranked
}

impl Engine {
    /// Best table and runners-up for a seating starting at `date` `time`.
    pub async fn recommend(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        party_size: u32,
        zone: Option<Zone>,
        features: &BTreeSet<Feature>,
    ) -> Result<Recommendation, EngineError> {
        let window = Span::seating(date, time);
        let occupied = self.occupied_during(&window).await?;
        let tables = self.tables.find_all().await?;

        let mut ranked = rank_candidates(tables, &occupied, party_size, zone, features);
        ranked.truncate(3);
        Ok(Recommendation {
            best: ranked.first().cloned(),
            top_three: ranked,
        })
    }
}
