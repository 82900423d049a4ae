use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::limits::RESERVATION_DURATION_MS;

/// Unix milliseconds of the restaurant's wall clock.
pub type Ms = i64;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// The seating window for a party arriving at `date` `time`.
    pub fn seating(date: NaiveDate, time: NaiveTime) -> Self {
        let start = date.and_time(time).and_utc().timestamp_millis();
        Self::new(start, start + RESERVATION_DURATION_MS)
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Dining area a table belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Zone {
    MainHall,
    Terrace,
    PrivateRoom,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::MainHall => "MAIN_HALL",
            Zone::Terrace => "TERRACE",
            Zone::PrivateRoom => "PRIVATE_ROOM",
        }
    }
}

impl FromStr for Zone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MAIN_HALL" => Ok(Zone::MainHall),
            "TERRACE" => Ok(Zone::Terrace),
            "PRIVATE_ROOM" => Ok(Zone::PrivateRoom),
            _ => Err(format!("unknown zone: {s}")),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Amenity tag on a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Feature {
    Quiet,
    Window,
    Accessible,
    KidsNear,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Quiet => "QUIET",
            Feature::Window => "WINDOW",
            Feature::Accessible => "ACCESSIBLE",
            Feature::KidsNear => "KIDS_NEAR",
        }
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "QUIET" => Ok(Feature::Quiet),
            "WINDOW" => Ok(Feature::Window),
            "ACCESSIBLE" => Ok(Feature::Accessible),
            "KIDS_NEAR" => Ok(Feature::KidsNear),
            _ => Err(format!("unknown feature: {s}")),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Floor-plan coordinates. Display only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: Ulid,
    pub code: String,
    pub capacity: u32,
    pub zone: Zone,
    #[serde(flatten)]
    pub position: Position,
    pub features: BTreeSet<Feature>,
}

impl DiningTable {
    pub fn fits(&self, party_size: u32) -> bool {
        self.capacity >= party_size
    }
}

/// One seating of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Ulid,
    pub table_id: Ulid,
    pub span: Span,
    pub party_size: u32,
}

/// Reservations of a single table, sorted by `span.start`.
#[derive(Debug, Clone, Default)]
pub struct TableSchedule {
    pub reservations: Vec<Reservation>,
}

impl TableSchedule {
    /// Insert maintaining sort order by span.start.
    pub fn insert(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .partition_point(|r| r.span.start <= reservation.span.start);
        self.reservations.insert(pos, reservation);
    }

    /// Reservations whose span overlaps the query window.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Reservation> {
        // Everything at index >= right_bound starts at or after query.end.
        let right_bound = self
            .reservations
            .partition_point(|r| r.span.start < query.end);
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.span.end > query.start)
    }
}

/// WAL record. Variants carry plain fields so bincode can encode them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    TableCreated {
        id: Ulid,
        code: String,
        capacity: u32,
        zone: Zone,
        x: i32,
        y: i32,
        features: Vec<Feature>,
    },
    ReservationConfirmed {
        id: Ulid,
        table_id: Ulid,
        span: Span,
        party_size: u32,
    },
}

impl From<&DiningTable> for Event {
    fn from(t: &DiningTable) -> Self {
        Event::TableCreated {
            id: t.id,
            code: t.code.clone(),
            capacity: t.capacity,
            zone: t.zone,
            x: t.position.x,
            y: t.position.y,
            features: t.features.iter().copied().collect(),
        }
    }
}

impl From<&Reservation> for Event {
    fn from(r: &Reservation) -> Self {
        Event::ReservationConfirmed {
            id: r.id,
            table_id: r.table_id,
            span: r.span,
            party_size: r.party_size,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableAvailability {
    #[serde(flatten)]
    pub table: DiningTable,
    pub occupied: bool,
    pub suitable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    #[serde(flatten)]
    pub table: DiningTable,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    #[serde(rename = "recommended")]
    pub best: Option<Candidate>,
    #[serde(rename = "topCandidates")]
    pub top_three: Vec<Candidate>,
}
