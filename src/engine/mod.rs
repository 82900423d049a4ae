mod admission;
mod availability;
mod conflict;
mod error;
mod recommend;
mod store;

pub use availability::table_availability;
pub use error::EngineError;
pub use recommend::{rank_candidates, score};
pub use store::{InMemoryStore, ReservationStore, TableStore};

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;
use ulid::Ulid;

use crate::model::*;

pub struct Engine {
    tables: Arc<dyn TableStore>,
    reservations: Arc<dyn ReservationStore>,
    /// Per-table admission locks, held across the overlap check and the insert.
    admission: DashMap<Ulid, Arc<Mutex<()>>>,
}

impl Engine {
    pub fn new(tables: Arc<dyn TableStore>, reservations: Arc<dyn ReservationStore>) -> Self {
        Self {
            tables,
            reservations,
            admission: DashMap::new(),
        }
    }

    /// Engine over a fresh, non-durable store.
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::new(store.clone(), store)
    }

    /// Engine over a store replayed from (and appending to) the WAL at `path`.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let store = Arc::new(InMemoryStore::open(path)?);
        Ok(Self::new(store.clone(), store))
    }

    /// Insert the floor plan unless tables already exist. Returns how many were inserted.
    pub async fn load_floor_plan(&self, tables: Vec<DiningTable>) -> Result<usize, EngineError> {
        let existing = self.tables.count().await?;
        if existing > 0 {
            info!("floor plan already present: {existing} tables");
            metrics::gauge!(crate::observability::TABLES_LOADED).set(existing as f64);
            return Ok(0);
        }
        let count = tables.len();
        self.tables.insert_all(tables).await?;
        info!("loaded floor plan: {count} tables");
        metrics::gauge!(crate::observability::TABLES_LOADED).set(count as f64);
        Ok(count)
    }

    /// All tables, sorted by code.
    pub async fn list_tables(&self) -> Result<Vec<DiningTable>, EngineError> {
        let mut tables = self.tables.find_all().await?;
        tables.sort_by(by_code);
        Ok(tables)
    }

    /// Ids of tables holding a reservation that overlaps `window`.
    pub(super) async fn occupied_during(
        &self,
        window: &Span,
    ) -> Result<HashSet<Ulid>, EngineError> {
        let overlapping = self.reservations.find_overlapping(window).await?;
        Ok(conflict::occupied_tables(&overlapping))
    }

    pub(super) fn admission_lock(&self, table_id: Ulid) -> Arc<Mutex<()>> {
        self.admission.entry(table_id).or_default().value().clone()
    }
}

/// Code ascending; id breaks ties so the order is total.
pub(crate) fn by_code(a: &DiningTable, b: &DiningTable) -> Ordering {
    a.code.cmp(&b.code).then_with(|| a.id.cmp(&b.id))
}
