use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use ulid::Ulid;

use crate::limits::MAX_TABLES;
use crate::model::*;
use crate::wal::Wal;

use super::conflict::validate_table;
use super::EngineError;

/// Holds the floor plan.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn insert_all(&self, tables: Vec<DiningTable>) -> Result<(), EngineError>;
    async fn find_all(&self) -> Result<Vec<DiningTable>, EngineError>;
    async fn find_by_id(&self, id: &Ulid) -> Result<Option<DiningTable>, EngineError>;
    async fn count(&self) -> Result<usize, EngineError>;
}

/// Holds confirmed reservations.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn insert(&self, reservation: Reservation) -> Result<(), EngineError>;
    /// Every reservation whose span overlaps `window` (half-open).
    async fn find_overlapping(&self, window: &Span) -> Result<Vec<Reservation>, EngineError>;
}

/// DashMap-backed store for both tables and reservations, optionally
/// made durable by a WAL. Writes are serialized on the writer mutex;
/// reads never take it.
pub struct InMemoryStore {
    tables: DashMap<Ulid, DiningTable>,
    codes: DashMap<String, Ulid>,
    schedules: DashMap<Ulid, TableSchedule>,
    writer: Mutex<Option<Wal>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
            codes: DashMap::new(),
            schedules: DashMap::new(),
            writer: Mutex::new(None),
        }
    }

    /// Replay the WAL at `path`, cutting off any damaged tail, and keep appending to it.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let events = Wal::recover(path)?;
        let mut store = Self::new();
        for event in events {
            store.apply_event(event);
        }
        let reservations: usize = store.schedules.iter().map(|s| s.reservations.len()).sum();
        tracing::info!(
            "replayed {}: {} tables, {} reservations",
            path.display(),
            store.tables.len(),
            reservations
        );
        *store.writer.get_mut() = Some(Wal::open(path)?);
        Ok(store)
    }

    fn apply_event(&self, event: Event) {
        match event {
            Event::TableCreated {
                id,
                code,
                capacity,
                zone,
                x,
                y,
                features,
            } => {
                self.codes.insert(code.clone(), id);
                self.tables.insert(
                    id,
                    DiningTable {
                        id,
                        code,
                        capacity,
                        zone,
                        position: Position { x, y },
                        features: features.into_iter().collect(),
                    },
                );
            }
            Event::ReservationConfirmed {
                id,
                table_id,
                span,
                party_size,
            } => {
                self.schedules.entry(table_id).or_default().insert(Reservation {
                    id,
                    table_id,
                    span,
                    party_size,
                });
            }
        }
    }

    /// Caller holds the writer lock. WAL first, then memory.
    fn persist(&self, wal: &mut Option<Wal>, events: Vec<Event>) -> Result<(), EngineError> {
        if let Some(wal) = wal.as_mut() {
            let started = std::time::Instant::now();
            wal.append_all(&events).map_err(|e| {
                tracing::error!("WAL append to {} failed: {e}", wal.path().display());
                EngineError::WalError(e.to_string())
            })?;
            metrics::histogram!(crate::observability::WAL_APPEND_DURATION_SECONDS)
                .record(started.elapsed().as_secs_f64());
        }
        for event in events {
            self.apply_event(event);
        }
        Ok(())
    }
}

#[async_trait]
impl TableStore for InMemoryStore {
    async fn insert_all(&self, tables: Vec<DiningTable>) -> Result<(), EngineError> {
        let mut wal = self.writer.lock().await;

        if self.tables.len() + tables.len() > MAX_TABLES {
            return Err(EngineError::LimitExceeded("too many tables"));
        }
        let mut batch_codes = HashSet::new();
        let mut batch_ids = HashSet::new();
        for table in &tables {
            validate_table(table)?;
            if self.codes.contains_key(&table.code) || !batch_codes.insert(table.code.as_str()) {
                return Err(EngineError::AlreadyExists(format!("table code {}", table.code)));
            }
            if self.tables.contains_key(&table.id) || !batch_ids.insert(table.id) {
                return Err(EngineError::AlreadyExists(format!("table id {}", table.id)));
            }
        }

        let events = tables.iter().map(Event::from).collect();
        self.persist(&mut wal, events)
    }

    async fn find_all(&self) -> Result<Vec<DiningTable>, EngineError> {
        Ok(self.tables.iter().map(|e| e.value().clone()).collect())
    }

    async fn find_by_id(&self, id: &Ulid) -> Result<Option<DiningTable>, EngineError> {
        Ok(self.tables.get(id).map(|e| e.value().clone()))
    }

    async fn count(&self) -> Result<usize, EngineError> {
        Ok(self.tables.len())
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn insert(&self, reservation: Reservation) -> Result<(), EngineError> {
        let mut wal = self.writer.lock().await;
        self.persist(&mut wal, vec![Event::from(&reservation)])
    }

    async fn find_overlapping(&self, window: &Span) -> Result<Vec<Reservation>, EngineError> {
        let mut hits: Vec<Reservation> = self
            .schedules
            .iter()
            .flat_map(|e| e.value().overlapping(window).cloned().collect::<Vec<_>>())
            .collect();
        hits.sort_by_key(|r| (r.span.start, r.id));
        Ok(hits)
    }
}
