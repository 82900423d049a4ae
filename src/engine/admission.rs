use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, info};
use ulid::Ulid;

use crate::model::*;

use super::conflict::check_no_conflict;
use super::{Engine, EngineError};

impl Engine {
    /// Admit one reservation of `table_id` for a seating starting at `date` `time`.
    ///
    /// Checks run in order: table exists, party size is positive and fits,
    /// then no overlapping reservation on the table. The overlap check and
    /// the insert run under the table's admission lock, so two concurrent
    /// requests for overlapping windows cannot both succeed.
    pub async fn create_reservation(
        &self,
        table_id: Ulid,
        date: NaiveDate,
        time: NaiveTime,
        party_size: u32,
    ) -> Result<Reservation, EngineError> {
        let result = self.admit(table_id, Span::seating(date, time), party_size).await;
        match &result {
            Ok(r) => {
                info!(
                    "reservation {} confirmed: table {} [{}, {}) party {}",
                    r.id, r.table_id, r.span.start, r.span.end, r.party_size
                );
                metrics::counter!(crate::observability::RESERVATIONS_CREATED_TOTAL).increment(1);
            }
            Err(e) => {
                debug!("reservation for table {table_id} rejected: {e}");
                metrics::counter!(
                    crate::observability::ADMISSIONS_REJECTED_TOTAL,
                    "reason" => e.kind()
                )
                .increment(1);
            }
        }
        result
    }

    async fn admit(
        &self,
        table_id: Ulid,
        window: Span,
        party_size: u32,
    ) -> Result<Reservation, EngineError> {
        let table = self
            .tables
            .find_by_id(&table_id)
            .await?
            .ok_or(EngineError::NotFound(table_id))?;

        if party_size == 0 {
            return Err(EngineError::InvalidInput("party size must be positive".into()));
        }
        if !table.fits(party_size) {
            return Err(EngineError::CapacityExceeded {
                party_size,
                capacity: table.capacity,
            });
        }

        let lock = self.admission_lock(table_id);
        let _guard = lock.lock().await;

        let overlapping = self.reservations.find_overlapping(&window).await?;
        check_no_conflict(&overlapping, table_id, &window)?;

        let reservation = Reservation {
            id: Ulid::new(),
            table_id,
            span: window,
            party_size,
        };
        self.reservations.insert(reservation.clone()).await?;
        Ok(reservation)
    }
}
