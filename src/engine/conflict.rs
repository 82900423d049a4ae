use std::collections::HashSet;

use ulid::Ulid;

use crate::limits::MAX_CODE_LEN;
use crate::model::*;

use super::EngineError;

pub(crate) fn validate_table(table: &DiningTable) -> Result<(), EngineError> {
    if table.code.trim().is_empty() {
        return Err(EngineError::InvalidInput("table code is empty".into()));
    }
    if table.code.len() > MAX_CODE_LEN {
        return Err(EngineError::LimitExceeded("table code too long"));
    }
    if table.capacity == 0 {
        return Err(EngineError::InvalidInput(format!(
            "table {} has zero capacity",
            table.code
        )));
    }
    Ok(())
}

/// Tables referenced by any of the given reservations.
pub(crate) fn occupied_tables(overlapping: &[Reservation]) -> HashSet<Ulid> {
    overlapping.iter().map(|r| r.table_id).collect()
}

/// `overlapping` must already be restricted to reservations intersecting `window`.
pub(crate) fn check_no_conflict(
    overlapping: &[Reservation],
    table_id: Ulid,
    window: &Span,
) -> Result<(), EngineError> {
    let taken = overlapping
        .iter()
        .any(|r| r.table_id == table_id && r.span.overlaps(window));
    if taken {
        return Err(EngineError::SlotTaken(table_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    const H: Ms = 3_600_000;

    fn booked(table_id: Ulid, start: Ms, end: Ms) -> Reservation {
        Reservation {
            id: Ulid::new(),
            table_id,
            span: Span::new(start, end),
            party_size: 2,
        }
    }

    #[test]
    fn conflict_on_same_table_only() {
        let (t1, t2) = (Ulid::new(), Ulid::new());
        let existing = vec![booked(t1, 18 * H, 20 * H)];
        let window = Span::new(19 * H, 21 * H);

        assert!(matches!(
            check_no_conflict(&existing, t1, &window),
            Err(EngineError::SlotTaken(id)) if id == t1
        ));
        assert!(check_no_conflict(&existing, t2, &window).is_ok());
    }

    #[test]
    fn touching_window_is_free() {
        let t1 = Ulid::new();
        let existing = vec![booked(t1, 18 * H, 20 * H)];
        assert!(check_no_conflict(&existing, t1, &Span::new(20 * H, 22 * H)).is_ok());
        assert!(check_no_conflict(&existing, t1, &Span::new(16 * H, 18 * H)).is_ok());
    }

    #[test]
    fn occupied_set_dedupes() {
        let t1 = Ulid::new();
        let existing = vec![booked(t1, 10 * H, 12 * H), booked(t1, 12 * H, 14 * H)];
        assert_eq!(occupied_tables(&existing), HashSet::from([t1]));
    }

    #[test]
    fn table_validation() {
        let mut table = DiningTable {
            id: Ulid::new(),
            code: "T1".into(),
            capacity: 2,
            zone: Zone::Terrace,
            position: Position::default(),
            features: BTreeSet::new(),
        };
        assert!(validate_table(&table).is_ok());

        table.capacity = 0;
        assert!(matches!(validate_table(&table), Err(EngineError::InvalidInput(_))));

        table.capacity = 2;
        table.code = "  ".into();
        assert!(matches!(validate_table(&table), Err(EngineError::InvalidInput(_))));

        table.code = "T".repeat(MAX_CODE_LEN + 1);
        assert!(matches!(validate_table(&table), Err(EngineError::LimitExceeded(_))));
    }
}
