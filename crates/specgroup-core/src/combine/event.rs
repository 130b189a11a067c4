use super::histogram::{combined_header, empty_group};
use crate::domain::{Behaviour, EventRow, GroupingResult};

#[derive(Debug, Clone, PartialEq)]
pub struct CombinedEvents {
    pub row: EventRow,
    /// Rows the weights must later be divided by; only set when averaging
    /// over more than one unmasked row.
    pub average_count: Option<usize>,
}

/// Appends the events of every row in the group, in group order.
///
/// Events are not re-sorted. Masked rows still contribute events but are
/// not counted towards the averaging denominator, which is at least one.
pub fn combine_events(rows: &[&EventRow], behaviour: Behaviour) -> GroupingResult<CombinedEvents> {
    let Some(first) = rows.first() else {
        return Err(empty_group());
    };

    let capacity = rows.iter().map(|row| row.events.len()).sum();
    let mut events = Vec::with_capacity(capacity);
    for row in rows {
        events.extend_from_slice(&row.events);
    }

    let unmasked = rows
        .iter()
        .filter(|row| !row.header.masked)
        .count()
        .max(1);
    let average_count = (behaviour == Behaviour::Average && unmasked > 1).then_some(unmasked);

    let header = if rows.len() == 1 {
        first.header.clone()
    } else {
        combined_header(rows.iter().map(|row| &row.header))
    };

    Ok(CombinedEvents {
        row: EventRow::new(header, first.x.clone(), events),
        average_count,
    })
}
